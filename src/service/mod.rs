//! Region retrieval service.
//!
//! [`ImageService`] owns a [`BlockCache`](crate::cache::BlockCache) and a
//! [`BlockFetcher`](crate::fetch::BlockFetcher) and turns region requests into
//! composed rasters.

mod image_service;

pub use image_service::ImageService;
