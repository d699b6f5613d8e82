//! # Block Streamer
//!
//! Serves rectangular image regions sliced out of a block-tiled, zoomable
//! image store.
//!
//! The store is addressed in fixed-size blocks. Fetching a block is slow, so
//! resolved blocks are kept in a cache bounded by age and by total bytes. A
//! region request is answered by finding the blocks that overlap it, taking
//! the fresh ones from the cache, fetching the rest, and stitching the result
//! into one contiguous raster.
//!
//! ## Architecture
//!
//! - [`block`] - Block coordinates, payloads, regions and grid arithmetic
//! - [`fetch`] - The [`BlockFetcher`] seam to the remote store, plus an in-memory store
//! - [`cache`] - TTL- and size-bounded [`BlockCache`]
//! - [`compose`] - Stitching resolved blocks into an output raster
//! - [`service`] - [`ImageService`], the orchestrator
//! - [`server`] - Axum-based HTTP routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use block_streamer::{ImageService, MemoryBlockStore, Offset, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryBlockStore::synthetic(32, 1, 4, 1).await.unwrap();
//!     let config = ServiceConfig::new(1, 0, 64 * 1024 * 1024, Duration::from_secs(60));
//!     let service = ImageService::new(store, config).unwrap();
//!
//!     let raster = service
//!         .retrieve_image(48, 48, Offset::new(16, 16, 0), 0)
//!         .await
//!         .unwrap();
//!     assert_eq!(raster.len(), 48 * 48);
//! }
//! ```

pub mod block;
pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod fetch;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use block::{intersecting_coords, Block, BlockCoord, BlockData, Dims, Offset, Region};
pub use cache::{BlockCache, CacheStats};
pub use compose::{compose, Canvas};
pub use config::{Cli, Command, FetchConfig, ServeConfig, ServiceConfig};
pub use error::{ComposeError, ConfigError, FetchError, ServiceError};
pub use fetch::{BlockFetcher, MemoryBlockStore};
pub use server::{create_router, AppState, RouterConfig};
pub use service::ImageService;
