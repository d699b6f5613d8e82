//! Upstream block access.
//!
//! [`BlockFetcher`] is the seam between the image service and whatever talks
//! to the remote block store. [`MemoryBlockStore`] is an in-process
//! implementation.

mod fetcher;
mod memory;

pub use fetcher::BlockFetcher;
pub use memory::MemoryBlockStore;
