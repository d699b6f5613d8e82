//! Block cache.
//!
//! Keeps recently fetched blocks so repeated region requests do not go back
//! to the remote store. Entries expire after the refresh window and are
//! evicted least-recently-refreshed first once the byte capacity is reached.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use block_streamer::block::{Block, BlockCoord, BlockData};
//! use block_streamer::cache::BlockCache;
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut cache = BlockCache::with_limits(1024 * 1024, Duration::from_secs(60), 1000);
//!
//!     let coord = BlockCoord::new(0, 0, 0, 0);
//!     let mut block = Block::descriptor(coord, 32, 1, 1);
//!     block.data = BlockData::Raw(Bytes::from(vec![0u8; 32 * 32]));
//!
//!     cache.record_fetched(block.clone());
//!     assert_eq!(cache.retrieve_block(&coord), Some(block));
//! }
//! ```

mod block_cache;

pub use block_cache::{
    BlockCache, CacheStats, DEFAULT_CACHE_SIZE, DEFAULT_MAX_ENTRIES, DEFAULT_REFRESH_RATE,
};
