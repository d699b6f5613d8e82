//! Test utilities for integration tests.
//!
//! Mock fetchers that count and shape upstream traffic, plus helpers for
//! building block payloads with known content.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use block_streamer::{
    intersecting_coords, Block, BlockCoord, BlockData, BlockFetcher, Dims, FetchError,
    MemoryBlockStore, Offset, ServiceConfig,
};

pub const BLOCKSIZE: u32 = 32;

/// Service config with bytedepth 1 and the given cache limits.
pub fn config(emptyval: u8, cache_size: usize, refresh: Duration) -> ServiceConfig {
    ServiceConfig::new(1, emptyval, cache_size, refresh)
}

/// One block's worth of bytes, all equal to `value`.
pub fn solid(value: u8) -> Bytes {
    let bs = BLOCKSIZE as usize;
    Bytes::from(vec![value; bs * bs])
}

/// Block payload whose byte at (px, py) is `seed + py * 32 + px` (wrapping).
pub fn patterned(seed: u8) -> Bytes {
    let bs = BLOCKSIZE as usize;
    Bytes::from(
        (0..bs * bs)
            .map(|i| seed.wrapping_add(i as u8))
            .collect::<Vec<u8>>(),
    )
}

pub fn coord(x: i64, y: i64) -> BlockCoord {
    BlockCoord::new(x, y, 0, 0)
}

// =============================================================================
// Counting Fetcher
// =============================================================================

/// Wraps a [`MemoryBlockStore`] and records every block it is asked to fetch.
///
/// Can be told to fail the next extraction, or to leave blocks unresolved.
pub struct CountingFetcher {
    store: MemoryBlockStore,
    extract_calls: AtomicUsize,
    per_coord: Mutex<HashMap<BlockCoord, usize>>,
    fail_next: AtomicBool,
    leave_pending: AtomicBool,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self {
            store: MemoryBlockStore::new(BLOCKSIZE, 1, 1).unwrap(),
            extract_calls: AtomicUsize::new(0),
            per_coord: Mutex::new(HashMap::new()),
            fail_next: AtomicBool::new(false),
            leave_pending: AtomicBool::new(false),
        }
    }

    pub async fn with_block(self, coord: BlockCoord, payload: Bytes) -> Self {
        self.store.insert(coord, payload).await.unwrap();
        self
    }

    pub fn store(&self) -> &MemoryBlockStore {
        &self.store
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// How many times `coord` was fetched from upstream.
    pub fn fetches_of(&self, coord: BlockCoord) -> usize {
        self.per_coord
            .lock()
            .unwrap()
            .get(&coord)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn leave_pending(&self, enabled: bool) {
        self.leave_pending.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlockFetcher for CountingFetcher {
    async fn intersecting_blocks(
        &self,
        dims: Dims,
        offset: Offset,
        zoom: u32,
    ) -> Result<Vec<Block>, FetchError> {
        self.store.intersecting_blocks(dims, offset, zoom).await
    }

    async fn extract_specific_blocks(&self, blocks: &mut [Block]) -> Result<(), FetchError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut per_coord = self.per_coord.lock().unwrap();
            for block in blocks.iter() {
                *per_coord.entry(block.coord).or_insert(0) += 1;
            }
        }

        if self.fail_next.swap(false, Ordering::SeqCst) {
            // partially fill before failing; none of it may be cached
            if let Some(first) = blocks.first_mut() {
                first.data = BlockData::Empty;
            }
            return Err(FetchError::Unreachable("upstream down".to_string()));
        }

        if self.leave_pending.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.store.extract_specific_blocks(blocks).await
    }
}

// =============================================================================
// Stamping Fetcher
// =============================================================================

/// Fetcher that sleeps, then fills every block of one extraction with a
/// byte unique to that extraction.
///
/// Any raster mixing two stamps was assembled from two different fetches.
pub struct StampingFetcher {
    delay: Duration,
    next_stamp: AtomicU8,
    extract_calls: AtomicUsize,
    failing_stamps: Vec<u8>,
}

impl StampingFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_stamp: AtomicU8::new(1),
            extract_calls: AtomicUsize::new(0),
            failing_stamps: Vec::new(),
        }
    }

    /// Make the first extraction fail after its delay.
    pub fn failing_first(self) -> Self {
        self.failing_on(&[1])
    }

    /// Make the extractions with these stamps (1-based call order) fail after
    /// their delay.
    pub fn failing_on(mut self, stamps: &[u8]) -> Self {
        self.failing_stamps = stamps.to_vec();
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockFetcher for StampingFetcher {
    async fn intersecting_blocks(
        &self,
        dims: Dims,
        offset: Offset,
        zoom: u32,
    ) -> Result<Vec<Block>, FetchError> {
        let coords = intersecting_coords(BLOCKSIZE, 1, dims, offset, zoom)
            .ok_or_else(|| FetchError::InvalidRegion("off the grid".to_string()))?;
        Ok(coords
            .into_iter()
            .map(|coord| Block::descriptor(coord, BLOCKSIZE, 1, 1))
            .collect())
    }

    async fn extract_specific_blocks(&self, blocks: &mut [Block]) -> Result<(), FetchError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let stamp = self.next_stamp.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        if self.failing_stamps.contains(&stamp) {
            return Err(FetchError::Transport("connection reset".to_string()));
        }

        for block in blocks.iter_mut() {
            block.data = BlockData::Raw(solid(stamp));
        }
        Ok(())
    }
}
