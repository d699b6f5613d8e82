//! TTL- and size-bounded cache of resolved blocks.
//!
//! # Freshness
//!
//! Every entry is stamped when it is recorded. An entry older than the
//! refresh window is stale: lookups report a miss for it and the next
//! insertion physically drops it.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the payload bytes of resident blocks and evicts entries in
//! least-recently-refreshed order when the capacity is exceeded. Lookups use
//! `peek` and never reorder entries, so eviction order depends only on the
//! sequence of [`BlockCache::record_fetched`] calls.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;
use tracing::debug;

use crate::block::{Block, BlockCoord};

/// Default cache capacity: 256MB
pub const DEFAULT_CACHE_SIZE: usize = 256 * 1024 * 1024;

/// Default refresh window: 10 minutes
pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_secs(600);

/// Default maximum number of entries (to bound LRU overhead)
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    block: Block,
    refreshed_at: Instant,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub resident_bytes: usize,
    pub capacity_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Cache of resolved blocks keyed by [`BlockCoord`].
///
/// The cache itself is not synchronized; the image service keeps it behind
/// its own lock together with the in-flight fetch table.
pub struct BlockCache {
    entries: LruCache<BlockCoord, CacheEntry>,
    ttl: Duration,
    max_size: usize,
    resident: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl BlockCache {
    /// Create a cache with default capacity and refresh window.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CACHE_SIZE, DEFAULT_REFRESH_RATE, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with explicit limits.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum resident payload bytes
    /// * `ttl` - Age after which an entry is stale
    /// * `max_entries` - Maximum number of entries; clamped to at least 1
    pub fn with_limits(max_size: usize, ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
            ttl,
            max_size,
            resident: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Set the staleness window.
    pub fn set_timer(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    /// Set the capacity bound in bytes, evicting immediately if it shrank.
    pub fn set_max_size(&mut self, bytes: usize) {
        self.max_size = bytes;
        self.evict(Instant::now());
    }

    /// Look up a fresh copy of the block at `coord`.
    ///
    /// Stale and absent entries are both misses. Neither outcome changes which
    /// entries are resident or their eviction order.
    pub fn retrieve_block(&mut self, coord: &BlockCoord) -> Option<Block> {
        let now = Instant::now();
        let found = self
            .entries
            .peek(coord)
            .filter(|entry| !self.is_stale(entry, now))
            .map(|entry| entry.block.clone());

        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Insert or refresh the entry for `block.coord`, stamped now.
    ///
    /// Stale entries are dropped first, then the least recently refreshed
    /// entries until the cache fits. A block larger than the whole capacity
    /// is not cached.
    pub fn record_fetched(&mut self, block: Block) {
        let now = Instant::now();
        let size = block.payload_len();
        let coord = block.coord;

        if let Some(old) = self.entries.pop(&coord) {
            self.resident = self.resident.saturating_sub(old.block.payload_len());
        }

        if size > self.max_size {
            debug!(%coord, size, max_size = self.max_size, "block exceeds cache capacity, not cached");
            return;
        }

        if let Some((_, displaced)) = self.entries.push(
            coord,
            CacheEntry {
                block,
                refreshed_at: now,
            },
        ) {
            // the entry-count bound pushed out the oldest entry
            self.resident = self.resident.saturating_sub(displaced.block.payload_len());
            self.evictions += 1;
        }
        self.resident += size;

        self.evict(now);
    }

    /// Remove every entry.
    pub fn flush(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.resident = 0;
        debug!(count, "block cache flushed");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resident payload bytes.
    pub fn size(&self) -> usize {
        self.resident
    }

    /// Capacity bound in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check whether `coord` holds a fresh entry without touching counters.
    pub fn contains(&self, coord: &BlockCoord) -> bool {
        let now = Instant::now();
        self.entries
            .peek(coord)
            .is_some_and(|entry| !self.is_stale(entry, now))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            resident_bytes: self.resident,
            capacity_bytes: self.max_size,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn is_stale(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.refreshed_at) >= self.ttl
    }

    /// Drop stale entries from the tail, then shrink to capacity.
    ///
    /// The LRU tail is always the oldest refresh, so stale entries are
    /// contiguous at the tail.
    fn evict(&mut self, now: Instant) {
        while let Some((_, entry)) = self.entries.peek_lru() {
            if !self.is_stale(entry, now) {
                break;
            }
            self.pop_tail();
        }

        while self.resident > self.max_size {
            if !self.pop_tail() {
                break;
            }
        }
    }

    fn pop_tail(&mut self) -> bool {
        match self.entries.pop_lru() {
            Some((coord, entry)) => {
                let size = entry.block.payload_len();
                self.resident = self.resident.saturating_sub(size);
                self.evictions += 1;
                debug!(%coord, size, resident = self.resident, "evicted block");
                true
            }
            None => false,
        }
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
