//! Image service orchestrating region retrieval.
//!
//! # Pipeline
//!
//! ```text
//! retrieve_image()
//!   1. Reject if paused          5. Fetch claimed misses (no lock held)
//!   2. Allocate output canvas    6. Record fetched blocks, release claims
//!   3. Ask fetcher for blocks    7. Wait for others' fetches, re-lookup
//!   4. Lookup: hits / in-flight  8. Draw snapshot into the canvas
//!      elsewhere / claim misses
//! ```
//!
//! # Concurrency
//!
//! A short mutex guards the block cache together with a table of in-flight
//! fetches. The lock is never held across an await. Concurrent misses for
//! the same coordinate are fetched once: the first caller claims the
//! coordinate and the others wait for the claim to be released, then look the
//! cache up again. A caller whose wait ends without a cache entry (the
//! claimant's fetch failed) claims the coordinate itself.
//!
//! Cache hits are snapshotted as cheap `Bytes` clones, so composition reads
//! no shared state and every caller composes into its own buffer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::block::{Block, BlockCoord, BlockData, Offset, Region};
use crate::cache::{BlockCache, CacheStats};
use crate::compose::Canvas;
use crate::config::ServiceConfig;
use crate::error::{ConfigError, FetchError, ServiceError};
use crate::fetch::BlockFetcher;

/// Cache plus the coordinates currently being fetched.
///
/// Dropping a sender wakes every receiver subscribed to it.
struct SharedState {
    cache: BlockCache,
    in_flight: HashMap<BlockCoord, watch::Sender<()>>,
}

/// Releases claimed coordinates when dropped, including when a retrieval is
/// cancelled mid-fetch.
struct ClaimGuard<'a> {
    state: &'a Mutex<SharedState>,
    coords: Vec<BlockCoord>,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if self.coords.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for coord in &self.coords {
            state.in_flight.remove(coord);
        }
    }
}

/// Outcome of one lookup pass.
struct Lookup<'a> {
    hits: Vec<Block>,
    claimed: Vec<Block>,
    waiting: Vec<(Block, watch::Receiver<()>)>,
    guard: ClaimGuard<'a>,
}

/// Serves rectangular regions from a block store through a block cache.
///
/// # Type Parameters
///
/// * `F` - The fetcher used to reach the block store
///
/// # Example
///
/// ```
/// use block_streamer::block::Offset;
/// use block_streamer::config::ServiceConfig;
/// use block_streamer::fetch::MemoryBlockStore;
/// use block_streamer::service::ImageService;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryBlockStore::new(32, 1, 1).unwrap();
///     let service = ImageService::new(store, ServiceConfig::default()).unwrap();
///
///     let raster = service
///         .retrieve_image(64, 32, Offset::new(16, 0, 0), 0)
///         .await
///         .unwrap();
///     assert_eq!(raster.len(), 64 * 32);
/// }
/// ```
pub struct ImageService<F: BlockFetcher> {
    fetcher: F,
    config: ServiceConfig,
    state: Mutex<SharedState>,
    paused: AtomicBool,
}

impl<F: BlockFetcher> ImageService<F> {
    /// Create a service over `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is invalid.
    pub fn new(fetcher: F, config: ServiceConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache =
            BlockCache::with_limits(config.cache_size, config.refresh_rate, config.max_entries);

        Ok(Self {
            fetcher,
            config,
            state: Mutex::new(SharedState {
                cache,
                in_flight: HashMap::new(),
            }),
            paused: AtomicBool::new(false),
        })
    }

    /// Stop accepting retrievals. Retrievals already running complete.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            info!("image service paused");
        }
    }

    /// Accept retrievals again.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!("image service resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Drop every cached block; the next request for any coordinate fetches.
    pub fn flush_cache(&self) {
        self.lock_state().cache.flush();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_state().cache.stats()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get a reference to the underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Retrieve a `width x height` raster at `offset` on a single z-plane.
    ///
    /// Returns exactly `width * height * bytedepth` bytes, row-major.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Paused`] while the service is paused
    /// - [`ServiceError::Fetch`] if the fetcher fails; nothing from the failed
    ///   batch is cached
    /// - [`ServiceError::Compose`] if the output cannot be sized or allocated,
    ///   the region runs past the `i64` coordinate space, or a block does not
    ///   fit the request. Sizing and allocation fail before any fetch.
    pub async fn retrieve_image(
        &self,
        width: u32,
        height: u32,
        offset: Offset,
        zoom: u32,
    ) -> Result<Bytes, ServiceError> {
        self.retrieve(Region::new(width, height, offset, zoom)).await
    }

    /// Retrieve the raster for `region`. See [`ImageService::retrieve_image`].
    pub async fn retrieve(&self, region: Region) -> Result<Bytes, ServiceError> {
        if self.is_paused() {
            return Err(ServiceError::Paused);
        }

        // sized and allocated before anything is fetched
        let mut canvas = Canvas::allocate(&region, self.config.bytedepth, self.config.emptyval)?;
        if region.is_empty() {
            return Ok(Bytes::new());
        }

        let descriptors = self
            .fetcher
            .intersecting_blocks(region.dims(), region.offset, region.zoom)
            .await?;

        let blocks = self.resolve(descriptors).await?;

        for block in &blocks {
            canvas.draw(block)?;
        }
        Ok(canvas.finish())
    }

    /// Turn descriptors into resolved blocks from the cache or the fetcher.
    async fn resolve(&self, descriptors: Vec<Block>) -> Result<Vec<Block>, ServiceError> {
        let mut resolved = Vec::with_capacity(descriptors.len());
        let mut pending = descriptors;

        while !pending.is_empty() {
            let Lookup {
                hits,
                claimed,
                waiting,
                guard,
            } = self.lookup(pending);

            debug!(
                hits = hits.len(),
                misses = claimed.len(),
                waiting = waiting.len(),
                "block lookup"
            );
            resolved.extend(hits);

            if !claimed.is_empty() {
                let fetched = self.fetch_claimed(claimed).await?;
                resolved.extend(fetched);
            }
            // claims must be released before waiting, or two callers waiting
            // on each other's coordinates would deadlock
            drop(guard);

            pending = Vec::with_capacity(waiting.len());
            for (block, mut done) in waiting {
                // resolves once the claimant drops its sender
                let _ = done.changed().await;
                pending.push(block);
            }
        }

        Ok(resolved)
    }

    /// Partition `pending` into cache hits, coordinates someone else is
    /// fetching, and misses this caller now owns.
    fn lookup(&self, pending: Vec<Block>) -> Lookup<'_> {
        let mut hits = Vec::new();
        let mut claimed = Vec::new();
        let mut waiting = Vec::new();

        let mut state = self.lock_state();
        for block in pending {
            if let Some(cached) = state.cache.retrieve_block(&block.coord) {
                hits.push(cached);
            } else if let Some(sender) = state.in_flight.get(&block.coord) {
                waiting.push((block, sender.subscribe()));
            } else {
                let (sender, _) = watch::channel(());
                state.in_flight.insert(block.coord, sender);
                claimed.push(block);
            }
        }
        drop(state);

        let guard = ClaimGuard {
            state: &self.state,
            coords: claimed.iter().map(|block| block.coord).collect(),
        };
        Lookup {
            hits,
            claimed,
            waiting,
            guard,
        }
    }

    /// Fetch claimed misses in one batch and record them.
    ///
    /// Blocks are recorded only if the whole batch succeeded and validated,
    /// each exactly once.
    async fn fetch_claimed(&self, mut blocks: Vec<Block>) -> Result<Vec<Block>, ServiceError> {
        if let Err(err) = self.fetcher.extract_specific_blocks(&mut blocks).await {
            warn!(error = %err, blocks = blocks.len(), "block fetch failed");
            return Err(err.into());
        }

        if let Err(err) = self.validate_fetched(&blocks) {
            warn!(error = %err, "fetcher returned invalid blocks");
            return Err(err.into());
        }

        {
            let mut state = self.lock_state();
            for block in &blocks {
                state.cache.record_fetched(block.clone());
            }
        }

        debug!(count = blocks.len(), "recorded fetched blocks");
        Ok(blocks)
    }

    fn validate_fetched(&self, blocks: &[Block]) -> Result<(), FetchError> {
        for block in blocks {
            match &block.data {
                BlockData::Pending => {
                    return Err(FetchError::Incomplete { coord: block.coord });
                }
                BlockData::Empty => {}
                BlockData::Raw(bytes) => {
                    if block.bytedepth != self.config.bytedepth {
                        return Err(FetchError::Malformed {
                            coord: block.coord,
                            message: format!(
                                "bytedepth {} does not match service bytedepth {}",
                                block.bytedepth, self.config.bytedepth
                            ),
                        });
                    }
                    if bytes.len() != block.expected_len() {
                        return Err(FetchError::Malformed {
                            coord: block.coord,
                            message: format!(
                                "payload is {} bytes, expected {}",
                                bytes.len(),
                                block.expected_len()
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Tests
// =============================================================================
