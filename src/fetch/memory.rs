//! In-process block store.
//!
//! Holds decompressed block payloads in a map keyed by [`BlockCoord`]. Cells
//! with no entry resolve to [`BlockData::Empty`]. Used by the CLI demo mode
//! and by tests as a stand-in for a remote store.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::BlockFetcher;
use crate::block::{intersecting_coords, Block, BlockCoord, BlockData, Dims, Offset};
use crate::error::{ConfigError, FetchError};

/// A [`BlockFetcher`] backed by an in-memory map.
pub struct MemoryBlockStore {
    blocksize: u32,
    depth: u32,
    bytedepth: usize,
    blocks: RwLock<HashMap<BlockCoord, Bytes>>,
}

impl MemoryBlockStore {
    /// Create an empty store with the given block geometry.
    pub fn new(blocksize: u32, depth: u32, bytedepth: usize) -> Result<Self, ConfigError> {
        if blocksize == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if depth == 0 {
            return Err(ConfigError::Invalid("block depth must be greater than 0".into()));
        }
        if bytedepth == 0 {
            return Err(ConfigError::ZeroByteDepth);
        }
        Ok(Self {
            blocksize,
            depth,
            bytedepth,
            blocks: RwLock::new(HashMap::new()),
        })
    }

    /// Build a planar store filled with a deterministic gradient.
    ///
    /// Covers `extent x extent` blocks at every zoom in `0..zooms`, z index 0.
    /// Each byte is `(x + y + zoom) mod 256` in pixel space, replicated across
    /// the bytedepth.
    pub async fn synthetic(
        blocksize: u32,
        bytedepth: usize,
        extent: u32,
        zooms: u32,
    ) -> Result<Self, ConfigError> {
        let store = Self::new(blocksize, 1, bytedepth)?;
        let bs = blocksize as usize;
        for zoom in 0..zooms {
            for by in 0..i64::from(extent) {
                for bx in 0..i64::from(extent) {
                    let mut payload = Vec::with_capacity(bs * bs * bytedepth);
                    for py in 0..bs as i64 {
                        for px in 0..bs as i64 {
                            let x = bx * i64::from(blocksize) + px;
                            let y = by * i64::from(blocksize) + py;
                            let value = (x + y + i64::from(zoom)).rem_euclid(256) as u8;
                            payload.extend(std::iter::repeat(value).take(bytedepth));
                        }
                    }
                    store
                        .insert(BlockCoord::new(bx, by, 0, zoom), Bytes::from(payload))
                        .await?;
                }
            }
        }
        Ok(store)
    }

    /// Store a payload for `coord`, replacing any previous one.
    pub async fn insert(&self, coord: BlockCoord, payload: Bytes) -> Result<(), ConfigError> {
        let expected = self.block_len();
        if payload.len() != expected {
            return Err(ConfigError::Invalid(format!(
                "payload for block {} is {} bytes, expected {}",
                coord,
                payload.len(),
                expected
            )));
        }
        self.blocks.write().await.insert(coord, payload);
        Ok(())
    }

    /// Drop the payload for `coord`; the cell reads as empty afterwards.
    pub async fn remove(&self, coord: &BlockCoord) -> Option<Bytes> {
        self.blocks.write().await.remove(coord)
    }

    pub async fn len(&self) -> usize {
        self.blocks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blocks.read().await.is_empty()
    }

    pub fn blocksize(&self) -> u32 {
        self.blocksize
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn bytedepth(&self) -> usize {
        self.bytedepth
    }

    fn block_len(&self) -> usize {
        let bs = self.blocksize as usize;
        bs * bs * self.depth as usize * self.bytedepth
    }
}

#[async_trait]
impl BlockFetcher for MemoryBlockStore {
    async fn intersecting_blocks(
        &self,
        dims: Dims,
        offset: Offset,
        zoom: u32,
    ) -> Result<Vec<Block>, FetchError> {
        let coords = intersecting_coords(self.blocksize, self.depth, dims, offset, zoom)
            .ok_or_else(|| {
                FetchError::InvalidRegion(format!(
                    "{}x{}x{} at ({}, {}, {}) does not map onto the block grid",
                    dims.width, dims.height, dims.depth, offset.x, offset.y, offset.z
                ))
            })?;

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(coords.len()).map_err(|_| {
            FetchError::InvalidRegion(format!("{} blocks cannot be allocated", coords.len()))
        })?;
        blocks.extend(
            coords
                .into_iter()
                .map(|coord| Block::descriptor(coord, self.blocksize, self.depth, self.bytedepth)),
        );
        Ok(blocks)
    }

    async fn extract_specific_blocks(&self, blocks: &mut [Block]) -> Result<(), FetchError> {
        let stored = self.blocks.read().await;
        for block in blocks.iter_mut() {
            block.data = match stored.get(&block.coord) {
                Some(payload) => BlockData::Raw(payload.clone()),
                None => BlockData::Empty,
            };
        }
        Ok(())
    }
}
