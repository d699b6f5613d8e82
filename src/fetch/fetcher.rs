use std::sync::Arc;

use async_trait::async_trait;

use crate::block::{Block, Dims, Offset};
use crate::error::FetchError;

/// Client for the remote block store.
///
/// This abstraction lets the image service work with any transport (HTTP
/// block servers, object storage, an in-process store) without knowing the
/// on-wire block format. Implementations must be thread-safe; retries and
/// timeouts, if any, live here and not in the service.
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Describe every block whose grid cell overlaps `[offset, offset + dims)`
    /// at `zoom`.
    ///
    /// The returned blocks are descriptors with
    /// [`BlockData::Pending`](crate::block::BlockData::Pending) payloads. The set
    /// must tile the whole rectangle; blocks may overhang its edges.
    async fn intersecting_blocks(
        &self,
        dims: Dims,
        offset: Offset,
        zoom: u32,
    ) -> Result<Vec<Block>, FetchError>;

    /// Resolve the payload of each block in place.
    ///
    /// Every block must end up either `Raw` or `Empty`. Any error aborts the
    /// whole batch; callers discard all of its blocks.
    async fn extract_specific_blocks(&self, blocks: &mut [Block]) -> Result<(), FetchError>;
}

#[async_trait]
impl<F: BlockFetcher + ?Sized> BlockFetcher for Arc<F> {
    async fn intersecting_blocks(
        &self,
        dims: Dims,
        offset: Offset,
        zoom: u32,
    ) -> Result<Vec<Block>, FetchError> {
        (**self).intersecting_blocks(dims, offset, zoom).await
    }

    async fn extract_specific_blocks(&self, blocks: &mut [Block]) -> Result<(), FetchError> {
        (**self).extract_specific_blocks(blocks).await
    }
}
