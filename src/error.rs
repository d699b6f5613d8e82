use thiserror::Error;

use crate::block::BlockCoord;

/// Errors raised by a [`BlockFetcher`](crate::fetch::BlockFetcher) while talking to the
/// upstream block store.
///
/// An "empty" block is not an error: the fetcher marks it as
/// [`BlockData::Empty`](crate::block::BlockData::Empty) instead.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Upstream could not be reached
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    /// Upstream answered with data that could not be decoded
    #[error("Malformed block {coord}: {message}")]
    Malformed { coord: BlockCoord, message: String },

    /// A block was left unresolved after extraction
    #[error("Fetcher left block {coord} unresolved")]
    Incomplete { coord: BlockCoord },

    /// The requested rectangle cannot be mapped onto the block grid
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Any other transport failure, passed through unmodified
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Invalid service configuration, detected before any request is served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bytedepth must be greater than 0")]
    ZeroByteDepth,

    #[error("cache_size must be greater than 0")]
    ZeroCacheSize,

    #[error("max_entries must be greater than 0")]
    ZeroMaxEntries,

    #[error("refresh_rate must be greater than 0")]
    ZeroRefreshRate,

    #[error("blocksize must be greater than 0")]
    ZeroBlockSize,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors produced while stitching blocks into an output raster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// The output buffer could not be allocated
    #[error("Cannot allocate output buffer of {bytes} bytes")]
    Allocation { bytes: usize },

    /// `width * height * bytedepth` does not fit in memory addressing
    #[error("Region {width}x{height} with bytedepth {bytedepth} is too large")]
    RegionTooLarge {
        width: u32,
        height: u32,
        bytedepth: usize,
    },

    /// The region's far edge lies past the `i64` coordinate space
    #[error("Region {width}x{height} at ({x}, {y}, {z}) runs past the coordinate space")]
    OffsetOutOfRange {
        x: i64,
        y: i64,
        z: i64,
        width: u32,
        height: u32,
    },

    /// A block's grid coordinate has no pixel-space origin
    #[error("Block {coord} lies outside the coordinate space")]
    BlockOutOfRange { coord: BlockCoord },

    /// A block reached the compositor without data or an empty marker
    #[error("Block {coord} was never resolved")]
    Unresolved { coord: BlockCoord },

    /// Payload length does not match the block geometry
    #[error("Block {coord} payload is {actual} bytes, expected {expected}")]
    PayloadSize {
        coord: BlockCoord,
        expected: usize,
        actual: usize,
    },

    /// Block carries a different pixel width than the service
    #[error("Block {coord} has bytedepth {block}, service uses {service}")]
    ByteDepthMismatch {
        coord: BlockCoord,
        block: usize,
        service: usize,
    },

    /// The requested z-plane lies outside the block's z extent
    #[error("Plane z={z} is outside block {coord} (z extent {start}..{end})")]
    PlaneOutOfRange {
        coord: BlockCoord,
        z: i64,
        start: i64,
        end: i64,
    },
}

/// Errors returned by [`ImageService`](crate::service::ImageService).
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    /// The service is paused and rejects new retrievals
    #[error("Service is paused")]
    Paused,
}
