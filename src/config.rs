//! Configuration management for Block Streamer.
//!
//! This module provides:
//! - [`ServiceConfig`]: the immutable settings of an [`ImageService`](crate::service::ImageService)
//! - A clap-based CLI with `serve` and `fetch` subcommands
//! - Environment variables with the `BLOCK_` prefix for every option
//!
//! # Environment Variables
//!
//! - `BLOCK_HOST` - Server bind address (default: 0.0.0.0)
//! - `BLOCK_PORT` - Server port (default: 3000)
//! - `BLOCK_BYTEDEPTH` - Bytes per pixel (default: 1)
//! - `BLOCK_EMPTYVAL` - Fill value for empty blocks (default: 0)
//! - `BLOCK_CACHE_SIZE` - Block cache capacity in bytes (default: 256MB)
//! - `BLOCK_REFRESH_RATE` - Seconds before a cached block is re-fetched (default: 600)
//! - `BLOCK_CACHE_ENTRIES` - Maximum number of cached blocks (default: 100000)
//! - `BLOCK_BLOCKSIZE` - Block edge length of the demo store (default: 32)
//! - `BLOCK_STORE_EXTENT` - Demo store extent in blocks per axis (default: 16)
//! - `BLOCK_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 60)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::cache::{DEFAULT_CACHE_SIZE, DEFAULT_MAX_ENTRIES, DEFAULT_REFRESH_RATE};
use crate::error::ConfigError;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bytes per pixel.
pub const DEFAULT_BYTEDEPTH: usize = 1;

/// Default block edge length for the demo store.
pub const DEFAULT_BLOCKSIZE: u32 = 32;

/// Default demo store extent, in blocks per axis.
pub const DEFAULT_STORE_EXTENT: u32 = 16;

/// Default number of zoom levels in the demo store.
pub const DEFAULT_STORE_ZOOMS: u32 = 4;

/// Default HTTP cache max-age in seconds.
pub const DEFAULT_CACHE_MAX_AGE: u32 = 60;

// =============================================================================
// Service Configuration
// =============================================================================

/// Settings of an image service. Immutable for the service's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bytes per pixel element
    pub bytedepth: usize,

    /// Byte written for every pixel of an empty block
    pub emptyval: u8,

    /// Block cache capacity in bytes
    pub cache_size: usize,

    /// Age after which a cached block must be re-fetched
    pub refresh_rate: Duration,

    /// Maximum number of cached blocks
    pub max_entries: usize,
}

impl ServiceConfig {
    pub fn new(bytedepth: usize, emptyval: u8, cache_size: usize, refresh_rate: Duration) -> Self {
        Self {
            bytedepth,
            emptyval,
            cache_size,
            refresh_rate,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bytedepth == 0 {
            return Err(ConfigError::ZeroByteDepth);
        }
        if self.cache_size == 0 {
            return Err(ConfigError::ZeroCacheSize);
        }
        if self.max_entries == 0 {
            return Err(ConfigError::ZeroMaxEntries);
        }
        if self.refresh_rate.is_zero() {
            return Err(ConfigError::ZeroRefreshRate);
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BYTEDEPTH, 0, DEFAULT_CACHE_SIZE, DEFAULT_REFRESH_RATE)
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Block Streamer - serve image regions stitched from a block store.
#[derive(Parser, Debug, Clone)]
#[command(name = "block-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve regions over HTTP
    Serve(ServeConfig),

    /// Retrieve one region and write the raw raster to a file
    Fetch(FetchConfig),
}

/// Options shared by every command that builds an image service.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Bytes per pixel element.
    #[arg(long, default_value_t = DEFAULT_BYTEDEPTH, env = "BLOCK_BYTEDEPTH")]
    pub bytedepth: usize,

    /// Fill value for pixels of empty blocks.
    #[arg(long, default_value_t = 0, env = "BLOCK_EMPTYVAL")]
    pub emptyval: u8,

    /// Block cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_CACHE_SIZE, env = "BLOCK_CACHE_SIZE")]
    pub cache_size: usize,

    /// Seconds before a cached block is considered stale.
    #[arg(long, default_value_t = DEFAULT_REFRESH_RATE.as_secs(), env = "BLOCK_REFRESH_RATE")]
    pub refresh_rate: u64,

    /// Maximum number of cached blocks.
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES, env = "BLOCK_CACHE_ENTRIES")]
    pub cache_entries: usize,
}

impl ServiceArgs {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(
            self.bytedepth,
            self.emptyval,
            self.cache_size,
            Duration::from_secs(self.refresh_rate),
        )
        .with_max_entries(self.cache_entries)
    }
}

/// Geometry of the in-process demo store.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Block edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_BLOCKSIZE, env = "BLOCK_BLOCKSIZE")]
    pub blocksize: u32,

    /// Store extent in blocks per axis.
    #[arg(long, default_value_t = DEFAULT_STORE_EXTENT, env = "BLOCK_STORE_EXTENT")]
    pub store_extent: u32,

    /// Number of zoom levels populated.
    #[arg(long, default_value_t = DEFAULT_STORE_ZOOMS, env = "BLOCK_STORE_ZOOMS")]
    pub store_zooms: u32,
}

impl StoreArgs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocksize == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.store_zooms == 0 {
            return Err(ConfigError::Invalid(
                "store_zooms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BLOCK_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BLOCK_PORT")]
    pub port: u16,

    /// Allowed CORS origins (comma-separated). Any origin if unset.
    #[arg(long, env = "BLOCK_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "BLOCK_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.service_config().validate()?;
        self.store.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the `fetch` command.
#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Region width in pixels.
    #[arg(long)]
    pub width: u32,

    /// Region height in pixels.
    #[arg(long)]
    pub height: u32,

    /// Region x offset.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub x: i64,

    /// Region y offset.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub y: i64,

    /// Region z-plane.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub z: i64,

    /// Zoom level.
    #[arg(long, default_value_t = 0)]
    pub zoom: u32,

    /// File the raw raster is written to.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of times to retrieve the region (later passes hit the cache).
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.service_config().validate()?;
        self.store.validate()?;
        if self.repeat == 0 {
            return Err(ConfigError::Invalid(
                "repeat must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
