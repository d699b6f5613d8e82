//! Block data model and grid arithmetic.
//!
//! - [`BlockCoord`]: grid index of a block at one zoom level (the cache key)
//! - [`Block`]: a block descriptor plus its resolved payload
//! - [`Region`]: a requested viewport
//! - [`intersecting_coords`]: which grid cells overlap a pixel rectangle

mod grid;
mod types;

pub use grid::{cell_index, intersecting_coords};
pub use types::{Block, BlockCoord, BlockData, Dims, Offset, Region};
