//! Raster composition from resolved blocks.

mod compositor;

pub use compositor::{compose, Canvas};
