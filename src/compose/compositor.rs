//! Stitches resolved blocks into one contiguous raster.
//!
//! For every block the compositor intersects the block footprint with the
//! requested rectangle, picks the single z-plane the request lies on, and
//! copies the intersection row by row:
//!
//! ```text
//!   block row stride = blocksize * bytedepth
//!   dest  row stride = width     * bytedepth
//!
//!   ┌──────── block ────────┐
//!   │        ┌──────────────┼──── request ──┐
//!   │        │▓▓▓▓▓▓▓▓▓▓▓▓▓▓│               │
//!   │        │▓▓▓▓▓▓▓▓▓▓▓▓▓▓│               │
//!   └────────┼──────────────┘               │
//!            └──────────────────────────────┘
//! ```
//!
//! The destination is pre-filled with the empty value, so pixels no block
//! covers come out deterministic.

use bytes::Bytes;

use crate::block::{Block, BlockData, Region};
use crate::error::ComposeError;

/// Compose `blocks` into a `width * height * bytedepth` row-major raster.
///
/// Empty blocks render as `emptyval` in every byte. Blocks that do not
/// overlap the region are skipped. The result does not alias any block
/// payload.
///
/// # Errors
///
/// See [`Canvas::allocate`] and [`Canvas::draw`].
pub fn compose(
    blocks: &[Block],
    region: &Region,
    bytedepth: usize,
    emptyval: u8,
) -> Result<Bytes, ComposeError> {
    let mut canvas = Canvas::allocate(region, bytedepth, emptyval)?;
    for block in blocks {
        canvas.draw(block)?;
    }
    Ok(canvas.finish())
}

/// Pixel rectangle `[x0, x1) x [y0, y1)` in store coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Rect {
    fn intersect(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (rect.x0 < rect.x1 && rect.y0 < rect.y1).then_some(rect)
    }
}

/// Output raster for one region, pre-filled with the empty value.
///
/// Allocating the canvas up front lets a caller fail an oversized request
/// before any block is fetched.
#[derive(Debug)]
pub struct Canvas {
    buf: Vec<u8>,
    requested: Rect,
    z: i64,
    width: usize,
    bytedepth: usize,
    emptyval: u8,
}

impl Canvas {
    /// Allocate the raster for `region`.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::RegionTooLarge`] if `width * height * bytedepth`
    ///   overflows `usize`
    /// - [`ComposeError::OffsetOutOfRange`] if the region's far edge overflows
    ///   `i64`
    /// - [`ComposeError::Allocation`] if the buffer cannot be allocated
    pub fn allocate(region: &Region, bytedepth: usize, emptyval: u8) -> Result<Self, ComposeError> {
        let len = region
            .byte_len(bytedepth)
            .ok_or(ComposeError::RegionTooLarge {
                width: region.width,
                height: region.height,
                bytedepth,
            })?;

        let offset = region.offset;
        let end = region
            .checked_end()
            .ok_or(ComposeError::OffsetOutOfRange {
                x: offset.x,
                y: offset.y,
                z: offset.z,
                width: region.width,
                height: region.height,
            })?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| ComposeError::Allocation { bytes: len })?;
        buf.resize(len, emptyval);

        Ok(Self {
            buf,
            requested: Rect {
                x0: offset.x,
                y0: offset.y,
                x1: end.x,
                y1: end.y,
            },
            z: offset.z,
            width: region.width as usize,
            bytedepth,
            emptyval,
        })
    }

    /// Copy the part of `block` that overlaps the region.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::Unresolved`] if the block is still pending
    /// - [`ComposeError::ByteDepthMismatch`] / [`ComposeError::PayloadSize`]
    ///   if its payload does not match its geometry
    /// - [`ComposeError::BlockOutOfRange`] if its coordinate has no pixel origin
    /// - [`ComposeError::PlaneOutOfRange`] if it overlaps the region but does
    ///   not contain the region's z-plane
    pub fn draw(&mut self, block: &Block) -> Result<(), ComposeError> {
        let coord = block.coord;
        let bytedepth = self.bytedepth;

        let payload = match &block.data {
            BlockData::Pending => return Err(ComposeError::Unresolved { coord }),
            BlockData::Empty => None,
            BlockData::Raw(bytes) => {
                if block.bytedepth != bytedepth {
                    return Err(ComposeError::ByteDepthMismatch {
                        coord,
                        block: block.bytedepth,
                        service: bytedepth,
                    });
                }
                let expected = block.expected_len();
                if bytes.len() != expected {
                    return Err(ComposeError::PayloadSize {
                        coord,
                        expected,
                        actual: bytes.len(),
                    });
                }
                Some(bytes)
            }
        };

        let origin = block
            .origin()
            .ok_or(ComposeError::BlockOutOfRange { coord })?;
        let bs = i64::from(block.blocksize);
        // pixels past i64::MAX cannot be requested, so clamping is exact
        let footprint = Rect {
            x0: origin.x,
            y0: origin.y,
            x1: origin.x.saturating_add(bs),
            y1: origin.y.saturating_add(bs),
        };

        let Some(overlap) = footprint.intersect(&self.requested) else {
            return Ok(());
        };

        // single-slice requests only: the plane must lie inside this block
        let z_end = origin.z.saturating_add(i64::from(block.depth));
        if self.z < origin.z || self.z >= z_end {
            return Err(ComposeError::PlaneOutOfRange {
                coord,
                z: self.z,
                start: origin.z,
                end: z_end,
            });
        }
        let plane = (self.z - origin.z) as usize;

        let blocksize = block.blocksize as usize;
        let run = (overlap.x1 - overlap.x0) as usize * bytedepth;
        let src_col = (overlap.x0 - origin.x) as usize;
        let dst_col = (overlap.x0 - self.requested.x0) as usize;

        for y in overlap.y0..overlap.y1 {
            let dst_row = (y - self.requested.y0) as usize;
            let dst_start = (dst_row * self.width + dst_col) * bytedepth;
            let dst = &mut self.buf[dst_start..dst_start + run];

            match payload {
                Some(bytes) => {
                    let src_row = (y - origin.y) as usize;
                    let src_start =
                        ((plane * blocksize + src_row) * blocksize + src_col) * bytedepth;
                    dst.copy_from_slice(&bytes[src_start..src_start + run]);
                }
                None => dst.fill(self.emptyval),
            }
        }

        Ok(())
    }

    /// Hand the raster over; nothing else aliases it.
    pub fn finish(self) -> Bytes {
        Bytes::from(self.buf)
    }
}

// =============================================================================
// Tests
// =============================================================================
