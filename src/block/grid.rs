//! Block grid arithmetic.
//!
//! Maps pixel-space rectangles onto the fixed block grid of a store. Fetcher
//! implementations use this to answer `intersecting_blocks`.

use super::types::{BlockCoord, Dims, Offset};

/// Grid index of the cell containing pixel `pos` along one axis.
#[inline]
pub fn cell_index(pos: i64, edge: u32) -> i64 {
    pos.div_euclid(i64::from(edge))
}

/// Inclusive range of cell indices overlapping `[start, start + len)`.
///
/// Returns `Ok(None)` for a zero-length span and `Err(())` if the span runs
/// past `i64`.
fn cell_span(start: i64, len: u32, edge: u32) -> Result<Option<(i64, i64)>, ()> {
    if len == 0 {
        return Ok(None);
    }
    let last = start.checked_add(i64::from(len) - 1).ok_or(())?;
    Ok(Some((cell_index(start, edge), cell_index(last, edge))))
}

/// Number of cells in the inclusive range `[first, last]`.
fn span_len(first: i64, last: i64) -> Option<usize> {
    let len = i128::from(last) - i128::from(first) + 1;
    usize::try_from(len).ok()
}

/// Every block coordinate whose footprint overlaps `[offset, offset + dims)`.
///
/// Blocks are `blocksize` pixels wide in x/y and `depth` planes deep in z.
/// Coordinates are returned in z, y, x order so the result is deterministic.
///
/// Returns `None` if the rectangle runs past `i64` pixel space or the
/// coordinate list cannot be allocated. A zero-sized rectangle or grid yields
/// an empty list.
pub fn intersecting_coords(
    blocksize: u32,
    depth: u32,
    dims: Dims,
    offset: Offset,
    zoom: u32,
) -> Option<Vec<BlockCoord>> {
    if blocksize == 0 || depth == 0 {
        return Some(Vec::new());
    }

    let (Some((x0, x1)), Some((y0, y1)), Some((z0, z1))) = (
        cell_span(offset.x, dims.width, blocksize).ok()?,
        cell_span(offset.y, dims.height, blocksize).ok()?,
        cell_span(offset.z, dims.depth, depth).ok()?,
    ) else {
        return Some(Vec::new());
    };

    let count = span_len(x0, x1)?
        .checked_mul(span_len(y0, y1)?)?
        .checked_mul(span_len(z0, z1)?)?;
    let mut coords = Vec::new();
    coords.try_reserve_exact(count).ok()?;

    for z in z0..=z1 {
        for y in y0..=y1 {
            for x in x0..=x1 {
                coords.push(BlockCoord::new(x, y, z, zoom));
            }
        }
    }
    Some(coords)
}
