use std::fmt;

use bytes::Bytes;

// =============================================================================
// Coordinates
// =============================================================================

/// Grid index of one block in the store, at one zoom level.
///
/// `x`, `y` and `z` count blocks, not pixels: with a blocksize of 32 the block
/// at `x = 1` covers pixel columns `32..64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockCoord {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub zoom: u32,
}

impl BlockCoord {
    pub fn new(x: i64, y: i64, z: i64, zoom: u32) -> Self {
        Self { x, y, z, zoom }
    }
}

impl fmt::Display for BlockCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})@{}", self.x, self.y, self.z, self.zoom)
    }
}

/// Pixel-space position in the store's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Offset {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// Extent of a rectangle handed to a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Dims {
    /// A single z-plane of `width` x `height` pixels.
    pub fn planar(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }
}

// =============================================================================
// Region
// =============================================================================

/// A requested viewport.
///
/// Pixel depth and fill value are not part of the request; they come from the
/// service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub width: u32,
    pub height: u32,
    pub offset: Offset,
    pub zoom: u32,
}

impl Region {
    pub fn new(width: u32, height: u32, offset: Offset, zoom: u32) -> Self {
        Self {
            width,
            height,
            offset,
            zoom,
        }
    }

    /// Returns true if the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes in the composed raster, or `None` on overflow.
    pub fn byte_len(&self, bytedepth: usize) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(bytedepth)
    }

    pub fn dims(&self) -> Dims {
        Dims::planar(self.width, self.height)
    }

    /// Exclusive far corner `offset + (width, height, 1)`, or `None` if it
    /// does not fit in `i64`.
    pub fn checked_end(&self) -> Option<Offset> {
        Some(Offset {
            x: self.offset.x.checked_add(i64::from(self.width))?,
            y: self.offset.y.checked_add(i64::from(self.height))?,
            z: self.offset.z.checked_add(1)?,
        })
    }
}

// =============================================================================
// Block
// =============================================================================

/// Payload state of a block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlockData {
    /// Descriptor only, not resolved yet
    #[default]
    Pending,

    /// The store holds no data for this cell; renders as the fill value
    Empty,

    /// Decompressed voxels, plane-major then row-major
    Raw(Bytes),
}

/// One fixed-size block of the store.
///
/// A block spans `blocksize x blocksize` pixels in x/y and `depth` planes in z.
/// Its pixel footprint starts at `coord * blocksize` in x/y and at
/// `coord.z * depth` in z.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub coord: BlockCoord,
    pub blocksize: u32,
    pub depth: u32,
    pub bytedepth: usize,
    pub data: BlockData,
}

impl Block {
    /// Create an unresolved block descriptor.
    pub fn descriptor(coord: BlockCoord, blocksize: u32, depth: u32, bytedepth: usize) -> Self {
        Self {
            coord,
            blocksize,
            depth,
            bytedepth,
            data: BlockData::Pending,
        }
    }

    /// Pixel-space origin of the block footprint, or `None` if the grid
    /// coordinate lies outside `i64` pixel space.
    pub fn origin(&self) -> Option<Offset> {
        let bs = i64::from(self.blocksize);
        Some(Offset {
            x: self.coord.x.checked_mul(bs)?,
            y: self.coord.y.checked_mul(bs)?,
            z: self.coord.z.checked_mul(i64::from(self.depth))?,
        })
    }

    /// Payload length implied by the block geometry.
    pub fn expected_len(&self) -> usize {
        let bs = self.blocksize as usize;
        bs * bs * self.depth as usize * self.bytedepth
    }

    /// Bytes this block occupies when cached.
    pub fn payload_len(&self) -> usize {
        match &self.data {
            BlockData::Raw(bytes) => bytes.len(),
            BlockData::Pending | BlockData::Empty => 0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.data, BlockData::Pending)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, BlockData::Empty)
    }
}
