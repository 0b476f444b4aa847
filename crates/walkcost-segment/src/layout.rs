//! How a grid is cut into fixed-size tiles.

use walkcost_core::{Extent, Point};

use crate::error::SegmentError;

/// Tiling of a grid into `tile_rows x tile_cols` blocks.
///
/// Edge tiles are stored at full size, so every tile occupies the same
/// number of bytes in the backing file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileLayout {
    extent: Extent,
    tile_rows: i32,
    tile_cols: i32,
}

impl TileLayout {
    /// Create a layout. Tile sizes must be positive.
    pub fn new(extent: Extent, tile_rows: i32, tile_cols: i32) -> Result<Self, SegmentError> {
        if tile_rows <= 0 || tile_cols <= 0 {
            return Err(SegmentError::InvalidLayout {
                extent,
                tile_rows,
                tile_cols,
            });
        }
        Ok(Self {
            extent,
            tile_rows,
            tile_cols,
        })
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    #[inline]
    pub fn tile_rows(&self) -> i32 {
        self.tile_rows
    }

    #[inline]
    pub fn tile_cols(&self) -> i32 {
        self.tile_cols
    }

    /// Number of tile rows needed to cover the grid.
    #[inline]
    pub fn tiles_down(&self) -> usize {
        div_ceil(self.extent.rows, self.tile_rows)
    }

    /// Number of tile columns needed to cover the grid.
    #[inline]
    pub fn tiles_across(&self) -> usize {
        div_ceil(self.extent.cols, self.tile_cols)
    }

    /// Total number of tiles.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles_down() * self.tiles_across()
    }

    /// Cells per tile, including padding on edge tiles.
    #[inline]
    pub fn cells_per_tile(&self) -> usize {
        self.tile_rows as usize * self.tile_cols as usize
    }

    /// The tile holding `p` and the cell's offset inside that tile.
    pub fn locate(&self, p: Point) -> Result<(usize, usize), SegmentError> {
        if !self.extent.contains(p) {
            return Err(SegmentError::OutOfBounds {
                point: p,
                extent: self.extent,
            });
        }
        let (tr, tc) = (p.row / self.tile_rows, p.col / self.tile_cols);
        let (or, oc) = (p.row % self.tile_rows, p.col % self.tile_cols);
        let tile = tr as usize * self.tiles_across() + tc as usize;
        let offset = or as usize * self.tile_cols as usize + oc as usize;
        Ok((tile, offset))
    }
}

fn div_ceil(n: i32, d: i32) -> usize {
    (n.max(0) as usize).div_ceil(d as usize)
}
