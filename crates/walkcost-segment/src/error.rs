//! Errors raised by the tiled store.

use walkcost_core::{Extent, Point};

/// Errors that can occur while opening or accessing a segment file.
///
/// Every variant is fatal to a computation that owns the store: a tile that
/// could not be read or written leaves the grid in an unknown state.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SegmentError {
    /// The backing file could not be created, read or written.
    #[error("segment file i/o failed")]
    Io(#[from] std::io::Error),

    /// A cell outside the stored grid was requested.
    #[error("cell {point} is outside segment {extent}")]
    OutOfBounds { point: Point, extent: Extent },

    /// The tile dimensions cannot cover the grid.
    #[error("invalid tile layout {tile_rows}x{tile_cols} for grid {extent}")]
    InvalidLayout {
        extent: Extent,
        tile_rows: i32,
        tile_cols: i32,
    },

    /// At least one tile must be allowed in memory.
    #[error("resident tile budget must be at least 1")]
    ZeroBudget,

    /// A record buffer has the wrong length for this store.
    #[error("record of {found} bytes does not fit slot of {expected} bytes")]
    RecordSize { expected: usize, found: usize },
}
