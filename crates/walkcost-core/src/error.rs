//! Errors raised while building or addressing grids.

use crate::geom::{Extent, Point};

/// Errors that can occur when constructing or indexing a grid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// A flat buffer does not match the declared extent.
    #[error("buffer holds {len} cells but extent {extent} needs {expected}")]
    BufferSize {
        extent: Extent,
        len: usize,
        expected: usize,
    },

    /// Two grids that must share dimensions do not.
    #[error("grid extent {found} does not match expected {expected}")]
    ExtentMismatch { expected: Extent, found: Extent },

    /// A cell lies outside the grid.
    #[error("cell {point} is outside grid {extent}")]
    OutOfBounds { point: Point, extent: Extent },

    /// A region has a non-positive size or resolution.
    #[error("invalid region: {0}")]
    InvalidRegion(String),
}
