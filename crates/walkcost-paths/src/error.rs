//! Errors raised by a walking-cost run.

use std::io;

use walkcost_core::{Extent, GridError, Point};
use walkcost_segment::SegmentError;

/// A problem with the inputs or options, detected before any expansion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Exactly one seed source must be supplied.
    #[error("exactly one start source is required, got {0}")]
    SeedSourceCount(usize),

    /// An explicit start cell lies outside the grid.
    #[error("start cell {point} is outside grid {extent}")]
    SeedOutOfBounds { point: Point, extent: Extent },

    /// The seed source produced no usable start cell.
    #[error("no start points inside the region")]
    NoStartPoints,

    /// The tile layout or resident budget is unusable.
    #[error("invalid tile budget: {tile_rows}x{tile_cols} tiles, {resident_tiles} resident")]
    InvalidTileBudget {
        tile_rows: i32,
        tile_cols: i32,
        resident_tiles: usize,
    },

    /// Walking coefficients must be given as exactly four numbers.
    #[error("walking coefficients need 4 values, got {0}")]
    CoefficientCount(usize),

    /// A coefficient is not a finite number.
    #[error("invalid walking coefficient: {0}")]
    InvalidCoefficient(String),

    /// An input layer does not match the region.
    #[error("{layer} layer is {found}, region is {expected}")]
    DimensionMismatch {
        layer: &'static str,
        expected: Extent,
        found: Extent,
    },

    /// The maximum cumulative cost is negative or not finite.
    #[error("inappropriate maximum cost: {0}")]
    InvalidMaxCost(f64),

    /// The memory percentage is outside 0..=100.
    #[error("inappropriate percent memory: {0}")]
    InvalidPercentMemory(u32),
}

/// Any failure of a walking-cost run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WalkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Grid(#[from] GridError),

    /// The tiled store failed; the partial surface is discarded.
    #[error("tiled storage failed")]
    Segment(#[from] SegmentError),

    /// Reading an input row or writing an output row failed.
    #[error("layer i/o failed")]
    Io(#[from] io::Error),
}
