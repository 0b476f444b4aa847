//! Anisotropic least-cost walking surfaces.
//!
//! Given an elevation and a friction raster over the same [`Region`], this
//! crate computes for every cell the cheapest cumulative cost of walking
//! there from a set of start cells. The cost of a single step depends on its
//! length, the friction of the cells it crosses and the slope, with
//! different coefficients for climbing, gentle descent and steep descent.
//!
//! - [`run`] computes the surface with the default [`WalkingEnergy`] model.
//! - [`SearchContext`] exposes the same search one step at a time.
//! - Any [`MoveCost`] implementation can replace the energy model.
//!
//! All per-cell state lives in tiled stores from `walkcost-segment`, so the
//! grid does not need to fit in memory; see [`MemoryPolicy`]. Input layers
//! are read through [`RowSource`] and outputs can be drained into a
//! [`RowSink`], one row at a time.
//!
//! # Example
//!
//! ```
//! use walkcost_core::{Extent, Point, Raster, Region, Resolution};
//! use walkcost_paths::{SeedSource, WalkConfig, WalkInputs, run};
//!
//! let extent = Extent::new(3, 3);
//! let region = Region::from_corner(0.0, 0.0, 3, 3, Resolution::default()).unwrap();
//! let elevation = Raster::filled(extent, 0.0);
//! let friction = Raster::filled(extent, 1.0);
//! let inputs = WalkInputs::new(
//!     region,
//!     &elevation,
//!     &friction,
//!     SeedSource::Cells(vec![Point::new(1, 1)]),
//! );
//! let out = run(inputs, &WalkConfig::default()).unwrap();
//! assert_eq!(out.cost.at(Point::new(1, 1)), Some(0.0));
//! assert!(out.cost.at(Point::new(0, 0)).unwrap() > out.cost.at(Point::new(0, 1)).unwrap());
//! ```
//!
//! [`Region`]: walkcost_core::Region

mod cell_store;
mod config;
mod direction;
mod driver;
mod error;
mod frontier;
mod kernel;
mod rows;
mod seeds;
mod solver;
mod visited;

pub use cell_store::{CellRecord, CellStore};
pub use config::{
    DirectionMode, MemoryEstimate, MemoryPolicy, TileBudget, WalkCoefficients, WalkConfig,
};
pub use direction::{DirectionSet, DirectionStore};
pub use driver::{
    DirectionGrid, SearchContext, Step, StopReason, WalkInputs, WalkOutput, WalkStats, run,
    run_with,
};
pub use error::{ConfigError, WalkError};
pub use frontier::{EntryHandle, Frontier, FrontierEntry};
pub use kernel::{DistanceFactors, Edge, MOVES, Move, MoveCost, Stride, WalkingEnergy, moves};
pub use rows::{DirectionRow, RasterRows, RowSink, RowSource};
pub use seeds::{Seed, SeedPoint, SeedSource, StopSet, StopSource};
pub use solver::{SolverRecord, SolverStore};
pub use visited::FlagGrid;
