//! Grid types shared by the *walkcost* crates.
//!
//! This crate provides the foundational types used across the workspace:
//! row/column geometry, a dense raster with explicit nulls, and the
//! georeferenced region that maps map coordinates onto grid cells.

pub mod error;
pub mod geom;
pub mod raster;
pub mod region;

pub use error::GridError;
pub use geom::{Extent, Point};
pub use raster::Raster;
pub use region::{Region, Resolution};
