//! Georeferencing: the [`Region`] a grid covers and its cell [`Resolution`].

use crate::error::GridError;
use crate::geom::{Extent, Point};

/// Physical cell size along each axis, in map units.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// North-south cell size (row spacing).
    pub ns: f64,
    /// East-west cell size (column spacing).
    pub ew: f64,
}

impl Resolution {
    /// Create a resolution, rejecting non-positive or non-finite sizes.
    pub fn new(ns: f64, ew: f64) -> Result<Self, GridError> {
        if !(ns.is_finite() && ns > 0.0 && ew.is_finite() && ew > 0.0) {
            return Err(GridError::InvalidRegion(format!(
                "resolution must be positive, got ns={ns} ew={ew}"
            )));
        }
        Ok(Self { ns, ew })
    }

    /// Square cells of side `size`.
    pub fn square(size: f64) -> Result<Self, GridError> {
        Self::new(size, size)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self { ns: 1.0, ew: 1.0 }
    }
}

/// The rectangle of map space covered by a grid.
///
/// Row 0 touches `north`, column 0 touches `west`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub rows: i32,
    pub cols: i32,
}

impl Region {
    /// Create a region, checking that its bounds and size are consistent.
    pub fn new(
        north: f64,
        south: f64,
        east: f64,
        west: f64,
        rows: i32,
        cols: i32,
    ) -> Result<Self, GridError> {
        if rows <= 0 || cols <= 0 {
            return Err(GridError::InvalidRegion(format!(
                "region needs at least one cell, got {rows}x{cols}"
            )));
        }
        if !(north > south && east > west) {
            return Err(GridError::InvalidRegion(format!(
                "bounds are inverted: n={north} s={south} e={east} w={west}"
            )));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
            rows,
            cols,
        })
    }

    /// Region anchored at its lower-left corner with the given cell sizes.
    pub fn from_corner(
        west: f64,
        south: f64,
        rows: i32,
        cols: i32,
        res: Resolution,
    ) -> Result<Self, GridError> {
        Self::new(
            south + rows as f64 * res.ns,
            south,
            west + cols as f64 * res.ew,
            west,
            rows,
            cols,
        )
    }

    /// The grid dimensions.
    #[inline]
    pub fn extent(&self) -> Extent {
        Extent::new(self.rows, self.cols)
    }

    /// Cell size along each axis.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution {
            ns: (self.north - self.south) / self.rows as f64,
            ew: (self.east - self.west) / self.cols as f64,
        }
    }

    /// Whether a map coordinate lies inside the region (edges inclusive).
    #[inline]
    pub fn contains(&self, east: f64, north: f64) -> bool {
        east >= self.west && east <= self.east && north >= self.south && north <= self.north
    }

    /// The cell containing a map coordinate, or `None` outside the region.
    ///
    /// Points on the southern or eastern edge belong to the last row/column.
    pub fn point_at(&self, east: f64, north: f64) -> Option<Point> {
        if !self.contains(east, north) {
            return None;
        }
        let res = self.resolution();
        let row = (((self.north - north) / res.ns) as i32).min(self.rows - 1);
        let col = (((east - self.west) / res.ew) as i32).min(self.cols - 1);
        Some(Point::new(row, col))
    }
}
