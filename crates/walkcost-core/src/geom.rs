//! Geometry primitives: [`Point`] and [`Extent`].
//!
//! Cells are addressed by `(row, col)` with row 0 at the northern edge and
//! col 0 at the western edge, the usual raster convention.

use std::fmt;
use std::ops::{Add, Sub};

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A cell coordinate (or an offset between two cells).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub row: i32,
    pub col: i32,
}

impl Point {
    /// Origin (0, 0).
    pub const ZERO: Self = Self { row: 0, col: 0 };

    /// Create a new point.
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The offset pointing the opposite way.
    #[inline]
    pub const fn inverse(self) -> Self {
        Self {
            row: -self.row,
            col: -self.col,
        }
    }
}

/// Points order row-major, matching the storage order of every grid here.
impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.row.cmp(&other.row).then(self.col.cmp(&other.col))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(row {}, col {})", self.row, self.col)
    }
}

impl Add for Point {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl Sub for Point {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.row - rhs.row, self.col - rhs.col)
    }
}

// ---------------------------------------------------------------------------
// Extent
// ---------------------------------------------------------------------------

/// The dimensions of a grid anchored at (0, 0).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    pub rows: i32,
    pub cols: i32,
}

impl Extent {
    /// Create a new extent. Negative sizes are clamped to zero.
    #[inline]
    pub const fn new(rows: i32, cols: i32) -> Self {
        Self {
            rows: if rows < 0 { 0 } else { rows },
            cols: if cols < 0 { 0 } else { cols },
        }
    }

    /// Total number of cells.
    #[inline]
    pub fn len(self) -> usize {
        (self.rows as usize) * (self.cols as usize)
    }

    /// Whether the extent holds no cells.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Whether `p` lies inside the grid.
    #[inline]
    pub fn contains(self, p: Point) -> bool {
        p.row >= 0 && p.col >= 0 && p.row < self.rows && p.col < self.cols
    }

    /// Row-major flat index of `p`, or `None` when outside.
    #[inline]
    pub fn index(self, p: Point) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        Some(p.row as usize * self.cols as usize + p.col as usize)
    }

    /// Convert a flat index back to a `Point`.
    #[inline]
    pub fn point(self, idx: usize) -> Point {
        let cols = self.cols.max(1) as usize;
        Point::new((idx / cols) as i32, (idx % cols) as i32)
    }

    /// Row-major iterator over every cell.
    #[inline]
    pub fn iter(self) -> ExtentIter {
        ExtentIter {
            extent: self,
            next: 0,
        }
    }
}

impl IntoIterator for Extent {
    type Item = Point;
    type IntoIter = ExtentIter;
    #[inline]
    fn into_iter(self) -> ExtentIter {
        self.iter()
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

// ---------------------------------------------------------------------------
// ExtentIter
// ---------------------------------------------------------------------------

/// Row-major iterator over the cells of an [`Extent`].
#[derive(Clone, Debug)]
pub struct ExtentIter {
    extent: Extent,
    next: usize,
}

impl Iterator for ExtentIter {
    type Item = Point;

    #[inline]
    fn next(&mut self) -> Option<Point> {
        if self.next >= self.extent.len() {
            return None;
        }
        let p = self.extent.point(self.next);
        self.next += 1;
        Some(p)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.extent.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ExtentIter {}
