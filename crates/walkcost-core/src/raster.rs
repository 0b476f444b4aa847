//! A dense 2D raster whose cells may be null.
//!
//! [`Raster`] is the in-memory exchange format for every input and output
//! layer: elevation, friction, seed and solver layers going in, cumulative
//! cost, direction and nearest-seed layers coming out. Null is modelled as
//! `None` rather than a sentinel value.

use crate::error::GridError;
use crate::geom::{Extent, Point};

/// A row-major grid of optional cell values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Raster<T> {
    extent: Extent,
    cells: Vec<Option<T>>,
}

impl<T: Copy> Raster<T> {
    /// Create a raster where every cell is null.
    pub fn null(extent: Extent) -> Self {
        Self {
            extent,
            cells: vec![None; extent.len()],
        }
    }

    /// Create a raster where every cell holds `value`.
    pub fn filled(extent: Extent, value: T) -> Self {
        Self {
            extent,
            cells: vec![Some(value); extent.len()],
        }
    }

    /// Build a raster by evaluating `f` at every cell, row-major.
    pub fn from_fn(extent: Extent, mut f: impl FnMut(Point) -> Option<T>) -> Self {
        Self {
            extent,
            cells: extent.iter().map(&mut f).collect(),
        }
    }

    /// Wrap a row-major buffer. Fails if the buffer length does not match.
    pub fn from_vec(extent: Extent, cells: Vec<Option<T>>) -> Result<Self, GridError> {
        if cells.len() != extent.len() {
            return Err(GridError::BufferSize {
                extent,
                len: cells.len(),
                expected: extent.len(),
            });
        }
        Ok(Self { extent, cells })
    }

    /// The grid dimensions.
    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> i32 {
        self.extent.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> i32 {
        self.extent.cols
    }

    /// The value at `p`; `None` when null or outside the grid.
    #[inline]
    pub fn at(&self, p: Point) -> Option<T> {
        self.extent.index(p).and_then(|i| self.cells[i])
    }

    /// Whether `p` is inside the grid and null.
    #[inline]
    pub fn is_null(&self, p: Point) -> bool {
        self.extent.index(p).is_some_and(|i| self.cells[i].is_none())
    }

    /// Set the value at `p`.
    pub fn set(&mut self, p: Point, value: Option<T>) -> Result<(), GridError> {
        let i = self.extent.index(p).ok_or(GridError::OutOfBounds {
            point: p,
            extent: self.extent,
        })?;
        self.cells[i] = value;
        Ok(())
    }

    /// Number of non-null cells.
    pub fn count_valid(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Iterate over `(Point, Option<T>)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, Option<T>)> + '_ {
        self.extent.iter().zip(self.cells.iter().copied())
    }

    /// Borrow one row as a slice.
    pub fn row(&self, row: i32) -> Option<&[Option<T>]> {
        if row < 0 || row >= self.extent.rows {
            return None;
        }
        let cols = self.extent.cols as usize;
        let start = row as usize * cols;
        Some(&self.cells[start..start + cols])
    }

    /// Apply `f` to every cell, producing a raster of another type.
    pub fn map<U: Copy>(&self, mut f: impl FnMut(Option<T>) -> Option<U>) -> Raster<U> {
        Raster {
            extent: self.extent,
            cells: self.cells.iter().map(|&c| f(c)).collect(),
        }
    }

    /// Fail unless `self` has exactly the dimensions of `expected`.
    pub fn ensure_extent(&self, expected: Extent) -> Result<(), GridError> {
        if self.extent != expected {
            return Err(GridError::ExtentMismatch {
                expected,
                found: self.extent,
            });
        }
        Ok(())
    }

    /// Consume the raster and return its row-major buffer.
    pub fn into_vec(self) -> Vec<Option<T>> {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_filled() {
        let e = Extent::new(2, 3);
        let n: Raster<f64> = Raster::null(e);
        assert_eq!(n.count_valid(), 0);
        assert!(n.is_null(Point::new(1, 2)));
        let f = Raster::filled(e, 1.5);
        assert_eq!(f.count_valid(), 6);
        assert_eq!(f.at(Point::new(1, 1)), Some(1.5));
    }

    #[test]
    fn set_and_at() {
        let mut r = Raster::null(Extent::new(3, 3));
        r.set(Point::new(2, 1), Some(7.0)).unwrap();
        assert_eq!(r.at(Point::new(2, 1)), Some(7.0));
        assert_eq!(r.at(Point::new(5, 5)), None);
        assert!(!r.is_null(Point::new(5, 5)));
        let err = r.set(Point::new(3, 0), Some(1.0)).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { .. }));
    }

    #[test]
    fn from_vec_checks_length() {
        let e = Extent::new(2, 2);
        assert!(Raster::from_vec(e, vec![Some(1.0); 4]).is_ok());
        let err = Raster::from_vec(e, vec![Some(1.0); 3]).unwrap_err();
        assert_eq!(
            err,
            GridError::BufferSize {
                extent: e,
                len: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn from_fn_and_rows() {
        let r = Raster::from_fn(Extent::new(2, 3), |p| {
            if p.col == 1 { None } else { Some(p.row * 10 + p.col) }
        });
        assert_eq!(r.row(1), Some(&[Some(10), None, Some(12)][..]));
        assert_eq!(r.row(2), None);
        assert_eq!(r.count_valid(), 4);
    }

    #[test]
    fn map_preserves_nulls() {
        let r = Raster::from_fn(Extent::new(1, 3), |p| (p.col != 0).then_some(p.col as f64));
        let doubled = r.map(|c| c.map(|v| v * 2.0));
        assert_eq!(doubled.into_vec(), vec![None, Some(2.0), Some(4.0)]);
    }

    #[test]
    fn ensure_extent_mismatch() {
        let r: Raster<f32> = Raster::null(Extent::new(2, 2));
        assert!(r.ensure_extent(Extent::new(2, 2)).is_ok());
        assert!(matches!(
            r.ensure_extent(Extent::new(2, 3)),
            Err(GridError::ExtentMismatch { .. })
        ));
    }
}
