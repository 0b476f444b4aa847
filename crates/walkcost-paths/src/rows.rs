//! Row-at-a-time access to input and output layers.
//!
//! A run reads each input layer once, north row first, while it fills the
//! tiled stores, and emits the output layers the same way. Neither side
//! needs a whole layer in memory.

use std::io;

use walkcost_core::{Extent, Raster};

/// An input layer read one row at a time.
///
/// Rows are requested in ascending order, each exactly once, into a buffer
/// holding one cell per column.
pub trait RowSource {
    fn extent(&self) -> Extent;

    fn read_row(&mut self, row: i32, out: &mut [Option<f64>]) -> io::Result<()>;
}

/// An in-memory raster served as a [`RowSource`].
#[derive(Copy, Clone, Debug)]
pub struct RasterRows<'a>(pub &'a Raster<f64>);

impl RowSource for RasterRows<'_> {
    fn extent(&self) -> Extent {
        self.0.extent()
    }

    fn read_row(&mut self, row: i32, out: &mut [Option<f64>]) -> io::Result<()> {
        match self.0.row(row) {
            Some(cells) if cells.len() == out.len() => {
                out.copy_from_slice(cells);
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row {row} does not fit raster {}", self.0.extent()),
            )),
        }
    }
}

/// Read the whole of `source` in order, handing each row to `f`.
pub(crate) fn for_each_row<E: From<io::Error>>(
    source: &mut dyn RowSource,
    mut f: impl FnMut(i32, &[Option<f64>]) -> Result<(), E>,
) -> Result<(), E> {
    let extent = source.extent();
    let mut buf = vec![None; extent.cols.max(0) as usize];
    for row in 0..extent.rows {
        source.read_row(row, &mut buf)?;
        f(row, &buf)?;
    }
    Ok(())
}

/// One row of the direction layer in the requested encoding.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DirectionRow<'a> {
    Azimuth(&'a [Option<f32>]),
    Bitmask(&'a [Option<u16>]),
}

/// Receives the output layers of a run, north row first.
///
/// Each row of the cost layer is delivered before the same row of the
/// direction and nearest-start layers. Layers the run was not asked for are
/// never delivered.
pub trait RowSink {
    fn cost_row(&mut self, row: i32, cells: &[Option<f64>]) -> io::Result<()>;

    fn direction_row(&mut self, _row: i32, _cells: DirectionRow<'_>) -> io::Result<()> {
        Ok(())
    }

    fn nearest_row(&mut self, _row: i32, _cells: &[Option<f64>]) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_rows_in_order() {
        let r = Raster::from_fn(Extent::new(3, 2), |p| (p.col == 0).then_some(p.row as f64));
        let mut seen = Vec::new();
        for_each_row::<io::Error>(&mut RasterRows(&r), |row, cells| {
            seen.push((row, cells.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], (2, vec![Some(2.0), None]));
    }

    #[test]
    fn row_outside_raster_is_an_error() {
        let r = Raster::filled(Extent::new(2, 2), 1.0);
        let mut rows = RasterRows(&r);
        let mut buf = [None; 2];
        assert!(rows.read_row(2, &mut buf).is_err());
        let mut short = [None; 1];
        assert!(rows.read_row(0, &mut short).is_err());
        rows.read_row(1, &mut buf).unwrap();
        assert_eq!(buf, [Some(1.0); 2]);
    }
}
