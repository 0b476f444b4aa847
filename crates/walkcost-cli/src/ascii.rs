//! ESRI ASCII grids.
//!
//! A header of `key value` lines followed by `nrows * ncols` values in
//! row-major order, north row first. Recognised keys are `ncols`, `nrows`,
//! `xllcorner`/`xllcenter`, `yllcorner`/`yllcenter`, `cellsize` (or `dx`
//! and `dy`) and the optional `NODATA_value`. Keys are case-insensitive.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Lines, Write};

#[cfg(test)]
use walkcost_core::Raster;
use walkcost_core::{Region, Resolution};

use crate::error::ParseError;

/// Marker written for null cells.
pub const NODATA: &str = "-9999";

/// A grid read whole, together with its georeferencing.
#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub struct AsciiGrid {
    pub region: Region,
    pub raster: Raster<f64>,
}

#[derive(Default)]
struct Header {
    ncols: Option<i32>,
    nrows: Option<i32>,
    // (value, refers to the cell centre)
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    nodata: Option<f64>,
}

impl Header {
    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let num = || {
            value
                .parse::<f64>()
                .map_err(|_| format!("{key}: invalid number {value:?}"))
        };
        let count = || {
            value
                .parse::<i32>()
                .map_err(|_| format!("{key}: invalid count {value:?}"))
        };
        match key.to_ascii_lowercase().as_str() {
            "ncols" => self.ncols = Some(count()?),
            "nrows" => self.nrows = Some(count()?),
            "xllcorner" => self.xll = Some((num()?, false)),
            "xllcenter" => self.xll = Some((num()?, true)),
            "yllcorner" => self.yll = Some((num()?, false)),
            "yllcenter" => self.yll = Some((num()?, true)),
            "cellsize" => self.cellsize = Some(num()?),
            "dx" => self.dx = Some(num()?),
            "dy" => self.dy = Some(num()?),
            "nodata_value" => self.nodata = Some(num()?),
            _ => return Err(format!("unknown header field {key:?}")),
        }
        Ok(())
    }

    fn region(&self) -> Result<Region, ParseError> {
        let cols = self.ncols.ok_or(ParseError::MissingField("ncols"))?;
        let rows = self.nrows.ok_or(ParseError::MissingField("nrows"))?;
        let (ew, ns) = match (self.cellsize, self.dx, self.dy) {
            (_, Some(dx), Some(dy)) => (dx, dy),
            (Some(size), _, _) => (size, size),
            _ => return Err(ParseError::MissingField("cellsize")),
        };
        let res = Resolution::new(ns, ew)?;
        let (x, x_centre) = self.xll.ok_or(ParseError::MissingField("xllcorner"))?;
        let (y, y_centre) = self.yll.ok_or(ParseError::MissingField("yllcorner"))?;
        let west = if x_centre { x - ew / 2.0 } else { x };
        let south = if y_centre { y - ns / 2.0 } else { y };
        Ok(Region::from_corner(west, south, rows, cols, res)?)
    }
}

/// A grid whose header has been read; cell values are pulled one row at a
/// time.
pub struct AsciiRows<R> {
    lines: Lines<R>,
    lineno: usize,
    region: Region,
    nodata: Option<f64>,
    /// Values read past the end of the last row handed out.
    pending: VecDeque<f64>,
    next_row: i32,
    values_read: usize,
}

impl<R: BufRead> AsciiRows<R> {
    /// Read the header, stopping at the first line of cell values.
    pub fn open(input: R) -> Result<Self, ParseError> {
        let mut lines = input.lines();
        let mut header = Header::default();
        let mut lineno = 0;
        let mut pending = VecDeque::new();

        for line in lines.by_ref() {
            let line = line?;
            lineno += 1;
            let mut tokens = line.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };
            if first.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let value = tokens
                    .next()
                    .ok_or_else(|| ParseError::syntax(lineno, format!("{first} has no value")))?;
                header
                    .set(first, value)
                    .map_err(|msg| ParseError::syntax(lineno, msg))?;
                continue;
            }
            push_values(&mut pending, lineno, line.split_whitespace())?;
            break;
        }

        let region = header.region()?;
        Ok(Self {
            lines,
            lineno,
            region,
            nodata: header.nodata,
            values_read: pending.len(),
            pending,
            next_row: 0,
        })
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Fill `out` with the next row, which must be row `row`.
    pub fn read_row(&mut self, row: i32, out: &mut [Option<f64>]) -> Result<(), ParseError> {
        if row != self.next_row || out.len() != self.region.cols.max(0) as usize {
            return Err(ParseError::syntax(
                self.lineno,
                format!("row {row} requested out of order"),
            ));
        }
        while self.pending.len() < out.len() {
            if !self.fill()? {
                return Err(self.value_count());
            }
        }
        for cell in out.iter_mut() {
            let v = self.pending.pop_front().unwrap_or(f64::NAN);
            *cell = (!v.is_nan() && Some(v) != self.nodata).then_some(v);
        }
        self.next_row += 1;
        if self.next_row == self.region.rows {
            // nothing may follow the last row
            while self.fill()? {}
            if !self.pending.is_empty() {
                return Err(self.value_count());
            }
        }
        Ok(())
    }

    /// Read one more line of values. Returns false at the end of input.
    fn fill(&mut self) -> Result<bool, ParseError> {
        let Some(line) = self.lines.next() else {
            return Ok(false);
        };
        let line = line?;
        self.lineno += 1;
        let before = self.pending.len();
        push_values(&mut self.pending, self.lineno, line.split_whitespace())?;
        self.values_read += self.pending.len() - before;
        Ok(true)
    }

    fn value_count(&self) -> ParseError {
        ParseError::ValueCount {
            expected: self.region.extent().len(),
            found: self.values_read,
        }
    }
}

fn push_values<'a>(
    pending: &mut VecDeque<f64>,
    lineno: usize,
    tokens: impl Iterator<Item = &'a str>,
) -> Result<(), ParseError> {
    for tok in tokens {
        let v: f64 = tok
            .parse()
            .map_err(|_| ParseError::syntax(lineno, format!("invalid cell value {tok:?}")))?;
        pending.push_back(v);
    }
    Ok(())
}

/// Read a whole grid into memory.
#[cfg(test)]
pub fn read_grid<R: BufRead>(input: R) -> Result<AsciiGrid, ParseError> {
    let mut rows = AsciiRows::open(input)?;
    let region = rows.region();
    let extent = region.extent();
    let mut cells = Vec::with_capacity(extent.len());
    let mut buf = vec![None; extent.cols.max(0) as usize];
    for row in 0..extent.rows {
        rows.read_row(row, &mut buf)?;
        cells.extend_from_slice(&buf);
    }
    Ok(AsciiGrid {
        region,
        raster: Raster::from_vec(extent, cells)?,
    })
}

/// Writes a grid one row at a time, north row first.
pub struct AsciiWriter<W: Write> {
    out: W,
    line: String,
}

impl<W: Write> AsciiWriter<W> {
    /// Write the header for `region`.
    pub fn new(mut out: W, region: &Region) -> io::Result<Self> {
        let res = region.resolution();
        writeln!(out, "ncols {}", region.cols)?;
        writeln!(out, "nrows {}", region.rows)?;
        writeln!(out, "xllcorner {}", region.west)?;
        writeln!(out, "yllcorner {}", region.south)?;
        if (res.ns - res.ew).abs() <= 1e-9 * res.ew.abs() {
            writeln!(out, "cellsize {}", res.ew)?;
        } else {
            writeln!(out, "dx {}", res.ew)?;
            writeln!(out, "dy {}", res.ns)?;
        }
        writeln!(out, "NODATA_value {NODATA}")?;
        Ok(Self {
            out,
            line: String::new(),
        })
    }

    pub fn write_row<T: Copy + fmt::Display>(&mut self, cells: &[Option<T>]) -> io::Result<()> {
        self.line.clear();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                self.line.push(' ');
            }
            match cell {
                Some(v) => self.line.push_str(&v.to_string()),
                None => self.line.push_str(NODATA),
            }
        }
        writeln!(self.out, "{}", self.line)
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkcost_core::Point;

    const SAMPLE: &str = "\
ncols 3
nrows 2
xllcorner 100
yllcorner 50.5
cellsize 10
NODATA_value -1
1 2 -1
4.5 5 6
";

    #[test]
    fn reads_header_and_nulls() {
        let grid = read_grid(SAMPLE.as_bytes()).unwrap();
        assert_eq!(grid.region.west, 100.0);
        assert_eq!(grid.region.north, 70.5);
        assert_eq!(grid.region.east, 130.0);
        assert_eq!(grid.raster.at(Point::new(0, 0)), Some(1.0));
        assert_eq!(grid.raster.at(Point::new(0, 2)), None);
        assert_eq!(grid.raster.at(Point::new(1, 0)), Some(4.5));
    }

    #[test]
    fn centre_and_separate_resolutions() {
        let text = "NCOLS 2\nNROWS 1\nXLLCENTER 1\nYLLCENTER 2\nDX 2\nDY 4\n7 8\n";
        let grid = read_grid(text.as_bytes()).unwrap();
        let res = grid.region.resolution();
        assert_eq!((res.ew, res.ns), (2.0, 4.0));
        assert_eq!(grid.region.west, 0.0);
        assert_eq!(grid.region.south, 0.0);
        assert_eq!(grid.raster.count_valid(), 2);
    }

    #[test]
    fn rejects_bad_input() {
        let short = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        assert!(matches!(
            read_grid(short.as_bytes()),
            Err(ParseError::ValueCount { expected: 4, found: 3 })
        ));
        let junk = "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1x\n";
        assert!(matches!(
            read_grid(junk.as_bytes()),
            Err(ParseError::Syntax { line: 6, .. })
        ));
        let no_size = "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\n1\n";
        assert!(matches!(
            read_grid(no_size.as_bytes()),
            Err(ParseError::MissingField("cellsize"))
        ));
        let unknown = "ncols 1\nwidth 3\n";
        assert!(matches!(
            read_grid(unknown.as_bytes()),
            Err(ParseError::Syntax { line: 2, .. })
        ));
    }

    fn write_grid<T: Copy + fmt::Display>(region: &Region, raster: &Raster<T>) -> String {
        let mut w = AsciiWriter::new(Vec::new(), region).unwrap();
        for row in 0..raster.rows() {
            w.write_row(raster.row(row).unwrap()).unwrap();
        }
        String::from_utf8(w.finish().unwrap()).unwrap()
    }

    #[test]
    fn rows_stream_one_at_a_time() {
        let mut rows = AsciiRows::open(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.region().extent(), walkcost_core::Extent::new(2, 3));
        let mut buf = [None; 3];
        assert!(matches!(rows.read_row(1, &mut buf), Err(ParseError::Syntax { .. })));
        rows.read_row(0, &mut buf).unwrap();
        assert_eq!(buf, [Some(1.0), Some(2.0), None]);
        rows.read_row(1, &mut buf).unwrap();
        assert_eq!(buf, [Some(4.5), Some(5.0), Some(6.0)]);
    }

    #[test]
    fn values_may_wrap_across_lines() {
        let text = "ncols 3\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n3 4 5\n\n6\n";
        let grid = read_grid(text.as_bytes()).unwrap();
        assert_eq!(grid.raster.at(Point::new(1, 0)), Some(4.0));
        assert_eq!(grid.raster.at(Point::new(1, 2)), Some(6.0));
    }

    #[test]
    fn trailing_values_rejected() {
        let text = "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n2\n";
        assert!(matches!(
            read_grid(text.as_bytes()),
            Err(ParseError::ValueCount { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn written_grid_reads_back() {
        let grid = read_grid(SAMPLE.as_bytes()).unwrap();
        let text = write_grid(&grid.region, &grid.raster);
        assert!(text.contains("cellsize 10\n"));
        assert!(text.ends_with("1 2 -9999\n4.5 5 6\n"));
        assert_eq!(read_grid(text.as_bytes()).unwrap(), grid);
    }

    #[test]
    fn writes_integer_masks() {
        let region = Region::from_corner(0.0, 0.0, 1, 2, Resolution::new(1.0, 2.0).unwrap()).unwrap();
        let mask = Raster::from_vec(region.extent(), vec![Some(0u16), None]).unwrap();
        let text = write_grid(&region, &mask);
        assert!(text.contains("dx 2\ndy 1\n"));
        assert!(text.ends_with("0 -9999\n"));
    }
}
