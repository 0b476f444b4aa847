//! Tie-break layer for equally cheap paths.
//!
//! Every cell carries its own value from the tie-break raster and the best
//! value propagated along the path that currently reaches it. When two
//! paths reach a cell at exactly the same cost, the one carrying the
//! smaller value wins.

use std::cmp::Ordering;
use std::io;

use walkcost_core::Point;
use walkcost_segment::{Record, Segment};

use crate::config::TileBudget;
use crate::error::WalkError;
use crate::rows::{self, RowSource};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SolverRecord {
    /// The cell's own tie-break value.
    pub value: Option<f64>,
    /// Value carried by the path that reaches the cell.
    pub best: Option<f64>,
}

impl Record for SolverRecord {
    const SIZE: usize = 16;

    fn encode(&self, out: &mut &mut [u8]) -> io::Result<()> {
        self.value.encode(out)?;
        self.best.encode(out)
    }

    fn decode(input: &mut &[u8]) -> io::Result<Self> {
        Ok(Self {
            value: Option::<f64>::decode(input)?,
            best: Option::<f64>::decode(input)?,
        })
    }
}

/// Order two propagated values; smaller wins and null always loses to a
/// value.
pub fn compare(candidate: Option<f64>, current: Option<f64>) -> Ordering {
    match (candidate, current) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug)]
pub struct SolverStore {
    seg: Segment<SolverRecord>,
}

impl SolverStore {
    /// Load the tie-break layer row by row. No path values are set yet.
    pub fn build(solver: &mut dyn RowSource, budget: TileBudget) -> Result<Self, WalkError> {
        let layout = budget.layout(solver.extent())?;
        let mut seg = Segment::with_layout(layout, budget.resident_tiles)?;
        rows::for_each_row(solver, |row, values| {
            for (col, &value) in values.iter().enumerate() {
                seg.put(Point::new(row, col as i32), &SolverRecord { value, best: None })?;
            }
            Ok::<(), WalkError>(())
        })?;
        Ok(Self { seg })
    }

    #[inline]
    pub fn read(&mut self, p: Point) -> Result<SolverRecord, WalkError> {
        Ok(self.seg.get(p)?)
    }

    #[inline]
    pub fn write(&mut self, p: Point, rec: &SolverRecord) -> Result<(), WalkError> {
        Ok(self.seg.put(p, rec)?)
    }

    /// Start a path at `p`: it carries the cell's own value.
    pub fn seed(&mut self, p: Point) -> Result<(), WalkError> {
        let mut rec = self.read(p)?;
        rec.best = rec.value;
        self.write(p, &rec)
    }

    /// Replace the value carried into `p`.
    pub fn set_best(&mut self, p: Point, best: Option<f64>) -> Result<(), WalkError> {
        let mut rec = self.read(p)?;
        rec.best = best;
        self.write(p, &rec)
    }
}
