//! Per-cell search state kept in a tiled store.

use std::io;

use walkcost_core::{Extent, GridError, Point};
use walkcost_segment::{Record, Segment, SegmentStats};

use crate::config::TileBudget;
use crate::error::WalkError;
use crate::rows::{self, RowSource};
use crate::visited::FlagGrid;

/// Everything the search knows about one cell.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CellRecord {
    pub elevation: Option<f64>,
    pub friction: Option<f64>,
    /// Cheapest cumulative cost found so far; `None` until reached.
    pub cost: Option<f64>,
    /// Id of the start point the cheapest path comes from.
    pub nearest: Option<f64>,
}

impl CellRecord {
    /// Elevation and friction of a cell that can be entered or left.
    #[inline]
    pub fn terrain(&self) -> Option<(f64, f64)> {
        self.elevation.zip(self.friction)
    }
}

impl Record for CellRecord {
    const SIZE: usize = 32;

    fn encode(&self, out: &mut &mut [u8]) -> io::Result<()> {
        self.elevation.encode(out)?;
        self.friction.encode(out)?;
        self.cost.encode(out)?;
        self.nearest.encode(out)
    }

    fn decode(input: &mut &[u8]) -> io::Result<Self> {
        Ok(Self {
            elevation: Option::<f64>::decode(input)?,
            friction: Option::<f64>::decode(input)?,
            cost: Option::<f64>::decode(input)?,
            nearest: Option::<f64>::decode(input)?,
        })
    }
}

/// The single point of access to [`CellRecord`]s during a run.
#[derive(Debug)]
pub struct CellStore {
    seg: Segment<CellRecord>,
}

impl CellStore {
    /// Copy the source layers into a fresh store, one row at a time.
    ///
    /// `null_cost`, when given, stands in for null friction and null
    /// elevation values. Cells whose source elevation is null are flagged in
    /// `null_elevation` when one is passed.
    pub fn build(
        elevation: &mut dyn RowSource,
        friction: &mut dyn RowSource,
        null_cost: Option<f64>,
        budget: TileBudget,
        mut null_elevation: Option<&mut FlagGrid>,
    ) -> Result<Self, WalkError> {
        let extent = elevation.extent();
        if friction.extent() != extent {
            return Err(GridError::ExtentMismatch {
                expected: extent,
                found: friction.extent(),
            }
            .into());
        }
        let layout = budget.layout(extent)?;
        let mut seg = Segment::with_layout(layout, budget.resident_tiles)?;
        let mut fric_row = vec![None; extent.cols.max(0) as usize];
        rows::for_each_row(elevation, |row, elev_row| {
            friction.read_row(row, &mut fric_row)?;
            for (col, (&elev, &fric)) in elev_row.iter().zip(&fric_row).enumerate() {
                let p = Point::new(row, col as i32);
                if elev.is_none() {
                    if let Some(mask) = null_elevation.as_deref_mut() {
                        mask.set(p);
                    }
                }
                let rec = CellRecord {
                    elevation: elev.or(null_cost),
                    friction: fric.or(null_cost),
                    cost: None,
                    nearest: None,
                };
                seg.put(p, &rec)?;
            }
            Ok::<(), WalkError>(())
        })?;
        Ok(Self { seg })
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.seg.extent()
    }

    #[inline]
    pub fn read(&mut self, p: Point) -> Result<CellRecord, WalkError> {
        Ok(self.seg.get(p)?)
    }

    #[inline]
    pub fn write(&mut self, p: Point, rec: &CellRecord) -> Result<(), WalkError> {
        Ok(self.seg.put(p, rec)?)
    }

    pub fn stats(&self) -> SegmentStats {
        self.seg.stats()
    }
}
