//! Start cells and stop cells.

use std::io;

use walkcost_core::{Extent, Point, Raster, Region};

use crate::error::ConfigError;
use crate::rows::{self, RowSource};

/// A start or stop location in map coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeedPoint {
    pub east: f64,
    pub north: f64,
    /// Category reported in the nearest-start layer.
    pub id: f64,
}

impl SeedPoint {
    pub const fn new(east: f64, north: f64, id: f64) -> Self {
        Self { east, north, id }
    }
}

/// Where the search starts from.
#[derive(Clone, Debug, PartialEq)]
pub enum SeedSource {
    /// Grid cells; each id is the 1-based position in the list.
    Cells(Vec<Point>),
    /// Map points; points outside the region are skipped.
    Points(Vec<SeedPoint>),
    /// Every non-null cell of a raster; the value is the id.
    Raster(Raster<f64>),
    /// The non-null cells of a start layer of `extent`, as kept by
    /// [`SeedSource::from_rows`]. Resolved like [`SeedSource::Raster`].
    Sparse {
        extent: Extent,
        cells: Vec<(Point, f64)>,
    },
}

/// A resolved start cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Seed {
    pub point: Point,
    /// Cumulative cost the cell starts at.
    pub cost: f64,
    pub id: f64,
}

impl SeedSource {
    /// Pick the single source out of everything that was supplied.
    pub fn single(mut sources: Vec<SeedSource>) -> Result<Self, ConfigError> {
        match sources.len() {
            1 => sources.pop().ok_or(ConfigError::SeedSourceCount(0)),
            n => Err(ConfigError::SeedSourceCount(n)),
        }
    }

    /// Read a start layer row by row, keeping only its non-null cells.
    pub fn from_rows(source: &mut dyn RowSource) -> io::Result<Self> {
        let extent = source.extent();
        let mut cells = Vec::new();
        rows::for_each_row(source, |row, values| {
            cells.extend(
                values
                    .iter()
                    .enumerate()
                    .filter_map(|(col, v)| v.map(|v| (Point::new(row, col as i32), v))),
            );
            Ok::<(), io::Error>(())
        })?;
        Ok(SeedSource::Sparse { extent, cells })
    }

    /// Turn the source into start cells on `region`.
    pub fn resolve(
        &self,
        region: &Region,
        start_with_raster_values: bool,
    ) -> Result<Vec<Seed>, ConfigError> {
        let extent = region.extent();
        let seeds: Vec<Seed> = match self {
            SeedSource::Cells(cells) => {
                let mut seeds = Vec::with_capacity(cells.len());
                for (i, &point) in cells.iter().enumerate() {
                    if !extent.contains(point) {
                        return Err(ConfigError::SeedOutOfBounds { point, extent });
                    }
                    seeds.push(Seed {
                        point,
                        cost: 0.0,
                        id: (i + 1) as f64,
                    });
                }
                seeds
            }
            SeedSource::Points(points) => points
                .iter()
                .filter_map(|sp| match region.point_at(sp.east, sp.north) {
                    Some(point) => Some(Seed {
                        point,
                        cost: 0.0,
                        id: sp.id,
                    }),
                    None => {
                        log::warn!("start point ({}, {}) is outside the region", sp.east, sp.north);
                        None
                    }
                })
                .collect(),
            SeedSource::Raster(raster) => {
                check_start_layer(raster.extent(), extent)?;
                raster
                    .iter()
                    .filter_map(|(point, v)| v.map(|v| layer_seed(point, v, start_with_raster_values)))
                    .collect()
            }
            SeedSource::Sparse { extent: found, cells } => {
                check_start_layer(*found, extent)?;
                cells
                    .iter()
                    .map(|&(point, v)| layer_seed(point, v, start_with_raster_values))
                    .collect()
            }
        };
        if seeds.is_empty() {
            return Err(ConfigError::NoStartPoints);
        }
        Ok(seeds)
    }
}

fn check_start_layer(found: Extent, expected: Extent) -> Result<(), ConfigError> {
    if found != expected {
        return Err(ConfigError::DimensionMismatch {
            layer: "start",
            expected,
            found,
        });
    }
    Ok(())
}

/// A start cell taken from a layer: the value is the id, and the start cost
/// when asked for.
fn layer_seed(point: Point, value: f64, start_with_value: bool) -> Seed {
    Seed {
        point,
        cost: if start_with_value { value } else { 0.0 },
        id: value,
    }
}

// ---------------------------------------------------------------------------
// Stops
// ---------------------------------------------------------------------------

/// Cells that end the run once all of them are finalized.
#[derive(Clone, Debug, PartialEq)]
pub enum StopSource {
    Cells(Vec<Point>),
    Points(Vec<SeedPoint>),
}

/// Sorted, deduplicated stop cells with reached tracking.
#[derive(Clone, Debug, Default)]
pub struct StopSet {
    cells: Vec<Point>,
    reached: Vec<bool>,
    remaining: usize,
}

impl StopSet {
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        let mut cells: Vec<Point> = points.into_iter().collect();
        cells.sort_unstable();
        cells.dedup();
        let n = cells.len();
        Self {
            cells,
            reached: vec![false; n],
            remaining: n,
        }
    }

    /// Build the set on `region`, skipping locations outside it.
    pub fn from_source(source: &StopSource, region: &Region) -> Self {
        let extent = region.extent();
        match source {
            StopSource::Cells(cells) => Self::new(cells.iter().copied().filter(|&p| {
                let inside = extent.contains(p);
                if !inside {
                    log::warn!("stop cell {p} is outside the grid");
                }
                inside
            })),
            StopSource::Points(points) => Self::new(points.iter().filter_map(|sp| {
                let p = region.point_at(sp.east, sp.north);
                if p.is_none() {
                    log::warn!("stop point ({}, {}) is outside the region", sp.east, sp.north);
                }
                p
            })),
        }
    }

    /// Record that `p` was finalized. Returns whether it is a stop cell
    /// reached for the first time.
    pub fn mark(&mut self, p: Point) -> bool {
        let Ok(i) = self.cells.binary_search(&p) else {
            return false;
        };
        if self.reached[i] {
            return false;
        }
        self.reached[i] = true;
        self.remaining -= 1;
        true
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.cells.binary_search(&p).is_ok()
    }

    /// Whether every stop cell has been finalized.
    #[inline]
    pub fn all_reached(&self) -> bool {
        self.remaining == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::RasterRows;
    use walkcost_core::Resolution;

    fn region() -> Region {
        Region::from_corner(0.0, 0.0, 4, 4, Resolution::square(10.0).unwrap()).unwrap()
    }

    #[test]
    fn exactly_one_source() {
        assert_eq!(
            SeedSource::single(vec![]),
            Err(ConfigError::SeedSourceCount(0))
        );
        let two = vec![
            SeedSource::Cells(vec![Point::ZERO]),
            SeedSource::Points(vec![]),
        ];
        assert_eq!(SeedSource::single(two), Err(ConfigError::SeedSourceCount(2)));
        let one = SeedSource::single(vec![SeedSource::Cells(vec![Point::ZERO])]).unwrap();
        assert_eq!(one, SeedSource::Cells(vec![Point::ZERO]));
    }

    #[test]
    fn cells_get_positional_ids() {
        let src = SeedSource::Cells(vec![Point::new(1, 1), Point::new(3, 0)]);
        let seeds = src.resolve(&region(), false).unwrap();
        assert_eq!(seeds[1].id, 2.0);
        assert_eq!(seeds[1].cost, 0.0);
    }

    #[test]
    fn cell_outside_grid_is_fatal() {
        let src = SeedSource::Cells(vec![Point::new(4, 0)]);
        assert!(matches!(
            src.resolve(&region(), false),
            Err(ConfigError::SeedOutOfBounds { .. })
        ));
    }

    #[test]
    fn points_outside_region_skipped() {
        let src = SeedSource::Points(vec![
            SeedPoint::new(15.0, 35.0, 7.0),
            SeedPoint::new(-5.0, 5.0, 8.0),
        ]);
        let seeds = src.resolve(&region(), false).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].point, Point::new(0, 1));
        assert_eq!(seeds[0].id, 7.0);

        let none = SeedSource::Points(vec![SeedPoint::new(100.0, 100.0, 1.0)]);
        assert_eq!(none.resolve(&region(), false), Err(ConfigError::NoStartPoints));
    }

    #[test]
    fn raster_seed_values() {
        let mut r = Raster::null(Extent::new(4, 4));
        r.set(Point::new(2, 2), Some(3.5)).unwrap();
        let src = SeedSource::Raster(r);
        let plain = src.resolve(&region(), false).unwrap();
        assert_eq!(plain, vec![Seed { point: Point::new(2, 2), cost: 0.0, id: 3.5 }]);
        let valued = src.resolve(&region(), true).unwrap();
        assert_eq!(valued[0].cost, 3.5);

        let empty = SeedSource::Raster(Raster::null(Extent::new(4, 4)));
        assert_eq!(empty.resolve(&region(), false), Err(ConfigError::NoStartPoints));

        let wrong = SeedSource::Raster(Raster::null(Extent::new(3, 4)));
        assert!(matches!(
            wrong.resolve(&region(), false),
            Err(ConfigError::DimensionMismatch { layer: "start", .. })
        ));
    }

    #[test]
    fn start_layer_read_by_rows() {
        let mut r = Raster::null(Extent::new(4, 4));
        r.set(Point::new(1, 3), Some(2.0)).unwrap();
        r.set(Point::new(3, 0), Some(6.0)).unwrap();
        let src = SeedSource::from_rows(&mut RasterRows(&r)).unwrap();
        assert_eq!(
            src,
            SeedSource::Sparse {
                extent: Extent::new(4, 4),
                cells: vec![(Point::new(1, 3), 2.0), (Point::new(3, 0), 6.0)],
            }
        );
        assert_eq!(
            src.resolve(&region(), true).unwrap(),
            SeedSource::Raster(r).resolve(&region(), true).unwrap()
        );

        let wrong = SeedSource::Sparse {
            extent: Extent::new(4, 5),
            cells: vec![],
        };
        assert!(matches!(
            wrong.resolve(&region(), false),
            Err(ConfigError::DimensionMismatch { layer: "start", .. })
        ));
    }

    #[test]
    fn stop_set_tracks_hits() {
        let mut stops = StopSet::new([Point::new(2, 2), Point::new(0, 1), Point::new(2, 2)]);
        assert_eq!(stops.len(), 2);
        assert!(!stops.mark(Point::new(1, 1)));
        assert!(stops.mark(Point::new(2, 2)));
        assert!(!stops.mark(Point::new(2, 2)));
        assert!(!stops.all_reached());
        assert_eq!(stops.remaining(), 1);
        assert!(stops.mark(Point::new(0, 1)));
        assert!(stops.all_reached());
    }

    #[test]
    fn stop_points_skip_outside() {
        let src = StopSource::Points(vec![
            SeedPoint::new(5.0, 5.0, 0.0),
            SeedPoint::new(55.0, 5.0, 0.0),
        ]);
        let stops = StopSet::from_source(&src, &region());
        assert_eq!(stops.len(), 1);
        assert!(stops.contains(Point::new(3, 0)));
    }
}
