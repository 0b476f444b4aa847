//! The expansion loop.
//!
//! A [`SearchContext`] owns every piece of search state: the cell store, the
//! visited flags, the frontier and the optional direction, tie-break and
//! stop structures. It is built in one go by [`SearchContext::new`], advanced
//! one popped entry at a time by [`SearchContext::step`] and drained row by
//! row into a [`RowSink`] by [`SearchContext::finish_into`], or into
//! in-memory rasters by [`SearchContext::finish`].

use std::cmp::Ordering;
use std::fmt;
use std::io;

use walkcost_core::{Extent, Point, Raster, Region};

use crate::cell_store::{CellRecord, CellStore};
use crate::config::{DirectionMode, WalkConfig};
use crate::direction::{DirectionSet, DirectionStore};
use crate::error::{ConfigError, WalkError};
use crate::frontier::{Frontier, FrontierEntry};
use crate::kernel::{self, DistanceFactors, Edge, Move, MoveCost, WalkingEnergy};
use crate::rows::{DirectionRow, RasterRows, RowSink, RowSource};
use crate::seeds::{Seed, SeedSource, StopSet, StopSource};
use crate::solver::{self, SolverStore};
use crate::visited::FlagGrid;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// The layers a run reads. Each one is read once, row by row.
pub struct WalkInputs<'a> {
    pub region: Region,
    pub elevation: Box<dyn RowSource + 'a>,
    pub friction: Box<dyn RowSource + 'a>,
    pub seeds: SeedSource,
    pub stops: Option<StopSource>,
    /// Tie-break values for equally cheap paths.
    pub solver: Option<Box<dyn RowSource + 'a>>,
}

impl<'a> WalkInputs<'a> {
    /// Inputs held in memory.
    pub fn new(
        region: Region,
        elevation: &'a Raster<f64>,
        friction: &'a Raster<f64>,
        seeds: SeedSource,
    ) -> Self {
        Self::from_rows(region, RasterRows(elevation), RasterRows(friction), seeds)
    }

    /// Inputs streamed from any [`RowSource`].
    pub fn from_rows(
        region: Region,
        elevation: impl RowSource + 'a,
        friction: impl RowSource + 'a,
        seeds: SeedSource,
    ) -> Self {
        Self {
            region,
            elevation: Box::new(elevation),
            friction: Box::new(friction),
            seeds,
            stops: None,
            solver: None,
        }
    }

    pub fn with_stops(mut self, stops: StopSource) -> Self {
        self.stops = Some(stops);
        self
    }

    pub fn with_solver(self, solver: &'a Raster<f64>) -> Self {
        self.with_solver_rows(RasterRows(solver))
    }

    pub fn with_solver_rows(mut self, solver: impl RowSource + 'a) -> Self {
        self.solver = Some(Box::new(solver));
        self
    }
}

/// Why a run ended.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// Every reachable cell was finalized.
    #[default]
    Exhausted,
    /// The cheapest open cell exceeded the maximum cost.
    MaxCost,
    /// Every stop cell was finalized.
    StopPoints,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Exhausted => "frontier exhausted",
            StopReason::MaxCost => "maximum cost reached",
            StopReason::StopPoints => "all stop points reached",
        })
    }
}

/// Counters collected during a run.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkStats {
    pub finalized: u64,
    /// Superseded entries discarded at pop time.
    pub stale: u64,
    pub inserted: u64,
    pub peak_frontier: usize,
    /// Highest finalized cost.
    pub peak_cost: Option<f64>,
    pub reason: StopReason,
}

/// One iteration of the expansion loop.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Step {
    /// The entry's cell was finalized at the entry's cost.
    Finalized(FrontierEntry),
    /// The entry was superseded and dropped.
    Stale(FrontierEntry),
    Done(StopReason),
}

/// The direction layer in the requested encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectionGrid {
    Azimuth(Raster<f32>),
    Bitmask(Raster<u16>),
}

/// The layers a run produces. Cells that were not finalized are null.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkOutput {
    pub cost: Raster<f64>,
    pub direction: Option<DirectionGrid>,
    pub nearest: Option<Raster<f64>>,
    pub stats: WalkStats,
}

// ---------------------------------------------------------------------------
// SearchContext
// ---------------------------------------------------------------------------

/// State of one cumulative-cost computation.
pub struct SearchContext<M: MoveCost> {
    model: M,
    moves: &'static [Move],
    factors: DistanceFactors,
    max_cost: Option<f64>,
    direction_mode: Option<DirectionMode>,
    want_nearest: bool,
    cells: CellStore,
    visited: FlagGrid,
    frontier: Frontier,
    stops: Option<StopSet>,
    directions: Option<DirectionStore>,
    solver: Option<SolverStore>,
    /// Null-elevation cells forced to null in the outputs.
    null_mask: Option<FlagGrid>,
    /// Cells still at their start cost. Ties never touch them.
    seeded: FlagGrid,
    stats: WalkStats,
    done: Option<StopReason>,
}

fn check_layer(layer: &'static str, source: &dyn RowSource, expected: Extent) -> Result<(), ConfigError> {
    if source.extent() != expected {
        return Err(ConfigError::DimensionMismatch {
            layer,
            expected,
            found: source.extent(),
        });
    }
    Ok(())
}

impl<M: MoveCost> SearchContext<M> {
    /// Validate the inputs, build the stores and plant the seeds.
    ///
    /// Nothing is expanded yet; every configuration error surfaces here.
    pub fn new(mut inputs: WalkInputs<'_>, config: &WalkConfig, model: M) -> Result<Self, WalkError> {
        config.validate()?;
        let region = inputs.region;
        let extent = region.extent();
        check_layer("elevation", &*inputs.elevation, extent)?;
        check_layer("friction", &*inputs.friction, extent)?;
        if let Some(s) = inputs.solver.as_deref() {
            check_layer("solver", s, extent)?;
        }
        let budget = config.memory.resolve(extent)?;
        let seeds = inputs.seeds.resolve(&region, config.start_with_raster_values)?;
        let stops = match &inputs.stops {
            Some(src) => {
                let set = StopSet::from_source(src, &region);
                if set.is_empty() {
                    log::warn!("no stop points inside the region, running to completion");
                    None
                } else {
                    Some(set)
                }
            }
            None => None,
        };
        let null_cost = config.effective_null_cost();
        let res = region.resolution();

        log::info!(
            "walking costs {}, lambda {}, slope factor {}",
            config.coefficients,
            config.lambda,
            config.slope_factor
        );
        log::debug!(
            "grid {} at ns={} ew={}, {} seeds, tiles {}x{} with {} resident",
            extent,
            res.ns,
            res.ew,
            seeds.len(),
            budget.tile_rows,
            budget.tile_cols,
            budget.resident_tiles
        );

        let mut null_mask = (config.keep_nulls && null_cost.is_some()).then(|| FlagGrid::new(extent));
        let cells = CellStore::build(
            &mut *inputs.elevation,
            &mut *inputs.friction,
            null_cost,
            budget,
            null_mask.as_mut(),
        )?;
        if let Some(mask) = &null_mask {
            log::debug!("{} null elevation cells kept null", mask.count());
        }
        let directions = match config.direction {
            Some(_) => Some(DirectionStore::new(extent, budget)?),
            None => None,
        };
        let solver = match inputs.solver.as_deref_mut() {
            Some(r) => Some(SolverStore::build(r, budget)?),
            None => None,
        };
        let moves = kernel::moves(config.knight_moves);

        let mut ctx = Self {
            model,
            moves,
            factors: DistanceFactors::new(res),
            max_cost: config.max_cost,
            direction_mode: config.direction,
            want_nearest: config.nearest,
            cells,
            visited: FlagGrid::new(extent),
            frontier: Frontier::with_capacity((extent.len() / 20).max(moves.len())),
            stops,
            directions,
            solver,
            null_mask,
            seeded: FlagGrid::new(extent),
            stats: WalkStats::default(),
            done: None,
        };
        for seed in seeds {
            ctx.plant(seed)?;
        }
        Ok(ctx)
    }

    #[inline]
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.is_some()
    }

    /// Entries currently on the frontier, stale ones included.
    #[inline]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    fn plant(&mut self, seed: Seed) -> Result<(), WalkError> {
        if !seed.cost.is_finite() {
            log::warn!("start cell {} has no usable start cost", seed.point);
            return Ok(());
        }
        let mut rec = self.cells.read(seed.point)?;
        if rec.cost.is_some_and(|c| c <= seed.cost) {
            return Ok(());
        }
        rec.cost = Some(seed.cost);
        rec.nearest = Some(seed.id);
        self.cells.write(seed.point, &rec)?;
        self.seeded.set(seed.point);
        if let Some(s) = self.solver.as_mut() {
            s.seed(seed.point)?;
        }
        self.push(seed.cost, seed.point);
        Ok(())
    }

    fn push(&mut self, cost: f64, p: Point) {
        self.frontier.insert(cost, p);
        self.stats.inserted += 1;
        self.stats.peak_frontier = self.stats.peak_frontier.max(self.frontier.len());
    }

    fn conclude(&mut self, reason: StopReason) -> Step {
        self.done = Some(reason);
        self.stats.reason = reason;
        log::info!(
            "search finished, {}: {} cells finalized, {} stale entries, peak cost {}",
            reason,
            self.stats.finalized,
            self.stats.stale,
            self.stats.peak_cost.map_or("none".to_string(), |c| c.to_string())
        );
        if let Some(stops) = self.stops.as_ref().filter(|s| !s.all_reached()) {
            log::info!("{} of {} stop points not reached", stops.remaining(), stops.len());
        }
        Step::Done(reason)
    }

    /// Pop one entry and finalize or discard it.
    pub fn step(&mut self) -> Result<Step, WalkError> {
        if let Some(reason) = self.done {
            return Ok(Step::Done(reason));
        }
        let Some((handle, entry)) = self.frontier.pop_min() else {
            return Ok(self.conclude(StopReason::Exhausted));
        };
        self.frontier.release(handle);
        if self.max_cost.is_some_and(|max| entry.cost > max) {
            return Ok(self.conclude(StopReason::MaxCost));
        }

        let p = entry.point;
        let rec = self.cells.read(p)?;
        if self.visited.get(p) || rec.cost.is_none_or(|c| entry.cost > c) {
            self.stats.stale += 1;
            return Ok(Step::Stale(entry));
        }

        self.visited.set(p);
        self.stats.finalized += 1;
        self.stats.peak_cost = Some(self.stats.peak_cost.map_or(entry.cost, |c| c.max(entry.cost)));
        log::trace!("finalize {} at {}", p, entry.cost);

        self.expand(p, &rec)?;

        let stops_reached = match self.stops.as_mut() {
            Some(stops) => {
                stops.mark(p);
                stops.all_reached()
            }
            None => false,
        };
        if stops_reached {
            self.conclude(StopReason::StopPoints);
        }
        Ok(Step::Finalized(entry))
    }

    /// Step until the run ends.
    pub fn run_to_end(&mut self) -> Result<StopReason, WalkError> {
        loop {
            if let Step::Done(reason) = self.step()? {
                return Ok(reason);
            }
        }
    }

    fn expand(&mut self, from: Point, rec: &CellRecord) -> Result<(), WalkError> {
        // impassable cells keep their cost but spread nowhere
        let (Some((e0, f0)), Some(c0)) = (rec.terrain(), rec.cost) else {
            return Ok(());
        };
        let origin_dirs = match self.directions.as_mut() {
            Some(d) => d.read(from)?,
            None => DirectionSet::EMPTY,
        };
        let origin_best = match self.solver.as_mut() {
            Some(s) => s.read(from)?.best,
            None => None,
        };
        let extent = self.cells.extent();
        let moves = self.moves;

        for mv in moves {
            let to = from + mv.offset;
            if !extent.contains(to) || self.visited.get(to) {
                continue;
            }
            let mut target = self.cells.read(to)?;
            let Some((e1, f1)) = target.terrain() else {
                continue;
            };
            let friction = match mv.intermediates() {
                None => (f0 + f1) / 2.0,
                Some([a, b]) => {
                    let fa = self.cells.read(from + a)?.friction;
                    let fb = self.cells.read(from + b)?.friction;
                    let (Some(fa), Some(fb)) = (fa, fb) else {
                        continue;
                    };
                    (f0 + f1 + fa + fb) / 4.0
                }
            };
            let edge = Edge {
                rise: e1 - e0,
                distance: self.factors.of(mv.stride),
                friction,
            };
            let candidate = c0 + self.model.cost(&edge);
            if !candidate.is_finite() {
                continue;
            }

            match target.cost {
                Some(old) if candidate > old => {}
                Some(old) if candidate == old => {
                    if !self.seeded.get(to) {
                        self.resolve_tie(to, &mut target, mv, rec.nearest, origin_dirs, origin_best)?;
                    }
                }
                _ => {
                    self.seeded.clear(to);
                    target.cost = Some(candidate);
                    target.nearest = rec.nearest;
                    self.cells.write(to, &target)?;
                    if let Some(d) = self.directions.as_mut() {
                        d.write(to, DirectionSet::single(mv.bit))?;
                    }
                    if let Some(s) = self.solver.as_mut() {
                        s.set_best(to, origin_best)?;
                    }
                    self.push(candidate, to);
                }
            }
        }
        Ok(())
    }

    /// An equally cheap path reached `to`. The tie-break layer decides
    /// first; only paths it cannot separate merge their directions.
    fn resolve_tie(
        &mut self,
        to: Point,
        target: &mut CellRecord,
        mv: &Move,
        nearest: Option<f64>,
        origin_dirs: DirectionSet,
        origin_best: Option<f64>,
    ) -> Result<(), WalkError> {
        if let Some(s) = self.solver.as_mut() {
            let mut srec = s.read(to)?;
            match solver::compare(origin_best, srec.best) {
                Ordering::Less => {
                    srec.best = origin_best;
                    s.write(to, &srec)?;
                    target.nearest = nearest;
                    self.cells.write(to, target)?;
                    if let Some(d) = self.directions.as_mut() {
                        d.write(to, DirectionSet::single(mv.bit))?;
                    }
                    return Ok(());
                }
                Ordering::Greater => return Ok(()),
                Ordering::Equal => {}
            }
        }
        if let (Some(DirectionMode::Bitmask), Some(d)) = (self.direction_mode, self.directions.as_mut()) {
            let mut set = d.read(to)?;
            if set.merge(mv.bit, origin_dirs) {
                d.write(to, set)?;
            }
        }
        Ok(())
    }

    /// Stream the output layers into `sink`, north row first. Only finalized
    /// cells are reported; every other cell is null.
    pub fn finish_into(mut self, sink: &mut dyn RowSink) -> Result<WalkStats, WalkError> {
        let extent = self.cells.extent();
        let cols = extent.cols.max(0) as usize;
        let mut cost = Vec::with_capacity(cols);
        let mut nearest = Vec::with_capacity(cols);
        let mut azimuth = Vec::new();
        let mut bitmask = Vec::new();

        for row in 0..extent.rows {
            cost.clear();
            nearest.clear();
            azimuth.clear();
            bitmask.clear();
            for col in 0..extent.cols {
                let p = Point::new(row, col);
                let masked = self.null_mask.as_ref().is_some_and(|m| m.get(p));
                let finalized = self.visited.get(p) && !masked;
                let rec = self.cells.read(p)?;
                cost.push(rec.cost.filter(|_| finalized));
                nearest.push(rec.nearest.filter(|_| finalized));
                if let Some(d) = self.directions.as_mut() {
                    let set = if finalized { Some(d.read(p)?) } else { None };
                    match self.direction_mode {
                        Some(DirectionMode::Bitmask) => bitmask.push(set.map(DirectionSet::bits)),
                        _ => azimuth.push(set.and_then(DirectionSet::azimuth)),
                    }
                }
            }
            sink.cost_row(row, &cost)?;
            match self.direction_mode {
                Some(DirectionMode::Azimuth) => sink.direction_row(row, DirectionRow::Azimuth(&azimuth))?,
                Some(DirectionMode::Bitmask) => sink.direction_row(row, DirectionRow::Bitmask(&bitmask))?,
                None => {}
            }
            if self.want_nearest {
                sink.nearest_row(row, &nearest)?;
            }
        }

        let st = self.cells.stats();
        log::debug!(
            "cell store: {} hits, {} misses, {} evictions, {} write-backs",
            st.hits,
            st.misses,
            st.evictions,
            st.writebacks
        );
        Ok(self.stats)
    }

    /// Collect the output layers as rasters. Only finalized cells are
    /// reported.
    pub fn finish(self) -> Result<WalkOutput, WalkError> {
        let extent = self.cells.extent();
        let mode = self.direction_mode;
        let want_nearest = self.want_nearest;
        let mut rows = RasterCollector::default();
        let stats = self.finish_into(&mut rows)?;

        let direction = match mode {
            Some(DirectionMode::Azimuth) => {
                Some(DirectionGrid::Azimuth(Raster::from_vec(extent, rows.azimuth)?))
            }
            Some(DirectionMode::Bitmask) => {
                Some(DirectionGrid::Bitmask(Raster::from_vec(extent, rows.bitmask)?))
            }
            None => None,
        };
        Ok(WalkOutput {
            cost: Raster::from_vec(extent, rows.cost)?,
            direction,
            nearest: if want_nearest {
                Some(Raster::from_vec(extent, rows.nearest)?)
            } else {
                None
            },
            stats,
        })
    }
}

/// Gathers streamed rows into row-major buffers.
#[derive(Default)]
struct RasterCollector {
    cost: Vec<Option<f64>>,
    azimuth: Vec<Option<f32>>,
    bitmask: Vec<Option<u16>>,
    nearest: Vec<Option<f64>>,
}

impl RowSink for RasterCollector {
    fn cost_row(&mut self, _row: i32, cells: &[Option<f64>]) -> io::Result<()> {
        self.cost.extend_from_slice(cells);
        Ok(())
    }

    fn direction_row(&mut self, _row: i32, cells: DirectionRow<'_>) -> io::Result<()> {
        match cells {
            DirectionRow::Azimuth(c) => self.azimuth.extend_from_slice(c),
            DirectionRow::Bitmask(c) => self.bitmask.extend_from_slice(c),
        }
        Ok(())
    }

    fn nearest_row(&mut self, _row: i32, cells: &[Option<f64>]) -> io::Result<()> {
        self.nearest.extend_from_slice(cells);
        Ok(())
    }
}

/// Compute the cumulative walking cost surface with the default energy model.
pub fn run(inputs: WalkInputs<'_>, config: &WalkConfig) -> Result<WalkOutput, WalkError> {
    run_with(inputs, config, WalkingEnergy::from_config(config))
}

/// Compute a cumulative cost surface with a custom per-step cost model.
pub fn run_with<M: MoveCost>(
    inputs: WalkInputs<'_>,
    config: &WalkConfig,
    model: M,
) -> Result<WalkOutput, WalkError> {
    let mut ctx = SearchContext::new(inputs, config, model)?;
    ctx.run_to_end()?;
    ctx.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryPolicy, WalkCoefficients};
    use walkcost_core::Resolution;

    fn flat_config() -> WalkConfig {
        WalkConfig {
            coefficients: WalkCoefficients::new(1.0, 0.0, 0.0, 0.0),
            lambda: 1.0,
            ..Default::default()
        }
    }

    fn region(rows: i32, cols: i32) -> Region {
        Region::from_corner(0.0, 0.0, rows, cols, Resolution::default()).unwrap()
    }

    #[test]
    fn seeds_are_planted_before_expansion() {
        let r = Raster::filled(Extent::new(3, 3), 1.0);
        let inputs = WalkInputs::new(
            region(3, 3),
            &r,
            &r,
            SeedSource::Cells(vec![Point::new(0, 0), Point::new(2, 2)]),
        );
        let ctx = SearchContext::new(inputs, &flat_config(), WalkingEnergy::from_config(&flat_config()))
            .unwrap();
        assert_eq!(ctx.frontier_len(), 2);
        assert_eq!(ctx.stats().inserted, 2);
        assert!(!ctx.is_done());
    }

    #[test]
    fn duplicate_seed_keeps_first_id() {
        let r = Raster::filled(Extent::new(1, 2), 1.0);
        let inputs = WalkInputs::new(
            region(1, 2),
            &r,
            &r,
            SeedSource::Cells(vec![Point::new(0, 0), Point::new(0, 0)]),
        );
        let cfg = WalkConfig {
            nearest: true,
            ..flat_config()
        };
        let out = run(inputs, &cfg).unwrap();
        let nearest = out.nearest.unwrap();
        assert_eq!(nearest.at(Point::new(0, 0)), Some(1.0));
        assert_eq!(nearest.at(Point::new(0, 1)), Some(1.0));
        assert_eq!(out.stats.inserted, 2);
    }

    #[test]
    fn step_reports_stale_entries() {
        // the diagonal into the high-friction corner is dearer than going
        // round through a free cell, so the first entry for it goes stale
        let e = Extent::new(2, 2);
        let elev = Raster::filled(e, 0.0);
        let fric = Raster::from_fn(e, |p| Some(if p == Point::new(1, 1) { 10.0 } else { 0.0 }));
        let inputs = WalkInputs::new(region(2, 2), &elev, &fric, SeedSource::Cells(vec![Point::ZERO]));
        let mut ctx =
            SearchContext::new(inputs, &flat_config(), WalkingEnergy::from_config(&flat_config()))
                .unwrap();
        let mut stale = 0;
        loop {
            match ctx.step().unwrap() {
                Step::Stale(_) => stale += 1,
                Step::Done(reason) => {
                    assert_eq!(reason, StopReason::Exhausted);
                    break;
                }
                Step::Finalized(_) => {}
            }
        }
        assert_eq!(stale, 1);
        assert_eq!(ctx.stats().stale, 1);
        assert_eq!(ctx.stats().finalized, 4);
        assert_eq!(ctx.step().unwrap(), Step::Done(StopReason::Exhausted));
    }

    #[test]
    fn mismatched_layer_is_config_error() {
        let a = Raster::filled(Extent::new(2, 2), 1.0);
        let b = Raster::filled(Extent::new(2, 1), 1.0);
        let inputs = WalkInputs::new(region(2, 2), &a, &b, SeedSource::Cells(vec![Point::ZERO]));
        let err = run(inputs, &flat_config()).unwrap_err();
        assert!(matches!(
            err,
            WalkError::Config(ConfigError::DimensionMismatch { layer: "friction", .. })
        ));
    }

    #[test]
    fn invalid_budget_is_config_error() {
        let a = Raster::filled(Extent::new(2, 2), 1.0);
        let inputs = WalkInputs::new(region(2, 2), &a, &a, SeedSource::Cells(vec![Point::ZERO]));
        let cfg = WalkConfig {
            memory: MemoryPolicy::Explicit {
                tile_rows: 0,
                tile_cols: 4,
                resident_tiles: 1,
            },
            ..flat_config()
        };
        assert!(matches!(
            run(inputs, &cfg),
            Err(WalkError::Config(ConfigError::InvalidTileBudget { .. }))
        ));
    }
}
