//! Run options: walking coefficients, limits, outputs and memory policy.

use std::fmt;
use std::str::FromStr;

use walkcost_core::Extent;
use walkcost_segment::{Record, TileLayout};

use crate::cell_store::CellRecord;
use crate::error::ConfigError;
use crate::frontier::FrontierEntry;
use crate::solver::SolverRecord;

// ---------------------------------------------------------------------------
// WalkCoefficients
// ---------------------------------------------------------------------------

/// The four coefficients of the walking-energy formula.
///
/// Written `a,b,c,d` on the command line: `a` is the cost of flat movement
/// per unit distance, `b` the climb coefficient, `c` the moderate-descent
/// coefficient and `d` the steep-descent coefficient.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkCoefficients {
    pub flat: f64,
    pub climb: f64,
    pub moderate_descent: f64,
    pub steep_descent: f64,
}

impl WalkCoefficients {
    pub const fn new(flat: f64, climb: f64, moderate_descent: f64, steep_descent: f64) -> Self {
        Self {
            flat,
            climb,
            moderate_descent,
            steep_descent,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for v in [self.flat, self.climb, self.moderate_descent, self.steep_descent] {
            if !v.is_finite() {
                return Err(ConfigError::InvalidCoefficient(v.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for WalkCoefficients {
    fn default() -> Self {
        Self::new(0.72, 6.0, 1.9998, -1.9998)
    }
}

impl fmt::Display for WalkCoefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a={} b={} c={} d={}",
            self.flat, self.climb, self.moderate_descent, self.steep_descent
        )
    }
}

impl FromStr for WalkCoefficients {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ConfigError::CoefficientCount(parts.len()));
        }
        let mut vals = [0.0; 4];
        for (slot, part) in vals.iter_mut().zip(&parts) {
            let v: f64 = part
                .parse()
                .map_err(|_| ConfigError::InvalidCoefficient((*part).to_string()))?;
            if !v.is_finite() {
                return Err(ConfigError::InvalidCoefficient((*part).to_string()));
            }
            *slot = v;
        }
        Ok(Self::new(vals[0], vals[1], vals[2], vals[3]))
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Grids above this many cells use smaller tiles.
const LARGE_GRID_CELLS: f64 = 200_000_000.0;

/// How the tiled stores are laid out and how much of them stays in memory.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryPolicy {
    /// Keep this percentage (0..=100) of the tiles resident.
    Percent(u32),
    /// Set the layout directly.
    Explicit {
        tile_rows: i32,
        tile_cols: i32,
        resident_tiles: usize,
    },
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        MemoryPolicy::Percent(100)
    }
}

/// A resolved tile layout and resident-tile budget.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileBudget {
    pub tile_rows: i32,
    pub tile_cols: i32,
    pub resident_tiles: usize,
}

impl TileBudget {
    /// The segment layout for a grid of `extent`.
    pub fn layout(&self, extent: Extent) -> Result<TileLayout, ConfigError> {
        TileLayout::new(extent, self.tile_rows, self.tile_cols).map_err(|_| self.invalid())
    }

    fn invalid(&self) -> ConfigError {
        ConfigError::InvalidTileBudget {
            tile_rows: self.tile_rows,
            tile_cols: self.tile_cols,
            resident_tiles: self.resident_tiles,
        }
    }
}

impl MemoryPolicy {
    /// Resolve the policy for a grid.
    pub fn resolve(&self, extent: Extent) -> Result<TileBudget, ConfigError> {
        match *self {
            MemoryPolicy::Explicit {
                tile_rows,
                tile_cols,
                resident_tiles,
            } => {
                let budget = TileBudget {
                    tile_rows,
                    tile_cols,
                    resident_tiles,
                };
                if tile_rows <= 0 || tile_cols <= 0 || resident_tiles == 0 {
                    return Err(budget.invalid());
                }
                Ok(budget)
            }
            MemoryPolicy::Percent(p) => {
                if p > 100 {
                    return Err(ConfigError::InvalidPercentMemory(p));
                }
                let (rows, cols) = (extent.rows.max(0) as usize, extent.cols.max(0) as usize);
                let tile = if p == 100 {
                    256
                } else if (rows as f64) * (cols as f64) > LARGE_GRID_CELLS {
                    32
                } else {
                    64
                };
                let tiles = rows.div_ceil(tile) * cols.div_ceil(tile);
                let resident = if p > 0 {
                    p as usize * tiles / 100
                } else {
                    4 * (rows / tile + cols / tile + 2)
                };
                Ok(TileBudget {
                    tile_rows: tile as i32,
                    tile_cols: tile as i32,
                    resident_tiles: resident.max(1),
                })
            }
        }
    }
}

/// Disk and memory needed by a run, in MiB.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryEstimate {
    pub disk_mb: f64,
    pub memory_mb: f64,
}

impl MemoryEstimate {
    /// Estimate for a grid from the records of the stores a run opens: the
    /// cell store always, the direction and tie-break stores when asked for.
    ///
    /// Edge tiles are stored at full size. Memory covers the resident tiles
    /// of every store, the visited flags and a frontier allowance of 5% of
    /// the cells.
    pub fn for_grid(
        extent: Extent,
        budget: TileBudget,
        with_direction: bool,
        with_solver: bool,
    ) -> Result<Self, ConfigError> {
        const MIB: f64 = 1_048_576.0;
        let layout = budget.layout(extent)?;
        let mut record = CellRecord::SIZE;
        if with_direction {
            record += <u16 as Record>::SIZE;
        }
        if with_solver {
            record += SolverRecord::SIZE;
        }
        let tile_bytes = (layout.cells_per_tile() * record) as f64;
        let tiles = layout.tile_count();
        let resident = budget.resident_tiles.min(tiles.max(1));

        let cells = extent.len() as f64;
        let flags = cells / 8.0;
        // arena entry plus its heap index
        let entry = (size_of::<FrontierEntry>() + size_of::<u32>()) as f64;
        let frontier = cells * 0.05 * entry;
        Ok(Self {
            disk_mb: tiles as f64 * tile_bytes / MIB,
            memory_mb: (resident as f64 * tile_bytes + flags + frontier) / MIB,
        })
    }
}

impl fmt::Display for MemoryEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "will need at least {:.2} MB of disk space and {:.2} MB of memory",
            self.disk_mb, self.memory_mb
        )
    }
}

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// How movement directions are reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DirectionMode {
    /// One azimuth per cell, degrees counter-clockwise from east.
    Azimuth,
    /// Every equally cheap incoming direction as a 16-bit mask.
    Bitmask,
}

/// Options for a walking-cost run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WalkConfig {
    pub coefficients: WalkCoefficients,
    /// Weight of the friction term.
    pub lambda: f64,
    /// Slope below which a descent counts as steep.
    pub slope_factor: f64,
    /// Stop once the cheapest open cell costs more than this.
    pub max_cost: Option<f64>,
    /// Cost substituted for null friction and elevation cells.
    pub null_cost: Option<f64>,
    /// Evaluate 16 neighbours instead of 8.
    pub knight_moves: bool,
    pub direction: Option<DirectionMode>,
    /// Produce the nearest-start layer.
    pub nearest: bool,
    /// Keep null elevation cells null in the outputs when `null_cost` is set.
    pub keep_nulls: bool,
    /// Seed rasters give the start cost as well as the id.
    pub start_with_raster_values: bool,
    pub memory: MemoryPolicy,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            coefficients: WalkCoefficients::default(),
            lambda: 1.0,
            slope_factor: -0.2125,
            max_cost: None,
            null_cost: None,
            knight_moves: false,
            direction: None,
            nearest: false,
            keep_nulls: false,
            start_with_raster_values: false,
            memory: MemoryPolicy::default(),
        }
    }
}

impl WalkConfig {
    /// Check the numeric options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coefficients.validate()?;
        for v in [self.lambda, self.slope_factor] {
            if !v.is_finite() {
                return Err(ConfigError::InvalidCoefficient(v.to_string()));
            }
        }
        match self.max_cost {
            Some(max) if !(max.is_finite() && max >= 0.0) => Err(ConfigError::InvalidMaxCost(max)),
            _ => Ok(()),
        }
    }

    /// The null-substitute cost actually in effect.
    ///
    /// A negative value is dropped with a warning, leaving nulls impassable.
    pub fn effective_null_cost(&self) -> Option<f64> {
        match self.null_cost {
            Some(v) if v < 0.0 || !v.is_finite() => {
                log::warn!("ignoring null cost {v}: null cells stay impassable");
                None
            }
            other => other,
        }
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn config_round_trip() {
        let cfg = WalkConfig {
            max_cost: Some(120.0),
            direction: Some(DirectionMode::Bitmask),
            memory: MemoryPolicy::Explicit {
                tile_rows: 16,
                tile_cols: 32,
                resident_tiles: 3,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: WalkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: WalkConfig = serde_json::from_str(r#"{"lambda": 0.5}"#).unwrap();
        assert_eq!(cfg.lambda, 0.5);
        assert_eq!(cfg.coefficients, WalkCoefficients::default());
    }
}
