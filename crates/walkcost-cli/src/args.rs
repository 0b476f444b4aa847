use std::path::PathBuf;

use clap::Parser;
use walkcost_paths::{DirectionMode, MemoryPolicy, WalkCoefficients, WalkConfig};

use crate::points::parse_coordinate;

#[derive(Parser, Debug)]
#[command(name = "walkcost", version)]
#[command(about = "Cumulative cost of walking across a terrain from a set of start points")]
pub struct Args {
    /// Elevation grid (ESRI ASCII)
    #[arg(long, value_name = "FILE")]
    pub elevation: PathBuf,

    /// Friction grid (ESRI ASCII), the cost of crossing each cell
    #[arg(long, value_name = "FILE")]
    pub friction: PathBuf,

    /// Output grid of cumulative costs
    #[arg(short, long, value_name = "FILE", required_unless_present = "info")]
    pub output: Option<PathBuf>,

    /// Output grid of movement directions
    #[arg(long, value_name = "FILE")]
    pub outdir: Option<PathBuf>,

    /// Output grid with the id of the cheapest start point
    #[arg(long, value_name = "FILE")]
    pub nearest: Option<PathBuf>,

    /// Start points file (east,north[,id] per line)
    #[arg(long, value_name = "FILE")]
    pub start_points: Option<PathBuf>,

    /// Start grid; every non-null cell is a start point
    #[arg(long, value_name = "FILE")]
    pub start_raster: Option<PathBuf>,

    /// Start coordinate, may be repeated
    #[arg(long = "coordinate", value_name = "E,N", value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub coordinates: Vec<(f64, f64)>,

    /// Stop points file; the run ends once all of them are reached
    #[arg(long, value_name = "FILE")]
    pub stop_points: Option<PathBuf>,

    /// Stop coordinate, may be repeated
    #[arg(long = "stop-coordinate", value_name = "E,N", value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub stop_coordinates: Vec<(f64, f64)>,

    /// Maximum cumulative cost
    #[arg(long, value_name = "COST")]
    pub max_cost: Option<f64>,

    /// Cost assigned to null cells; by default they are impassable
    #[arg(long, value_name = "COST", allow_hyphen_values = true)]
    pub null_cost: Option<f64>,

    /// Percent of the tiles kept in memory (0-100)
    #[arg(long, value_name = "PERCENT", default_value_t = 100)]
    pub memory: u32,

    /// Walking energy coefficients a,b,c,d
    #[arg(long, value_name = "A,B,C,D", default_value = "0.72,6.0,1.9998,-1.9998", allow_hyphen_values = true)]
    pub walk_coeff: WalkCoefficients,

    /// Weight of the friction term
    #[arg(long, value_name = "LAMBDA", default_value_t = 1.0, allow_hyphen_values = true)]
    pub lambda: f64,

    /// Slope below which a descent counts as steep
    #[arg(long, value_name = "SLOPE", default_value_t = -0.2125, allow_hyphen_values = true)]
    pub slope_factor: f64,

    /// Tie-break grid for equally cheap paths; smaller values win
    #[arg(long, value_name = "FILE")]
    pub solver: Option<PathBuf>,

    /// Use the knight's move: 16 neighbours instead of 8
    #[arg(short, long)]
    pub knight: bool,

    /// Keep null elevation cells null in the output
    #[arg(short = 'n', long)]
    pub keep_nulls: bool,

    /// Start with the values of the start grid
    #[arg(short = 'r', long)]
    pub start_with_raster_values: bool,

    /// Write every equally cheap direction as a bitmask
    #[arg(short, long)]
    pub bitmask: bool,

    /// Print the disk and memory estimate and exit
    #[arg(short, long)]
    pub info: bool,

    /// Verbose mode - log search details
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode - only warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default log filter, overridden by `RUST_LOG`.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn walk_config(&self) -> WalkConfig {
        let direction = self.outdir.as_ref().map(|_| {
            if self.bitmask {
                DirectionMode::Bitmask
            } else {
                DirectionMode::Azimuth
            }
        });
        if self.bitmask && direction.is_none() {
            log::warn!("--bitmask has no effect without --outdir");
        }
        WalkConfig {
            coefficients: self.walk_coeff,
            lambda: self.lambda,
            slope_factor: self.slope_factor,
            max_cost: self.max_cost,
            null_cost: self.null_cost,
            knight_moves: self.knight,
            direction,
            nearest: self.nearest.is_some(),
            keep_nulls: self.keep_nulls,
            start_with_raster_values: self.start_with_raster_values,
            memory: MemoryPolicy::Percent(self.memory),
        }
    }
}
