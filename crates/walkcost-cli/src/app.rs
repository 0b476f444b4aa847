use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use walkcost_core::{Extent, Region};
use walkcost_paths::{
    DirectionRow, MemoryEstimate, RowSink, RowSource, SearchContext, SeedPoint, SeedSource,
    StopSource, WalkError, WalkInputs, WalkingEnergy,
};

use crate::args::Args;
use crate::ascii::{AsciiRows, AsciiWriter};
use crate::error::{CliError, ParseError};
use crate::points;

/// Run the command described by `args`.
pub fn execute(args: &Args) -> Result<(), CliError> {
    let elevation = GridFile::open(&args.elevation)?;
    let region = elevation.region();
    let config = args.walk_config();
    config.validate()?;

    if args.info {
        let budget = config.memory.resolve(region.extent())?;
        let estimate = MemoryEstimate::for_grid(
            region.extent(),
            budget,
            config.direction.is_some(),
            args.solver.is_some(),
        )?;
        println!("{estimate}");
        return Ok(());
    }
    let output = args.output.as_deref().ok_or(CliError::MissingOutput)?;

    let friction = GridFile::open_aligned(&args.friction, &region, "friction")?;
    let seeds = seed_source(args, &region)?;
    let stops = stop_source(args)?;

    let mut inputs = WalkInputs::from_rows(region, elevation, friction, seeds);
    if let Some(stops) = stops {
        inputs = inputs.with_stops(stops);
    }
    if let Some(path) = &args.solver {
        inputs = inputs.with_solver_rows(GridFile::open_aligned(path, &region, "solver")?);
    }
    let mut ctx = SearchContext::new(inputs, &config, WalkingEnergy::from_config(&config))?;
    ctx.run_to_end()?;

    let mut grids = OutputGrids {
        cost: OutputGrid::create(output, &region)?,
        direction: match (&args.outdir, config.direction) {
            (Some(path), Some(_)) => Some(OutputGrid::create(path, &region)?),
            _ => None,
        },
        nearest: match &args.nearest {
            Some(path) => Some(OutputGrid::create(path, &region)?),
            None => None,
        },
    };
    let stats = ctx.finish_into(&mut grids)?;
    grids.finish()?;
    log::info!(
        "{} of {} cells reached, {} frontier entries, peak frontier {}",
        stats.finalized,
        region.extent().len(),
        stats.inserted,
        stats.peak_frontier
    );
    Ok(())
}

fn seed_source(args: &Args, region: &Region) -> Result<SeedSource, CliError> {
    let mut sources = Vec::new();
    if let Some(path) = &args.start_points {
        sources.push(SeedSource::Points(load_points(path)?));
    }
    if let Some(path) = &args.start_raster {
        let mut start = GridFile::open_aligned(path, region, "start")?;
        sources.push(SeedSource::from_rows(&mut start).map_err(WalkError::from)?);
    }
    if !args.coordinates.is_empty() {
        sources.push(SeedSource::Points(points::from_coordinates(&args.coordinates)));
    }
    Ok(SeedSource::single(sources)?)
}

fn stop_source(args: &Args) -> Result<Option<StopSource>, CliError> {
    let mut stops = match &args.stop_points {
        Some(path) => load_points(path)?,
        None => Vec::new(),
    };
    stops.extend(points::from_coordinates(&args.stop_coordinates));
    Ok((!stops.is_empty()).then_some(StopSource::Points(stops)))
}

fn open(path: &Path) -> Result<BufReader<File>, CliError> {
    File::open(path).map(BufReader::new).map_err(|source| CliError::Open {
        path: path.to_owned(),
        source,
    })
}

fn load_points(path: &Path) -> Result<Vec<SeedPoint>, CliError> {
    points::read_points(open(path)?).map_err(|source| CliError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn aligned(a: &Region, b: &Region) -> bool {
    let res = b.resolution();
    let tol = 1e-6 * res.ns.min(res.ew);
    a.rows == b.rows
        && a.cols == b.cols
        && (a.north - b.north).abs() <= tol
        && (a.south - b.south).abs() <= tol
        && (a.east - b.east).abs() <= tol
        && (a.west - b.west).abs() <= tol
}

// ---------------------------------------------------------------------------
// Streaming grids
// ---------------------------------------------------------------------------

/// An input grid read from disk one row at a time.
struct GridFile {
    path: PathBuf,
    rows: AsciiRows<BufReader<File>>,
}

impl GridFile {
    fn open(path: &Path) -> Result<Self, CliError> {
        let rows = AsciiRows::open(open(path)?).map_err(|source| CliError::Parse {
            path: path.to_owned(),
            source,
        })?;
        log::debug!("reading {} ({})", path.display(), rows.region().extent());
        Ok(Self {
            path: path.to_owned(),
            rows,
        })
    }

    /// Open a grid that must cover the same cells as `region`.
    fn open_aligned(path: &Path, region: &Region, layer: &'static str) -> Result<Self, CliError> {
        let grid = Self::open(path)?;
        if !aligned(&grid.region(), region) {
            return Err(CliError::Misaligned {
                layer,
                path: path.to_owned(),
            });
        }
        Ok(grid)
    }

    fn region(&self) -> Region {
        self.rows.region()
    }
}

impl RowSource for GridFile {
    fn extent(&self) -> Extent {
        self.rows.region().extent()
    }

    fn read_row(&mut self, row: i32, out: &mut [Option<f64>]) -> io::Result<()> {
        self.rows.read_row(row, out).map_err(|source| {
            let kind = match &source {
                ParseError::Io(e) => e.kind(),
                _ => io::ErrorKind::InvalidData,
            };
            io::Error::new(
                kind,
                CliError::Parse {
                    path: self.path.clone(),
                    source,
                },
            )
        })
    }
}

/// An output grid written as the rows arrive.
struct OutputGrid {
    path: PathBuf,
    writer: AsciiWriter<BufWriter<File>>,
}

impl OutputGrid {
    fn create(path: &Path, region: &Region) -> Result<Self, CliError> {
        let write_err = |source| CliError::Write {
            path: path.to_owned(),
            source,
        };
        let file = File::create(path).map_err(write_err)?;
        let writer = AsciiWriter::new(BufWriter::new(file), region).map_err(write_err)?;
        Ok(Self {
            path: path.to_owned(),
            writer,
        })
    }

    fn write_row<T: Copy + fmt::Display>(&mut self, cells: &[Option<T>]) -> io::Result<()> {
        self.writer.write_row(cells).map_err(|source| {
            io::Error::new(
                source.kind(),
                CliError::Write {
                    path: self.path.clone(),
                    source,
                },
            )
        })
    }

    fn finish(self) -> Result<(), CliError> {
        self.writer.finish().map_err(|source| CliError::Write {
            path: self.path.clone(),
            source,
        })?;
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}

/// The output grids of one run.
struct OutputGrids {
    cost: OutputGrid,
    direction: Option<OutputGrid>,
    nearest: Option<OutputGrid>,
}

impl OutputGrids {
    fn finish(self) -> Result<(), CliError> {
        self.cost.finish()?;
        if let Some(grid) = self.direction {
            grid.finish()?;
        }
        if let Some(grid) = self.nearest {
            grid.finish()?;
        }
        Ok(())
    }
}

impl RowSink for OutputGrids {
    fn cost_row(&mut self, _row: i32, cells: &[Option<f64>]) -> io::Result<()> {
        self.cost.write_row(cells)
    }

    fn direction_row(&mut self, _row: i32, cells: DirectionRow<'_>) -> io::Result<()> {
        let Some(grid) = self.direction.as_mut() else {
            return Ok(());
        };
        match cells {
            DirectionRow::Azimuth(c) => grid.write_row(c),
            DirectionRow::Bitmask(c) => grid.write_row(c),
        }
    }

    fn nearest_row(&mut self, _row: i32, cells: &[Option<f64>]) -> io::Result<()> {
        match self.nearest.as_mut() {
            Some(grid) => grid.write_row(cells),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use std::error::Error;

    use clap::Parser;
    use walkcost_core::Point;
    use walkcost_paths::ConfigError;

    use super::*;
    use crate::ascii::{self, AsciiGrid};

    fn grid(rows: usize, cols: usize, value: &str) -> String {
        let mut s = format!("ncols {cols}\nnrows {rows}\nxllcorner 0\nyllcorner 0\ncellsize 1\n");
        for _ in 0..rows {
            s.push_str(&vec![value; cols].join(" "));
            s.push('\n');
        }
        s
    }

    struct Workspace {
        dir: tempfile::TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("elev.asc"), grid(3, 3, "0")).unwrap();
            fs::write(dir.path().join("fric.asc"), grid(3, 3, "1")).unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).display().to_string()
        }

        fn args(&self, extra: &[&str]) -> Args {
            let (e, f) = (self.path("elev.asc"), self.path("fric.asc"));
            let mut argv = vec!["walkcost", "--elevation", e.as_str(), "--friction", f.as_str()];
            argv.extend_from_slice(extra);
            Args::try_parse_from(argv).unwrap()
        }

        fn read(&self, name: &str) -> AsciiGrid {
            ascii::read_grid(open(Path::new(&self.path(name))).unwrap()).unwrap()
        }
    }

    #[test]
    fn writes_cost_direction_and_nearest() {
        let ws = Workspace::new();
        let (out, dir, near) = (ws.path("cost.asc"), ws.path("dir.asc"), ws.path("near.asc"));
        let args = ws.args(&[
            "-o",
            &out,
            "--outdir",
            &dir,
            "--nearest",
            &near,
            "--coordinate",
            "1.5,1.5",
            "--walk-coeff",
            "1,0,0,0",
            "--lambda",
            "0",
        ]);
        execute(&args).unwrap();

        let cost = ws.read("cost.asc");
        assert_eq!(cost.raster.at(Point::new(1, 1)), Some(0.0));
        assert_eq!(cost.raster.at(Point::new(1, 2)), Some(1.0));
        let dirs = ws.read("dir.asc");
        assert_eq!(dirs.raster.at(Point::new(1, 1)), None);
        assert_eq!(dirs.raster.at(Point::new(1, 2)), Some(180.0));
        let near = ws.read("near.asc");
        assert_eq!(near.raster.count_valid(), 9);
        assert_eq!(near.raster.at(Point::new(2, 2)), Some(1.0));
    }

    #[test]
    fn start_grid_and_bitmask_stream_through() {
        let ws = Workspace::new();
        // one start cell, id 4, in the bottom-left corner
        let start = "ncols 3\nnrows 3\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n\
                     -9999 -9999 -9999\n-9999 -9999 -9999\n4 -9999 -9999\n";
        fs::write(ws.dir.path().join("start.asc"), start).unwrap();
        let (out, dir, s) = (ws.path("cost.asc"), ws.path("dir.asc"), ws.path("start.asc"));
        let args = ws.args(&[
            "-o",
            &out,
            "--outdir",
            &dir,
            "-b",
            "--start-raster",
            &s,
            "--walk-coeff",
            "1,0,0,0",
            "--lambda",
            "0",
        ]);
        execute(&args).unwrap();
        let cost = ws.read("cost.asc");
        assert_eq!(cost.raster.at(Point::new(2, 0)), Some(0.0));
        assert_eq!(cost.raster.at(Point::new(2, 2)), Some(2.0));
        let dirs = ws.read("dir.asc");
        assert_eq!(dirs.raster.at(Point::new(2, 0)), Some(0.0));
        // reached moving east, bit 7
        assert_eq!(dirs.raster.at(Point::new(2, 1)), Some(128.0));
    }

    #[test]
    fn bad_row_names_the_grid() {
        let ws = Workspace::new();
        let broken = grid(3, 3, "1").replacen("1 1 1\n1 1 1\n1 1 1", "1 1 1\n1 x 1\n1 1 1", 1);
        fs::write(ws.dir.path().join("fric.asc"), broken).unwrap();
        let out = ws.path("cost.asc");
        let err = execute(&ws.args(&["-o", &out, "--coordinate", "1,1"])).unwrap_err();
        assert!(matches!(err, CliError::Walk(WalkError::Io(_))));
        let mut chain = Vec::new();
        let mut source: Option<&dyn Error> = Some(&err);
        while let Some(e) = source {
            chain.push(e.to_string());
            source = e.source();
        }
        assert!(chain.iter().any(|m| m.contains("fric.asc")), "{chain:?}");
        assert!(chain.iter().any(|m| m.contains("line 7")), "{chain:?}");
        assert!(!ws.dir.path().join("cost.asc").exists());
    }

    #[test]
    fn stop_coordinate_ends_early() {
        let ws = Workspace::new();
        let out = ws.path("cost.asc");
        let args = ws.args(&[
            "-o",
            &out,
            "--coordinate",
            "0.5,2.5",
            "--stop-coordinate",
            "1.5,2.5",
        ]);
        execute(&args).unwrap();
        let cost = ws.read("cost.asc");
        assert!(cost.raster.at(Point::new(0, 1)).is_some());
        assert_eq!(cost.raster.at(Point::new(2, 2)), None);
    }

    #[test]
    fn info_mode_writes_nothing() {
        let ws = Workspace::new();
        execute(&ws.args(&["-i"])).unwrap();
        assert!(!ws.dir.path().join("cost.asc").exists());
    }

    #[test]
    fn two_start_sources_are_rejected() {
        let ws = Workspace::new();
        fs::write(ws.dir.path().join("start.txt"), "0.5,0.5\n").unwrap();
        let (out, start) = (ws.path("cost.asc"), ws.path("start.txt"));
        let args = ws.args(&["-o", &out, "--start-points", &start, "--coordinate", "1,1"]);
        assert!(matches!(
            execute(&args),
            Err(CliError::Config(ConfigError::SeedSourceCount(2)))
        ));
    }

    #[test]
    fn misaligned_friction_is_rejected() {
        let ws = Workspace::new();
        fs::write(ws.dir.path().join("fric.asc"), grid(3, 4, "1")).unwrap();
        let out = ws.path("cost.asc");
        let args = ws.args(&["-o", &out, "--coordinate", "1,1"]);
        assert!(matches!(
            execute(&args),
            Err(CliError::Misaligned { layer: "friction", .. })
        ));
    }

    #[test]
    fn start_outside_region() {
        let ws = Workspace::new();
        let out = ws.path("cost.asc");
        let args = ws.args(&["-o", &out, "--coordinate", "10,10"]);
        assert!(matches!(
            execute(&args),
            Err(CliError::Walk(WalkError::Config(ConfigError::NoStartPoints)))
        ));
    }
}
