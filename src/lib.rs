//! Geoscore: scores predicted geographic features against ground truth.
//!
//! A scoring call takes two layers (rasters, polygons or points), a mode
//! and a set of parameters, and returns one number in `[0, 1]` plus an
//! optional diagnostic trace.
//!
//! # Modules
//!
//! - [`geometry`]: Feature model, GeoJSON reader and polygon repair
//! - [`index`]: R-tree bounding-box index used by the matcher
//! - [`matching`]: One-to-one object (IoU) and point-in-polygon matching
//! - [`area`]: Area confusion counts and the total-area similarity
//! - [`raster`]: Pixel confusion counts and the raster reader
//! - [`metrics`]: Score functions over confusion counts
//! - [`aoi`]: Area of interest filtering and clipping
//! - [`engine`]: The [`score`] entry point and its parameters
//! - [`error`]: Error types for geoscore operations
//!
//! # Example
//!
//! ```
//! use geo::polygon;
//! use geoscore::geometry::{GeometrySet, SetRole};
//! use geoscore::{score, Layer, RunParameters, ScoreMode};
//!
//! let square = polygon![
//!     (x: 0.0, y: 0.0),
//!     (x: 10.0, y: 0.0),
//!     (x: 10.0, y: 10.0),
//!     (x: 0.0, y: 10.0),
//! ];
//! let gt = Layer::Vector(GeometrySet::from_polygons(SetRole::GroundTruth, vec![square.clone()]));
//! let pred = Layer::Vector(GeometrySet::from_polygons(SetRole::Predicted, vec![square]));
//!
//! let report = score(&gt, &pred, ScoreMode::Object, &RunParameters::default())?;
//! assert!((report.score - 1.0).abs() < 1e-12);
//! # Ok::<(), geoscore::GeoscoreError>(())
//! ```

pub mod aoi;
pub mod area;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod index;
pub mod matching;
pub mod metrics;
pub mod raster;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

pub use engine::{score, Layer, RunParameters, ScoreMode, ScoreReport};
pub use error::{ErrorKind, GeoscoreError};

use aoi::{AoiPolicy, AreaOfInterest};
use geometry::io_geojson::{self, FeatureFilter};
use geometry::{GeometryKind, SetRole};
use matching::MatchPolicy;
use metrics::ScoreFunction;

/// The geoscore CLI application.
#[derive(Parser)]
#[command(name = "geoscore")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level written to stderr (off, error, warn, info, debug, trace).
    #[arg(long, global = true, env = "GEOSCORE_LOG", default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Score a prediction against ground truth.
    Score(ScoreArgs),
    /// List the registered score functions.
    Functions,
}

/// Arguments for the score subcommand.
#[derive(clap::Args)]
struct ScoreArgs {
    /// Ground-truth file (GeoJSON, or PNG/TIFF in pixel mode).
    ground_truth: PathBuf,

    /// Prediction file (GeoJSON, or PNG/TIFF in pixel mode).
    predicted: PathBuf,

    /// Scoring mode ('pixel', 'object', 'point', 'area' or 'total-area').
    #[arg(long, default_value = "object")]
    mode: String,

    /// Score function name (see 'geoscore functions').
    #[arg(long = "score-fn", env = "GEOSCORE_SCORE_FN", default_value = "f1_score")]
    score_fn: String,

    /// Beta for 'f_score'.
    #[arg(long)]
    beta: Option<f64>,

    /// IoU a match must exceed in object mode, strictly between 0 and 1.
    #[arg(long, env = "GEOSCORE_IOU", default_value_t = 0.5)]
    iou: f64,

    /// GeoJSON file with the area-of-interest polygons. Takes precedence over --bbox.
    #[arg(long)]
    aoi: Option<PathBuf>,

    /// Area of interest as 'min_x,min_y,max_x,max_y'.
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<String>,

    /// How the area of interest cuts features ('filter' or 'clip').
    #[arg(long, default_value = "filter")]
    aoi_policy: String,

    /// Matching execution policy ('sequential' or 'tolerant').
    #[arg(long, default_value = "sequential")]
    match_policy: String,

    /// Explicit true-negative count for object and point modes.
    #[arg(long)]
    tn: Option<f64>,

    /// Only score features whose property KEY equals VALUE.
    #[arg(long, value_name = "KEY=VALUE")]
    class: Option<String>,

    /// Collect and print the diagnostic trace.
    #[arg(short, long)]
    verbose: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the geoscore CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), GeoscoreError> {
    let cli = Cli::parse();

    // A second init (e.g. in tests) keeps the first logger.
    let _ = env_logger::Builder::new()
        .filter_level(cli.log_level)
        .target(env_logger::Target::Stderr)
        .try_init();

    match cli.command {
        Some(Commands::Score(args)) => run_score(args),
        Some(Commands::Functions) => {
            for name in ScoreFunction::NAMES {
                println!("{name}");
            }
            Ok(())
        }
        None => {
            println!("geoscore {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Scores predicted geographic features against ground truth.");
            println!();
            println!("Run 'geoscore --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the score subcommand.
fn run_score(args: ScoreArgs) -> Result<(), GeoscoreError> {
    let json = match args.output.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(GeoscoreError::UnsupportedOption(format!(
                "output format '{other}' (supported: text, json)"
            )));
        }
    };

    let started = Instant::now();
    let mut report = match score_files(&args) {
        Ok(report) => report,
        Err(err) => {
            if json {
                // Service-style 0.0 sentinel; the exit status still reports the failure.
                println!("{}", serde_json::to_string(&ScoreReport::sentinel(err.to_string()))?);
            }
            return Err(err);
        }
    };
    let elapsed = format!("Execution time: {:.3} s", started.elapsed().as_secs_f64());

    if json {
        if args.verbose {
            report.diagnostics.push(elapsed);
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
        if args.verbose {
            println!();
            println!("{elapsed}");
        }
    }
    Ok(())
}

/// Reads both layers and the area of interest, then scores them.
fn score_files(args: &ScoreArgs) -> Result<ScoreReport, GeoscoreError> {
    let mode: ScoreMode = args.mode.parse()?;
    let filter = args
        .class
        .as_deref()
        .map(str::parse::<FeatureFilter>)
        .transpose()?;

    let area_of_interest = match (&args.aoi, &args.bbox) {
        (Some(path), bbox) => {
            if bbox.is_some() {
                info!("both --aoi and --bbox given; using {}", path.display());
            }
            let set = io_geojson::read_geometry_set(
                path,
                SetRole::GroundTruth,
                GeometryKind::Polygon,
                None,
            )?;
            Some(AreaOfInterest::from_geometry_set(&set)?)
        }
        (None, Some(bbox)) => Some(AreaOfInterest::from_bbox_str(bbox)?),
        (None, None) => None,
    };

    let params = RunParameters {
        iou_threshold: args.iou,
        score_function: args.score_fn.clone(),
        beta: args.beta,
        verbose: args.verbose,
        area_of_interest,
        aoi_policy: args.aoi_policy.parse::<AoiPolicy>()?,
        match_policy: args.match_policy.parse::<MatchPolicy>()?,
        true_negatives: args.tn,
    };
    // Fail on bad parameters before reading any input.
    params.validate(mode)?;

    let (gt, pred) = match mode.prediction_kind() {
        Some(pred_kind) => {
            let gt = io_geojson::read_geometry_set(
                &args.ground_truth,
                SetRole::GroundTruth,
                GeometryKind::Polygon,
                filter.as_ref(),
            )?;
            let pred = io_geojson::read_geometry_set(
                &args.predicted,
                SetRole::Predicted,
                pred_kind,
                filter.as_ref(),
            )?;
            (Layer::Vector(gt), Layer::Vector(pred))
        }
        None => (
            Layer::Raster(raster::read_raster(&args.ground_truth)?),
            Layer::Raster(raster::read_raster(&args.predicted)?),
        ),
    };

    score(&gt, &pred, mode, &params)
}
