use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`GeoscoreError`].
///
/// Callers at the service boundary use this to decide whether to surface
/// a 0.0 sentinel score or to propagate the failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input data.
    Input,
    /// Invalid run parameters.
    Configuration,
    /// Filesystem or output failure outside the scoring core.
    Io,
}

/// The main error type for geoscore operations.
#[derive(Debug, Error)]
pub enum GeoscoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse GeoJSON from {path}: {source}")]
    GeoJsonParse {
        path: PathBuf,
        #[source]
        source: geojson::Error,
    },

    #[error("Failed to read raster from {path}: {source}")]
    RasterRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Expected {expected} geometries in the {role} set, found {found}")]
    GeometryKindMismatch {
        role: String,
        expected: String,
        found: String,
    },

    #[error(
        "Rasters have different shapes: ground truth {}x{}, prediction {}x{}",
        .ground_truth.0, .ground_truth.1, .predicted.0, .predicted.1
    )]
    RasterShapeMismatch {
        ground_truth: (usize, usize),
        predicted: (usize, usize),
    },

    #[error("Inputs use different coordinate reference systems: ground truth '{ground_truth}', prediction '{predicted}'")]
    CrsMismatch {
        ground_truth: String,
        predicted: String,
    },

    #[error("Invalid area of interest: {0}")]
    InvalidAreaOfInterest(String),

    #[error("Mode '{mode}' expects {expected} input")]
    InputMismatch { mode: String, expected: String },

    #[error("Unknown scoring function '{name}'. Allowed functions are: {}", .allowed.join(", "))]
    UnknownScoreFunction {
        name: String,
        allowed: Vec<&'static str>,
    },

    #[error("Unsupported mode '{0}' (supported: pixel, object, point, area, total-area)")]
    UnsupportedMode(String),

    #[error("Unsupported option value: {0}")]
    UnsupportedOption(String),

    #[error("IoU threshold must lie strictly between 0 and 1, got {0}")]
    InvalidIouThreshold(f64),

    #[error("Beta must be a positive number, got {0}")]
    InvalidBeta(f64),

    #[error("All the values must be non-negative, got TP={tp}, TN={tn}, FP={fp}, FN={fn_}")]
    NegativeCount { tp: f64, fp: f64, tn: f64, fn_: f64 },

    #[error("Scoring function '{function}' needs true negatives, which are not countable in {mode} mode without an explicit --tn value")]
    TrueNegativesUnavailable { function: String, mode: String },

    #[error("An area of interest cannot be applied in {0} mode")]
    AreaOfInterestUnsupported(String),

    #[error("Failed to serialize score report: {0}")]
    ReportSerialize(#[from] serde_json::Error),
}

impl GeoscoreError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeoscoreError::Io(_) | GeoscoreError::ReportSerialize(_) => ErrorKind::Io,
            GeoscoreError::GeoJsonParse { .. }
            | GeoscoreError::RasterRead { .. }
            | GeoscoreError::InvalidGeometry(_)
            | GeoscoreError::GeometryKindMismatch { .. }
            | GeoscoreError::RasterShapeMismatch { .. }
            | GeoscoreError::CrsMismatch { .. }
            | GeoscoreError::InvalidAreaOfInterest(_)
            | GeoscoreError::InputMismatch { .. }
            | GeoscoreError::NegativeCount { .. } => ErrorKind::Input,
            GeoscoreError::UnknownScoreFunction { .. }
            | GeoscoreError::UnsupportedMode(_)
            | GeoscoreError::UnsupportedOption(_)
            | GeoscoreError::InvalidIouThreshold(_)
            | GeoscoreError::InvalidBeta(_)
            | GeoscoreError::TrueNegativesUnavailable { .. }
            | GeoscoreError::AreaOfInterestUnsupported(_) => ErrorKind::Configuration,
        }
    }
}
