//! The `score` entry point: one call, one fresh index, one report.
//!
//! Each call validates its parameters before any geometry is touched,
//! checks that both layers fit the mode, applies the area of interest,
//! produces confusion counts with the mode's scorer and turns them into a
//! single number with the selected score function. Nothing survives the
//! call.

pub mod report;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use log::info;
use ndarray::Array2;

use crate::aoi::{AoiPolicy, AreaOfInterest};
use crate::area;
use crate::error::GeoscoreError;
use crate::geometry::repair::RepairedShape;
use crate::geometry::{FeatureGeometry, GeometryKind, GeometrySet};
use crate::matching::{self, MatchPolicy};
use crate::metrics::{ConfusionCounts, ScoreFunction};
use crate::raster;

pub use report::{ScoreReport, Trace};

/// How ground truth and prediction are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreMode {
    /// Pixel confusion counts over two equal-shape rasters.
    Pixel,
    /// One-to-one polygon matching by IoU.
    Object,
    /// Predicted points matched into ground-truth polygons.
    Point,
    /// Intersection and difference areas of the unioned layers.
    Area,
    /// Per-class area similarity, weighted by ground-truth area.
    TotalArea,
}

impl ScoreMode {
    pub const ALL: [ScoreMode; 5] = [
        ScoreMode::Pixel,
        ScoreMode::Object,
        ScoreMode::Point,
        ScoreMode::Area,
        ScoreMode::TotalArea,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScoreMode::Pixel => "pixel",
            ScoreMode::Object => "object",
            ScoreMode::Point => "point",
            ScoreMode::Area => "area",
            ScoreMode::TotalArea => "total-area",
        }
    }

    /// Whether the mode consumes vector geometry.
    pub fn is_vector(&self) -> bool {
        !matches!(self, ScoreMode::Pixel)
    }

    /// Kind the predicted set must hold in this mode; `None` for pixel mode.
    pub fn prediction_kind(&self) -> Option<GeometryKind> {
        match self {
            ScoreMode::Pixel => None,
            ScoreMode::Point => Some(GeometryKind::Point),
            ScoreMode::Object | ScoreMode::Area | ScoreMode::TotalArea => {
                Some(GeometryKind::Polygon)
            }
        }
    }

    /// Object and point modes count features, so background is not countable.
    fn counts_objects(&self) -> bool {
        matches!(self, ScoreMode::Object | ScoreMode::Point)
    }
}

impl FromStr for ScoreMode {
    type Err = GeoscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pixel" => Ok(ScoreMode::Pixel),
            "object" => Ok(ScoreMode::Object),
            "point" => Ok(ScoreMode::Point),
            "area" => Ok(ScoreMode::Area),
            "total-area" | "total_area" => Ok(ScoreMode::TotalArea),
            other => Err(GeoscoreError::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of one scoring call.
#[derive(Clone, Debug)]
pub struct RunParameters {
    /// IoU a match must exceed, strictly inside (0, 1). Object mode only.
    pub iou_threshold: f64,
    /// Registered score function name.
    pub score_function: String,
    /// β for `f_score`; 1 when unset.
    pub beta: Option<f64>,
    /// Collect the diagnostic trace.
    pub verbose: bool,
    pub area_of_interest: Option<AreaOfInterest>,
    pub aoi_policy: AoiPolicy,
    pub match_policy: MatchPolicy,
    /// Explicit background count for object and point modes.
    pub true_negatives: Option<f64>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            score_function: "f1_score".to_string(),
            beta: None,
            verbose: false,
            area_of_interest: None,
            aoi_policy: AoiPolicy::default(),
            match_policy: MatchPolicy::default(),
            true_negatives: None,
        }
    }
}

impl RunParameters {
    /// Checks the parameters against `mode` and resolves the score function.
    pub fn validate(&self, mode: ScoreMode) -> Result<ScoreFunction, GeoscoreError> {
        let function = ScoreFunction::from_name(&self.score_function, self.beta)?;

        if mode == ScoreMode::Object
            && !(self.iou_threshold > 0.0 && self.iou_threshold < 1.0)
        {
            return Err(GeoscoreError::InvalidIouThreshold(self.iou_threshold));
        }

        if mode == ScoreMode::Pixel && self.area_of_interest.is_some() {
            return Err(GeoscoreError::AreaOfInterestUnsupported(mode.to_string()));
        }

        if let Some(tn) = self.true_negatives {
            if !(tn.is_finite() && tn >= 0.0) {
                return Err(GeoscoreError::UnsupportedOption(format!(
                    "true negative count {tn} must be a non-negative number"
                )));
            }
        }

        if mode.counts_objects() && function.uses_true_negatives() && self.true_negatives.is_none()
        {
            return Err(GeoscoreError::TrueNegativesUnavailable {
                function: function.name().to_string(),
                mode: mode.to_string(),
            });
        }

        Ok(function)
    }
}

/// One side of the comparison.
#[derive(Clone, Debug)]
pub enum Layer {
    Vector(GeometrySet),
    Raster(Array2<f64>),
}

impl Layer {
    fn kind_name(&self) -> &'static str {
        match self {
            Layer::Vector(_) => "vector",
            Layer::Raster(_) => "raster",
        }
    }
}

/// Scores `predicted` against `ground_truth`.
///
/// # Errors
/// Input errors (wrong layer or geometry kind, raster shape mismatch, CRS
/// mismatch) and configuration errors (unknown function, IoU or β out of
/// range, true negatives not countable) abort the call. Geometry that
/// cannot be repaired only degrades to an empty contribution.
pub fn score(
    ground_truth: &Layer,
    predicted: &Layer,
    mode: ScoreMode,
    params: &RunParameters,
) -> Result<ScoreReport, GeoscoreError> {
    let function = params.validate(mode)?;
    let mut trace = Trace::new(params.verbose);

    let report = match (ground_truth, predicted) {
        (Layer::Raster(gt), Layer::Raster(pred)) if !mode.is_vector() => {
            trace.note(format!("Ground truth raster size = {:?}", gt.dim()));
            trace.note(format!("Predicted raster size = {:?}", pred.dim()));
            let counts = raster::pixel_confusion(gt, pred)?;
            counted_report(counts, function, None, trace)?
        }
        (Layer::Vector(gt), Layer::Vector(pred)) if mode.is_vector() => {
            score_vectors(gt, pred, mode, function, params, trace)?
        }
        (gt, pred) => {
            let expected = if mode.is_vector() { "vector" } else { "raster" };
            let found = if gt.kind_name() != expected {
                gt.kind_name()
            } else {
                pred.kind_name()
            };
            return Err(GeoscoreError::InputMismatch {
                mode: mode.to_string(),
                expected: format!("{expected} (got {found})"),
            });
        }
    };

    info!("{mode} score ({}) = {}", function, report.score);
    Ok(report)
}

fn score_vectors(
    gt: &GeometrySet,
    pred: &GeometrySet,
    mode: ScoreMode,
    function: ScoreFunction,
    params: &RunParameters,
    mut trace: Trace,
) -> Result<ScoreReport, GeoscoreError> {
    let pred_kind = mode.prediction_kind().unwrap_or(GeometryKind::Polygon);
    gt.ensure_kind(GeometryKind::Polygon)?;
    pred.ensure_kind(pred_kind)?;
    gt.ensure_same_crs(pred)?;

    trace.note(format!("Ground truth contains {} polygons", gt.len()));
    trace.note(format!("Prediction contains {} {}s", pred.len(), pred_kind));

    let (gt, pred): (Cow<'_, GeometrySet>, Cow<'_, GeometrySet>) = match &params.area_of_interest {
        Some(aoi) => {
            let gt = aoi.apply(gt, params.aoi_policy);
            let pred = aoi.apply(pred, params.aoi_policy);
            trace.note(format!(
                "Cut vector data by area of interest ({}): \
                 {} ground truth and {} predicted features inside",
                params.aoi_policy,
                gt.len(),
                pred.len()
            ));
            (Cow::Owned(gt), Cow::Owned(pred))
        }
        None => (Cow::Borrowed(gt), Cow::Borrowed(pred)),
    };

    if mode == ScoreMode::TotalArea {
        let score = area::total_area_score(&gt, &pred, &mut trace);
        return Ok(ScoreReport {
            score,
            diagnostics: trace.into_lines(),
            counts: None,
            matches: None,
        });
    }

    let gt_shapes = repaired(&gt);
    let tn = params.true_negatives.unwrap_or(0.0);

    match mode {
        ScoreMode::Object => {
            let pred_shapes = repaired(&pred);
            let result = matching::match_objects(
                &gt_shapes,
                &pred_shapes,
                params.iou_threshold,
                params.match_policy,
                &mut trace,
            );
            let counts = result.counts(tn);
            counted_report(counts, function, Some(result.matches), trace)
        }
        ScoreMode::Point => {
            let points: Vec<_> = pred
                .features
                .iter()
                .filter_map(|feature| match feature.geometry {
                    FeatureGeometry::Point(point) => Some((feature.id, point)),
                    _ => None,
                })
                .collect();
            let result =
                matching::match_points(&gt_shapes, &points, params.match_policy, &mut trace);
            let counts = result.counts(tn);
            counted_report(counts, function, Some(result.matches), trace)
        }
        ScoreMode::Area => {
            let pred_shapes = repaired(&pred);
            let aoi = params.area_of_interest.as_ref().map(AreaOfInterest::shape);
            let counts = area::area_confusion(&gt_shapes, &pred_shapes, aoi, &mut trace);
            counted_report(counts, function, None, trace)
        }
        ScoreMode::Pixel | ScoreMode::TotalArea => Err(GeoscoreError::InputMismatch {
            mode: mode.to_string(),
            expected: "vector".to_string(),
        }),
    }
}

fn repaired(set: &GeometrySet) -> Vec<RepairedShape> {
    set.features
        .iter()
        .filter_map(RepairedShape::from_feature)
        .collect()
}

fn counted_report(
    counts: ConfusionCounts,
    function: ScoreFunction,
    matches: Option<Vec<matching::MatchedPair>>,
    mut trace: Trace,
) -> Result<ScoreReport, GeoscoreError> {
    trace.note(counts.to_string());
    let score = function.evaluate(&counts)?;
    let matches = if trace.is_verbose() { matches } else { None };
    Ok(ScoreReport {
        score,
        diagnostics: trace.into_lines(),
        counts: Some(counts),
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::geometry::SetRole;
    use geo::{polygon, Point, Polygon};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]
    }

    fn gt(polygons: Vec<Polygon<f64>>) -> Layer {
        Layer::Vector(GeometrySet::from_polygons(SetRole::GroundTruth, polygons))
    }

    fn pred(polygons: Vec<Polygon<f64>>) -> Layer {
        Layer::Vector(GeometrySet::from_polygons(SetRole::Predicted, polygons))
    }

    fn with_iou(iou_threshold: f64) -> RunParameters {
        RunParameters {
            iou_threshold,
            ..Default::default()
        }
    }

    #[test]
    fn object_mode_threshold() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(5.0, 5.0, 10.0)]);
        let strict = score(&g, &p, ScoreMode::Object, &with_iou(0.5)).unwrap();
        assert_eq!(strict.score, 0.0);
        let loose = score(&g, &p, ScoreMode::Object, &with_iou(0.1)).unwrap();
        assert!((loose.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn point_mode_example() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = Layer::Vector(GeometrySet::from_points(
            SetRole::Predicted,
            vec![Point::new(5.0, 5.0), Point::new(50.0, 50.0)],
        ));
        let report = score(&g, &p, ScoreMode::Point, &RunParameters::default()).unwrap();
        assert!((report.score - 2.0 / 3.0).abs() < 1e-9);
        let counts = report.counts.unwrap();
        assert_eq!((counts.tp, counts.fp, counts.fn_), (1.0, 1.0, 0.0));
    }

    #[test]
    fn area_mode_example() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![polygon![
            (x: 2.0, y: 0.0), (x: 12.0, y: 0.0), (x: 12.0, y: 10.0), (x: 2.0, y: 10.0),
        ]]);
        let report = score(&g, &p, ScoreMode::Area, &RunParameters::default()).unwrap();
        assert!((report.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn pixel_mode_all_zero() {
        let zeros = Layer::Raster(Array2::zeros((4, 4)));
        let report = score(&zeros, &zeros, ScoreMode::Pixel, &RunParameters::default()).unwrap();
        assert_eq!(report.score, 0.0);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn identical_sets_score_one() {
        let polys = vec![square(0.0, 0.0, 1.0), square(3.0, 3.0, 2.0), square(10.0, 0.0, 4.0)];
        let report = score(
            &gt(polys.clone()),
            &pred(polys),
            ScoreMode::Object,
            &with_iou(0.99),
        )
        .unwrap();
        assert!((report.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn verbose_collects_trace_and_matches() {
        let params = RunParameters {
            verbose: true,
            ..Default::default()
        };
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let report = score(&g, &pred(vec![square(0.0, 0.0, 10.0)]), ScoreMode::Object, &params)
            .unwrap();
        assert!(report
            .diagnostics
            .iter()
            .any(|l| l == "True Positive = 1, False Negative = 0, False Positive = 0"));
        assert_eq!(report.matches.as_ref().map(Vec::len), Some(1));

        let quiet = score(
            &g,
            &pred(vec![square(0.0, 0.0, 10.0)]),
            ScoreMode::Object,
            &RunParameters::default(),
        )
        .unwrap();
        assert!(quiet.diagnostics.is_empty());
        assert!(quiet.matches.is_none());
    }

    #[test]
    fn iou_threshold_bounds_are_exclusive() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(0.0, 0.0, 10.0)]);
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let err = score(&g, &p, ScoreMode::Object, &with_iou(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
        // Ignored outside object mode.
        assert!(score(&g, &p, ScoreMode::Area, &with_iou(2.0)).is_ok());
    }

    #[test]
    fn accuracy_needs_explicit_background_in_object_mode() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(0.0, 0.0, 10.0)]);
        let mut params = RunParameters {
            score_function: "accuracy".into(),
            ..Default::default()
        };
        let err = score(&g, &p, ScoreMode::Object, &params).unwrap_err();
        assert!(matches!(err, GeoscoreError::TrueNegativesUnavailable { .. }));

        params.true_negatives = Some(3.0);
        let report = score(&g, &p, ScoreMode::Object, &params).unwrap();
        assert!((report.score - 1.0).abs() < 1e-12);

        // Area mode has a countable background.
        params.true_negatives = None;
        assert!(score(&g, &p, ScoreMode::Area, &params).is_ok());
    }

    #[test]
    fn wrong_layer_type_is_input_error() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let raster = Layer::Raster(Array2::zeros((2, 2)));
        let err = score(&g, &raster, ScoreMode::Object, &RunParameters::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        let err = score(&g, &g, ScoreMode::Pixel, &RunParameters::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn points_in_object_mode_are_rejected_before_matching() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = Layer::Vector(GeometrySet::from_points(
            SetRole::Predicted,
            vec![Point::new(1.0, 1.0)],
        ));
        let err = score(&g, &p, ScoreMode::Object, &RunParameters::default()).unwrap_err();
        assert!(matches!(err, GeoscoreError::GeometryKindMismatch { .. }));
    }

    #[test]
    fn aoi_is_rejected_in_pixel_mode() {
        let zeros = Layer::Raster(Array2::zeros((2, 2)));
        let params = RunParameters {
            area_of_interest: Some(AreaOfInterest::from_bbox_str("0,0,1,1").unwrap()),
            ..Default::default()
        };
        let err = score(&zeros, &zeros, ScoreMode::Pixel, &params).unwrap_err();
        assert!(matches!(err, GeoscoreError::AreaOfInterestUnsupported(_)));
    }

    #[test]
    fn aoi_filters_before_matching() {
        let g = gt(vec![square(0.0, 0.0, 10.0), square(100.0, 100.0, 10.0)]);
        let p = pred(vec![square(0.0, 0.0, 10.0)]);
        let unbounded = score(&g, &p, ScoreMode::Object, &RunParameters::default()).unwrap();
        assert!((unbounded.score - 2.0 / 3.0).abs() < 1e-9);

        let params = RunParameters {
            area_of_interest: Some(AreaOfInterest::from_bbox_str("-5,-5,20,20").unwrap()),
            ..Default::default()
        };
        let bounded = score(&g, &p, ScoreMode::Object, &params).unwrap();
        assert!((bounded.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn crs_mismatch_is_input_error() {
        let g = Layer::Vector(
            GeometrySet::from_polygons(SetRole::GroundTruth, vec![square(0.0, 0.0, 1.0)])
                .with_crs("EPSG:4326"),
        );
        let p = Layer::Vector(
            GeometrySet::from_polygons(SetRole::Predicted, vec![square(0.0, 0.0, 1.0)])
                .with_crs("EPSG:32633"),
        );
        let err = score(&g, &p, ScoreMode::Area, &RunParameters::default()).unwrap_err();
        assert!(matches!(err, GeoscoreError::CrsMismatch { .. }));
    }

    #[test]
    fn total_area_ignores_counts() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 8.0), (x: 0.0, y: 8.0),
        ]]);
        let report = score(&g, &p, ScoreMode::TotalArea, &RunParameters::default()).unwrap();
        assert!((report.score - (1.0 - 20.0 / 180.0)).abs() < 1e-9);
        assert!(report.counts.is_none());
    }

    #[test]
    fn clip_policy_trims_predictions_in_area_mode() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(5.0, 0.0, 10.0)]);
        let mut params = RunParameters {
            area_of_interest: Some(AreaOfInterest::from_bbox_str("0,0,10,10").unwrap()),
            ..Default::default()
        };
        let filtered = score(&g, &p, ScoreMode::Area, &params).unwrap();
        assert!((filtered.score - 0.5).abs() < 1e-9);

        params.aoi_policy = AoiPolicy::Clip;
        let clipped = score(&g, &p, ScoreMode::Area, &params).unwrap();
        assert!((clipped.score - 2.0 / 3.0).abs() < 1e-9);
        let counts = clipped.counts.unwrap();
        assert!(counts.fp.abs() < 1e-9);
        assert!(counts.tn.abs() < 1e-9);
    }

    #[test]
    fn tolerant_policy_lets_ground_truth_be_claimed_twice() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(0.0, 0.0, 10.0), square(1.0, 0.0, 10.0)]);
        let mut params = RunParameters::default();
        let sequential = score(&g, &p, ScoreMode::Object, &params).unwrap();
        assert!((sequential.score - 2.0 / 3.0).abs() < 1e-9);

        params.match_policy = MatchPolicy::Tolerant;
        let tolerant = score(&g, &p, ScoreMode::Object, &params).unwrap();
        assert!((tolerant.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn beta_and_background_reach_the_score_function() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(0.0, 0.0, 10.0), square(50.0, 50.0, 10.0)]);
        let f2 = RunParameters {
            score_function: "f_score".into(),
            beta: Some(2.0),
            ..Default::default()
        };
        let report = score(&g, &p, ScoreMode::Object, &f2).unwrap();
        assert!((report.score - 5.0 / 6.0).abs() < 1e-9);

        let accuracy = RunParameters {
            score_function: "accuracy".into(),
            true_negatives: Some(2.0),
            ..Default::default()
        };
        let report = score(&g, &p, ScoreMode::Object, &accuracy).unwrap();
        assert!((report.score - 0.75).abs() < 1e-9);
        assert_eq!(report.counts.unwrap().tn, 2.0);
    }

    #[test]
    fn degenerate_aoi_scores_zero_in_area_mode() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let p = pred(vec![square(0.0, 0.0, 10.0)]);
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0)];
        for aoi in [
            AreaOfInterest::from_polygons(Vec::new()),
            AreaOfInterest::from_polygons([sliver]),
        ] {
            assert_eq!(aoi.area(), 0.0);
            let params = RunParameters {
                area_of_interest: Some(aoi),
                score_function: "accuracy".into(),
                ..Default::default()
            };
            let report = score(&g, &p, ScoreMode::Area, &params).unwrap();
            assert_eq!(report.score, 0.0);
            assert_eq!(report.counts.unwrap().tn, 0.0);
        }
    }

    #[test]
    fn unrepairable_prediction_counts_the_same_with_or_without_aoi() {
        let g = gt(vec![square(0.0, 0.0, 10.0)]);
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0)];
        let p = pred(vec![square(0.0, 0.0, 10.0), sliver]);
        let mut params = RunParameters {
            verbose: true,
            ..Default::default()
        };
        let unbounded = score(&g, &p, ScoreMode::Object, &params).unwrap();

        params.area_of_interest = Some(AreaOfInterest::from_bbox_str("-100,-100,100,100").unwrap());
        let bounded = score(&g, &p, ScoreMode::Object, &params).unwrap();

        assert_eq!(unbounded.counts, bounded.counts);
        assert!((bounded.score - 2.0 / 3.0).abs() < 1e-9);
        assert!(bounded
            .diagnostics
            .iter()
            .any(|line| line.starts_with("Predicted feature 1 is empty after repair")));
    }

    #[test]
    fn mode_parses_both_spellings() {
        assert_eq!("total_area".parse::<ScoreMode>().unwrap(), ScoreMode::TotalArea);
        assert_eq!("total-area".parse::<ScoreMode>().unwrap(), ScoreMode::TotalArea);
        let err = "lines".parse::<ScoreMode>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
