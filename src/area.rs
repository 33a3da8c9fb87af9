//! Area-based scoring: polygon-algebra confusion counts and the
//! per-class total-area similarity.

use geo::{Area, ConvexHull, MultiPolygon};

use crate::engine::report::Trace;
use crate::geometry::repair::{self, RepairedShape};
use crate::geometry::{GeometrySet, SetRole};
use crate::metrics::ConfusionCounts;

/// Confusion counts measured in area units.
///
/// Both sides are unioned into a single multipolygon first, so overlapping
/// features within a set are only counted once. `aoi` is the explicit area
/// of interest; without one the convex hull of all geometry stands in.
pub fn area_confusion(
    gt: &[RepairedShape],
    pred: &[RepairedShape],
    aoi: Option<&MultiPolygon<f64>>,
    trace: &mut Trace,
) -> ConfusionCounts {
    note_empty(gt, SetRole::GroundTruth, trace);
    note_empty(pred, SetRole::Predicted, trace);

    let gt_union = repair::union_all(gt.iter().map(|s| s.shape.clone()));
    let pred_union = repair::union_all(pred.iter().map(|s| s.shape.clone()));

    let gt_area = gt_union.unsigned_area();
    let pred_area = pred_union.unsigned_area();
    let tp = repair::intersection(&gt_union, &pred_union).unsigned_area();
    // Boolean ops can leave the intersection a hair larger than either side.
    let fp = (pred_area - tp).max(0.0);
    let fn_ = (gt_area - tp).max(0.0);

    let background = match aoi {
        Some(aoi) => aoi.unsigned_area(),
        None if gt_union.0.is_empty() && pred_union.0.is_empty() => 0.0,
        None => {
            let hull = repair::union_all([gt_union, pred_union]).convex_hull();
            trace.note(format!(
                "No area of interest given, using convex hull of all geometry (area = {})",
                hull.unsigned_area()
            ));
            hull.unsigned_area()
        }
    };
    // A degenerate region, or features reaching past it, leave no background.
    let tn = (background - tp - fp - fn_).max(0.0);

    ConfusionCounts::new(tp, fp, tn, fn_)
}

fn note_empty(shapes: &[RepairedShape], role: SetRole, trace: &mut Trace) {
    let side = match role {
        SetRole::GroundTruth => "Groundtruth",
        SetRole::Predicted => "Predicted",
    };
    for shape in shapes.iter().filter(|shape| shape.is_empty()) {
        trace.note(format!(
            "{side} feature {} is empty after repair and contributes no area",
            shape.id
        ));
    }
}

/// Gt-area-weighted mean of per-class area similarities.
///
/// Classes come from the feature class label; unlabeled features form one
/// class of their own. Only classes present in ground truth are scored,
/// in order of first appearance. Per class the similarity is
/// `1 - |pred - gt| / (gt + pred)`, and 0 when the ground-truth area is 0.
pub fn total_area_score(gt: &GeometrySet, pred: &GeometrySet, trace: &mut Trace) -> f64 {
    let mut classes: Vec<Option<&str>> = Vec::new();
    for feature in &gt.features {
        let class = feature.class.as_deref();
        if !classes.contains(&class) {
            classes.push(class);
        }
    }

    let mut weighted = 0.0;
    let mut total_gt_area = 0.0;
    for class in classes {
        let gt_area = class_area(gt, class, trace);
        let pred_area = class_area(pred, class, trace);
        let score = area_similarity(gt_area, pred_area);
        trace.note(format!(
            "Class {}: ground truth area = {gt_area}, predicted area = {pred_area}, \
             score = {score}",
            class.unwrap_or("(unlabeled)")
        ));
        weighted += gt_area * score;
        total_gt_area += gt_area;
    }

    if total_gt_area <= 0.0 {
        return 0.0;
    }
    weighted / total_gt_area
}

fn class_area(set: &GeometrySet, class: Option<&str>, trace: &mut Trace) -> f64 {
    let shapes: Vec<RepairedShape> = set
        .features
        .iter()
        .filter(|feature| feature.class.as_deref() == class)
        .filter_map(RepairedShape::from_feature)
        .collect();
    note_empty(&shapes, set.role, trace);
    repair::union_all(shapes.into_iter().map(|shape| shape.shape)).unsigned_area()
}

fn area_similarity(gt_area: f64, pred_area: f64) -> f64 {
    if gt_area <= 0.0 {
        return 0.0;
    }
    1.0 - (pred_area - gt_area).abs() / (gt_area + pred_area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FeatureGeometry, FeatureId};
    use geo::{polygon, Polygon};

    fn rect(x0: f64, y0: f64, w: f64, h: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + w, y: y0),
            (x: x0 + w, y: y0 + h),
            (x: x0, y: y0 + h),
        ]
    }

    fn shapes(polygons: Vec<Polygon<f64>>) -> Vec<RepairedShape> {
        polygons
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                RepairedShape::from_repaired(FeatureId::from(idx), repair::repair_polygon(p))
            })
            .collect()
    }

    #[test]
    fn eighty_percent_overlap() {
        // Two 10x10 squares offset by 2 along x: intersection 8x10 = 80.
        let gt = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shapes(vec![rect(2.0, 0.0, 10.0, 10.0)]);
        let counts = area_confusion(&gt, &pred, None, &mut Trace::new(false));
        assert!((counts.tp - 80.0).abs() < 1e-6);
        assert!((counts.fp - 20.0).abs() < 1e-6);
        assert!((counts.fn_ - 20.0).abs() < 1e-6);
        // Hull is 12x10, fully covered.
        assert!(counts.tn.abs() < 1e-6);
        let f1 = crate::metrics::f1_score(&counts).unwrap();
        assert!((f1 - 0.8).abs() < 1e-9);
    }

    #[test]
    fn explicit_aoi_supplies_background() {
        let gt = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let aoi = MultiPolygon::new(vec![rect(0.0, 0.0, 20.0, 20.0)]);
        let counts = area_confusion(&gt, &pred, Some(&aoi), &mut Trace::new(false));
        assert!((counts.tp - 100.0).abs() < 1e-6);
        assert!((counts.tn - 300.0).abs() < 1e-6);
    }

    #[test]
    fn background_excludes_features_reaching_past_the_aoi() {
        // The prediction sticks 3 units out of the region on the right.
        let gt = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shapes(vec![rect(5.0, 0.0, 10.0, 10.0)]);
        let aoi = MultiPolygon::new(vec![rect(-100.0, -100.0, 112.0, 200.0)]);
        let counts = area_confusion(&gt, &pred, Some(&aoi), &mut Trace::new(false));
        assert!((counts.tp - 50.0).abs() < 1e-6);
        assert!((counts.fp - 50.0).abs() < 1e-6);
        assert!((counts.fn_ - 50.0).abs() < 1e-6);
        assert!((counts.tn - 22_250.0).abs() < 1e-6);
    }

    #[test]
    fn zero_area_aoi_leaves_no_background() {
        let gt = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let aoi = MultiPolygon::new(vec![]);
        let counts = area_confusion(&gt, &pred, Some(&aoi), &mut Trace::new(false));
        assert_eq!(counts.tn, 0.0);
    }

    #[test]
    fn empty_shapes_are_traced() {
        let gt = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shapes(vec![
            rect(0.0, 0.0, 10.0, 10.0),
            polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0)],
        ]);
        let mut trace = Trace::new(true);
        let counts = area_confusion(&gt, &pred, None, &mut trace);
        assert!((counts.tp - 100.0).abs() < 1e-6);
        let lines = trace.into_lines();
        assert!(lines.contains(
            &"Predicted feature 1 is empty after repair and contributes no area".to_string()
        ));
    }

    #[test]
    fn total_area_traces_empty_shapes() {
        let gt = GeometrySet::from_polygons(
            SetRole::GroundTruth,
            vec![
                rect(0.0, 0.0, 10.0, 10.0),
                polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0), (x: 10.0, y: 10.0)],
            ],
        );
        let pred = GeometrySet::from_polygons(SetRole::Predicted, vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let mut trace = Trace::new(true);
        let score = total_area_score(&gt, &pred, &mut trace);
        assert!((score - 1.0).abs() < 1e-9);
        assert!(trace
            .into_lines()
            .iter()
            .any(|line| line.starts_with("Groundtruth feature 1 is empty after repair")));
    }

    #[test]
    fn overlapping_predictions_are_counted_once() {
        let gt = shapes(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shapes(vec![rect(0.0, 0.0, 10.0, 10.0), rect(0.0, 0.0, 10.0, 10.0)]);
        let counts = area_confusion(&gt, &pred, None, &mut Trace::new(false));
        assert!((counts.tp - 100.0).abs() < 1e-6);
        assert!(counts.fp.abs() < 1e-6);
    }

    #[test]
    fn empty_inputs_give_zero_counts() {
        let counts = area_confusion(&[], &[], None, &mut Trace::new(false));
        assert_eq!(counts, ConfusionCounts::default());
    }

    #[test]
    fn total_area_single_class() {
        let gt = GeometrySet::from_polygons(SetRole::GroundTruth, vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred =
            GeometrySet::from_polygons(SetRole::Predicted, vec![rect(50.0, 50.0, 10.0, 8.0)]);
        let score = total_area_score(&gt, &pred, &mut Trace::new(false));
        assert!((score - (1.0 - 20.0 / 180.0)).abs() < 1e-9);
    }

    #[test]
    fn total_area_weights_by_ground_truth_area() {
        let mut gt = GeometrySet::new(SetRole::GroundTruth);
        gt.push(FeatureGeometry::Polygon(rect(0.0, 0.0, 10.0, 10.0)), Some("1".into()));
        gt.push(FeatureGeometry::Polygon(rect(20.0, 0.0, 10.0, 30.0)), Some("2".into()));

        // Class 1 predicted exactly, class 2 missed entirely; a class only in
        // the prediction is ignored.
        let mut pred = GeometrySet::new(SetRole::Predicted);
        pred.push(FeatureGeometry::Polygon(rect(0.0, 0.0, 10.0, 10.0)), Some("1".into()));
        pred.push(FeatureGeometry::Polygon(rect(90.0, 0.0, 5.0, 5.0)), Some("3".into()));

        let mut trace = Trace::new(true);
        let score = total_area_score(&gt, &pred, &mut trace);
        assert!((score - 100.0 / 400.0).abs() < 1e-9);
        assert_eq!(trace.into_lines().len(), 2);
    }

    #[test]
    fn total_area_without_ground_truth_is_zero() {
        let gt = GeometrySet::new(SetRole::GroundTruth);
        let pred = GeometrySet::from_polygons(SetRole::Predicted, vec![rect(0.0, 0.0, 1.0, 1.0)]);
        assert_eq!(total_area_score(&gt, &pred, &mut Trace::new(false)), 0.0);
    }
}
