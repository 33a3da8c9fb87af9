#![allow(dead_code)]

use geo::{polygon, Point, Polygon};
use geoscore::geometry::{GeometrySet, SetRole};
use geoscore::metrics::ConfusionCounts;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y),
        (x: x + w, y: y),
        (x: x + w, y: y + h),
        (x: x, y: y + h),
    ]
}

/// Axis-aligned rectangle on an integer grid, so boolean ops stay exact.
pub fn arb_rect() -> impl Strategy<Value = Polygon<f64>> {
    (0i32..100, 0i32..100, 1i32..20, 1i32..20)
        .prop_map(|(x, y, w, h)| rect(x as f64, y as f64, w as f64, h as f64))
}

/// Rectangles on disjoint grid cells: internally non-overlapping sets.
pub fn arb_tiled_rects(max: usize) -> impl Strategy<Value = Vec<Polygon<f64>>> {
    proptest::collection::btree_set((0u32..10, 0u32..10), 0..=max).prop_flat_map(|cells| {
        let cells: Vec<(u32, u32)> = cells.into_iter().collect();
        let n = cells.len();
        proptest::collection::vec((1i32..9, 1i32..9), n).prop_map(move |sizes| {
            cells
                .iter()
                .zip(sizes)
                .map(|(&(cx, cy), (w, h))| {
                    rect((cx * 10) as f64, (cy * 10) as f64, w as f64, h as f64)
                })
                .collect()
        })
    })
}

pub fn arb_rects(max: usize) -> impl Strategy<Value = Vec<Polygon<f64>>> {
    proptest::collection::vec(arb_rect(), 0..=max)
}

pub fn arb_points(max: usize) -> impl Strategy<Value = Vec<Point<f64>>> {
    proptest::collection::vec(
        (-10i32..110, -10i32..110).prop_map(|(x, y)| Point::new(x as f64, y as f64)),
        0..=max,
    )
}

pub fn arb_counts() -> impl Strategy<Value = ConfusionCounts> {
    (0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6)
        .prop_map(|(tp, fp, tn, fn_)| ConfusionCounts::new(tp, fp, tn, fn_))
}

pub fn ground_truth(polygons: Vec<Polygon<f64>>) -> GeometrySet {
    GeometrySet::from_polygons(SetRole::GroundTruth, polygons)
}

pub fn predicted(polygons: Vec<Polygon<f64>>) -> GeometrySet {
    GeometrySet::from_polygons(SetRole::Predicted, polygons)
}
