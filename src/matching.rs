//! Greedy one-to-one matching of predictions against ground truth.
//!
//! Two modes share the same skeleton: ground truth is indexed by bounding
//! box, predictions are processed in input order, and every claimed
//! ground-truth feature is deleted from the index so it cannot be matched
//! twice.
//!
//! - Object mode picks the candidate with the highest IoU (lowest ID on
//!   ties) and accepts it if the IoU is strictly above the threshold.
//! - Point mode accepts the first candidate, by ID, whose polygon contains
//!   the point. Points on a polygon boundary count as contained.
//!
//! Predictions are never reordered by confidence.

use std::collections::BTreeSet;

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, Point};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::engine::report::Trace;
use crate::error::GeoscoreError;
use crate::geometry::repair::{self, RepairedShape};
use crate::geometry::{BBox, FeatureId};
use crate::index::{IndexEntry, SpatialIndex};
use crate::metrics::ConfusionCounts;

/// Execution policy for matching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Input order, mutating index, strict one-to-one.
    #[default]
    Sequential,
    /// Parallel over predictions against a read-only index. A ground-truth
    /// feature may be claimed by several predictions; only sound when
    /// ground truth does not overlap.
    Tolerant,
}

impl FromStr for MatchPolicy {
    type Err = GeoscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(MatchPolicy::Sequential),
            "tolerant" => Ok(MatchPolicy::Tolerant),
            other => Err(GeoscoreError::UnsupportedOption(format!(
                "match policy '{other}' (supported: sequential, tolerant)"
            ))),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Sequential => f.write_str("sequential"),
            MatchPolicy::Tolerant => f.write_str("tolerant"),
        }
    }
}

/// One accepted match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchedPair {
    pub gt_id: FeatureId,
    pub pred_id: FeatureId,
    /// IoU of the pair, object mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iou: Option<f64>,
}

/// Outcome of a matching run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchResult {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub matches: Vec<MatchedPair>,
}

impl MatchResult {
    fn from_matches(matches: Vec<MatchedPair>, gt_count: usize, pred_count: usize) -> Self {
        let tp = matches.len();
        let claimed: BTreeSet<FeatureId> = matches.iter().map(|m| m.gt_id).collect();
        Self {
            true_positives: tp,
            false_positives: pred_count - tp,
            false_negatives: gt_count - claimed.len(),
            matches,
        }
    }

    /// Confusion counts with an explicit background count.
    pub fn counts(&self, tn: f64) -> ConfusionCounts {
        ConfusionCounts::new(
            self.true_positives as f64,
            self.false_positives as f64,
            tn,
            self.false_negatives as f64,
        )
    }
}

/// IoU of two repaired shapes; 0 when either is empty or the union has no area.
pub fn iou(a: &RepairedShape, b: &RepairedShape) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = repair::intersection(&a.shape, &b.shape).unsigned_area();
    let union = a.area + b.area - inter;
    if union <= 0.0 {
        return 0.0;
    }
    (inter / union).clamp(0.0, 1.0)
}

fn build_index<'a>(
    gt: &'a [RepairedShape],
    trace: &mut Trace,
) -> SpatialIndex<&'a RepairedShape> {
    let mut entries = Vec::with_capacity(gt.len());
    for shape in gt {
        match shape.bbox {
            Some(bbox) => entries.push(IndexEntry {
                id: shape.id,
                bbox,
                payload: shape,
            }),
            None => trace.note(format!(
                "Groundtruth feature {} is empty after repair and cannot be matched",
                shape.id
            )),
        }
    }
    SpatialIndex::from_entries(entries)
}

/// Highest-IoU surviving candidate strictly above `threshold`.
fn best_candidate(
    index: &SpatialIndex<&RepairedShape>,
    pred: &RepairedShape,
    threshold: f64,
) -> Option<(FeatureId, BBox, f64)> {
    let bbox = pred.bbox?;
    let mut best: Option<(FeatureId, BBox, f64)> = None;
    // Candidates come back in ascending ID order, so a strict `>` keeps the
    // lowest ID among equal IoUs.
    for (id, candidate) in index.query(&bbox) {
        let value = iou(pred, candidate);
        let better = match best {
            Some((_, _, best_iou)) => value > best_iou,
            None => value > 0.0,
        };
        if better {
            if let Some(candidate_bbox) = candidate.bbox {
                best = Some((id, candidate_bbox, value));
            }
        }
    }
    best.filter(|(_, _, value)| *value > threshold)
}

/// Object (IoU) matching of repaired predictions against repaired ground truth.
pub fn match_objects(
    gt: &[RepairedShape],
    pred: &[RepairedShape],
    iou_threshold: f64,
    policy: MatchPolicy,
    trace: &mut Trace,
) -> MatchResult {
    for shape in pred.iter().filter(|shape| shape.is_empty()) {
        trace.note(format!(
            "Predicted feature {} is empty after repair and counts as a false positive",
            shape.id
        ));
    }

    let mut index = build_index(gt, trace);

    let matches: Vec<MatchedPair> = match policy {
        MatchPolicy::Sequential => {
            let mut matches = Vec::new();
            for shape in pred {
                let best = best_candidate(&index, shape, iou_threshold);
                if let Some((gt_id, gt_bbox, value)) = best {
                    index.delete(gt_id, &gt_bbox);
                    matches.push(MatchedPair {
                        gt_id,
                        pred_id: shape.id,
                        iou: Some(value),
                    });
                }
            }
            matches
        }
        MatchPolicy::Tolerant => {
            let index = &index;
            pred.par_iter()
                .filter_map(|shape| {
                    best_candidate(index, shape, iou_threshold).map(|(gt_id, _, value)| {
                        MatchedPair {
                            gt_id,
                            pred_id: shape.id,
                            iou: Some(value),
                        }
                    })
                })
                .collect()
        }
    };

    MatchResult::from_matches(matches, gt.len(), pred.len())
}

fn contains_inclusive(shape: &RepairedShape, point: &Point<f64>) -> bool {
    shape.shape.coordinate_position(&point.0) != CoordPos::Outside
}

fn first_container(
    index: &SpatialIndex<&RepairedShape>,
    point: &Point<f64>,
) -> Option<(FeatureId, BBox)> {
    index
        .query_point(point.0)
        .into_iter()
        .find(|(_, candidate)| contains_inclusive(candidate, point))
        .and_then(|(id, candidate)| candidate.bbox.map(|bbox| (id, bbox)))
}

/// Point-in-polygon matching of predicted points against repaired ground truth.
pub fn match_points(
    gt: &[RepairedShape],
    pred: &[(FeatureId, Point<f64>)],
    policy: MatchPolicy,
    trace: &mut Trace,
) -> MatchResult {
    let mut index = build_index(gt, trace);

    let matches: Vec<MatchedPair> = match policy {
        MatchPolicy::Sequential => {
            let mut matches = Vec::new();
            for (pred_id, point) in pred {
                if let Some((gt_id, gt_bbox)) = first_container(&index, point) {
                    index.delete(gt_id, &gt_bbox);
                    matches.push(MatchedPair {
                        gt_id,
                        pred_id: *pred_id,
                        iou: None,
                    });
                }
            }
            matches
        }
        MatchPolicy::Tolerant => {
            let index = &index;
            pred.par_iter()
                .filter_map(|(pred_id, point)| {
                    first_container(index, point).map(|(gt_id, _)| MatchedPair {
                        gt_id,
                        pred_id: *pred_id,
                        iou: None,
                    })
                })
                .collect()
        }
    };

    MatchResult::from_matches(matches, gt.len(), pred.len())
}
