//! Polygon repair by zero-width self-union.
//!
//! Self-intersecting rings, duplicate vertices and collapsed parts are
//! resolved by running the polygon through a boolean union with an empty
//! operand, which re-nodes the rings and rebuilds valid output. Anything
//! that cannot be repaired becomes an empty multipolygon, which downstream
//! code treats as zero area with no match potential.

use std::panic::{self, AssertUnwindSafe};

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use log::warn;

use super::bbox::BBox;
use super::ids::FeatureId;
use super::model::{Feature, FeatureGeometry};

/// A repaired areal feature, ready for IoU and area computations.
#[derive(Clone, Debug)]
pub struct RepairedShape {
    pub id: FeatureId,
    pub shape: MultiPolygon<f64>,
    pub area: f64,
    /// `None` when repair produced an empty geometry.
    pub bbox: Option<BBox>,
}

impl RepairedShape {
    /// Repairs an areal feature. Points yield `None`.
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let shape = match &feature.geometry {
            FeatureGeometry::Polygon(polygon) => repair_polygon(polygon),
            FeatureGeometry::MultiPolygon(shape) => repair_multi_polygon(shape),
            FeatureGeometry::Point(_) => return None,
        };
        Some(Self::from_repaired(feature.id, shape))
    }

    /// Wraps an already valid shape.
    pub fn from_repaired(id: FeatureId, shape: MultiPolygon<f64>) -> Self {
        let area = shape.unsigned_area();
        let bbox = if shape.0.is_empty() {
            None
        } else {
            BBox::of_shape(&shape)
        };
        Self {
            id,
            shape,
            area,
            bbox,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty()
    }
}

/// Repairs a single polygon. Returns an empty multipolygon when unrepairable.
pub fn repair_polygon(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    match clean_polygon(polygon) {
        Some(cleaned) => self_union(MultiPolygon::new(vec![cleaned])),
        None => MultiPolygon::new(vec![]),
    }
}

/// Repairs every part of a multipolygon and merges overlapping parts.
pub fn repair_multi_polygon(shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    union_all(shape.0.iter().map(repair_polygon))
}

/// Unions already-repaired shapes pairwise into one valid multipolygon.
pub fn union_all(shapes: impl IntoIterator<Item = MultiPolygon<f64>>) -> MultiPolygon<f64> {
    shapes
        .into_iter()
        .filter(|shape| !shape.0.is_empty())
        .fold(MultiPolygon::new(vec![]), |acc, shape| {
            if acc.0.is_empty() {
                shape
            } else {
                guarded(|| acc.union(&shape)).unwrap_or(acc)
            }
        })
}

/// Intersection of two valid shapes, empty if the boolean op fails.
pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() || b.0.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    guarded(|| a.intersection(b)).unwrap_or_else(|| MultiPolygon::new(vec![]))
}

fn self_union(shape: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let empty = MultiPolygon::new(vec![]);
    match guarded(|| shape.union(&empty)) {
        Some(out) => MultiPolygon::new(
            out.0
                .into_iter()
                .filter(|part| part.unsigned_area() > 0.0)
                .collect(),
        ),
        None => MultiPolygon::new(vec![]),
    }
}

// Boolean ops can panic on pathological input; that counts as unrepairable.
fn guarded<F: FnOnce() -> MultiPolygon<f64>>(op: F) -> Option<MultiPolygon<f64>> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(out) => Some(out),
        Err(_) => {
            warn!("polygon boolean operation failed; treating result as empty");
            None
        }
    }
}

/// Drops repeated vertices and degenerate rings. `None` if nothing usable remains.
fn clean_polygon(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = clean_ring(polygon.exterior())?;
    let interiors = polygon.interiors().iter().filter_map(clean_ring).collect();
    Some(Polygon::new(exterior, interiors))
}

fn clean_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for coord in ring.coords() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return None;
        }
        if coords.last() != Some(coord) {
            coords.push(*coord);
        }
    }
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    // Three distinct vertices are the minimum for a ring with area.
    if coords.len() < 3 {
        return None;
    }
    Some(LineString::new(coords))
}
