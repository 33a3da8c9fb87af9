//! Feature collections scored against each other.
//!
//! A [`GeometrySet`] is built once per scoring call from already-parsed,
//! already-reprojected collaborator input and is not mutated afterwards;
//! area-of-interest handling produces a new set.

use geo::{Coord, MultiPolygon, Point, Polygon};
use serde::Serialize;
use std::fmt;

use super::ids::FeatureId;
use crate::error::GeoscoreError;

/// Which side of the comparison a set represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetRole {
    GroundTruth,
    Predicted,
}

impl fmt::Display for SetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetRole::GroundTruth => f.write_str("groundtruth"),
            SetRole::Predicted => f.write_str("predicted"),
        }
    }
}

/// Geometry kind requested from, or found in, a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Polygon,
    Point,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Polygon => f.write_str("polygon"),
            GeometryKind::Point => f.write_str("point"),
        }
    }
}

/// The geometry carried by a single feature.
///
/// `MultiPolygon` appears once an area of interest has cut the set: either
/// policy stores the repaired shape, which may have several parts. It still
/// counts as one object.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    Point(Point<f64>),
}

impl FeatureGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            FeatureGeometry::Polygon(_) | FeatureGeometry::MultiPolygon(_) => GeometryKind::Polygon,
            FeatureGeometry::Point(_) => GeometryKind::Point,
        }
    }

    /// Areal geometry as a multipolygon, `None` for points.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self {
            FeatureGeometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon.clone()])),
            FeatureGeometry::MultiPolygon(shape) => Some(shape.clone()),
            FeatureGeometry::Point(_) => None,
        }
    }

    fn coords(&self) -> Box<dyn Iterator<Item = Coord<f64>> + '_> {
        match self {
            FeatureGeometry::Polygon(polygon) => Box::new(polygon_coords(polygon)),
            FeatureGeometry::MultiPolygon(shape) => {
                Box::new(shape.0.iter().flat_map(polygon_coords))
            }
            FeatureGeometry::Point(point) => Box::new(std::iter::once(point.0)),
        }
    }
}

fn polygon_coords(polygon: &Polygon<f64>) -> impl Iterator<Item = Coord<f64>> + '_ {
    polygon
        .exterior()
        .coords()
        .chain(polygon.interiors().iter().flat_map(|ring| ring.coords()))
        .copied()
}

/// One scored feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: FeatureGeometry,
    /// Class label (the `class_id` property), used by the total-area score.
    pub class: Option<String>,
}

impl Feature {
    pub fn new(id: impl Into<FeatureId>, geometry: FeatureGeometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            class: None,
        }
    }
}

/// An ordered collection of features tagged as ground truth or prediction.
///
/// Features are assumed not to overlap each other within a set. This is
/// not validated; overlapping ground truth makes object-mode results
/// depend on prediction order.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometrySet {
    pub role: SetRole,
    pub features: Vec<Feature>,
    /// CRS name declared by the source, if any.
    pub crs: Option<String>,
}

impl GeometrySet {
    /// Creates an empty set.
    pub fn new(role: SetRole) -> Self {
        Self {
            role,
            features: Vec::new(),
            crs: None,
        }
    }

    /// Builds a set of polygons, numbering features in order.
    pub fn from_polygons(role: SetRole, polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        let features = polygons
            .into_iter()
            .enumerate()
            .map(|(idx, polygon)| Feature::new(idx, FeatureGeometry::Polygon(polygon)))
            .collect();
        Self {
            role,
            features,
            crs: None,
        }
    }

    /// Builds a set of points, numbering features in order.
    pub fn from_points(role: SetRole, points: impl IntoIterator<Item = Point<f64>>) -> Self {
        let features = points
            .into_iter()
            .enumerate()
            .map(|(idx, point)| Feature::new(idx, FeatureGeometry::Point(point)))
            .collect();
        Self {
            role,
            features,
            crs: None,
        }
    }

    /// Sets the declared CRS name.
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// Appends a feature, assigning it the next free ID.
    pub fn push(&mut self, geometry: FeatureGeometry, class: Option<String>) {
        let id = FeatureId::from(self.features.len());
        self.features.push(Feature {
            id,
            geometry,
            class,
        });
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Checks every feature has finite coordinates and the expected kind.
    ///
    /// Runs before any matching so malformed input aborts the call early.
    pub fn ensure_kind(&self, expected: GeometryKind) -> Result<(), GeoscoreError> {
        for feature in &self.features {
            let found = feature.geometry.kind();
            if found != expected {
                return Err(GeoscoreError::GeometryKindMismatch {
                    role: self.role.to_string(),
                    expected: expected.to_string(),
                    found: format!("{} (feature {})", found, feature.id),
                });
            }
            if feature.geometry.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
                return Err(GeoscoreError::InvalidGeometry(format!(
                    "{} feature {} has non-finite coordinates",
                    self.role, feature.id
                )));
            }
        }
        Ok(())
    }

    /// Fails when both sets declare a CRS and the names differ.
    ///
    /// Reprojection is the geometry supplier's job; this only guards
    /// against scoring two frames against each other.
    pub fn ensure_same_crs(&self, other: &GeometrySet) -> Result<(), GeoscoreError> {
        match (&self.crs, &other.crs) {
            (Some(a), Some(b)) if !a.eq_ignore_ascii_case(b) => {
                let (ground_truth, predicted) = match self.role {
                    SetRole::GroundTruth => (a.clone(), b.clone()),
                    SetRole::Predicted => (b.clone(), a.clone()),
                };
                Err(GeoscoreError::CrsMismatch {
                    ground_truth,
                    predicted,
                })
            }
            _ => Ok(()),
        }
    }
}
