//! Area of interest: the region that restricts which features are scored.

use std::fmt;
use std::str::FromStr;

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, Intersects, MultiPolygon, Polygon};

use crate::error::GeoscoreError;
use crate::geometry::repair::{self, RepairedShape};
use crate::geometry::{BBox, Feature, FeatureGeometry, GeometryKind, GeometrySet};

/// How features are cut by the area of interest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AoiPolicy {
    /// Keep every feature that touches the area, whole.
    #[default]
    Filter,
    /// Replace each polygon with its part inside the area.
    Clip,
}

impl FromStr for AoiPolicy {
    type Err = GeoscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter" => Ok(AoiPolicy::Filter),
            "clip" => Ok(AoiPolicy::Clip),
            other => Err(GeoscoreError::UnsupportedOption(format!(
                "area of interest policy '{other}' (supported: filter, clip)"
            ))),
        }
    }
}

impl fmt::Display for AoiPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AoiPolicy::Filter => f.write_str("filter"),
            AoiPolicy::Clip => f.write_str("clip"),
        }
    }
}

/// A repaired polygonal region.
#[derive(Clone, Debug)]
pub struct AreaOfInterest {
    shape: MultiPolygon<f64>,
    bbox: Option<BBox>,
}

impl AreaOfInterest {
    /// Unions and repairs the given polygons.
    ///
    /// An empty or degenerate region is allowed; it simply excludes every
    /// feature.
    pub fn from_polygons(polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        let shape = repair::union_all(polygons.into_iter().map(|p| repair::repair_polygon(&p)));
        let bbox = BBox::of_shape(&shape);
        Self { shape, bbox }
    }

    /// Rectangle from a bounding box; the box must be finite with `min < max`.
    pub fn from_bbox(bbox: BBox) -> Result<Self, GeoscoreError> {
        if !bbox.is_finite() || bbox.xmin() >= bbox.xmax() || bbox.ymin() >= bbox.ymax() {
            return Err(GeoscoreError::InvalidAreaOfInterest(format!(
                "bounding box {bbox:?} must be finite with min < max"
            )));
        }
        Ok(Self::from_polygons([bbox.to_polygon()]))
    }

    /// Parses `"min_x,min_y,max_x,max_y"`.
    pub fn from_bbox_str(text: &str) -> Result<Self, GeoscoreError> {
        let values = text
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    GeoscoreError::InvalidAreaOfInterest(format!(
                        "'{}' in bounding box '{text}' is not a number",
                        part.trim()
                    ))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        match values.as_slice() {
            [xmin, ymin, xmax, ymax] => {
                Self::from_bbox(BBox::from_xyxy(*xmin, *ymin, *xmax, *ymax))
            }
            _ => Err(GeoscoreError::InvalidAreaOfInterest(format!(
                "bounding box '{text}' must have exactly 4 comma-separated values, found {}",
                values.len()
            ))),
        }
    }

    /// Region covered by the polygons of a geometry set.
    pub fn from_geometry_set(set: &GeometrySet) -> Result<Self, GeoscoreError> {
        set.ensure_kind(GeometryKind::Polygon)?;
        let shapes = set
            .features
            .iter()
            .filter_map(RepairedShape::from_feature)
            .map(|shape| shape.shape);
        let shape = repair::union_all(shapes);
        let bbox = BBox::of_shape(&shape);
        Ok(Self { shape, bbox })
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }

    /// Returns a new set holding only the features inside the area.
    ///
    /// Points are kept when inside or on the boundary under either policy.
    /// Features that repair to nothing are kept as they are. Kept features
    /// retain their IDs.
    pub fn apply(&self, set: &GeometrySet, policy: AoiPolicy) -> GeometrySet {
        let features = set
            .features
            .iter()
            .filter_map(|feature| self.cut(feature, policy))
            .collect();
        GeometrySet {
            role: set.role,
            features,
            crs: set.crs.clone(),
        }
    }

    fn cut(&self, feature: &Feature, policy: AoiPolicy) -> Option<Feature> {
        if let FeatureGeometry::Point(point) = &feature.geometry {
            let inside = self.bbox.is_some_and(|bbox| bbox.contains_coord(point.0))
                && self.shape.coordinate_position(&point.0) != CoordPos::Outside;
            return inside.then(|| feature.clone());
        }

        let repaired = RepairedShape::from_feature(feature)?;
        // An unrepairable feature has no location; it stays and scores as unmatched.
        if repaired.is_empty() {
            return Some(feature.clone());
        }

        let aoi_bbox = self.bbox?;
        if !repaired.bbox.is_some_and(|bbox| bbox.intersects(&aoi_bbox)) {
            return None;
        }

        let shape = match policy {
            AoiPolicy::Filter => {
                if !repaired.shape.intersects(&self.shape) {
                    return None;
                }
                repaired.shape
            }
            AoiPolicy::Clip => {
                let clipped = repair::intersection(&repaired.shape, &self.shape);
                let parts: Vec<Polygon<f64>> = clipped
                    .0
                    .into_iter()
                    .filter(|part| part.unsigned_area() > 0.0)
                    .collect();
                if parts.is_empty() {
                    return None;
                }
                MultiPolygon::new(parts)
            }
        };

        Some(Feature {
            id: feature.id,
            geometry: FeatureGeometry::MultiPolygon(shape),
            class: feature.class.clone(),
        })
    }
}
