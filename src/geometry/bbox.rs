//! Axis-aligned bounding boxes used as spatial index keys.

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use rstar::AABB;

/// An axis-aligned bounding box in XYXY format (xmin, ymin, xmax, ymax).
///
/// Construction does not enforce `min <= max`; the area-of-interest parser
/// rejects unordered boxes.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Coord<f64>,
    pub max: Coord<f64>,
}

impl BBox {
    /// Creates a new bounding box from min and max coordinates.
    #[inline]
    pub fn new(min: Coord<f64>, max: Coord<f64>) -> Self {
        Self { min, max }
    }

    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord { x: xmin, y: ymin },
            max: Coord { x: xmax, y: ymax },
        }
    }

    /// Degenerate box covering a single coordinate.
    #[inline]
    pub fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            min: coord,
            max: coord,
        }
    }

    /// Bounding box of a multipolygon, `None` when it has no coordinates.
    pub fn of_shape(shape: &MultiPolygon<f64>) -> Option<Self> {
        shape
            .bounding_rect()
            .map(|rect| Self::new(rect.min(), rect.max()))
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.x.is_finite()
            && self.min.y.is_finite()
            && self.max.x.is_finite()
            && self.max.y.is_finite()
    }

    /// Boundary-inclusive overlap test.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Boundary-inclusive containment test for a coordinate.
    pub fn contains_coord(&self, coord: Coord<f64>) -> bool {
        coord.x >= self.min.x
            && coord.x <= self.max.x
            && coord.y >= self.min.y
            && coord.y <= self.max.y
    }

    /// Envelope used by the R-tree.
    #[inline]
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min.x, self.min.y], [self.max.x, self.max.y])
    }

    /// The box as a closed rectangular polygon.
    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min.x, self.max.y),
                (self.min.x, self.min.y),
                (self.max.x, self.min.y),
                (self.max.x, self.max.y),
                (self.min.x, self.max.y),
            ]),
            vec![],
        )
    }
}

impl std::fmt::Debug for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBox")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}
