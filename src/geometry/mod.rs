//! Geometry model shared by every scoring mode.
//!
//! Ground truth and predictions arrive as [`GeometrySet`]s: ordered,
//! position-numbered features holding polygons or points in one planar
//! reference frame. Construction is permissive; [`GeometrySet::ensure_kind`]
//! is the single validation gate before scoring, and [`repair`] turns
//! whatever polygons survive into valid shapes.
//!
//! # Example
//!
//! ```
//! use geo::polygon;
//! use geoscore::geometry::{GeometryKind, GeometrySet, SetRole};
//!
//! let gt = GeometrySet::from_polygons(
//!     SetRole::GroundTruth,
//!     vec![polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)]],
//! );
//! assert!(gt.ensure_kind(GeometryKind::Polygon).is_ok());
//! ```

mod bbox;
mod ids;
pub mod io_geojson;
mod model;
pub mod repair;

pub use bbox::BBox;
pub use ids::FeatureId;
pub use model::{Feature, FeatureGeometry, GeometryKind, GeometrySet, SetRole};
