//! GeoJSON geometry supplier.
//!
//! Turns a GeoJSON document into a [`GeometrySet`]. The rules:
//!
//! - Polygons become one feature each, MultiPolygons are split into their
//!   member polygons, Points stay points. Any other geometry type, and
//!   features without a geometry, are skipped with a warning.
//! - When points are requested, polygon features are replaced by their
//!   centroids.
//! - The `class_id` property, if present, becomes the feature's class label.
//! - The declared CRS (`"crs": "EPSG:4326"` or the named-CRS object form)
//!   is recorded but never used to reproject.
//!
//! Feature IDs are positions in the resulting set, after splitting and
//! filtering.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use geo::{Centroid, Geometry};
use geojson::{GeoJson, JsonObject, JsonValue};
use log::{debug, warn};

use super::model::{FeatureGeometry, GeometryKind, GeometrySet, SetRole};
use crate::error::GeoscoreError;

/// Property holding the class label.
pub const CLASS_PROPERTY: &str = "class_id";

/// `key=value` restriction on feature properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureFilter {
    pub key: String,
    pub value: String,
}

impl FeatureFilter {
    /// A string property equal to `value`, or any other JSON value whose
    /// text is `value` (so `class_id=3` matches both `"3"` and `3`).
    pub fn matches(&self, properties: Option<&JsonObject>) -> bool {
        match properties.and_then(|props| props.get(&self.key)) {
            Some(JsonValue::String(s)) => *s == self.value,
            Some(other) => other.to_string() == self.value,
            None => false,
        }
    }
}

impl FromStr for FeatureFilter {
    type Err = GeoscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(GeoscoreError::UnsupportedOption(format!(
                "feature filter '{s}' must look like KEY=VALUE"
            ))),
        }
    }
}

impl fmt::Display for FeatureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Reads a geometry set from a GeoJSON file.
///
/// # Errors
/// Fails if the file cannot be read, is not GeoJSON, or holds a geometry
/// that cannot be converted (for example a position with one coordinate).
pub fn read_geometry_set(
    path: &Path,
    role: SetRole,
    kind: GeometryKind,
    filter: Option<&FeatureFilter>,
) -> Result<GeometrySet, GeoscoreError> {
    let text = std::fs::read_to_string(path)?;
    let geojson = text
        .parse::<GeoJson>()
        .map_err(|source| GeoscoreError::GeoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;
    let set = to_geometry_set(geojson, role, kind, filter)?;
    debug!("read {} {} features from {}", set.len(), role, path.display());
    Ok(set)
}

/// Reads a geometry set from a GeoJSON string.
pub fn geometry_set_from_str(
    text: &str,
    role: SetRole,
    kind: GeometryKind,
    filter: Option<&FeatureFilter>,
) -> Result<GeometrySet, GeoscoreError> {
    let geojson = text
        .parse::<GeoJson>()
        .map_err(|source| GeoscoreError::GeoJsonParse {
            path: PathBuf::from("<string>"),
            source,
        })?;
    to_geometry_set(geojson, role, kind, filter)
}

/// Reads a geometry set from raw bytes.
///
/// Useful for fuzzing.
pub fn geometry_set_from_slice(
    bytes: &[u8],
    role: SetRole,
    kind: GeometryKind,
) -> Result<GeometrySet, GeoscoreError> {
    let geojson: GeoJson = serde_json::from_slice(bytes).map_err(|e| GeoscoreError::GeoJsonParse {
        path: PathBuf::from("<bytes>"),
        source: geojson::Error::from(e),
    })?;
    to_geometry_set(geojson, role, kind, None)
}

fn to_geometry_set(
    geojson: GeoJson,
    role: SetRole,
    kind: GeometryKind,
    filter: Option<&FeatureFilter>,
) -> Result<GeometrySet, GeoscoreError> {
    let mut set = GeometrySet::new(role);

    let entries: Vec<(Option<geojson::Geometry>, Option<JsonObject>)> = match geojson {
        GeoJson::FeatureCollection(fc) => {
            set.crs = fc.foreign_members.as_ref().and_then(declared_crs);
            fc.features
                .into_iter()
                .map(|f| (f.geometry, f.properties))
                .collect()
        }
        GeoJson::Feature(f) => {
            set.crs = f.foreign_members.as_ref().and_then(declared_crs);
            vec![(f.geometry, f.properties)]
        }
        GeoJson::Geometry(g) => {
            set.crs = g.foreign_members.as_ref().and_then(declared_crs);
            vec![(Some(g), None)]
        }
    };

    for (position, (geometry, properties)) in entries.into_iter().enumerate() {
        if let Some(filter) = filter {
            if !filter.matches(properties.as_ref()) {
                continue;
            }
        }
        let class = properties
            .as_ref()
            .and_then(|props| props.get(CLASS_PROPERTY))
            .map(|value| match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            });

        let Some(geometry) = geometry else {
            warn!("{role} feature at position {position} has no geometry, skipping");
            continue;
        };

        for geometry in convert_geometry(geometry, role, position)? {
            let geometry = match (kind, geometry) {
                (GeometryKind::Point, FeatureGeometry::Polygon(polygon)) => {
                    match polygon.centroid() {
                        Some(centroid) => FeatureGeometry::Point(centroid),
                        None => {
                            warn!(
                                "{role} polygon at position {position} has no centroid, skipping"
                            );
                            continue;
                        }
                    }
                }
                (_, other) => other,
            };
            set.push(geometry, class.clone());
        }
    }

    Ok(set)
}

/// Polygons and points found in one GeoJSON geometry.
fn convert_geometry(
    geometry: geojson::Geometry,
    role: SetRole,
    position: usize,
) -> Result<Vec<FeatureGeometry>, GeoscoreError> {
    if !positions_are_complete(&geometry.value) {
        return Err(GeoscoreError::InvalidGeometry(format!(
            "{role} feature at position {position} has a position with fewer than two coordinates"
        )));
    }
    let geometry = Geometry::<f64>::try_from(geometry).map_err(|e| {
        GeoscoreError::InvalidGeometry(format!(
            "{role} feature at position {position}: {e}"
        ))
    })?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(vec![FeatureGeometry::Polygon(polygon)]),
        Geometry::MultiPolygon(shape) => {
            Ok(shape.0.into_iter().map(FeatureGeometry::Polygon).collect())
        }
        Geometry::Point(point) => Ok(vec![FeatureGeometry::Point(point)]),
        other => {
            warn!(
                "{role} feature at position {position} is a {}, skipping",
                geometry_name(&other)
            );
            Ok(Vec::new())
        }
    }
}

fn positions_are_complete(value: &geojson::Value) -> bool {
    use geojson::Value;
    let complete = |pos: &geojson::Position| pos.len() >= 2;
    match value {
        Value::Point(pos) => complete(pos),
        Value::MultiPoint(line) | Value::LineString(line) => line.iter().all(complete),
        Value::MultiLineString(rings) | Value::Polygon(rings) => {
            rings.iter().flatten().all(complete)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().all(complete),
        Value::GeometryCollection(members) => {
            members.iter().all(|g| positions_are_complete(&g.value))
        }
    }
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) | Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// CRS name from either `"crs": "EPSG:xxxx"` or `"crs": {"properties": {"name": ..}}`.
fn declared_crs(members: &JsonObject) -> Option<String> {
    match members.get("crs")? {
        JsonValue::String(name) => Some(name.clone()),
        JsonValue::Object(crs) => crs
            .get("properties")
            .and_then(|props| props.get("name"))
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None,
    }
}
