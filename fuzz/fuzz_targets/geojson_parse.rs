//! Fuzz target for the GeoJSON geometry reader.
//!
//! Feeds arbitrary bytes to the reader and, when they parse, repairs every
//! polygon, checking for panics in parsing, conversion or repair.
//!
//! Run with:
//!   cargo +nightly fuzz run geojson_parse

#![no_main]

use geoscore::geometry::io_geojson::geometry_set_from_slice;
use geoscore::geometry::repair::RepairedShape;
use geoscore::geometry::{GeometryKind, SetRole};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid OOM on very large inputs.
    if data.len() > 1024 * 1024 {
        return;
    }

    if let Ok(set) = geometry_set_from_slice(data, SetRole::GroundTruth, GeometryKind::Polygon) {
        for feature in &set.features {
            let _ = RepairedShape::from_feature(feature);
        }
    }
});
