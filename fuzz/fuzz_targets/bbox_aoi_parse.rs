//! Fuzz target for the area-of-interest bounding box syntax.
//!
//! Run with:
//!   cargo +nightly fuzz run bbox_aoi_parse

#![no_main]

use geoscore::aoi::AreaOfInterest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = AreaOfInterest::from_bbox_str(text);
    }
});
