use std::fs;
use std::path::Path;

use image::{GrayImage, Luma};

/// Writes a single-band PNG mask with the listed `(x, y)` pixels set to 255.
pub fn write_mask(path: &Path, width: u32, height: u32, foreground: &[(u32, u32)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let mut img = GrayImage::new(width, height);
    for &(x, y) in foreground {
        img.put_pixel(x, y, Luma([255u8]));
    }
    img.save(path).expect("write png mask");
}
