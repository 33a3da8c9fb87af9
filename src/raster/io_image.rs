//! Single-band raster reader backed by the `image` crate.

use std::path::Path;

use log::debug;
use ndarray::Array2;

use crate::error::GeoscoreError;

/// Reads a PNG or TIFF file as a `(height, width)` array.
///
/// Multi-channel images are collapsed to luma; only the sign of each
/// value matters downstream, so the channel weighting is irrelevant for
/// label masks.
pub fn read_raster(path: &Path) -> Result<Array2<f64>, GeoscoreError> {
    let img = image::open(path)
        .map_err(|source| GeoscoreError::RasterRead {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma32f();

    let (width, height) = img.dimensions();
    debug!("read raster {} ({}x{})", path.display(), height, width);

    Ok(Array2::from_shape_fn(
        (height as usize, width as usize),
        |(row, col)| f64::from(img.get_pixel(col as u32, row as u32).0[0]),
    ))
}
