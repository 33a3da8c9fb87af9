//! Pixel confusion counts for co-registered single-band rasters.

mod io_image;

pub use io_image::read_raster;

use ndarray::{Array2, Zip};

use crate::error::GeoscoreError;
use crate::metrics::ConfusionCounts;

/// Binarizes a raster: any value above zero becomes 1, everything else 0.
pub fn binarize(raster: &Array2<f64>) -> Array2<u8> {
    raster.mapv(|v| u8::from(v > 0.0))
}

/// Pixel-level confusion counts.
///
/// The two rasters must have exactly the same shape; nothing is resampled
/// or cropped.
pub fn pixel_confusion(
    ground_truth: &Array2<f64>,
    predicted: &Array2<f64>,
) -> Result<ConfusionCounts, GeoscoreError> {
    if ground_truth.dim() != predicted.dim() {
        return Err(GeoscoreError::RasterShapeMismatch {
            ground_truth: ground_truth.dim(),
            predicted: predicted.dim(),
        });
    }

    let gt = binarize(ground_truth);
    let pred = binarize(predicted);

    let mut tp = 0u64;
    let mut gt_sum = 0u64;
    let mut pred_sum = 0u64;
    Zip::from(&gt).and(&pred).for_each(|&g, &p| {
        tp += u64::from(g & p);
        gt_sum += u64::from(g);
        pred_sum += u64::from(p);
    });

    let total = gt.len() as u64;
    let fn_ = gt_sum - tp;
    let fp = pred_sum - tp;
    let tn = total - tp - fp - fn_;

    Ok(ConfusionCounts::new(
        tp as f64,
        fp as f64,
        tn as f64,
        fn_ as f64,
    ))
}
