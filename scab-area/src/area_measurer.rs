use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::error::{MeasureError, Result};
use crate::regions::{extract_regions, Region};
use crate::threshold::{binarize, to_intensity};
use crate::utils::ImageUtil;

/// MeasureParameter
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct MeasureParameter {
    /// Intensities at or below this value count as dark.
    pub threshold: u8,
}

impl Default for MeasureParameter {
    fn default() -> Self {
        Self { threshold: 50 }
    }
}

impl MeasureParameter {
    pub fn new(threshold: u8) -> MeasureParameter {
        MeasureParameter { threshold }
    }

    pub fn from_i64(threshold: i64) -> Result<MeasureParameter> {
        u8::try_from(threshold)
            .map(MeasureParameter::new)
            .map_err(|_| MeasureError::ThresholdOutOfRange(threshold))
    }
}

fn check_shape(image: &DynamicImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(MeasureError::ImageShape { width, height });
    }
    Ok(())
}

/// Top-level dark regions of `image` at `threshold`.
pub fn dark_regions(image: &DynamicImage, threshold: u8) -> Result<Vec<Region>> {
    check_shape(image)?;
    let intensity = to_intensity(image);
    let mask = binarize(&intensity, threshold);
    Ok(extract_regions(&mask))
}

/// Total dark area of `image` in px². An image without dark pixels measures 0.
pub fn measure(image: &DynamicImage, threshold: u8) -> Result<f64> {
    // folding from +0.0 keeps an empty image at 0.0 rather than -0.0
    Ok(dark_regions(image, threshold)?
        .iter()
        .fold(0.0, |acc, region| acc + region.area))
}

/// Decode `bytes` and measure the result.
pub fn measure_bytes(name: &str, bytes: &[u8], threshold: u8) -> Result<f64> {
    let image = ImageUtil::decode(name, bytes)?;
    measure(&image, threshold)
}

/// Read the file at `path` and measure it.
pub fn measure_path(path: &Path, param: &MeasureParameter) -> Result<f64> {
    let (_, image) = ImageUtil::read(path)?;
    measure(&image, param.threshold)
}

#[inline]
pub fn physical_area(pixel_area: f64, area_conversion: f64) -> f64 {
    pixel_area * area_conversion
}
