use image::{DynamicImage, GrayImage, Luma, Rgb};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::map::map_colors;

/// Mask value of a dark (foreground) pixel.
pub const FOREGROUND: u8 = 255;
/// Mask value of a background pixel.
pub const BACKGROUND: u8 = 0;

// BT.601 luma weights in 14-bit fixed point, rounding on the final shift.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

#[inline]
fn rgb_to_luma(Rgb([r, g, b]): Rgb<u8>) -> Luma<u8> {
    let weighted = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    Luma([((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8])
}

/// Reduce a decoded image to one 8-bit intensity channel.
///
/// 8-bit gray passes through untouched, gray+alpha loses its alpha, deeper gray
/// is rescaled to 8 bits, and everything else goes through RGB luminance.
pub fn to_intensity(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => image.to_luma8(),
        _ => map_colors(&image.to_rgb8(), rgb_to_luma),
    }
}

/// Foreground/background mask of the dark pixels in an intensity image.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] == FOREGROUND
    }

    pub fn foreground_count(&self) -> usize {
        self.0.pixels().filter(|p| p[0] == FOREGROUND).count()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

/// Inverse binary threshold: intensities at or below `threshold` become foreground.
pub fn binarize(intensity: &GrayImage, threshold_value: u8) -> BinaryMask {
    BinaryMask(threshold(
        intensity,
        threshold_value,
        ThresholdType::BinaryInverted,
    ))
}
