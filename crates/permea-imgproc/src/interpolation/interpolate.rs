use super::bicubic::bicubic_interpolation;
use super::bilinear::bilinear_interpolation;
use permea_image::Image;
use serde::{Deserialize, Serialize};

/// Interpolation mode for the remap operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    /// Bilinear interpolation
    Bilinear,
    /// Bicubic interpolation
    Bicubic,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated channel values. Coordinates outside the image replicate the border.
pub fn interpolate_pixel<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    interpolation: InterpolationMode,
) -> [f32; C] {
    match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v),
        InterpolationMode::Bicubic => bicubic_interpolation(image, u, v),
    }
}

/// Clamp a signed coordinate into `[0, len)`.
#[inline(always)]
pub(crate) fn replicate(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Bring a sample coordinate into `[-2, len + 1]`, NaN maps to `0`.
///
/// Every tap of a coordinate outside this range replicates the same border
/// pixel, so clamping leaves finite results unchanged and keeps the integer
/// tap indices from overflowing.
#[inline(always)]
pub(crate) fn clamp_coordinate(u: f32, len: usize) -> f32 {
    if u.is_nan() {
        0.0
    } else {
        u.clamp(-2.0, len as f32 + 1.0)
    }
}
