use super::interpolate::{clamp_coordinate, replicate};
use permea_image::Image;

/// Kernel for bilinear interpolation
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values.
pub(crate) fn bilinear_interpolation<const C: usize>(image: &Image<f32, C>, u: f32, v: f32) -> [f32; C] {
    let (rows, cols) = (image.rows(), image.cols());

    let (u, v) = (clamp_coordinate(u, cols), clamp_coordinate(v, rows));
    let (u0, v0) = (u.floor(), v.floor());
    let frac_u = u - u0;
    let frac_v = v - v0;
    let (iu, iv) = (u0 as isize, v0 as isize);

    let iu0 = replicate(iu, cols);
    let iu1 = replicate(iu + 1, cols);
    let iv0 = replicate(iv, rows);
    let iv1 = replicate(iv + 1, rows);

    let w00 = (1.0 - frac_u) * (1.0 - frac_v);
    let w01 = frac_u * (1.0 - frac_v);
    let w10 = (1.0 - frac_u) * frac_v;
    let w11 = frac_u * frac_v;

    let data = image.as_slice();
    let at = |r: usize, c: usize, k: usize| data[(r * cols + c) * C + k];

    let mut pixel = [0.0; C];
    for (k, p) in pixel.iter_mut().enumerate() {
        *p = at(iv0, iu0, k) * w00 + at(iv0, iu1, k) * w01 + at(iv1, iu0, k) * w10 + at(iv1, iu1, k) * w11;
    }

    pixel
}
