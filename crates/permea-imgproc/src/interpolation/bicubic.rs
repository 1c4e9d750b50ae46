use super::interpolate::{clamp_coordinate, replicate};
use permea_image::Image;

/// Cubic convolution weight with the OpenCV coefficient.
#[inline(always)]
fn cubic_weight(x: f32) -> f32 {
    const A: f32 = -0.75;
    let x = x.abs();
    if x <= 1.0 {
        (A + 2.0) * x.powi(3) - (A + 3.0) * x.powi(2) + 1.0
    } else if x < 2.0 {
        A * x.powi(3) - 5.0 * A * x.powi(2) + 8.0 * A * x - 4.0 * A
    } else {
        0.0
    }
}

/// Kernel for bicubic interpolation over the 4x4 neighbourhood of `(u, v)`.
///
/// Integer coordinates reproduce the source pixel exactly.
pub(crate) fn bicubic_interpolation<const C: usize>(image: &Image<f32, C>, u: f32, v: f32) -> [f32; C] {
    let (rows, cols) = (image.rows(), image.cols());

    let (u, v) = (clamp_coordinate(u, cols), clamp_coordinate(v, rows));
    let (u0, v0) = (u.floor(), v.floor());
    let (fu, fv) = (u - u0, v - v0);
    let (iu, iv) = (u0 as isize, v0 as isize);

    let wu = [
        cubic_weight(1.0 + fu),
        cubic_weight(fu),
        cubic_weight(1.0 - fu),
        cubic_weight(2.0 - fu),
    ];
    let wv = [
        cubic_weight(1.0 + fv),
        cubic_weight(fv),
        cubic_weight(1.0 - fv),
        cubic_weight(2.0 - fv),
    ];

    let data = image.as_slice();
    let mut pixel = [0.0; C];

    for (j, &wy) in wv.iter().enumerate() {
        if wy == 0.0 {
            continue;
        }
        let r = replicate(iv - 1 + j as isize, rows);
        for (i, &wx) in wu.iter().enumerate() {
            if wx == 0.0 {
                continue;
            }
            let c = replicate(iu - 1 + i as isize, cols);
            let base = (r * cols + c) * C;
            let w = wy * wx;
            for (k, p) in pixel.iter_mut().enumerate() {
                *p += data[base + k] * w;
            }
        }
    }

    pixel
}
