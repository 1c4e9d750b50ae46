use super::interpolate::interpolate_pixel;
use super::InterpolationMode;
use crate::core::KernelError;
use crate::parallel::{self, ExecutionStrategy};
use permea_image::{ops::check_same_size, Image};

/// Apply generic geometric transformation to an image.
///
/// `dst(y, x) = src(map_y(y, x), map_x(y, x))`, interpolated with `interpolation`.
/// Sample positions outside `src` replicate the nearest border pixel.
///
/// # Arguments
///
/// * `src` - The input image container with shape (height, width, C).
/// * `dst` - The output image container with shape (height, width, C).
/// * `map_x` - The x coordinates of the pixels to interpolate.
/// * `map_y` - The y coordinates of the pixels to interpolate.
/// * `interpolation` - The interpolation mode to use.
/// * `strategy` - How output rows are scheduled.
///
/// # Errors
///
/// * The mapx and mapy must have the same size.
/// * The output image must have the same size as the mapx and mapy.
pub fn remap<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
    strategy: ExecutionStrategy,
) -> Result<(), KernelError> {
    check_same_size(map_x, map_y)?;
    check_same_size(dst, map_x)?;

    if src.as_slice().is_empty() {
        return Ok(());
    }

    let cols = dst.cols();
    let (xs, ys) = (map_x.as_slice(), map_y.as_slice());

    // parallelize the remap operation by rows
    parallel::for_each_row_mut(strategy, dst.as_slice_mut(), cols * C, |r, row| {
        let base = r * cols;
        row.chunks_exact_mut(C)
            .zip(xs[base..base + cols].iter().zip(&ys[base..base + cols]))
            .for_each(|(dst_pixel, (&x, &y))| {
                dst_pixel.copy_from_slice(&interpolate_pixel(src, x, y, interpolation));
            });
    })?;

    Ok(())
}
