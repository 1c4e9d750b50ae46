use log::debug;
use permea_image::Image;
use permea_imgproc::parallel::{self, ExecutionStrategy};

use super::distance_to_permeability;
use crate::error::FilterError;
use crate::params::check_positive;

/// Compute the horizontal permeability of an image.
///
/// The value at `(x, y)` is the coupling between the pixel and its right neighbour:
/// the channel-wise Euclidean norm of `I(x, y) - I(x + 1, y)`, normalized by
/// `sqrt(C) * delta_xy`, raised to `alpha_xy` and mapped with `p -> 1 / (1 + p)`.
/// The last column compares the pixel with itself and is therefore `1`.
///
/// # Arguments
///
/// * `image` - The guide image with shape (H, W, C).
/// * `delta_xy` - Gradient scale; smaller values make edges block more.
/// * `alpha_xy` - Exponent shaping the edge response.
/// * `strategy` - How rows are scheduled.
///
/// # Returns
///
/// The permeability map with shape (H, W, 1), every value in `(0, 1]`.
///
/// # Errors
///
/// If `delta_xy` or `alpha_xy` is not a positive finite number.
///
/// # Example
///
/// ```
/// use permea_filter::permeability::spatial_permeability;
/// use permea_image::{Image, ImageSize};
/// use permea_imgproc::parallel::ExecutionStrategy;
///
/// let image = Image::<f32, 1>::new(
///     ImageSize { width: 3, height: 1 },
///     vec![0.0, 0.0, 1.0],
/// ).unwrap();
///
/// let perm = spatial_permeability(&image, 1.0, 2.0, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(perm.as_slice(), &[1.0, 0.5, 1.0]);
/// ```
pub fn spatial_permeability<const C: usize>(
    image: &Image<f32, C>,
    delta_xy: f32,
    alpha_xy: f32,
    strategy: ExecutionStrategy,
) -> Result<Image<f32, 1>, FilterError> {
    check_positive("delta_xy", delta_xy)?;
    check_positive("alpha_xy", alpha_xy)?;

    debug!(
        "spatial permeability on {} with delta {} alpha {}",
        image.size(),
        delta_xy,
        alpha_xy
    );

    let cols = image.cols();
    let src = image.as_slice();
    let mut perm = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;

    parallel::for_each_row_mut(strategy, perm.as_slice_mut(), cols, |r, row| {
        let line = &src[r * cols * C..(r + 1) * cols * C];
        for (x, d) in row.iter_mut().enumerate() {
            let next = (x + 1).min(cols - 1);
            let a = &line[x * C..(x + 1) * C];
            let b = &line[next * C..(next + 1) * C];
            *d = a
                .iter()
                .zip(b)
                .map(|(&p, &q)| (p - q) * (p - q))
                .sum::<f32>()
                .sqrt();
        }
    })?;

    distance_to_permeability(&mut perm, (C as f32).sqrt() * delta_xy, alpha_xy, strategy)?;

    Ok(perm)
}

/// Compute the vertical permeability of an image.
///
/// The value at `(x, y)` is the coupling between the pixel and the pixel below.
/// Computed on the transposed image and transposed back.
pub fn spatial_permeability_vertical<const C: usize>(
    image: &Image<f32, C>,
    delta_xy: f32,
    alpha_xy: f32,
    strategy: ExecutionStrategy,
) -> Result<Image<f32, 1>, FilterError> {
    Ok(spatial_permeability(&image.transpose(), delta_xy, alpha_xy, strategy)?.transpose())
}
