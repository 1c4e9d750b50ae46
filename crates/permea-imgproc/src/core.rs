use permea_image::{ops::check_same_size, Image, ImageError};

use crate::parallel::{self, ExecutionStrategy, ParallelError};

/// Errors of the per-pixel kernels.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum KernelError {
    /// Error coming from the image containers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error coming from the parallel executor.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

/// Compute the per-pixel Euclidean norm of the difference between two fields.
///
/// $ D(y, x) = \sqrt{\sum_c (I_1(y, x, c) - I_2(y, x, c))^2} $
///
/// # Arguments
///
/// * `src1` - The first field with shape (H, W, C).
/// * `src2` - The second field with shape (H, W, C).
/// * `dst` - The output distance map with shape (H, W, 1).
/// * `strategy` - How rows are scheduled.
///
/// # Example
///
/// ```
/// use permea_image::{Image, ImageSize};
/// use permea_imgproc::core::pixel_distance;
/// use permea_imgproc::parallel::ExecutionStrategy;
///
/// let size = ImageSize { width: 2, height: 1 };
/// let a = Image::<f32, 2>::new(size, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
/// let b = Image::<f32, 2>::new(size, vec![3.0, 4.0, 1.0, 1.0]).unwrap();
/// let mut d = Image::<f32, 1>::from_size_val(size, 0.0).unwrap();
///
/// pixel_distance(&a, &b, &mut d, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(d.as_slice(), &[5.0, 0.0]);
/// ```
pub fn pixel_distance<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    dst: &mut Image<f32, 1>,
    strategy: ExecutionStrategy,
) -> Result<(), KernelError> {
    check_same_size(src1, src2)?;
    check_same_size(src1, dst)?;

    let cols = src1.cols();
    let (a, b) = (src1.as_slice(), src2.as_slice());

    parallel::for_each_row_mut(strategy, dst.as_slice_mut(), cols, |r, row| {
        let base = r * cols * C;
        let a_row = &a[base..base + cols * C];
        let b_row = &b[base..base + cols * C];
        row.iter_mut()
            .zip(a_row.chunks_exact(C).zip(b_row.chunks_exact(C)))
            .for_each(|(d, (pa, pb))| {
                *d = pa
                    .iter()
                    .zip(pb)
                    .map(|(&x, &y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt();
            });
    })?;

    Ok(())
}

/// Map every value of a scalar field in place with `f`, row-parallel.
pub fn map_in_place(
    image: &mut Image<f32, 1>,
    strategy: ExecutionStrategy,
    f: impl Fn(f32) -> f32 + Send + Sync,
) -> Result<(), KernelError> {
    let cols = image.cols();
    parallel::for_each_row_mut(strategy, image.as_slice_mut(), cols, |_, row| {
        row.iter_mut().for_each(|v| *v = f(*v));
    })?;
    Ok(())
}
