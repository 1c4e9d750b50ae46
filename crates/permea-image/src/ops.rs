use crate::{Image, ImageError};

/// Add two images element-wise.
///
/// # Arguments
///
/// * `src1` - The first image.
/// * `src2` - The second image.
/// * `dst` - The destination image.
///
/// # Errors
///
/// The three images must share the same size.
///
/// Example:
///
/// ```
/// use permea_image::{Image, ImageSize};
/// use permea_image::ops::add;
///
/// let a = Image::<f32, 2>::from_size_val(ImageSize { width: 2, height: 1 }, 1.0).unwrap();
/// let b = Image::<f32, 2>::from_size_val(a.size(), 2.0).unwrap();
/// let mut c = Image::<f32, 2>::from_size_val(a.size(), 0.0).unwrap();
///
/// add(&a, &b, &mut c).unwrap();
///
/// assert_eq!(c.as_slice(), &[3.0; 4]);
/// ```
pub fn add<const C: usize>(
    src1: &Image<f32, C>,
    src2: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    check_same_size(src1, src2)?;
    check_same_size(src1, dst)?;

    dst.as_slice_mut()
        .iter_mut()
        .zip(src1.as_slice().iter().zip(src2.as_slice()))
        .for_each(|(out, (&a, &b))| *out = a + b);

    Ok(())
}

/// Add a constant to every element of an image.
pub fn add_scalar<const C: usize>(src: &Image<f32, C>, value: f32, dst: &mut Image<f32, C>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .iter_mut()
        .zip(src.as_slice())
        .for_each(|(out, &a)| *out = a + value);

    Ok(())
}

/// Multiply every channel of each pixel by the matching value of a scalar map.
///
/// `dst(y, x, c) = src(y, x, c) * weights(y, x)`
pub fn mul_by_map<const C: usize>(
    src: &Image<f32, C>,
    weights: &Image<f32, 1>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    check_same_size(src, weights)?;
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .chunks_exact_mut(C)
        .zip(src.as_slice().chunks_exact(C))
        .zip(weights.as_slice())
        .for_each(|((out, px), &w)| {
            out.iter_mut().zip(px).for_each(|(o, &v)| *o = v * w);
        });

    Ok(())
}

/// Check that two images share the same size.
///
/// # Errors
///
/// Returns [`ImageError::InvalidImageSize`] with both sizes when they differ.
pub fn check_same_size<T, U, const C1: usize, const C2: usize>(
    a: &Image<T, C1>,
    b: &Image<U, C2>,
) -> Result<(), ImageError> {
    if a.size() != b.size() {
        return Err(ImageError::InvalidImageSize(
            a.width(),
            a.height(),
            b.width(),
            b.height(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageSize;

    #[test]
    fn test_add_scalar() -> Result<(), ImageError> {
        let image = Image::<f32, 2>::new(
            ImageSize {
                height: 1,
                width: 2,
            },
            vec![0.0, 1.0, 2.0, 3.0],
        )?;
        let mut out = Image::from_size_val(image.size(), 0.0)?;
        add_scalar(&image, 1.0, &mut out)?;
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_mul_by_map() -> Result<(), ImageError> {
        let size = ImageSize {
            height: 1,
            width: 2,
        };
        let image = Image::<f32, 2>::new(size, vec![1.0, 2.0, 3.0, 4.0])?;
        let weights = Image::<f32, 1>::new(size, vec![0.5, 0.0])?;
        let mut out = Image::from_size_val(size, 0.0)?;
        mul_by_map(&image, &weights, &mut out)?;
        assert_eq!(out.as_slice(), &[0.5, 1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), ImageError> {
        let a = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let b = Image::<f32, 1>::from_size_val([3, 2].into(), 0.0)?;
        let mut c = a.clone();
        assert_eq!(
            add(&a, &b, &mut c),
            Err(ImageError::InvalidImageSize(2, 2, 3, 2))
        );
        Ok(())
    }
}
