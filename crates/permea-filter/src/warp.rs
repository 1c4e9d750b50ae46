use permea_image::Image;
use permea_imgproc::interpolation::{grid, remap, InterpolationMode};
use permea_imgproc::parallel::ExecutionStrategy;

use crate::error::{ensure_size, FilterError};
use crate::geometry::UnknownFlow;

/// Build the backward sampling map of a flow field.
///
/// Pixel `(x, y)` samples the previous frame at `(x - dx, y - dy)`, where `(dx, dy)`
/// is the flow at `(x, y)`. Pixels with an unknown flow sample themselves.
pub fn backward_sample_map(
    flow: &Image<f32, 2>,
    unknown: &UnknownFlow,
) -> Result<(Image<f32, 1>, Image<f32, 1>), FilterError> {
    let cols = flow.cols();
    let data = flow.as_slice();
    let maps = grid::displaced_grid(flow.size(), |x, y| {
        let base = (y * cols + x) * 2;
        match unknown.displacement(&data[base..base + 2]) {
            Some([dx, dy]) => [-dx, -dy],
            None => [0.0, 0.0],
        }
    })?;
    Ok(maps)
}

/// Resample a field at the positions of a sampling map.
///
/// Positions outside the field replicate the border.
pub fn warp<const C: usize>(
    src: &Image<f32, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
    strategy: ExecutionStrategy,
) -> Result<Image<f32, C>, FilterError> {
    ensure_size(src.size(), map_x.size())?;
    let mut dst = Image::<f32, C>::from_size_val(map_x.size(), 0.0)?;
    remap(src, &mut dst, map_x, map_y, interpolation, strategy)?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permea_image::ImageSize;

    #[test]
    fn zero_flow_is_identity() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 5,
            height: 3,
        };
        let image = Image::<f32, 3>::from_fn(size, |x, y| [x as f32, y as f32, (x * y) as f32 * 0.3]);
        let flow = Image::<f32, 2>::from_size_val(size, 0.0)?;
        let (map_x, map_y) = backward_sample_map(&flow, &UnknownFlow::default())?;
        let warped = warp(
            &image,
            &map_x,
            &map_y,
            InterpolationMode::Bicubic,
            ExecutionStrategy::Serial,
        )?;
        assert_eq!(warped, image);
        Ok(())
    }

    #[test]
    fn integer_shift_moves_content() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 4,
            height: 1,
        };
        let image = Image::<f32, 1>::new(size, vec![1.0, 2.0, 3.0, 4.0])?;
        let flow = Image::<f32, 2>::from_fn(size, |_, _| [1.0, 0.0]);
        let (map_x, map_y) = backward_sample_map(&flow, &UnknownFlow::default())?;
        let warped = warp(
            &image,
            &map_x,
            &map_y,
            InterpolationMode::Bicubic,
            ExecutionStrategy::Parallel,
        )?;
        // the first column replicates the border
        assert_eq!(warped.as_slice(), &[1.0, 1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn unknown_flow_samples_itself() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let flow = Image::<f32, 2>::new(size, vec![1e10, 1e10, 0.5, -0.5])?;
        let (map_x, map_y) = backward_sample_map(&flow, &UnknownFlow::default())?;
        assert_eq!(map_x.as_slice(), &[0.0, 0.5]);
        assert_eq!(map_y.as_slice(), &[0.0, 0.5]);
        Ok(())
    }
}
