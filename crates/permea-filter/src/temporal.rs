use log::debug;
use permea_image::{ops, Image, ImageSize};
use permea_imgproc::parallel;

use crate::error::{ensure_size, FilterError};
use crate::params::TemporalParams;
use crate::permeability::temporal_permeability_from_map;
use crate::warp::{backward_sample_map, warp};

/// The inputs of one frame of a sequence.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a, const IC: usize, const C: usize> {
    /// The guide image with shape (H, W, IC).
    pub image: &'a Image<f32, IC>,
    /// The field to filter with shape (H, W, C).
    pub field: &'a Image<f32, C>,
    /// The optical flow of the frame with shape (H, W, 2).
    pub flow: &'a Image<f32, 2>,
    /// An optional confidence map of `flow`, values in `[0, 1]`.
    pub confidence: Option<&'a Image<f32, 1>>,
}

impl<'a, const IC: usize, const C: usize> Frame<'a, IC, C> {
    /// A frame without confidence map.
    pub fn new(image: &'a Image<f32, IC>, field: &'a Image<f32, C>, flow: &'a Image<f32, 2>) -> Self {
        Frame {
            image,
            field,
            flow,
            confidence: None,
        }
    }

    /// Attach a confidence map to the frame.
    pub fn with_confidence(mut self, confidence: &'a Image<f32, 1>) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// The common size of the frame inputs.
    pub fn size(&self) -> ImageSize {
        self.image.size()
    }

    fn check(&self) -> Result<(), FilterError> {
        let size = self.size();
        ensure_size(size, self.field.size())?;
        ensure_size(size, self.flow.size())?;
        if let Some(confidence) = self.confidence {
            ensure_size(size, confidence.size())?;
        }
        Ok(())
    }
}

/// The running numerator and denominator carried from one frame to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalAccumulator<const C: usize> {
    /// Weighted sum of the past values, shape (H, W, C).
    pub numerator: Image<f32, C>,
    /// Sum of the weights of the past values, shape (H, W, 1).
    pub normalizer: Image<f32, 1>,
}

impl<const C: usize> TemporalAccumulator<C> {
    /// An empty history: both images are zero.
    pub fn zeros(size: ImageSize) -> Result<Self, FilterError> {
        Ok(TemporalAccumulator {
            numerator: Image::from_size_val(size, 0.0)?,
            normalizer: Image::from_size_val(size, 0.0)?,
        })
    }

    /// The size of the accumulated images.
    pub fn size(&self) -> ImageSize {
        self.numerator.size()
    }
}

/// The result of [`filter_t`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalOutput<const C: usize> {
    /// The accumulator to hand to the next frame.
    pub accumulator: TemporalAccumulator<C>,
    /// The temporally filtered field.
    pub field: Image<f32, C>,
}

/// Blend a field with its motion-compensated history.
///
/// The previous accumulator, extended by the previous field, is warped to the
/// current frame along the backward map of `previous.flow` and attenuated by the
/// temporal permeability:
///
/// ```text
/// l(p)  = perm(p) * warp(l_prev + J_prev)(p)
/// lN(p) = perm(p) * warp(lN_prev + 1)(p)
/// J'(p) = (l(p) + (1 - lambda_t) * J(p)) / (lN(p) + 1)
/// ```
///
/// When the previous frame carries a confidence map, it is warped the same way and
/// further attenuates the permeability.
///
/// # Arguments
///
/// * `current` - The frame being filtered.
/// * `previous` - The previous frame; its field is the previous filter output.
/// * `prev_accumulator` - The accumulator returned for the previous frame.
/// * `params` - The temporal parameters.
///
/// # Errors
///
/// If any input differs in size from `current.image` or a parameter is out of range.
pub fn filter_t<const IC: usize, const C: usize>(
    current: &Frame<'_, IC, C>,
    previous: &Frame<'_, IC, C>,
    prev_accumulator: &TemporalAccumulator<C>,
    params: &TemporalParams,
) -> Result<TemporalOutput<C>, FilterError> {
    params.validate()?;
    current.check()?;
    previous.check()?;
    let size = current.size();
    ensure_size(size, previous.size())?;
    ensure_size(size, prev_accumulator.size())?;
    ensure_size(size, prev_accumulator.normalizer.size())?;

    debug!("temporal filter on {} with lambda {}", size, params.lambda_t);

    let strategy = params.strategy;
    let (map_x, map_y) = backward_sample_map(previous.flow, &params.unknown_flow)?;

    let mut perm = temporal_permeability_from_map(
        current.image,
        previous.image,
        current.flow,
        previous.flow,
        &map_x,
        &map_y,
        params,
    )?;

    if let Some(confidence) = previous.confidence {
        let confidence = warp(confidence, &map_x, &map_y, params.interpolation, strategy)?;
        let confidence = confidence.as_slice();
        let cols = size.width;
        parallel::for_each_row_mut(strategy, perm.as_slice_mut(), cols, |r, row| {
            for (x, p) in row.iter_mut().enumerate() {
                *p *= confidence[r * cols + x].clamp(0.0, 1.0);
            }
        })?;
    }

    // carry the history over to the current frame
    let mut weights = Image::<f32, 1>::from_size_val(size, 0.0)?;
    ops::add_scalar(&prev_accumulator.normalizer, 1.0, &mut weights)?;
    let weights = warp(&weights, &map_x, &map_y, params.interpolation, strategy)?;

    // the cubic kernel undershoots next to a sharp drop of the weights, such a
    // pixel has no usable history
    {
        let weights = weights.as_slice();
        let cols = size.width;
        parallel::for_each_row_mut(strategy, perm.as_slice_mut(), cols, |r, row| {
            for (x, p) in row.iter_mut().enumerate() {
                if weights[r * cols + x] < 0.0 {
                    *p = 0.0;
                }
            }
        })?;
    }

    let mut normalizer = Image::<f32, 1>::from_size_val(size, 0.0)?;
    ops::mul_by_map(&weights, &perm, &mut normalizer)?;

    let mut history = Image::<f32, C>::from_size_val(size, 0.0)?;
    ops::add(&prev_accumulator.numerator, previous.field, &mut history)?;
    let history = warp(&history, &map_x, &map_y, params.interpolation, strategy)?;
    let mut numerator = Image::<f32, C>::from_size_val(size, 0.0)?;
    ops::mul_by_map(&history, &perm, &mut numerator)?;

    let mut field = current.field.clone();
    {
        let (num, norm) = (numerator.as_slice(), normalizer.as_slice());
        let cols = size.width;
        let keep = 1.0 - params.lambda_t;
        parallel::for_each_row_mut(strategy, field.as_slice_mut(), cols * C, |r, row| {
            for (x, px) in row.chunks_exact_mut(C).enumerate() {
                let i = r * cols + x;
                let denominator = norm[i] + 1.0;
                debug_assert!(denominator >= 1.0, "negative temporal weight at {i}");
                for (c, v) in px.iter_mut().enumerate() {
                    *v = (num[i * C + c] + keep * *v) / denominator;
                }
            }
        })?;
    }

    Ok(TemporalOutput {
        accumulator: TemporalAccumulator {
            numerator,
            normalizer,
        },
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MOVEMENT_UNKNOWN;
    use approx::assert_relative_eq;

    fn size() -> ImageSize {
        ImageSize {
            width: 6,
            height: 4,
        }
    }

    fn still() -> Result<(Image<f32, 1>, Image<f32, 2>), FilterError> {
        let image = Image::from_fn(size(), |x, y| [((x + y) % 3) as f32 * 0.2]);
        let flow = Image::<f32, 2>::from_size_val(size(), 0.0)?;
        Ok((image, flow))
    }

    #[test]
    fn static_scene_averages_with_history() -> Result<(), FilterError> {
        let (image, flow) = still()?;
        let prev_field = Image::<f32, 1>::from_size_val(size(), 2.0)?;
        let field = Image::<f32, 1>::from_size_val(size(), 4.0)?;

        let current = Frame::new(&image, &field, &flow);
        let previous = Frame::new(&image, &prev_field, &flow);
        let out = filter_t(
            &current,
            &previous,
            &TemporalAccumulator::zeros(size())?,
            &TemporalParams::reference_flow(),
        )?;

        for &v in out.field.as_slice() {
            assert_relative_eq!(v, 3.0, epsilon = 1e-5);
        }
        for &n in out.accumulator.normalizer.as_slice() {
            assert_relative_eq!(n, 1.0, epsilon = 1e-5);
        }
        assert_eq!(out.accumulator.numerator.size(), size());
        Ok(())
    }

    #[test]
    fn static_scene_fixed_point() -> Result<(), FilterError> {
        let (image, flow) = still()?;
        let field = Image::<f32, 2>::from_fn(size(), |x, y| [x as f32 * 0.5, -(y as f32)]);
        let frame = Frame::new(&image, &field, &flow);

        let mut accumulator = TemporalAccumulator::zeros(size())?;
        for _ in 0..3 {
            let out = filter_t(&frame, &frame, &accumulator, &TemporalParams::reference_flow())?;
            for (a, b) in out.field.as_slice().iter().zip(field.as_slice()) {
                assert_relative_eq!(a, b, epsilon = 1e-4);
            }
            accumulator = out.accumulator;
        }
        // the history grows by one frame per call
        for &n in accumulator.normalizer.as_slice() {
            assert_relative_eq!(n, 3.0, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn unknown_flow_keeps_current_value() -> Result<(), FilterError> {
        let (image, flow) = still()?;
        let mut prev_flow = flow.clone();
        prev_flow.set_pixel(2, 1, [MOVEMENT_UNKNOWN, MOVEMENT_UNKNOWN])?;
        let prev_field = Image::<f32, 1>::from_size_val(size(), 10.0)?;
        let field = Image::<f32, 1>::from_size_val(size(), 1.0)?;

        let current = Frame::new(&image, &field, &flow);
        let previous = Frame::new(&image, &prev_field, &prev_flow);
        let out = filter_t(
            &current,
            &previous,
            &TemporalAccumulator::zeros(size())?,
            &TemporalParams::reference_flow(),
        )?;

        assert_eq!(out.field.pixel(2, 1)?[0], 1.0);
        assert_eq!(out.accumulator.normalizer.pixel(2, 1)?[0], 0.0);
        assert_relative_eq!(out.field.pixel(0, 0)?[0], 5.5, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn confidence_attenuates_history() -> Result<(), FilterError> {
        let (image, flow) = still()?;
        let prev_field = Image::<f32, 1>::from_size_val(size(), 3.0)?;
        let field = Image::<f32, 1>::from_size_val(size(), 0.0)?;
        let confidence = Image::<f32, 1>::from_size_val(size(), 0.5)?;

        let current = Frame::new(&image, &field, &flow);
        let previous = Frame::new(&image, &prev_field, &flow).with_confidence(&confidence);
        let out = filter_t(
            &current,
            &previous,
            &TemporalAccumulator::zeros(size())?,
            &TemporalParams::reference_flow(),
        )?;

        // (0.5 * 3) / (0.5 + 1)
        for &v in out.field.as_slice() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn lambda_discounts_current_value() -> Result<(), FilterError> {
        let (image, flow) = still()?;
        let field = Image::<f32, 1>::from_size_val(size(), 4.0)?;
        let frame = Frame::new(&image, &field, &flow);
        let mut params = TemporalParams::reference_flow();
        params.lambda_t = 0.5;

        let out = filter_t(&frame, &frame, &TemporalAccumulator::zeros(size())?, &params)?;
        // (4 + 0.5 * 4) / 2
        for &v in out.field.as_slice() {
            assert_relative_eq!(v, 3.0, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn undershooting_weights_drop_the_history() -> Result<(), FilterError> {
        // half a pixel to the left of a weight drop the cubic kernel gives
        // 31 * -0.09375 + 0.59375 + 0.59375 - 0.09375 = -1.8125
        let size = ImageSize {
            width: 4,
            height: 1,
        };
        let image = Image::<f32, 1>::from_size_val(size, 0.5)?;
        let flow = Image::<f32, 2>::from_fn(size, |_, _| [-0.5, 0.0]);
        let field = Image::<f32, 1>::from_size_val(size, 2.0)?;
        let accumulator = TemporalAccumulator {
            numerator: Image::new(size, vec![60.0, 0.0, 0.0, 0.0])?,
            normalizer: Image::new(size, vec![30.0, 0.0, 0.0, 0.0])?,
        };

        let frame = Frame::new(&image, &field, &flow);
        let out = filter_t(&frame, &frame, &accumulator, &TemporalParams::reference_flow())?;

        let normalizer = out.accumulator.normalizer.as_slice();
        assert!(normalizer.iter().all(|&n| n >= 0.0), "{normalizer:?}");
        assert_eq!(normalizer[1], 0.0);
        assert_relative_eq!(normalizer[0], 16.0, epsilon = 1e-4);
        // a history consistent with the field keeps it unchanged
        for &v in out.field.as_slice() {
            assert_relative_eq!(v, 2.0, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn size_mismatch_fails_fast() -> Result<(), FilterError> {
        let (image, flow) = still()?;
        let field = Image::<f32, 1>::from_size_val(size(), 0.0)?;
        let frame = Frame::new(&image, &field, &flow);
        let accumulator = TemporalAccumulator::<1>::zeros([2, 2].into())?;
        let res = filter_t(&frame, &frame, &accumulator, &TemporalParams::reference_flow());
        assert!(matches!(res, Err(FilterError::SizeMismatch { .. })));

        let small = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let bad = Frame::new(&image, &small, &flow);
        let res = filter_t(
            &frame,
            &bad,
            &TemporalAccumulator::zeros(size())?,
            &TemporalParams::reference_flow(),
        );
        assert!(matches!(res, Err(FilterError::SizeMismatch { .. })));
        Ok(())
    }
}
