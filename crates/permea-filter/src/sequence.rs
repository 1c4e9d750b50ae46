use log::{debug, info};
use permea_image::{Image, ImageSize};

use crate::confidence::flow_confidence;
use crate::error::{ensure_size, FilterError};
use crate::params::FilterParams;
use crate::spatial::filter_xy;
use crate::temporal::{filter_t, Frame, TemporalAccumulator};

/// What is kept of the last processed frame.
#[derive(Debug, Clone)]
struct PreviousFrame<const IC: usize, const C: usize> {
    image: Image<f32, IC>,
    field: Image<f32, C>,
    flow: Image<f32, 2>,
    confidence: Option<Image<f32, 1>>,
    accumulator: TemporalAccumulator<C>,
}

/// Runs the spatial and the temporal filter over a sequence of frames.
///
/// The driver owns the state carried between frames: the previous image, flow and
/// spatially filtered field, and the temporal accumulator. The first frame, and the
/// first frame after [`SequenceFilter::reset`], are only filtered spatially.
///
/// # Example
///
/// ```
/// use permea_filter::{sequence::SequenceFilter, FilterParams};
/// use permea_image::{Image, ImageSize};
///
/// let size = ImageSize { width: 8, height: 6 };
/// let image = Image::<f32, 1>::from_size_val(size, 0.5).unwrap();
/// let flow = Image::<f32, 2>::from_fn(size, |_, _| [0.0, 0.0]);
///
/// let mut filter = SequenceFilter::<1, 2>::new(FilterParams::reference_flow()).unwrap();
/// for _ in 0..3 {
///     let filtered = filter.process(&image, &flow, &flow).unwrap();
///     assert_eq!(filtered.size(), size);
/// }
/// assert_eq!(filter.frame_index(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceFilter<const IC: usize, const C: usize> {
    params: FilterParams,
    previous: Option<PreviousFrame<IC, C>>,
    frame_index: usize,
}

impl<const IC: usize, const C: usize> SequenceFilter<IC, C> {
    /// Create a driver with validated parameters.
    pub fn new(params: FilterParams) -> Result<Self, FilterError> {
        params.validate()?;
        Ok(SequenceFilter {
            params,
            previous: None,
            frame_index: 0,
        })
    }

    /// The parameters of both passes.
    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Number of frames processed since creation or the last reset.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// The frame size fixed by the first processed frame, if any.
    pub fn frame_size(&self) -> Option<ImageSize> {
        self.previous.as_ref().map(|p| p.image.size())
    }

    /// The accumulator that the next frame will consume, if any.
    pub fn accumulator(&self) -> Option<&TemporalAccumulator<C>> {
        self.previous.as_ref().map(|p| &p.accumulator)
    }

    /// Drop the temporal state, e.g. at a scene cut.
    pub fn reset(&mut self) {
        info!("sequence filter reset after {} frames", self.frame_index);
        self.previous = None;
        self.frame_index = 0;
    }

    /// Filter the next frame.
    ///
    /// # Arguments
    ///
    /// * `image` - The guide image of the frame.
    /// * `field` - The field to filter, e.g. the flow itself.
    /// * `flow` - The flow from this frame to the next one.
    ///
    /// # Returns
    ///
    /// The spatially and temporally filtered field.
    pub fn process(
        &mut self,
        image: &Image<f32, IC>,
        field: &Image<f32, C>,
        flow: &Image<f32, 2>,
    ) -> Result<Image<f32, C>, FilterError> {
        self.step(image, field, flow, None)
    }

    /// Filter the next frame, weighting its temporal coupling to the following
    /// frame by the forward/backward consistency of `flow` and `backward`.
    pub fn process_with_backward(
        &mut self,
        image: &Image<f32, IC>,
        field: &Image<f32, C>,
        flow: &Image<f32, 2>,
        backward: &Image<f32, 2>,
    ) -> Result<Image<f32, C>, FilterError> {
        let confidence = flow_confidence(
            flow,
            backward,
            &self.params.temporal.unknown_flow,
            self.params.backward_convention,
            self.params.temporal.strategy,
        )?;
        self.step(image, field, flow, Some(confidence))
    }

    fn step(
        &mut self,
        image: &Image<f32, IC>,
        field: &Image<f32, C>,
        flow: &Image<f32, 2>,
        confidence: Option<Image<f32, 1>>,
    ) -> Result<Image<f32, C>, FilterError> {
        let size = image.size();
        ensure_size(size, field.size())?;
        ensure_size(size, flow.size())?;
        if let Some(expected) = self.frame_size() {
            ensure_size(expected, size)?;
        }

        debug!("sequence frame {} of size {}", self.frame_index, size);

        let spatial = filter_xy(image, field.clone(), &self.params.spatial)?;

        let (filtered, accumulator) = match &self.previous {
            Some(prev) => {
                let current = Frame::new(image, &spatial, flow);
                let mut previous = Frame::new(&prev.image, &prev.field, &prev.flow);
                if let Some(c) = &prev.confidence {
                    previous = previous.with_confidence(c);
                }
                let out = filter_t(&current, &previous, &prev.accumulator, &self.params.temporal)?;
                (out.field, out.accumulator)
            }
            None => (spatial.clone(), TemporalAccumulator::zeros(size)?),
        };

        self.previous = Some(PreviousFrame {
            image: image.clone(),
            field: spatial,
            flow: flow.clone(),
            confidence,
            accumulator,
        });
        self.frame_index += 1;

        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn size() -> ImageSize {
        ImageSize {
            width: 6,
            height: 5,
        }
    }

    #[test]
    fn first_frame_is_spatial_only() -> Result<(), FilterError> {
        let image = Image::<f32, 1>::from_fn(size(), |x, _| [if x < 3 { 0.0 } else { 1.0 }]);
        let flow = Image::<f32, 2>::from_fn(size(), |x, y| [(x % 2) as f32, (y % 3) as f32]);
        let params = FilterParams::reference_flow();

        let mut filter = SequenceFilter::<1, 2>::new(params)?;
        let out = filter.process(&image, &flow, &flow)?;
        let expected = filter_xy(&image, flow.clone(), &params.spatial)?;
        assert_eq!(out, expected);
        assert_eq!(filter.frame_index(), 1);
        assert_eq!(filter.frame_size(), Some(size()));
        Ok(())
    }

    #[test]
    fn static_sequence_is_stable() -> Result<(), FilterError> {
        let image = Image::<f32, 1>::from_fn(size(), |x, y| [((x + y) % 2) as f32 * 0.01]);
        let field = Image::<f32, 1>::from_size_val(size(), 2.0)?;
        let flow = Image::<f32, 2>::from_size_val(size(), 0.0)?;

        let mut filter = SequenceFilter::<1, 1>::new(FilterParams::reference_flow())?;
        for i in 0..4 {
            let out = filter.process(&image, &field, &flow)?;
            for &v in out.as_slice() {
                assert_relative_eq!(v, 2.0, epsilon = 1e-4);
            }
            let accumulator = filter.accumulator().map(|a| a.normalizer.as_slice()[0]);
            assert_relative_eq!(accumulator.unwrap_or(-1.0), i as f32, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn reset_drops_history() -> Result<(), FilterError> {
        let image = Image::<f32, 1>::from_size_val(size(), 0.5)?;
        let flow = Image::<f32, 2>::from_size_val(size(), 0.0)?;
        let first = Image::<f32, 1>::from_size_val(size(), 10.0)?;
        let second = Image::<f32, 1>::from_size_val(size(), 0.0)?;

        let mut filter = SequenceFilter::<1, 1>::new(FilterParams::reference_flow())?;
        filter.process(&image, &first, &flow)?;
        let blended = filter.process(&image, &second, &flow)?;
        assert_relative_eq!(blended.as_slice()[0], 5.0, epsilon = 1e-4);

        filter.reset();
        assert_eq!(filter.frame_index(), 0);
        assert!(filter.accumulator().is_none());
        filter.process(&image, &first, &flow)?;
        let out = filter.process(&image, &first, &flow)?;
        assert_relative_eq!(out.as_slice()[0], 10.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn backward_confidence_is_used() -> Result<(), FilterError> {
        let image = Image::<f32, 1>::from_size_val(size(), 0.5)?;
        let flow = Image::<f32, 2>::from_size_val(size(), 0.0)?;
        let mut backward = flow.clone();
        backward.set_pixel(1, 1, [3.0, 4.0])?;
        let first = Image::<f32, 1>::from_size_val(size(), 10.0)?;
        let second = Image::<f32, 1>::from_size_val(size(), 0.0)?;

        let mut filter = SequenceFilter::<1, 1>::new(FilterParams::reference_flow())?;
        filter.process_with_backward(&image, &first, &flow, &backward)?;
        let out = filter.process(&image, &second, &flow)?;

        // the inconsistent pixel has confidence 0 and keeps the current value
        assert_eq!(out.pixel(1, 1)?[0], 0.0);
        assert_relative_eq!(out.pixel(4, 3)?[0], 5.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn frame_size_is_fixed() -> Result<(), FilterError> {
        let image = Image::<f32, 1>::from_size_val(size(), 0.5)?;
        let field = Image::<f32, 1>::from_size_val(size(), 0.0)?;
        let flow = Image::<f32, 2>::from_size_val(size(), 0.0)?;
        let mut filter = SequenceFilter::<1, 1>::new(FilterParams::reference_flow())?;
        filter.process(&image, &field, &flow)?;

        let other: ImageSize = [3, 3].into();
        let res = filter.process(
            &Image::from_size_val(other, 0.5)?,
            &Image::from_size_val(other, 0.0)?,
            &Image::from_size_val(other, 0.0)?,
        );
        assert!(matches!(res, Err(FilterError::SizeMismatch { .. })));
        assert_eq!(filter.frame_index(), 1);
        Ok(())
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut params = FilterParams::reference_flow();
        params.temporal.delta_grad = -1.0;
        assert!(SequenceFilter::<1, 2>::new(params).is_err());
    }
}
