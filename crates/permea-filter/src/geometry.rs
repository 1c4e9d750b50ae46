use permea_image::{Image, ImageSize};
use serde::{Deserialize, Serialize};

/// Magnitude stored in both channels of a `.flo` field where no motion is known.
pub const MOVEMENT_UNKNOWN: f32 = 1e10;

/// The sentinel marking pixels without a valid flow estimate.
///
/// A flow vector is unknown when any of its components equals `value`.
/// Kernels never compare against the sentinel directly; they go through
/// [`UnknownFlow::displacement`] which yields `None` for such pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnknownFlow {
    /// The reserved component value.
    pub value: f32,
}

impl Default for UnknownFlow {
    fn default() -> Self {
        UnknownFlow {
            value: MOVEMENT_UNKNOWN,
        }
    }
}

impl UnknownFlow {
    /// Whether the pixel holds the sentinel.
    pub fn is_unknown(&self, px: &[f32]) -> bool {
        px.iter().any(|&v| v == self.value)
    }

    /// The displacement of a flow pixel, `None` if unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use permea_filter::geometry::UnknownFlow;
    ///
    /// let unknown = UnknownFlow::default();
    /// assert_eq!(unknown.displacement(&[1.0, -0.5]), Some([1.0, -0.5]));
    /// assert_eq!(unknown.displacement(&[1e10, 1e10]), None);
    /// ```
    pub fn displacement(&self, px: &[f32]) -> Option<[f32; 2]> {
        match px {
            [dx, dy] if !self.is_unknown(px) => Some([*dx, *dy]),
            _ => None,
        }
    }

    /// Replace every unknown pixel by zero and return how many were replaced.
    pub fn mask_to_zero<const C: usize>(&self, field: &mut Image<f32, C>) -> usize {
        let mut masked = 0;
        field.as_slice_mut().chunks_exact_mut(C).for_each(|px| {
            if self.is_unknown(px) {
                px.fill(0.0);
                masked += 1;
            }
        });
        masked
    }
}

/// Transforms a relative flow into an absolute position, checking for margins.
///
/// Returns the `(row, col)` of `(x + dx, y + dy)` rounded to the nearest pixel,
/// or `None` when it falls outside the image.
///
/// # Example
///
/// ```
/// use permea_filter::geometry::absolute_position;
/// use permea_image::ImageSize;
///
/// let size = ImageSize { width: 4, height: 3 };
/// assert_eq!(absolute_position(1, 1, [1.4, 0.6], size), Some((2, 2)));
/// assert_eq!(absolute_position(3, 0, [1.0, 0.0], size), None);
/// ```
pub fn absolute_position(x: usize, y: usize, flow: [f32; 2], size: ImageSize) -> Option<(usize, usize)> {
    let col = (x as f32 + flow[0]).round();
    let row = (y as f32 + flow[1]).round();

    if col >= 0.0 && row >= 0.0 && (col as usize) < size.width && (row as usize) < size.height {
        Some((row as usize, col as usize))
    } else {
        None
    }
}
