//! Forward/backward flow consistency.
//!
//! The distance between the forward flow at a pixel and the backward flow at the
//! pixel it points to measures how trustworthy the forward estimate is:
//!
//! $ D(x, y) = \| F(x, y) \pm B(x + F_x, y + F_y) \| $
//!
//! and the normalized confidence is $ C = 1 - D / \max D $.

use log::debug;
use permea_image::Image;
use permea_imgproc::parallel::{self, ExecutionStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_size, FilterError};
use crate::geometry::{absolute_position, UnknownFlow};

/// Sign convention of the backward flow field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackwardConvention {
    /// The backward flow points from frame t+1 back to frame t, so a consistent
    /// pair satisfies `B = -F` and the distance is `||F + B||`.
    #[default]
    Opposing,
    /// The backward flow is stored with the forward sign, so a consistent pair
    /// satisfies `B = F` and the distance is `||F - B||`.
    Aligned,
}

impl BackwardConvention {
    fn distance(&self, forward: [f32; 2], backward: [f32; 2]) -> f32 {
        let sign = match self {
            BackwardConvention::Opposing => 1.0,
            BackwardConvention::Aligned => -1.0,
        };
        let dx = forward[0] + sign * backward[0];
        let dy = forward[1] + sign * backward[1];
        (dx * dx + dy * dy).sqrt()
    }
}

/// Compute the normalized confidence map between a forward and a backward flow.
///
/// Pixels with an unknown forward flow, a target outside the image, or an unknown
/// backward flow at the target get confidence 0. When every valid distance is equal
/// (in particular when both flows agree everywhere) every valid pixel gets 1.
/// Otherwise `C = (max - D) / max`, so the least consistent pixel gets exactly 0.
///
/// # Arguments
///
/// * `forward` - The flow from frame t to frame t+1.
/// * `backward` - The flow from frame t+1 to frame t.
/// * `unknown` - The unknown-flow sentinel.
/// * `convention` - The sign convention of `backward`.
/// * `strategy` - How rows are scheduled.
///
/// # Example
///
/// ```
/// use permea_filter::confidence::{flow_confidence, BackwardConvention};
/// use permea_filter::geometry::UnknownFlow;
/// use permea_image::{Image, ImageSize};
/// use permea_imgproc::parallel::ExecutionStrategy;
///
/// let size = ImageSize { width: 3, height: 2 };
/// let forward = Image::<f32, 2>::from_size_val(size, 0.0).unwrap();
/// let backward = forward.clone();
///
/// let confidence = flow_confidence(
///     &forward,
///     &backward,
///     &UnknownFlow::default(),
///     BackwardConvention::Opposing,
///     ExecutionStrategy::Serial,
/// ).unwrap();
///
/// assert_eq!(confidence.as_slice(), &[1.0; 6]);
/// ```
pub fn flow_confidence(
    forward: &Image<f32, 2>,
    backward: &Image<f32, 2>,
    unknown: &UnknownFlow,
    convention: BackwardConvention,
    strategy: ExecutionStrategy,
) -> Result<Image<f32, 1>, FilterError> {
    ensure_size(forward.size(), backward.size())?;

    let size = forward.size();
    let cols = size.width;
    let (fwd, bwd) = (forward.as_slice(), backward.as_slice());

    // negative distances mark pixels without a valid forward/backward pair
    let mut distances = Image::<f32, 1>::from_size_val(size, -1.0)?;

    parallel::for_each_row_mut(strategy, distances.as_slice_mut(), cols, |y, row| {
        for (x, d) in row.iter_mut().enumerate() {
            let base = (y * cols + x) * 2;
            let Some(f) = unknown.displacement(&fwd[base..base + 2]) else {
                continue;
            };
            let Some((ty, tx)) = absolute_position(x, y, f, size) else {
                continue;
            };
            let target = (ty * cols + tx) * 2;
            if let Some(b) = unknown.displacement(&bwd[target..target + 2]) {
                *d = convention.distance(f, b);
            }
        }
    })?;

    // parallel map-reduce of the valid range, no shared state between rows
    let row_range = |_: usize, row: &[f32]| {
        row.iter()
            .filter(|&&d| d >= 0.0)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| {
                (lo.min(d), hi.max(d))
            })
    };
    let merge = |a: (f32, f32), b: (f32, f32)| (a.0.min(b.0), a.1.max(b.1));
    let (min_distance, max_distance) = parallel::map_reduce_rows(
        strategy,
        distances.as_slice(),
        cols,
        (f32::INFINITY, f32::NEG_INFINITY),
        row_range,
        merge,
    )?;

    debug!(
        "flow confidence on {}: distance range [{}, {}]",
        size, min_distance, max_distance
    );

    let uniform = max_distance <= min_distance;

    parallel::for_each_row_mut(strategy, distances.as_slice_mut(), cols, |_, row| {
        for d in row.iter_mut() {
            *d = if *d < 0.0 {
                0.0
            } else if uniform {
                1.0
            } else {
                (max_distance - *d) / max_distance
            };
        }
    })?;

    Ok(distances)
}
