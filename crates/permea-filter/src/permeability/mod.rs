//! Permeability maps.
//!
//! A permeability is a coupling strength in `[0, 1]` derived from a distance `d`
//! between two values that should agree:
//!
//! $ p = \frac{1}{1 + (d / \delta)^{\alpha}} $
//!
//! A distance of zero gives a fully permeable `1`, large distances tend to `0`.

mod spatial;
mod temporal;

pub use spatial::{spatial_permeability, spatial_permeability_vertical};
pub use temporal::temporal_permeability;
pub(crate) use temporal::temporal_permeability_from_map;

use permea_image::Image;
use permea_imgproc::{core, parallel::ExecutionStrategy};

use crate::error::FilterError;

/// Turn a distance map into a permeability map in place.
///
/// `scale` already includes the `sqrt(channels)` normalization.
pub(crate) fn distance_to_permeability(
    distance: &mut Image<f32, 1>,
    scale: f32,
    alpha: f32,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    core::map_in_place(distance, strategy, |d| {
        debug_assert!(!(d < 0.0), "negative distance {d} fed to a permeability map");
        1.0 / (1.0 + (d / scale).powf(alpha))
    })?;
    Ok(())
}
