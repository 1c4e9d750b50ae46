use log::{debug, warn};
use permea_image::Image;
use permea_imgproc::{core::pixel_distance, parallel};

use super::distance_to_permeability;
use crate::error::{ensure_size, FilterError};
use crate::params::TemporalParams;
use crate::warp::{backward_sample_map, warp};

/// Compute the temporal permeability between a frame and its predecessor.
///
/// The previous image and flow are motion-compensated with the backward map of
/// `prev_flow`. The result is the product of
///
/// * the photometric permeability of `||I - warp(I_prev)||` with `sqrt(C) * delta_photo`
///   and `alpha_photo`,
/// * the gradient permeability of `||F - warp(F_prev)||` with `sqrt(2) * delta_grad`
///   and `alpha_grad`.
///
/// Pixels whose current or previous flow is unknown get `0`: the temporal filter then
/// keeps the current value only.
///
/// # Arguments
///
/// * `image` - The current image with shape (H, W, C).
/// * `prev_image` - The previous image with shape (H, W, C).
/// * `flow` - The current flow with shape (H, W, 2).
/// * `prev_flow` - The flow from the previous frame to the current one.
/// * `params` - The temporal parameters.
///
/// # Returns
///
/// The permeability map with shape (H, W, 1), every value in `[0, 1]`.
pub fn temporal_permeability<const C: usize>(
    image: &Image<f32, C>,
    prev_image: &Image<f32, C>,
    flow: &Image<f32, 2>,
    prev_flow: &Image<f32, 2>,
    params: &TemporalParams,
) -> Result<Image<f32, 1>, FilterError> {
    params.validate()?;
    ensure_size(image.size(), prev_image.size())?;
    ensure_size(image.size(), flow.size())?;
    ensure_size(image.size(), prev_flow.size())?;

    let (map_x, map_y) = backward_sample_map(prev_flow, &params.unknown_flow)?;
    temporal_permeability_from_map(image, prev_image, flow, prev_flow, &map_x, &map_y, params)
}

/// [`temporal_permeability`] with a precomputed backward map; sizes are already checked.
pub(crate) fn temporal_permeability_from_map<const C: usize>(
    image: &Image<f32, C>,
    prev_image: &Image<f32, C>,
    flow: &Image<f32, 2>,
    prev_flow: &Image<f32, 2>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    params: &TemporalParams,
) -> Result<Image<f32, 1>, FilterError> {
    let size = image.size();
    let strategy = params.strategy;
    let unknown = &params.unknown_flow;

    debug!(
        "temporal permeability on {} with delta_photo {} delta_grad {}",
        size, params.delta_photo, params.delta_grad
    );

    // photometric consistency
    let prev_image_warped = warp(prev_image, map_x, map_y, params.interpolation, strategy)?;
    let mut perm_photo = Image::<f32, 1>::from_size_val(size, 0.0)?;
    pixel_distance(image, &prev_image_warped, &mut perm_photo, strategy)?;
    distance_to_permeability(
        &mut perm_photo,
        (C as f32).sqrt() * params.delta_photo,
        params.alpha_photo,
        strategy,
    )?;

    // flow consistency, the sentinel must not leak into the cubic neighbourhoods
    let mut prev_flow_known = prev_flow.clone();
    let unknown_prev = unknown.mask_to_zero(&mut prev_flow_known);
    let mut flow_known = flow.clone();
    let unknown_curr = unknown.mask_to_zero(&mut flow_known);
    if unknown_prev + unknown_curr > 0 {
        warn!(
            "{} current and {} previous flow vectors are unknown, their temporal coupling is cut",
            unknown_curr, unknown_prev
        );
    }

    let prev_flow_warped = warp(&prev_flow_known, map_x, map_y, params.interpolation, strategy)?;
    let mut perm_grad = Image::<f32, 1>::from_size_val(size, 0.0)?;
    pixel_distance(&flow_known, &prev_flow_warped, &mut perm_grad, strategy)?;
    distance_to_permeability(
        &mut perm_grad,
        std::f32::consts::SQRT_2 * params.delta_grad,
        params.alpha_grad,
        strategy,
    )?;

    let cols = size.width;
    let (grad, curr, prev) = (perm_grad.as_slice(), flow.as_slice(), prev_flow.as_slice());
    let mut perm = perm_photo;
    parallel::for_each_row_mut(strategy, perm.as_slice_mut(), cols, |r, row| {
        for (x, p) in row.iter_mut().enumerate() {
            let i = r * cols + x;
            let known = !unknown.is_unknown(&curr[i * 2..i * 2 + 2])
                && !unknown.is_unknown(&prev[i * 2..i * 2 + 2]);
            *p = if known { *p * grad[i] } else { 0.0 };
        }
    })?;

    Ok(perm)
}
