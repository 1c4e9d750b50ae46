//! Iterative edge-aware spatial filter.
//!
//! Each iteration runs a horizontal pass over every row followed by a vertical
//! pass over every column. A pass accumulates, from both sides, the values of the
//! line attenuated by the permeability crossed on the way:
//!
//! ```text
//! lp(x) = perm(x-1) * (lp(x-1) + J(x-1))      lpN(x) = perm(x-1) * (lpN(x-1) + 1)
//! rp(x) = perm(x)   * (rp(x+1) + J(x+1))      rpN(x) = perm(x)   * (rpN(x+1) + 1)
//! J'(x) = (lp(x) + (1 - lambda) * J(x) + rp(x)) / (lpN(x) + 1 + rpN(x))
//! ```
//!
//! with `lp(0) = lpN(0) = rp(W-1) = rpN(W-1) = 0`. The denominator is always at
//! least one.
//!
//! The right-to-left accumulation runs together with the combination, so
//! `rp(x)` reads the already combined `J'(x+1)`, except for `rp(W-2)` which reads
//! the value of the last pixel from before the pass.

use log::{debug, trace, warn};
use permea_image::Image;
use permea_imgproc::parallel::{self, ExecutionStrategy};

use crate::error::{ensure_size, FilterError};
use crate::params::{SpatialParams, UnknownFlowPolicy};
use crate::permeability::spatial_permeability;

/// Filter a field with the spatial permeability of a guide image.
///
/// The field is consumed and the filtered field returned. With `iterations = 0`
/// the field is returned untouched.
///
/// # Arguments
///
/// * `image` - The guide image with shape (H, W, IC).
/// * `field` - The field to filter with shape (H, W, C), e.g. a flow field.
/// * `params` - The spatial parameters.
///
/// # Errors
///
/// If the image and the field differ in size or a parameter is out of range.
///
/// # Example
///
/// ```
/// use permea_filter::{spatial::filter_xy, SpatialParams};
/// use permea_image::{Image, ImageSize};
///
/// let size = ImageSize { width: 4, height: 4 };
/// let image = Image::<f32, 1>::from_size_val(size, 0.5).unwrap();
/// let flow = Image::<f32, 2>::from_fn(size, |_, _| [1.0, 0.0]);
///
/// let filtered = filter_xy(&image, flow.clone(), &SpatialParams::reference_flow()).unwrap();
/// assert_eq!(filtered, flow);
/// ```
pub fn filter_xy<const IC: usize, const C: usize>(
    image: &Image<f32, IC>,
    mut field: Image<f32, C>,
    params: &SpatialParams,
) -> Result<Image<f32, C>, FilterError> {
    ensure_size(image.size(), field.size())?;
    params.validate()?;

    if params.iterations == 0 {
        return Ok(field);
    }

    debug!(
        "spatial filter on {} with {} iterations, lambda {} delta {} alpha {}",
        field.size(),
        params.iterations,
        params.lambda_xy,
        params.delta_xy,
        params.alpha_xy
    );

    if params.unknown_policy == UnknownFlowPolicy::MaskToZero {
        let masked = params.unknown_flow.mask_to_zero(&mut field);
        if masked > 0 {
            warn!("masked {} unknown vectors to zero before spatial filtering", masked);
        }
    }

    let strategy = params.strategy;
    let perm_horizontal = spatial_permeability(image, params.delta_xy, params.alpha_xy, strategy)?;
    // kept transposed, the vertical pass runs on the rows of the transposed field
    let perm_vertical_t =
        spatial_permeability(&image.transpose(), params.delta_xy, params.alpha_xy, strategy)?;

    for i in 0..params.iterations {
        diffuse_rows(&mut field, &perm_horizontal, params.lambda_xy, strategy)?;

        let mut field_t = field.transpose();
        diffuse_rows(&mut field_t, &perm_vertical_t, params.lambda_xy, strategy)?;
        field = field_t.transpose();

        trace!("spatial iteration {} done", i + 1);
    }

    Ok(field)
}

/// Run the two-sided recurrence on every row of `field`.
fn diffuse_rows<const C: usize>(
    field: &mut Image<f32, C>,
    perm: &Image<f32, 1>,
    lambda: f32,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    ensure_size(field.size(), perm.size())?;

    let cols = field.cols();
    let perm = perm.as_slice();
    parallel::for_each_row_mut(strategy, field.as_slice_mut(), cols * C, |r, row| {
        diffuse_line::<C>(row, &perm[r * cols..(r + 1) * cols], lambda);
    })?;

    Ok(())
}

/// The two-sided recurrence on one line of `perm.len()` pixels.
///
/// The left accumulation reads the line as it was before the pass, the right one
/// reads the combined values except for the last pixel. Lines shorter than two
/// pixels have no neighbours and are left untouched.
fn diffuse_line<const C: usize>(line: &mut [f32], perm: &[f32], lambda: f32) {
    let n = perm.len();
    if n < 2 {
        return;
    }

    // left to right
    let mut lp = vec![0.0f32; n * C];
    let mut lp_normal = vec![0.0f32; n];
    for x in 1..n {
        let p = perm[x - 1];
        lp_normal[x] = p * (lp_normal[x - 1] + 1.0);
        for c in 0..C {
            lp[x * C + c] = p * (lp[(x - 1) * C + c] + line[(x - 1) * C + c]);
        }
    }

    // right to left, combined on the fly
    let mut rp = [0.0f32; C];
    let mut rp_normal = 0.0f32;
    let mut next = [0.0f32; C];
    for x in (0..n).rev() {
        if x + 1 < n {
            let p = perm[x];
            rp_normal = p * (rp_normal + 1.0);
            for c in 0..C {
                rp[c] = p * (rp[c] + next[c]);
            }
        }

        let normal = lp_normal[x] + 1.0 + rp_normal;
        for c in 0..C {
            let value = line[x * C + c];
            let combined = (lp[x * C + c] + (1.0 - lambda) * value + rp[c]) / normal;
            next[c] = if x + 1 == n { value } else { combined };
            line[x * C + c] = combined;
        }
    }
}
