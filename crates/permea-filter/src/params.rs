use std::path::Path;

use permea_imgproc::{interpolation::InterpolationMode, parallel::ExecutionStrategy};
use serde::{Deserialize, Serialize};

use crate::confidence::BackwardConvention;
use crate::error::FilterError;
use crate::geometry::UnknownFlow;

/// What the spatial filter does with pixels holding the unknown-flow sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFlowPolicy {
    /// Replace unknown vectors by zero before filtering.
    #[default]
    MaskToZero,
    /// Leave the sentinel in the field; it takes part in the weighted averages.
    Propagate,
}

/// Parameters of the spatial filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialParams {
    /// Number of horizontal + vertical rounds.
    pub iterations: usize,
    /// Weight removed from the pixel's own value in the average, in `[0, 1]`.
    pub lambda_xy: f32,
    /// Gradient scale; smaller values make edges block more.
    pub delta_xy: f32,
    /// Exponent shaping the edge response.
    pub alpha_xy: f32,
    /// Handling of unknown flow vectors in the filtered field.
    #[serde(default)]
    pub unknown_policy: UnknownFlowPolicy,
    /// The unknown-flow sentinel.
    #[serde(default)]
    pub unknown_flow: UnknownFlow,
    /// How rows and columns are scheduled.
    #[serde(default)]
    pub strategy: ExecutionStrategy,
}

impl SpatialParams {
    /// The settings used for optical-flow post-processing on images in `[0, 1]`:
    /// 5 iterations, `lambda_xy = 0`, `delta_xy = 0.017`, `alpha_xy = 2`.
    pub fn reference_flow() -> Self {
        SpatialParams {
            iterations: 5,
            lambda_xy: 0.0,
            delta_xy: 0.017,
            alpha_xy: 2.0,
            unknown_policy: UnknownFlowPolicy::MaskToZero,
            unknown_flow: UnknownFlow::default(),
            strategy: ExecutionStrategy::Parallel,
        }
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), FilterError> {
        check_unit("lambda_xy", self.lambda_xy)?;
        check_positive("delta_xy", self.delta_xy)?;
        check_positive("alpha_xy", self.alpha_xy)?;
        self.strategy.validate()?;
        Ok(())
    }
}

/// Parameters of the temporal filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalParams {
    /// Weight removed from the current value in the blend, in `[0, 1]`.
    pub lambda_t: f32,
    /// Photometric difference scale.
    pub delta_photo: f32,
    /// Flow difference scale.
    pub delta_grad: f32,
    /// Exponent of the photometric response.
    pub alpha_photo: f32,
    /// Exponent of the flow difference response.
    pub alpha_grad: f32,
    /// Resampling used for motion compensation.
    #[serde(default = "default_interpolation")]
    pub interpolation: InterpolationMode,
    /// The unknown-flow sentinel.
    #[serde(default)]
    pub unknown_flow: UnknownFlow,
    /// How rows are scheduled.
    #[serde(default)]
    pub strategy: ExecutionStrategy,
}

fn default_interpolation() -> InterpolationMode {
    InterpolationMode::Bicubic
}

impl TemporalParams {
    /// The settings used for optical-flow post-processing on images in `[0, 1]`:
    /// `lambda_t = 0`, `delta_photo = 0.3`, `delta_grad = 1`, both exponents 2, bicubic warping.
    pub fn reference_flow() -> Self {
        TemporalParams {
            lambda_t: 0.0,
            delta_photo: 0.3,
            delta_grad: 1.0,
            alpha_photo: 2.0,
            alpha_grad: 2.0,
            interpolation: InterpolationMode::Bicubic,
            unknown_flow: UnknownFlow::default(),
            strategy: ExecutionStrategy::Parallel,
        }
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), FilterError> {
        check_unit("lambda_t", self.lambda_t)?;
        check_positive("delta_photo", self.delta_photo)?;
        check_positive("delta_grad", self.delta_grad)?;
        check_positive("alpha_photo", self.alpha_photo)?;
        check_positive("alpha_grad", self.alpha_grad)?;
        self.strategy.validate()?;
        Ok(())
    }
}

/// Parameters of the full spatio-temporal pipeline.
///
/// # Example
///
/// ```
/// use permea_filter::FilterParams;
///
/// let params = FilterParams::from_json_str(r#"{
///     "spatial": { "iterations": 3, "lambda_xy": 0.0, "delta_xy": 0.02, "alpha_xy": 2.0 },
///     "temporal": {
///         "lambda_t": 0.0, "delta_photo": 0.3, "delta_grad": 1.0,
///         "alpha_photo": 2.0, "alpha_grad": 2.0
///     }
/// }"#).unwrap();
///
/// assert_eq!(params.spatial.iterations, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Spatial filter settings.
    pub spatial: SpatialParams,
    /// Temporal filter settings.
    pub temporal: TemporalParams,
    /// Sign convention of the backward flow used for confidence maps.
    #[serde(default)]
    pub backward_convention: BackwardConvention,
}

impl FilterParams {
    /// The reference settings of both passes.
    pub fn reference_flow() -> Self {
        FilterParams {
            spatial: SpatialParams::reference_flow(),
            temporal: TemporalParams::reference_flow(),
            backward_convention: BackwardConvention::Opposing,
        }
    }

    /// Parse and validate parameters from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, FilterError> {
        let params: FilterParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse and validate parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize the parameters to pretty JSON.
    pub fn to_json_string(&self) -> Result<String, FilterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check both parameter sets.
    pub fn validate(&self) -> Result<(), FilterError> {
        self.spatial.validate()?;
        self.temporal.validate()
    }
}

pub(crate) fn check_positive(name: &'static str, value: f32) -> Result<(), FilterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidParameter { name, value })
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), FilterError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FilterError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_valid() -> Result<(), FilterError> {
        FilterParams::reference_flow().validate()
    }

    #[test]
    fn rejects_bad_ranges() {
        let mut spatial = SpatialParams::reference_flow();
        spatial.delta_xy = 0.0;
        assert!(matches!(
            spatial.validate(),
            Err(FilterError::InvalidParameter {
                name: "delta_xy",
                ..
            })
        ));

        let mut temporal = TemporalParams::reference_flow();
        temporal.lambda_t = 1.5;
        assert!(matches!(
            temporal.validate(),
            Err(FilterError::InvalidParameter {
                name: "lambda_t",
                ..
            })
        ));

        temporal.lambda_t = f32::NAN;
        assert!(temporal.validate().is_err());

        let mut spatial = SpatialParams::reference_flow();
        spatial.strategy = ExecutionStrategy::Fixed(0);
        assert!(matches!(spatial.validate(), Err(FilterError::Parallel(_))));
    }

    #[test]
    fn json_roundtrip_through_file() -> Result<(), FilterError> {
        let mut params = FilterParams::reference_flow();
        params.spatial.unknown_policy = UnknownFlowPolicy::Propagate;
        params.temporal.strategy = ExecutionStrategy::Fixed(2);

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.json");
        std::fs::write(&path, params.to_json_string()?)?;

        assert_eq!(FilterParams::from_json_file(&path)?, params);
        Ok(())
    }

    #[test]
    fn json_defaults_and_errors() -> Result<(), FilterError> {
        let params = FilterParams::from_json_str(
            r#"{
                "spatial": { "iterations": 1, "lambda_xy": 0.0, "delta_xy": 0.1, "alpha_xy": 1.0 },
                "temporal": { "lambda_t": 0.0, "delta_photo": 0.3, "delta_grad": 1.0,
                              "alpha_photo": 2.0, "alpha_grad": 2.0, "interpolation": "bilinear" }
            }"#,
        )?;
        assert_eq!(params.spatial.unknown_policy, UnknownFlowPolicy::MaskToZero);
        assert_eq!(params.spatial.unknown_flow, UnknownFlow::default());
        assert_eq!(params.temporal.interpolation, InterpolationMode::Bilinear);
        assert_eq!(params.backward_convention, BackwardConvention::Opposing);

        assert!(matches!(
            FilterParams::from_json_str("{ \"spatial\": 3 }"),
            Err(FilterError::Config(_))
        ));
        assert!(matches!(
            FilterParams::from_json_str(
                r#"{
                    "spatial": { "iterations": 1, "lambda_xy": 0.0, "delta_xy": -1.0, "alpha_xy": 1.0 },
                    "temporal": { "lambda_t": 0.0, "delta_photo": 0.3, "delta_grad": 1.0,
                                  "alpha_photo": 2.0, "alpha_grad": 2.0 }
                }"#
            ),
            Err(FilterError::InvalidParameter { .. })
        ));
        Ok(())
    }
}
