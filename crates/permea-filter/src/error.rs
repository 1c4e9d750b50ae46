use permea_image::{ImageError, ImageSize};
use permea_imgproc::{core::KernelError, parallel::ParallelError};

/// An error type for the filter module.
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    /// Error coming from the image containers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error coming from a pixel kernel.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Error coming from the parallel executor.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// Two inputs that must share a size do not.
    #[error("size mismatch: expected {expected}, found {found}")]
    SizeMismatch {
        /// The reference size.
        expected: ImageSize,
        /// The offending size.
        found: ImageSize,
    },

    /// A parameter is outside of its valid range.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// The parameter file could not be parsed.
    #[error("failed to parse filter parameters: {0}")]
    Config(#[from] serde_json::Error),

    /// The parameter file could not be read.
    #[error("failed to read filter parameters: {0}")]
    Io(#[from] std::io::Error),
}

/// Fail with [`FilterError::SizeMismatch`] unless both sizes are equal.
pub(crate) fn ensure_size(expected: ImageSize, found: ImageSize) -> Result<(), FilterError> {
    if expected != found {
        return Err(FilterError::SizeMismatch { expected, found });
    }
    Ok(())
}
