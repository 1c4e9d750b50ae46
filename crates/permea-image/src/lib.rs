#![deny(missing_docs)]
//! Dense multi-channel field types for permeability filtering

/// dense field representation for images, flows and scalar maps.
pub mod image;

/// Error types for the image module.
pub mod error;

/// element-wise operations over images.
pub mod ops;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
