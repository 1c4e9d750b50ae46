//! Pixel interpolation methods for motion-compensated resampling.
//!
//! Samples outside the image replicate the nearest border pixel.
//!
//! # Interpolation Modes
//!
//! - **Bilinear**: Smooth linear interpolation between adjacent pixels
//! - **Bicubic**: Cubic convolution over a 4x4 neighbourhood (A = -0.75)

mod bicubic;
mod bilinear;

/// Grid generation and coordinate mapping utilities.
pub mod grid;

pub(crate) mod interpolate;
mod remap;

pub use interpolate::{interpolate_pixel, InterpolationMode};
pub use remap::remap;
