#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// per-pixel distances between fields.
pub mod core;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallization utilities.
pub mod parallel;
