#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// forward/backward flow consistency.
pub mod confidence;

/// Error types for the filter module.
pub mod error;

/// flow vector geometry and the unknown-flow sentinel.
pub mod geometry;

/// filter parameters and their JSON loading.
pub mod params;

/// spatial and temporal permeability maps.
pub mod permeability;

/// per-sequence driver owning the temporal state.
pub mod sequence;

/// iterative edge-aware spatial filter.
pub mod spatial;

/// motion-compensated temporal filter.
pub mod temporal;

/// backward warping along a flow field.
pub mod warp;

pub use crate::error::FilterError;
pub use crate::params::{FilterParams, SpatialParams, TemporalParams, UnknownFlowPolicy};
