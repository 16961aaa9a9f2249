//! Configuration types for hyperbolic layers.
//!
//! This module provides configuration structures for:
//! - Mobius batch normalization (BatchNormConfig)
//! - Distance-to-hyperplane features (HyperplaneConfig)
//! - 2D Mobius pooling windows (Pool2dConfig)
//! - Mobius linear maps (LinearConfig)
//! - Hyperbolic graph convolution (GraphConvConfig, Aggregation)

mod batch_norm;
mod graph;
mod hyperplanes;
mod linear;
mod pooling;

pub use self::batch_norm::BatchNormConfig;
pub use self::graph::{Aggregation, GraphConvConfig};
pub use self::hyperplanes::HyperplaneConfig;
pub use self::linear::LinearConfig;
pub use self::pooling::Pool2dConfig;

/// Largest number of trailing spatial axes the rank-generic layers accept.
pub const MAX_SPATIAL_RANK: usize = 3;

#[cfg(test)]
mod tests;
