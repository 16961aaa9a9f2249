//! Distance-to-hyperplane feature configuration.

use serde::{Deserialize, Serialize};

use super::MAX_SPATIAL_RANK;
use crate::error::LayerError;

/// Configuration of a [`Distance2PoincareHyperplanes`](crate::Distance2PoincareHyperplanes) layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HyperplaneConfig {
    /// Keep the side of the hyperplane as the sign of the distance.
    /// Default: true
    pub signed: bool,

    /// Square the distance (signed-square when `signed`).
    /// Default: false
    pub squared: bool,

    /// Multiply distances by the norm of the hyperplane normal.
    /// Default: false
    pub scaled: bool,

    /// Prepend a distance-to-origin channel in place of one learned plane.
    /// Default: false
    pub zero: bool,

    /// Spread of the initial hyperplane offsets.
    /// Default: 1.0
    pub std: f64,

    /// Number of trailing spatial axes after the feature axis.
    /// Default: 0
    pub n: usize,
}

impl Default for HyperplaneConfig {
    fn default() -> Self {
        Self {
            signed: true,
            squared: false,
            scaled: false,
            zero: false,
            std: 1.0,
            n: 0,
        }
    }
}

impl HyperplaneConfig {
    /// Default config for inputs with `n` trailing spatial axes.
    pub fn with_spatial_rank(n: usize) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    /// Validate the configuration (fails on the first problem).
    pub fn validate(&self) -> Result<(), LayerError> {
        if !self.std.is_finite() || self.std <= 0.0 {
            return Err(LayerError::InvalidConfig(format!(
                "std must be positive, got {}",
                self.std
            )));
        }
        if self.n > MAX_SPATIAL_RANK {
            return Err(LayerError::InvalidConfig(format!(
                "spatial rank must be at most {MAX_SPATIAL_RANK}, got {}",
                self.n
            )));
        }
        Ok(())
    }
}
