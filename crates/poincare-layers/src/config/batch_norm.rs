//! Mobius batch normalization configuration.

use serde::{Deserialize, Serialize};

use super::MAX_SPATIAL_RANK;
use crate::error::LayerError;

/// Mobius batch normalization configuration.
///
/// # Example
/// ```
/// use poincare_layers::config::BatchNormConfig;
///
/// let config = BatchNormConfig::with_spatial_rank(2);
/// assert_eq!(config.beta1, 0.1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchNormConfig {
    /// Smoothing factor of the running variance.
    /// Default: 0.1
    pub beta1: f64,

    /// Geodesic step toward the batch midpoint for the running midpoint.
    /// Default: 0.1
    pub beta2: f64,

    /// Added to the variance before the square root.
    /// Default: 1e-4
    pub epsilon: f64,

    /// Learn per-channel `alpha` and `bias`.
    /// Default: true
    pub affine: bool,

    /// Number of trailing spatial axes after the feature axis.
    /// Default: 0
    pub n: usize,
}

impl Default for BatchNormConfig {
    fn default() -> Self {
        Self {
            beta1: 0.1,
            beta2: 0.1,
            epsilon: 1e-4,
            affine: true,
            n: 0,
        }
    }
}

impl BatchNormConfig {
    /// Default config for inputs with `n` trailing spatial axes.
    pub fn with_spatial_rank(n: usize) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// - `beta1`, `beta2` in [0, 1]
    /// - `epsilon` finite and > 0
    /// - `n` <= 3
    ///
    /// # Errors
    /// Returns the FIRST error encountered.
    pub fn validate(&self) -> Result<(), LayerError> {
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..=1.0).contains(&beta) {
                return Err(LayerError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {beta}"
                )));
            }
        }

        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(LayerError::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                self.epsilon
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
