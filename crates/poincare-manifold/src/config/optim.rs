//! Riemannian SGD configuration.

use serde::{Deserialize, Serialize};

use crate::error::ManifoldError;

/// Riemannian SGD configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SgdConfig {
    /// Step size.
    pub learning_rate: f64,
    /// Momentum coefficient in [0, 1). Zero disables the momentum buffer.
    pub momentum: f64,
    /// Dampening applied to the gradient added into the momentum buffer.
    pub dampening: f64,
    /// Re-project every parameter onto its manifold every N steps.
    pub stabilize_every: Option<usize>,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            momentum: 0.0,
            dampening: 0.0,
            stabilize_every: None,
        }
    }
}

impl SgdConfig {
    /// Config with the given learning rate and no momentum.
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..Default::default()
        }
    }

    /// Validate the optimizer settings (fail fast on the first problem).
    pub fn validate(&self) -> Result<(), ManifoldError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ManifoldError::InvalidConfig(format!(
                "learning_rate must be positive (got {})",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ManifoldError::InvalidConfig(format!(
                "momentum must be in [0, 1) (got {})",
                self.momentum
            )));
        }
        if !(0.0..=1.0).contains(&self.dampening) {
            return Err(ManifoldError::InvalidConfig(format!(
                "dampening must be in [0, 1] (got {})",
                self.dampening
            )));
        }
        if self.stabilize_every == Some(0) {
            return Err(ManifoldError::InvalidConfig(
                "stabilize_every must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
