//! Poincare ball configuration.

use serde::{Deserialize, Serialize};

use crate::error::ManifoldError;

/// Poincare ball configuration.
///
/// Parameterizes the open ball `{x : c||x||^2 < 1}` with `c = |curvature|`
/// and the numeric guards every ball operation applies.
///
/// # Mathematics
/// - Radius of the ball: `1 / sqrt(c)`
/// - Points are kept strictly inside, at most `max_norm() = (1 - boundary_eps) / sqrt(c)`
///
/// # Example
/// ```
/// use poincare_manifold::config::BallConfig;
///
/// let config = BallConfig::default();
/// assert_eq!(config.curvature, -1.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BallConfig {
    /// Curvature of hyperbolic space. MUST be negative.
    /// Default: -1.0
    pub curvature: f64,

    /// Lower clamp applied to norms and denominators.
    /// Default: 1e-15
    pub min_norm: f64,

    /// Relative distance kept from the boundary when projecting points.
    /// Default: 4e-3, which keeps f32 artanh finite.
    pub boundary_eps: f64,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            curvature: -1.0,
            min_norm: 1e-15,
            boundary_eps: 4e-3,
        }
    }
}

impl BallConfig {
    /// Create config with custom curvature.
    ///
    /// # Example
    /// ```
    /// use poincare_manifold::config::BallConfig;
    /// let config = BallConfig::with_curvature(-0.5);
    /// assert_eq!(config.curvature, -0.5);
    /// ```
    pub fn with_curvature(curvature: f64) -> Self {
        Self {
            curvature,
            ..Default::default()
        }
    }

    /// Create a validated config with custom curvature.
    ///
    /// # Example
    /// ```
    /// use poincare_manifold::config::BallConfig;
    ///
    /// assert!(BallConfig::try_with_curvature(-2.0).is_ok());
    /// assert!(BallConfig::try_with_curvature(1.0).is_err());
    /// ```
    pub fn try_with_curvature(curvature: f64) -> Result<Self, ManifoldError> {
        let config = Self::with_curvature(curvature);
        config.validate()?;
        Ok(config)
    }

    /// Absolute value of the curvature, the `c` of the Mobius formulas.
    #[inline]
    pub fn abs_curvature(&self) -> f64 {
        self.curvature.abs()
    }

    /// Scale factor `sqrt(c)`.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.abs_curvature().sqrt()
    }

    /// Ball radius `1 / sqrt(c)`.
    #[inline]
    pub fn radius(&self) -> f64 {
        1.0 / self.scale()
    }

    /// Largest norm a projected point may have.
    #[inline]
    pub fn max_norm(&self) -> f64 {
        (1.0 - self.boundary_eps) / self.scale()
    }

    /// Validate that all parameters are usable for the Poincare ball model.
    ///
    /// # Validation Rules
    /// - `curvature` finite and < 0
    /// - `min_norm` finite and > 0
    /// - `boundary_eps` in the open interval (0, 1)
    ///
    /// # Errors
    /// Returns the FIRST error encountered.
    pub fn validate(&self) -> Result<(), ManifoldError> {
        if !self.curvature.is_finite() || self.curvature >= 0.0 {
            return Err(ManifoldError::InvalidCurvature(self.curvature));
        }

        if !self.min_norm.is_finite() || self.min_norm <= 0.0 {
            return Err(ManifoldError::InvalidConfig(format!(
                "min_norm must be positive (got {})",
                self.min_norm
            )));
        }

        if !(self.boundary_eps > 0.0 && self.boundary_eps < 1.0) {
            return Err(ManifoldError::InvalidConfig(format!(
                "boundary_eps must be in open interval (0, 1), got {}",
                self.boundary_eps
            )));
        }

        Ok(())
    }
}
