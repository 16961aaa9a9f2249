//! Type definitions for the Poincare ball model.

use std::sync::Arc;

use crate::config::BallConfig;
use crate::error::ManifoldResult;

/// Poincare ball model with Mobius gyrovector operations over candle tensors.
///
/// A ball is immutable once built. Layers share one instance through
/// `Arc<PoincareBall>`; two layers use "the same manifold" exactly when their
/// `Arc`s point at the same ball (see [`PoincareBall::same`]).
///
/// # Example
///
/// ```
/// use poincare_manifold::ball::PoincareBall;
/// use poincare_manifold::config::BallConfig;
///
/// let ball = PoincareBall::new(BallConfig::with_curvature(-0.5));
/// assert_eq!(ball.c(), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct PoincareBall {
    pub(crate) config: BallConfig,
}

impl Default for PoincareBall {
    fn default() -> Self {
        Self::new(BallConfig::default())
    }
}

impl PoincareBall {
    /// Create a new Poincare ball with given configuration.
    #[inline]
    pub fn new(config: BallConfig) -> Self {
        Self { config }
    }

    /// Create a ball after validating its configuration.
    pub fn try_new(config: BallConfig) -> ManifoldResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Validated ball of the given (negative) curvature, ready to share.
    pub fn shared(curvature: f64) -> ManifoldResult<Arc<Self>> {
        Ok(Arc::new(Self::try_new(BallConfig::with_curvature(curvature))?))
    }

    /// Get reference to configuration.
    #[inline]
    pub fn config(&self) -> &BallConfig {
        &self.config
    }

    /// `c = |curvature|`.
    #[inline]
    pub fn c(&self) -> f64 {
        self.config.abs_curvature()
    }

    /// `sqrt(c)`.
    #[inline]
    pub fn sqrt_c(&self) -> f64 {
        self.config.scale()
    }

    /// Whether two shared handles refer to the same manifold instance.
    #[inline]
    pub fn same(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }
}
