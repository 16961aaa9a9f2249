//! Mobius batch normalization layer.
//!
//! Owns the running statistics and the optional channel affine parameters and
//! forwards to [`mobius_batch_norm_nd`]. The number of spatial axes comes from
//! [`BatchNormConfig::n`].

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use poincare_manifold::{ManifoldParameter, PoincareBall};
use tracing::debug;

use crate::config::BatchNormConfig;
use crate::error::LayerResult;
use crate::functional::{mobius_batch_norm_nd, RunningStatistics};

/// Batch normalization of points on a Poincare ball.
#[derive(Debug)]
pub struct MobiusBatchNorm {
    config: BatchNormConfig,
    ball: Arc<PoincareBall>,
    stats: RunningStatistics,
    /// Per-channel rescaling, shape of the running variance.
    alpha: Option<ManifoldParameter>,
    /// Per-channel recentring point, shape of the running midpoint.
    bias: Option<ManifoldParameter>,
    training: bool,
}

impl MobiusBatchNorm {
    /// Create a layer for `channel_shape` channels of `dim`-dimensional points.
    ///
    /// Starts in training mode with origin midpoints, unit variances, unit
    /// `alpha` and bias at the origin.
    pub fn new(
        channel_shape: &[usize],
        dim: usize,
        ball: Arc<PoincareBall>,
        config: BatchNormConfig,
        dtype: DType,
        device: &Device,
    ) -> LayerResult<Self> {
        config.validate()?;
        let stats = RunningStatistics::new(channel_shape, dim, dtype, device)?;
        let (alpha, bias) = if config.affine {
            (
                Some(ManifoldParameter::euclidean(&stats.variance().ones_like()?)?),
                Some(ManifoldParameter::ball(
                    &stats.midpoint().zeros_like()?,
                    Arc::clone(&ball),
                )?),
            )
        } else {
            (None, None)
        };
        debug!(
            channels = ?channel_shape,
            dim,
            n = config.n,
            affine = config.affine,
            "mobius batch norm created"
        );
        Ok(Self {
            config,
            ball,
            stats,
            alpha,
            bias,
            training: true,
        })
    }

    /// Normalize `input`. In training mode this also updates the running
    /// statistics.
    pub fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        mobius_batch_norm_nd(
            input,
            &mut self.stats,
            self.alpha.as_ref().map(ManifoldParameter::as_tensor),
            self.bias.as_ref().map(ManifoldParameter::as_tensor),
            &self.config,
            self.training,
            &self.ball,
        )
    }

    pub fn train(&mut self) {
        self.training = true;
    }

    pub fn eval(&mut self) {
        self.training = false;
    }

    #[inline]
    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn reset_running_stats(&mut self) -> LayerResult<()> {
        self.stats.reset()
    }

    /// Reset running statistics and the affine parameters.
    pub fn reset_parameters(&mut self) -> LayerResult<()> {
        self.reset_running_stats()?;
        if let Some(alpha) = &self.alpha {
            alpha.set(&alpha.as_tensor().ones_like()?)?;
        }
        if let Some(bias) = &self.bias {
            bias.set(&bias.as_tensor().zeros_like()?)?;
        }
        Ok(())
    }

    /// Trainable parameters (`alpha` then `bias`), empty without affine.
    pub fn parameters(&self) -> Vec<ManifoldParameter> {
        self.alpha.iter().chain(self.bias.iter()).cloned().collect()
    }

    #[inline]
    pub fn running_stats(&self) -> &RunningStatistics {
        &self.stats
    }

    #[inline]
    pub fn config(&self) -> &BatchNormConfig {
        &self.config
    }

    #[inline]
    pub fn ball(&self) -> &Arc<PoincareBall> {
        &self.ball
    }
}
