//! Mobius pooling layers.
//!
//! Thin stateful wrappers over [`crate::functional`] pooling that keep the
//! window configuration and, for average pooling, the ball.

use std::sync::Arc;

use candle_core::Tensor;
use poincare_manifold::PoincareBall;

use crate::config::Pool2dConfig;
use crate::error::{LayerError, LayerResult};
use crate::functional::{
    mobius_adaptive_avg_pool2d, mobius_adaptive_max_pool2d, mobius_adaptive_max_pool2d_with_indices,
    mobius_avg_pool2d, mobius_max_pool2d, mobius_max_pool2d_with_indices,
};

fn check_output_size(output_size: (usize, usize)) -> LayerResult<()> {
    if output_size.0 == 0 || output_size.1 == 0 {
        return Err(LayerError::InvalidConfig(format!(
            "adaptive output size must be positive, got {output_size:?}"
        )));
    }
    Ok(())
}

/// Keeps the largest-norm point of every window.
#[derive(Debug, Clone, PartialEq)]
pub struct MobiusMaxPool2d {
    config: Pool2dConfig,
}

impl MobiusMaxPool2d {
    pub fn new(config: Pool2dConfig) -> LayerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        mobius_max_pool2d(input, &self.config)
    }

    /// Pooled output and flat `(B, 1, OH, OW)` source positions.
    pub fn forward_with_indices(&self, input: &Tensor) -> LayerResult<(Tensor, Tensor)> {
        mobius_max_pool2d_with_indices(input, &self.config)
    }

    #[inline]
    pub fn config(&self) -> &Pool2dConfig {
        &self.config
    }
}

/// Gyromidpoint of every window.
#[derive(Debug, Clone)]
pub struct MobiusAvgPool2d {
    config: Pool2dConfig,
    ball: Arc<PoincareBall>,
}

impl MobiusAvgPool2d {
    pub fn new(config: Pool2dConfig, ball: Arc<PoincareBall>) -> LayerResult<Self> {
        config.validate()?;
        Ok(Self { config, ball })
    }

    pub fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        mobius_avg_pool2d(input, &self.config, &self.ball)
    }

    #[inline]
    pub fn config(&self) -> &Pool2dConfig {
        &self.config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobiusAdaptiveMaxPool2d {
    output_size: (usize, usize),
}

impl MobiusAdaptiveMaxPool2d {
    pub fn new(output_size: (usize, usize)) -> LayerResult<Self> {
        check_output_size(output_size)?;
        Ok(Self { output_size })
    }

    pub fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        mobius_adaptive_max_pool2d(input, self.output_size)
    }

    pub fn forward_with_indices(&self, input: &Tensor) -> LayerResult<(Tensor, Tensor)> {
        mobius_adaptive_max_pool2d_with_indices(input, self.output_size)
    }
}

#[derive(Debug, Clone)]
pub struct MobiusAdaptiveAvgPool2d {
    output_size: (usize, usize),
    ball: Arc<PoincareBall>,
}

impl MobiusAdaptiveAvgPool2d {
    pub fn new(output_size: (usize, usize), ball: Arc<PoincareBall>) -> LayerResult<Self> {
        check_output_size(output_size)?;
        Ok(Self { output_size, ball })
    }

    pub fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        mobius_adaptive_avg_pool2d(input, self.output_size, &self.ball)
    }
}
