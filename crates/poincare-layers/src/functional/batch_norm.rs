//! Mobius batch normalization, generic over the number `n` of trailing
//! spatial axes.
//!
//! The feature (ball) axis is `-n - 1`. Running statistics are stored per
//! channel: the midpoint has shape `(*channels, D)` and the variance
//! `(*channels, 1)`. Every input axis in front of the channels, plus every
//! spatial axis, is reduced when computing batch statistics.

use candle_core::{DType, Device, Tensor, D};
use poincare_manifold::PoincareBall;
use tracing::{debug, trace};

use crate::config::BatchNormConfig;
use crate::error::{LayerError, LayerResult};

/// Running midpoint and variance of a batch-norm layer.
///
/// Only [`RunningStatistics::update`] mutates the statistics, and it works on
/// detached copies, so no gradient ever flows into them.
#[derive(Debug, Clone)]
pub struct RunningStatistics {
    midpoint: Tensor,
    variance: Tensor,
}

impl RunningStatistics {
    /// Statistics for `channels` channels of `dim`-dimensional points:
    /// midpoints at the origin, unit variances.
    pub fn new(channels: &[usize], dim: usize, dtype: DType, device: &Device) -> LayerResult<Self> {
        if dim == 0 {
            return Err(LayerError::InvalidConfig(
                "point dimension must be positive".to_string(),
            ));
        }
        let mut mid_shape = channels.to_vec();
        mid_shape.push(dim);
        let mut var_shape = channels.to_vec();
        var_shape.push(1);
        Ok(Self {
            midpoint: Tensor::zeros(mid_shape, dtype, device)?,
            variance: Tensor::ones(var_shape, dtype, device)?,
        })
    }

    /// Wrap existing statistics. `variance` must match `midpoint` with a
    /// size-1 last axis.
    pub fn from_tensors(midpoint: Tensor, variance: Tensor) -> LayerResult<Self> {
        let mut expected = midpoint.dims().to_vec();
        match expected.last_mut() {
            Some(last) => *last = 1,
            None => {
                return Err(LayerError::InvalidInput(
                    "running midpoint must have a feature axis".to_string(),
                ))
            }
        }
        if variance.dims() != expected.as_slice() {
            return Err(LayerError::shape("running variance", &expected, variance.dims()));
        }
        Ok(Self {
            midpoint: midpoint.detach(),
            variance: variance.detach(),
        })
    }

    #[inline]
    pub fn midpoint(&self) -> &Tensor {
        &self.midpoint
    }

    #[inline]
    pub fn variance(&self) -> &Tensor {
        &self.variance
    }

    /// Channel axes, i.e. the midpoint shape without the feature axis.
    pub fn channel_shape(&self) -> &[usize] {
        let dims = self.midpoint.dims();
        &dims[..dims.len() - 1]
    }

    /// Point dimension.
    pub fn dim(&self) -> usize {
        self.midpoint.dims().last().copied().unwrap_or(0)
    }

    /// Reset to origin midpoints and unit variances.
    pub fn reset(&mut self) -> LayerResult<()> {
        self.midpoint = self.midpoint.zeros_like()?;
        self.variance = self.variance.ones_like()?;
        Ok(())
    }

    /// Exponential smoothing toward a batch estimate.
    ///
    /// - `variance <- variance + beta1 (batch_variance - variance)`
    /// - `midpoint <- geodesic(beta2, midpoint, batch_midpoint)`
    ///
    /// Batch tensors may carry extra size-1 axes; they are reshaped to the
    /// stored shapes. Non-finite batch statistics are rejected and leave the
    /// running values untouched.
    pub fn update(
        &mut self,
        batch_midpoint: &Tensor,
        batch_variance: &Tensor,
        beta1: f64,
        beta2: f64,
        ball: &PoincareBall,
    ) -> LayerResult<()> {
        let batch_midpoint = batch_midpoint.detach().reshape(self.midpoint.shape())?;
        let batch_variance = batch_variance.detach().reshape(self.variance.shape())?;
        if !all_finite(&batch_variance)? {
            return Err(LayerError::NonFinite("batch variance"));
        }
        if !all_finite(&batch_midpoint)? {
            return Err(LayerError::NonFinite("batch midpoint"));
        }

        let variance = self
            .variance
            .affine(1.0 - beta1, 0.0)?
            .add(&batch_variance.affine(beta1, 0.0)?)?;
        let midpoint = ball.geodesic(beta2, &self.midpoint, &batch_midpoint, D::Minus1)?;

        self.variance = variance.detach();
        self.midpoint = midpoint.detach();
        trace!(beta1, beta2, channels = ?self.channel_shape(), "running statistics updated");
        Ok(())
    }
}

fn all_finite(t: &Tensor) -> LayerResult<bool> {
    let values = t.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
    Ok(values.iter().all(|v| v.is_finite()))
}

/// Append `n` size-1 axes so per-channel tensors broadcast over spatial axes.
fn spread(t: &Tensor, n: usize) -> LayerResult<Tensor> {
    if n == 0 {
        return Ok(t.clone());
    }
    let mut dims = t.dims().to_vec();
    dims.extend(std::iter::repeat(1).take(n));
    Ok(t.reshape(dims)?)
}

/// Mobius batch normalization over `n` trailing spatial axes.
///
/// In training mode the batch midpoint and variance normalize the input and
/// are folded into `stats`; in evaluation mode the frozen `stats` are used and
/// left untouched. `alpha` (shape of the running variance) defaults to 1 and
/// `bias` (shape of the running midpoint) is Mobius-added last when given.
#[tracing::instrument(skip_all, fields(shape = ?input.dims(), n = config.n, training = training))]
pub fn mobius_batch_norm_nd(
    input: &Tensor,
    stats: &mut RunningStatistics,
    alpha: Option<&Tensor>,
    bias: Option<&Tensor>,
    config: &BatchNormConfig,
    training: bool,
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    config.validate()?;
    let n = config.n;
    let rank = input.rank();
    let mid_dims = stats.midpoint().dims().to_vec();
    if rank < n + mid_dims.len() {
        return Err(LayerError::InvalidInput(format!(
            "input of rank {rank} cannot hold statistics of shape {mid_dims:?} \
             and {n} spatial axes"
        )));
    }
    let lead = rank - n - mid_dims.len();
    let stat_axes = &input.dims()[lead..rank - n];
    if stat_axes != mid_dims.as_slice() {
        return Err(LayerError::shape("running midpoint", &mid_dims, stat_axes));
    }
    let dim = D::Minus(n + 1);

    let alpha = match alpha {
        Some(a) => {
            if a.dims() != stats.variance().dims() {
                return Err(LayerError::shape("alpha", stats.variance().dims(), a.dims()));
            }
            Some(spread(a, n)?)
        }
        None => None,
    };
    let bias = match bias {
        Some(b) => {
            if b.dims() != mid_dims.as_slice() {
                return Err(LayerError::shape("bias", &mid_dims, b.dims()));
            }
            Some(spread(b, n)?)
        }
        None => None,
    };

    let (midpoint, variance) = if training {
        let axes: Vec<usize> = (rank - n..rank).chain(0..lead).collect();
        if axes.is_empty() {
            return Err(LayerError::InvalidInput(
                "training batch norm needs a batch or spatial axis to reduce".to_string(),
            ));
        }
        let reduce: Vec<D> = axes.iter().map(|&a| D::Minus(rank - a)).collect();
        let midpoint = ball.weighted_midpoint(input, None, Some(&reduce), dim, true, false)?;
        let variance = ball.dist2(&midpoint, input, dim, true)?.mean_keepdim(axes)?;
        debug!(reduced = reduce.len(), "batch norm training statistics");
        (midpoint, variance)
    } else {
        (spread(stats.midpoint(), n)?, spread(stats.variance(), n)?)
    };

    let centred = ball.mobius_add(&midpoint.neg()?, input, dim)?;
    let mut scale = variance.affine(1.0, config.epsilon)?.sqrt()?.recip()?;
    if let Some(alpha) = alpha {
        scale = scale.broadcast_mul(&alpha)?;
    }
    let mut output = ball.mobius_scalar_mul(&scale, &centred, dim)?;

    if let Some(bias) = bias {
        output = ball.mobius_add(&output, &bias, dim)?;
    }
    // statistics move only once the forward pass has succeeded
    if training {
        stats.update(&midpoint, &variance, config.beta1, config.beta2, ball)?;
    }
    Ok(output)
}

fn with_rank(config: &BatchNormConfig, n: usize) -> BatchNormConfig {
    BatchNormConfig {
        n,
        ..config.clone()
    }
}

/// [`mobius_batch_norm_nd`] for `(batch, ..., D)` points (no spatial axes).
pub fn mobius_batch_norm(
    input: &Tensor,
    stats: &mut RunningStatistics,
    alpha: Option<&Tensor>,
    bias: Option<&Tensor>,
    config: &BatchNormConfig,
    training: bool,
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    mobius_batch_norm_nd(input, stats, alpha, bias, &with_rank(config, 0), training, ball)
}

/// [`mobius_batch_norm_nd`] for sequences `(batch, ..., D, L)`.
pub fn mobius_batch_norm1d(
    input: &Tensor,
    stats: &mut RunningStatistics,
    alpha: Option<&Tensor>,
    bias: Option<&Tensor>,
    config: &BatchNormConfig,
    training: bool,
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    mobius_batch_norm_nd(input, stats, alpha, bias, &with_rank(config, 1), training, ball)
}

/// [`mobius_batch_norm_nd`] for feature maps `(batch, ..., D, H, W)`.
pub fn mobius_batch_norm2d(
    input: &Tensor,
    stats: &mut RunningStatistics,
    alpha: Option<&Tensor>,
    bias: Option<&Tensor>,
    config: &BatchNormConfig,
    training: bool,
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    mobius_batch_norm_nd(input, stats, alpha, bias, &with_rank(config, 2), training, ball)
}
