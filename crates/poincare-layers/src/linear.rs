//! Mobius linear layer.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use poincare_manifold::{ManifoldParameter, PoincareBall};
use rand::Rng;
use rand_distr::Uniform;
use tracing::debug;

use crate::config::LinearConfig;
use crate::error::{LayerError, LayerResult};
use crate::functional::{mobius_linear, LinearOrigins};
use crate::init::sample;

/// Linear map from points on `ball` to points on `ball_out`.
///
/// The weight has shape `(in, out)`. With [`LinearConfig::learn_origin`] the
/// layer learns the tangent-space origins on both balls, otherwise it maps
/// through the ball origins (or uses Mobius matvec when both balls are the
/// same instance).
#[derive(Debug)]
pub struct MobiusLinear {
    weight: ManifoldParameter,
    bias: Option<ManifoldParameter>,
    source_origin: Option<ManifoldParameter>,
    target_origin: Option<ManifoldParameter>,
    ball: Arc<PoincareBall>,
    ball_out: Arc<PoincareBall>,
    config: LinearConfig,
}

impl MobiusLinear {
    /// Create a layer with randomly initialised weights.
    ///
    /// `ball_out = None` maps back onto `ball`.
    pub fn new(
        in_features: usize,
        out_features: usize,
        ball: Arc<PoincareBall>,
        ball_out: Option<Arc<PoincareBall>>,
        config: LinearConfig,
        dtype: DType,
        device: &Device,
    ) -> LayerResult<Self> {
        Self::new_with_rng(
            in_features,
            out_features,
            ball,
            ball_out,
            config,
            dtype,
            device,
            &mut rand::thread_rng(),
        )
    }

    /// [`MobiusLinear::new`] with an explicit random source.
    #[allow(clippy::too_many_arguments)]
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        ball: Arc<PoincareBall>,
        ball_out: Option<Arc<PoincareBall>>,
        config: LinearConfig,
        dtype: DType,
        device: &Device,
        rng: &mut R,
    ) -> LayerResult<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "features must be positive, got {in_features} -> {out_features}"
            )));
        }
        let ball_out = ball_out.unwrap_or_else(|| Arc::clone(&ball));
        let one_ball = PoincareBall::same(&ball, &ball_out);
        if config.learn_origin && one_ball && in_features != out_features {
            return Err(LayerError::BallMismatch(format!(
                "learned origins on a single ball need equal dimensions, \
                 got {in_features} -> {out_features}"
            )));
        }

        let weight = ManifoldParameter::euclidean(&Tensor::zeros(
            (in_features, out_features),
            dtype,
            device,
        )?)?;
        let bias = if config.bias {
            Some(ManifoldParameter::ball(
                &Tensor::zeros(out_features, dtype, device)?,
                Arc::clone(&ball_out),
            )?)
        } else {
            None
        };
        let (source_origin, target_origin) = if config.learn_origin {
            (
                Some(ManifoldParameter::ball(
                    &Tensor::zeros(in_features, dtype, device)?,
                    Arc::clone(&ball),
                )?),
                Some(ManifoldParameter::ball(
                    &Tensor::zeros(out_features, dtype, device)?,
                    Arc::clone(&ball_out),
                )?),
            )
        } else {
            (None, None)
        };

        let layer = Self {
            weight,
            bias,
            source_origin,
            target_origin,
            ball,
            ball_out,
            config,
        };
        layer.reset_parameters_with_rng(rng)?;
        debug!(
            in_features,
            out_features,
            bias = layer.config.bias,
            learn_origin = layer.config.learn_origin,
            "mobius linear created"
        );
        Ok(layer)
    }

    /// Map `input` of shape `(..., in)` to `(..., out)` on the output ball.
    pub fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        let origins = match (&self.source_origin, &self.target_origin) {
            (Some(s), Some(t)) => LinearOrigins::new(s.as_tensor(), t.as_tensor()),
            _ => LinearOrigins::none(),
        };
        mobius_linear(
            input,
            self.weight.as_tensor(),
            self.bias.as_ref().map(ManifoldParameter::as_tensor),
            &origins,
            &self.ball,
            &self.ball_out,
        )
    }

    pub fn reset_parameters(&self) -> LayerResult<()> {
        self.reset_parameters_with_rng(&mut rand::thread_rng())
    }

    /// Uniform weights in `+-1/sqrt(in)`; bias and origins at the ball origins.
    pub fn reset_parameters_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> LayerResult<()> {
        let w = self.weight.as_tensor();
        let (in_features, out_features) = w.dims2()?;
        let bound = 1.0 / (in_features as f64).sqrt();
        self.weight.set(&sample(
            &Uniform::new(-bound, bound),
            (in_features, out_features),
            w.dtype(),
            w.device(),
            rng,
        )?)?;
        for param in [&self.bias, &self.source_origin, &self.target_origin]
            .into_iter()
            .flatten()
        {
            param.set(&param.as_tensor().zeros_like()?)?;
        }
        Ok(())
    }

    /// Overwrite the weight `(in, out)` and optionally the bias point.
    pub fn set_weight(&self, weight: &Tensor, bias: Option<&Tensor>) -> LayerResult<()> {
        if weight.dims() != self.weight.dims() {
            return Err(LayerError::shape("weight", self.weight.dims(), weight.dims()));
        }
        self.weight.set(weight)?;
        match (&self.bias, bias) {
            (Some(param), Some(b)) => {
                if b.dims() != param.dims() {
                    return Err(LayerError::shape("bias", param.dims(), b.dims()));
                }
                param.set(b)?;
            }
            (None, Some(_)) => {
                return Err(LayerError::InvalidConfig(
                    "layer was built without a bias".to_string(),
                ))
            }
            _ => {}
        }
        Ok(())
    }

    /// Trainable parameters: weight, then bias and origins when present.
    pub fn parameters(&self) -> Vec<ManifoldParameter> {
        std::iter::once(&self.weight)
            .chain(self.bias.iter())
            .chain(self.source_origin.iter())
            .chain(self.target_origin.iter())
            .cloned()
            .collect()
    }

    #[inline]
    pub fn weight(&self) -> &Tensor {
        self.weight.as_tensor()
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref().map(ManifoldParameter::as_tensor)
    }

    #[inline]
    pub fn ball(&self) -> &Arc<PoincareBall> {
        &self.ball
    }

    #[inline]
    pub fn ball_out(&self) -> &Arc<PoincareBall> {
        &self.ball_out
    }
}
