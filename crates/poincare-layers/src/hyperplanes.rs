//! Distance-to-hyperplane feature maps.
//!
//! Each hyperplane is a point `p` on the ball and a unit normal `a` stored on
//! the sphere. For every input point the layer emits one channel per plane:
//! the geodesic distance to the plane, optionally signed and squared.
//!
//! # Shapes
//!
//! With `n` trailing spatial axes the input is `(..., D, *spatial)` and the
//! output `(..., P, *spatial)`. When `zero` is set the first output channel is
//! the distance to the origin and only `P - 1` planes are learned.

use std::f64::consts::PI;
use std::sync::Arc;

use candle_core::{DType, Device, Tensor, D};
use poincare_manifold::tensor_ops::sign;
use poincare_manifold::{ManifoldParameter, PoincareBall};
use rand::Rng;
use rand_distr::{Normal, StandardNormal};
use tracing::{debug, warn};

use crate::config::HyperplaneConfig;
use crate::error::{LayerError, LayerResult};
use crate::init::sample;

/// Learned hyperplanes on a Poincare ball producing distance features.
#[derive(Debug)]
pub struct Distance2PoincareHyperplanes {
    points: ManifoldParameter,
    tangents: ManifoldParameter,
    num_planes: usize,
    ball: Arc<PoincareBall>,
    config: HyperplaneConfig,
}

impl Distance2PoincareHyperplanes {
    /// `num_planes` output channels over `dim`-dimensional points.
    pub fn new(
        dim: usize,
        num_planes: usize,
        ball: Arc<PoincareBall>,
        config: HyperplaneConfig,
        dtype: DType,
        device: &Device,
    ) -> LayerResult<Self> {
        Self::new_with_rng(dim, num_planes, ball, config, dtype, device, &mut rand::thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        dim: usize,
        num_planes: usize,
        ball: Arc<PoincareBall>,
        config: HyperplaneConfig,
        dtype: DType,
        device: &Device,
        rng: &mut R,
    ) -> LayerResult<Self> {
        config.validate()?;
        if dim == 0 {
            return Err(LayerError::InvalidConfig(
                "point dimension must be positive".to_string(),
            ));
        }
        let learned = num_planes.saturating_sub(usize::from(config.zero));
        if learned == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "need at least one learned hyperplane, \
                 got num_planes = {num_planes} with zero = {}",
                config.zero
            )));
        }

        let zeros = Tensor::zeros((learned, dim), dtype, device)?;
        let points = ManifoldParameter::ball(&zeros, Arc::clone(&ball))?;
        // placeholder direction, overwritten by the reset below
        let tangents = ManifoldParameter::sphere(&zeros.ones_like()?)?;

        let layer = Self {
            points,
            tangents,
            num_planes,
            ball,
            config,
        };
        layer.reset_parameters_with_rng(rng)?;
        debug!(
            dim,
            num_planes,
            zero = layer.config.zero,
            n = layer.config.n,
            "hyperplanes created"
        );
        Ok(layer)
    }

    /// Distances from every input point to every plane.
    pub fn forward(&self, input: &Tensor) -> LayerResult<Tensor> {
        let n = self.config.n;
        let rank = input.rank();
        if rank < n + 1 {
            return Err(LayerError::InvalidInput(format!(
                "input of rank {rank} has no feature axis in front of {n} spatial axes"
            )));
        }
        let dim = self.dim();
        let actual = input.dims()[rank - n - 1];
        if actual != dim {
            return Err(LayerError::DimensionMismatch {
                expected: dim,
                actual,
            });
        }

        // (..., D, 1, *spatial) against (D, P, 1, ...)
        let input_p = input.unsqueeze(rank - n)?;
        let points = self.spread_planes(self.points.as_tensor())?;
        let tangents = self.spread_planes(self.tangents.as_tensor())?;

        let mut distance = self.ball.dist2plane(
            &input_p,
            &points,
            &tangents,
            D::Minus(n + 2),
            self.config.signed,
            self.config.scaled,
            false,
        )?;
        if self.config.squared {
            let squared = distance.sqr()?;
            distance = if self.config.signed {
                squared.mul(&sign(&distance)?)?
            } else {
                squared
            };
        }

        if self.config.zero {
            let mut to_origin = self.ball.dist0(input, D::Minus(n + 1), true)?;
            if self.config.squared {
                to_origin = to_origin.sqr()?;
            }
            distance = Tensor::cat(&[&to_origin, &distance], rank - n - 1)?;
        }
        Ok(distance)
    }

    /// `(P, D)` -> `(D, P, 1, ..., 1)` with `n` trailing ones.
    fn spread_planes(&self, planes: &Tensor) -> LayerResult<Tensor> {
        let t = planes.t()?;
        let mut dims = t.dims().to_vec();
        dims.extend(std::iter::repeat(1).take(self.config.n));
        Ok(t.reshape(dims)?)
    }

    pub fn reset_parameters(&self) -> LayerResult<()> {
        self.reset_parameters_with_rng(&mut rand::thread_rng())
    }

    /// Random planes: a uniform direction scaled by a normal offset of spread
    /// `std / sqrt(2 / pi)` and mapped onto the ball. Each normal starts along
    /// its point's direction.
    pub fn reset_parameters_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> LayerResult<()> {
        let current = self.points.as_tensor();
        let (planes, dim) = current.dims2()?;
        let (dtype, device) = (current.dtype(), current.device().clone());

        let direction = sample(&StandardNormal, (planes, dim), DType::F64, &device, rng)?;
        let direction = direction.broadcast_div(&direction.sqr()?.sum_keepdim(1)?.sqrt()?)?;
        let std = self.config.std;
        let offset_dist = Normal::new(0.0, std / (2.0 / PI).sqrt())
            .map_err(|e| LayerError::InvalidConfig(format!("invalid std {std}: {e}")))?;
        let offset = sample(&offset_dist, (planes, 1), DType::F64, &device, rng)?;

        let points = self
            .ball
            .expmap0(&direction.broadcast_mul(&offset)?, D::Minus1)?
            .to_dtype(dtype)?;
        self.points.set(&points)?;
        self.tangents.set(self.points.as_tensor())?;
        Ok(())
    }

    /// Place the planes of a Euclidean linear operator `x W^T + b` in the ball.
    ///
    /// Row `i` of `weight` (`(P, D)`) and `bias[i]` describe the Euclidean
    /// hyperplane `w . x + b = 0`. Its normal becomes the tangent and its point
    /// closest to the origin, `-b w / ||w||^2`, becomes the anchor (clipped into
    /// the ball when it falls outside).
    pub fn set_parameters_from_linear_operator(
        &self,
        weight: &Tensor,
        bias: Option<&Tensor>,
    ) -> LayerResult<()> {
        let expected = self.points.dims().to_vec();
        if weight.dims() != expected.as_slice() {
            return Err(LayerError::shape("linear operator weight", &expected, weight.dims()));
        }
        let weight = weight.to_dtype(self.points.as_tensor().dtype())?.detach();
        let sq_norms = weight.sqr()?.sum_keepdim(1)?;
        let norms = sq_norms.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
        if let Some(row) = norms.iter().position(|v| *v <= 0.0 || !v.is_finite()) {
            return Err(LayerError::InvalidInput(format!(
                "linear operator row {row} has no usable normal"
            )));
        }

        let points = match bias {
            Some(bias) => {
                if bias.dims() != [expected[0]] {
                    return Err(LayerError::shape(
                        "linear operator bias",
                        &expected[..1],
                        bias.dims(),
                    ));
                }
                let bias = bias.to_dtype(weight.dtype())?.detach().unsqueeze(1)?;
                weight
                    .broadcast_mul(&bias)?
                    .broadcast_div(&sq_norms)?
                    .neg()?
            }
            None => weight.zeros_like()?,
        };

        let max_norm = self.ball.config().max_norm();
        let clipped = points
            .sqr()?
            .sum(1)?
            .sqrt()?
            .to_dtype(DType::F64)?
            .to_vec1::<f64>()?
            .iter()
            .filter(|v| **v > max_norm)
            .count();
        if clipped > 0 {
            warn!(clipped, max_norm, "hyperplane anchors outside the ball were clipped");
        }

        self.points.set(&points)?;
        self.tangents.set(&weight)?;
        debug!(
            planes = expected[0],
            with_bias = bias.is_some(),
            "hyperplanes set from linear operator"
        );
        Ok(())
    }

    /// Trainable parameters: points on the ball, then normals on the sphere.
    pub fn parameters(&self) -> Vec<ManifoldParameter> {
        vec![self.points.clone(), self.tangents.clone()]
    }

    #[inline]
    pub fn points(&self) -> &Tensor {
        self.points.as_tensor()
    }

    #[inline]
    pub fn tangents(&self) -> &Tensor {
        self.tangents.as_tensor()
    }

    /// Number of output channels, including the origin channel.
    #[inline]
    pub fn num_planes(&self) -> usize {
        self.num_planes
    }

    /// Point dimension.
    pub fn dim(&self) -> usize {
        self.points.dims()[1]
    }

    #[inline]
    pub fn config(&self) -> &HyperplaneConfig {
        &self.config
    }

    #[inline]
    pub fn ball(&self) -> &Arc<PoincareBall> {
        &self.ball
    }
}
