//! Weighted combinations of learned centroids.
//!
//! Maps a weight vector over `K` centroids to a point on the ball through the
//! weighted gyromidpoint. In `lincomb` mode the midpoint is scaled by the
//! total weight, which makes the decoder a gyro-linear combination.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor, D};
use poincare_manifold::{ManifoldParameter, PoincareBall};
use rand::Rng;
use tracing::debug;

use crate::error::{LayerError, LayerResult};
use crate::init::rect_eye;

#[derive(Debug)]
pub struct WeightedPoincareCentroids {
    centroids: ManifoldParameter,
    ball: Arc<PoincareBall>,
    lincomb: bool,
}

impl WeightedPoincareCentroids {
    /// `num_centroids` points of dimension `dim`, initialised with
    /// [`Self::reset_parameters_identity`].
    pub fn new(
        dim: usize,
        num_centroids: usize,
        ball: Arc<PoincareBall>,
        lincomb: bool,
        dtype: DType,
        device: &Device,
    ) -> LayerResult<Self> {
        if dim == 0 || num_centroids == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "centroids need positive sizes, got {num_centroids} x {dim}"
            )));
        }
        let zeros = Tensor::zeros((num_centroids, dim), dtype, device)?;
        let layer = Self {
            centroids: ManifoldParameter::ball(&zeros, Arc::clone(&ball))?,
            ball,
            lincomb,
        };
        layer.reset_parameters_identity()?;
        Ok(layer)
    }

    /// Combine centroids with `weights` of shape `(..., K)` into `(..., D)`.
    pub fn forward(&self, weights: &Tensor) -> LayerResult<Tensor> {
        let k = self.num_centroids();
        match weights.dims().last() {
            Some(&actual) if actual == k => {}
            Some(&actual) => return Err(LayerError::DimensionMismatch { expected: k, actual }),
            None => {
                return Err(LayerError::InvalidInput(
                    "centroid weights need a trailing axis".to_string(),
                ))
            }
        }
        let weights = weights.unsqueeze(weights.rank())?;
        Ok(self.ball.weighted_midpoint(
            self.centroids.as_tensor(),
            Some(&weights),
            Some(&[D::Minus2]),
            D::Minus1,
            false,
            self.lincomb,
        )?)
    }

    /// Centroid `k` at `expmap0(e_k)`; extra centroids (`K > D`) at the origin.
    pub fn reset_parameters_identity(&self) -> LayerResult<()> {
        let current = self.centroids.as_tensor();
        let (k, d) = current.dims2()?;
        let eye = rect_eye(k, d, current.dtype(), current.device())?;
        self.centroids.set(&self.ball.expmap0(&eye, D::Minus1)?)?;
        debug!(centroids = k, dim = d, "centroids reset to identity");
        Ok(())
    }

    pub fn reset_parameters(&self) -> LayerResult<()> {
        self.reset_parameters_with_rng(&mut rand::thread_rng())
    }

    /// Centroids sampled around the origin with tangent spread `1 / sqrt(D)`.
    pub fn reset_parameters_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> LayerResult<()> {
        let current = self.centroids.as_tensor();
        let (k, d) = current.dims2()?;
        let std = 1.0 / (d as f64).sqrt();
        let points = self
            .ball
            .random_normal((k, d), std, current.dtype(), current.device(), rng)?;
        self.centroids.set(&points)?;
        Ok(())
    }

    pub fn parameters(&self) -> Vec<ManifoldParameter> {
        vec![self.centroids.clone()]
    }

    #[inline]
    pub fn centroids(&self) -> &Tensor {
        self.centroids.as_tensor()
    }

    pub fn num_centroids(&self) -> usize {
        self.centroids.dims()[0]
    }

    pub fn dim(&self) -> usize {
        self.centroids.dims()[1]
    }

    #[inline]
    pub fn lincomb(&self) -> bool {
        self.lincomb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn max_abs_diff(a: &Tensor, b: &Tensor) -> f64 {
        a.sub(b)
            .unwrap()
            .abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar::<f64>()
            .unwrap()
    }

    #[test]
    fn test_identity_init() {
        let ball = PoincareBall::shared(-1.0).unwrap();
        let layer =
            WeightedPoincareCentroids::new(3, 4, ball, false, DType::F64, &Device::Cpu).unwrap();
        let c = layer.centroids().to_vec2::<f64>().unwrap();
        let e = 1f64.tanh();
        assert!((c[0][0] - e).abs() < 1e-12);
        assert!((c[2][2] - e).abs() < 1e-12);
        assert_eq!(c[3], vec![0.0, 0.0, 0.0]);
        assert_eq!(c[0][1], 0.0);
    }

    #[test]
    fn test_one_hot_weights_select_centroid() {
        let ball = PoincareBall::shared(-1.0).unwrap();
        let layer =
            WeightedPoincareCentroids::new(2, 3, Arc::clone(&ball), false, DType::F64, &Device::Cpu)
                .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        layer.reset_parameters_with_rng(&mut rng).unwrap();

        let weights = Tensor::new(&[[0.0f64, 1.0, 0.0], [0.0, 0.0, 2.0]], &Device::Cpu).unwrap();
        let out = layer.forward(&weights).unwrap();
        assert_eq!(out.dims(), &[2, 2]);
        let expected = layer.centroids().narrow(0, 1, 2).unwrap();
        assert!(max_abs_diff(&out, &expected) < 1e-9);
    }

    #[test]
    fn test_lincomb_scales_by_total_weight() {
        let ball = PoincareBall::shared(-1.0).unwrap();
        let layer =
            WeightedPoincareCentroids::new(2, 2, Arc::clone(&ball), true, DType::F64, &Device::Cpu)
                .unwrap();
        let weights = Tensor::new(&[[0.0f64, 2.0]], &Device::Cpu).unwrap();
        let out = layer.forward(&weights).unwrap();

        // 2 (x) c_1 = expmap0(2 e_1)
        let e = Tensor::new(&[[0.0f64, 2.0]], &Device::Cpu).unwrap();
        let expected = ball.expmap0(&e, D::Minus1).unwrap();
        assert!(max_abs_diff(&out, &expected) < 1e-9);
    }

    #[test]
    fn test_forward_checks_weight_width() {
        let ball = PoincareBall::shared(-1.0).unwrap();
        let layer =
            WeightedPoincareCentroids::new(2, 3, ball, true, DType::F64, &Device::Cpu).unwrap();
        let weights = Tensor::zeros((4, 2), DType::F64, &Device::Cpu).unwrap();
        assert!(matches!(
            layer.forward(&weights),
            Err(LayerError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
