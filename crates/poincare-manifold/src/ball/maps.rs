//! Exponential and logarithmic maps, parallel transport and geodesics.
//!
//! These maps transfer between tangent spaces and the manifold:
//! - Exp map: tangent vector at x -> point on manifold
//! - Log map: point on manifold -> tangent vector at x
//!
//! # Mathematical Formulas
//!
//! - exp_x(u) = x (+) tanh(sqrt(c) lambda_x ||u|| / 2) u / (sqrt(c) ||u||)
//! - log_x(y) = 2 / (sqrt(c) lambda_x) artanh(sqrt(c) ||(-x) (+) y||) ((-x) (+) y) / ||(-x) (+) y||
//! - P_{x->y}(v) = gyr[y, -x] v * lambda_x / lambda_y
//! - gamma_{x->y}(t) = x (+) (t (x) ((-x) (+) y))

use candle_core::{DType, Device, Shape, Tensor, D};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::PoincareBall;
use crate::error::{ManifoldError, ManifoldResult};
use crate::tensor_ops::{artanh, norm};

impl PoincareBall {
    /// Exponential map at the origin.
    pub fn expmap0(&self, u: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let scaled_norm = norm(u, dim, self.config.min_norm)?.affine(sqrt_c, 0.0)?;
        let gamma = scaled_norm.tanh()?.div(&scaled_norm)?.broadcast_mul(u)?;
        self.projx(&gamma, dim)
    }

    /// Logarithmic map at the origin.
    pub fn logmap0(&self, y: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let scaled_norm = norm(y, dim, self.config.min_norm)?.affine(sqrt_c, 0.0)?;
        Ok(artanh(&scaled_norm)?.div(&scaled_norm)?.broadcast_mul(y)?)
    }

    /// Exponential map at `x`.
    ///
    /// Moves from `x` along the geodesic with initial velocity `u`.
    pub fn expmap(&self, x: &Tensor, u: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let u_norm = norm(u, dim, self.config.min_norm)?;
        let lam = self.lambda_x(x, dim, true)?;
        let factor = lam
            .broadcast_mul(&u_norm)?
            .affine(sqrt_c / 2.0, 0.0)?
            .tanh()?
            .broadcast_div(&u_norm.affine(sqrt_c, 0.0)?)?;
        let second = factor.broadcast_mul(u)?;
        self.mobius_add(x, &second, dim)
    }

    /// Logarithmic map at `x`: tangent vector at `x` pointing toward `y`.
    ///
    /// Inverse of [`PoincareBall::expmap`].
    pub fn logmap(&self, x: &Tensor, y: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let sub = self.mobius_sub(x, y, dim)?;
        let sub_norm = norm(&sub, dim, self.config.min_norm)?;
        let lam = self.lambda_x(x, dim, true)?;
        let factor = artanh(&sub_norm.affine(sqrt_c, 0.0)?)?
            .div(&sub_norm)?
            .broadcast_div(&lam)?
            .affine(2.0 / sqrt_c, 0.0)?;
        Ok(factor.broadcast_mul(&sub)?)
    }

    /// Parallel transport of tangent vector `v` from `x` to `y`.
    pub fn transp(&self, x: &Tensor, y: &Tensor, v: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let rotated = self.gyration(y, &x.neg()?, v, dim)?;
        let ratio = self
            .lambda_x(x, dim, true)?
            .broadcast_div(&self.lambda_x(y, dim, true)?)?;
        Ok(rotated.broadcast_mul(&ratio)?)
    }

    /// Parallel transport of `v` from the origin to `y`.
    pub fn transp0(&self, y: &Tensor, v: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let lam = self.lambda_x(y, dim, true)?;
        Ok(v.broadcast_div(&lam)?.affine(2.0, 0.0)?)
    }

    /// Point at parameter `t` on the geodesic from `x` (t = 0) to `y` (t = 1).
    pub fn geodesic(&self, t: f64, x: &Tensor, y: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let v = self.mobius_sub(x, y, dim)?;
        let tv = self.mobius_scale(t, &v, dim)?;
        self.mobius_add(x, &tv, dim)
    }

    /// Sample points by pushing a centred normal through `expmap0`.
    ///
    /// The feature axis is the last axis of `shape`.
    pub fn random_normal<R: Rng + ?Sized, S: Into<Shape>>(
        &self,
        shape: S,
        std: f64,
        dtype: DType,
        device: &Device,
        rng: &mut R,
    ) -> ManifoldResult<Tensor> {
        if !std.is_finite() || std < 0.0 {
            return Err(ManifoldError::InvalidInput(format!(
                "std must be finite and non-negative, got {std}"
            )));
        }
        let shape: Shape = shape.into();
        let normal = Normal::new(0.0f64, std)
            .map_err(|e| ManifoldError::InvalidInput(format!("invalid std {std}: {e}")))?;
        let data: Vec<f64> = (0..shape.elem_count())
            .map(|_| normal.sample(rng))
            .collect();
        let tangent = Tensor::from_vec(data, shape, device)?.to_dtype(dtype)?;
        self.expmap0(&tangent, D::Minus1)
    }
}
