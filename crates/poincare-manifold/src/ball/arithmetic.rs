//! Mobius gyrovector arithmetic on the Poincare ball.
//!
//! # Mathematics
//!
//! With `c = |curvature|`:
//!
//! - Conformal factor: `lambda_x = 2 / (1 - c||x||^2)`
//! - Mobius addition: `x + y = ((1 + 2c<x,y> + c||y||^2)x + (1 - c||x||^2)y) /
//!   (1 + 2c<x,y> + c^2||x||^2||y||^2)`
//! - Scalar multiplication: `r * x = tanh(r artanh(sqrt(c)||x||)) x / (sqrt(c)||x||)`
//! - Matrix-vector product: `W * x = tanh(||xW||/||x|| artanh(sqrt(c)||x||)) xW / (sqrt(c)||xW||)`
//!
//! Every operation broadcasts its operands and projects returned points back
//! inside the ball.

use candle_core::{Tensor, D};

use super::PoincareBall;
use crate::error::ManifoldResult;
use crate::tensor_ops::{artanh, axis, dot, matmul_last, norm, sq_norm};

impl PoincareBall {
    /// Conformal factor `lambda_x = 2 / (1 - c||x||^2)` along `dim`.
    ///
    /// The factor scales tangent vectors between Euclidean and hyperbolic
    /// metrics at `x`.
    pub fn lambda_x(&self, x: &Tensor, dim: D, keepdim: bool) -> ManifoldResult<Tensor> {
        let x2 = sq_norm(x, dim)?;
        let lam = x2
            .affine(-self.c(), 1.0)?
            .maximum(self.config.min_norm)?
            .recip()?
            .affine(2.0, 0.0)?;
        if keepdim {
            Ok(lam)
        } else {
            Ok(lam.squeeze(axis(x, dim)?)?)
        }
    }

    /// Project points with norm above `max_norm` back onto the `max_norm` shell.
    pub fn projx(&self, x: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let max_norm = self.config.max_norm();
        let x_norm = norm(x, dim, self.config.min_norm)?;
        let outside = x_norm.gt(max_norm)?.broadcast_as(x.shape())?;
        let projected = x.broadcast_div(&x_norm)?.affine(max_norm, 0.0)?;
        Ok(outside.where_cond(&projected, x)?)
    }

    /// Check that every point lies strictly inside the ball (tolerance on norm).
    pub fn check_point(&self, x: &Tensor, dim: D, tol: f64) -> ManifoldResult<bool> {
        let limit = self.config.radius() + tol;
        let over = sq_norm(x, dim)?
            .sqrt()?
            .ge(limit)?
            .to_dtype(candle_core::DType::F32)?
            .sum_all()?
            .to_scalar::<f32>()?;
        Ok(over == 0.0)
    }

    /// Mobius addition `x (+) y`.
    ///
    /// # Example
    ///
    /// ```
    /// use candle_core::{Device, Tensor, D};
    /// use poincare_manifold::ball::PoincareBall;
    ///
    /// let ball = PoincareBall::default();
    /// let origin = Tensor::zeros((1, 2), candle_core::DType::F32, &Device::Cpu).unwrap();
    /// let x = Tensor::new(&[[0.3f32, 0.1]], &Device::Cpu).unwrap();
    ///
    /// // Adding origin returns the other point
    /// let y = ball.mobius_add(&origin, &x, D::Minus1).unwrap();
    /// let v = y.to_vec2::<f32>().unwrap();
    /// assert!((v[0][0] - 0.3).abs() < 1e-6);
    /// ```
    pub fn mobius_add(&self, x: &Tensor, y: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let c = self.c();
        let x2 = sq_norm(x, dim)?;
        let y2 = sq_norm(y, dim)?;
        let xy = dot(x, y, dim)?;

        let coef_x = xy.affine(2.0 * c, 1.0)?.broadcast_add(&y2.affine(c, 0.0)?)?;
        let coef_y = x2.affine(-c, 1.0)?;
        let num = coef_x
            .broadcast_mul(x)?
            .broadcast_add(&coef_y.broadcast_mul(y)?)?;

        let denom = xy
            .affine(2.0 * c, 1.0)?
            .broadcast_add(&x2.broadcast_mul(&y2)?.affine(c * c, 0.0)?)?
            .maximum(self.config.min_norm)?;

        self.projx(&num.broadcast_div(&denom)?, dim)
    }

    /// Mobius subtraction `(-x) (+) y`, the displacement from `x` to `y`.
    pub fn mobius_sub(&self, x: &Tensor, y: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        self.mobius_add(&x.neg()?, y, dim)
    }

    /// Mobius scalar multiplication `r (x) x` with a broadcastable tensor `r`.
    pub fn mobius_scalar_mul(&self, r: &Tensor, x: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let scaled_norm = norm(x, dim, self.config.min_norm)?.affine(sqrt_c, 0.0)?;
        let factor = r.broadcast_mul(&artanh(&scaled_norm)?)?.tanh()?;
        let res = factor
            .broadcast_div(&scaled_norm)?
            .broadcast_mul(x)?;
        self.projx(&res, dim)
    }

    /// Mobius scalar multiplication by a plain number.
    pub fn mobius_scale(&self, r: f64, x: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let scaled_norm = norm(x, dim, self.config.min_norm)?.affine(sqrt_c, 0.0)?;
        let factor = artanh(&scaled_norm)?.affine(r, 0.0)?.tanh()?;
        let res = factor.div(&scaled_norm)?.broadcast_mul(x)?;
        self.projx(&res, dim)
    }

    /// Mobius matrix-vector product along the last axis.
    ///
    /// `weight` has shape `(in, out)` and is applied as `x W`. Rows whose image
    /// `x W` is exactly zero map to the origin.
    pub fn mobius_matvec(&self, weight: &Tensor, x: &Tensor) -> ManifoldResult<Tensor> {
        let dim = D::Minus1;
        let sqrt_c = self.sqrt_c();
        let min_norm = self.config.min_norm;

        let x_norm = norm(x, dim, min_norm)?;
        let mx = matmul_last(x, weight)?;
        let mx_norm = norm(&mx, dim, min_norm)?;

        let angle = mx_norm
            .div(&x_norm)?
            .mul(&artanh(&x_norm.affine(sqrt_c, 0.0)?)?)?;
        let res = angle
            .tanh()?
            .div(&mx_norm.affine(sqrt_c, 0.0)?)?
            .broadcast_mul(&mx)?;

        let last = axis(&mx, dim)?;
        let all_zero = mx
            .abs()?
            .sum_keepdim(last)?
            .le(0.0)?
            .broadcast_as(res.shape())?;
        let res = all_zero.where_cond(&res.zeros_like()?, &res)?;
        self.projx(&res, dim)
    }

    /// Gyration `gyr[a, b] u`, the rotation that restores associativity:
    /// `a (+) (b (+) u) = (a (+) b) (+) gyr[a, b] u`.
    pub fn gyration(&self, a: &Tensor, b: &Tensor, u: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let c = self.c();
        let c2 = c * c;
        let a2 = sq_norm(a, dim)?;
        let b2 = sq_norm(b, dim)?;
        let ab = dot(a, b, dim)?;
        let au = dot(a, u, dim)?;
        let bu = dot(b, u, dim)?;

        // A = -c^2 <a,u> ||b||^2 + c <b,u> + 2c^2 <a,b><b,u>
        let coef_a = au
            .broadcast_mul(&b2)?
            .affine(-c2, 0.0)?
            .broadcast_add(&bu.affine(c, 0.0)?)?
            .broadcast_add(&ab.broadcast_mul(&bu)?.affine(2.0 * c2, 0.0)?)?;
        // B = -c^2 <b,u> ||a||^2 - c <a,u>
        let coef_b = bu
            .broadcast_mul(&a2)?
            .affine(-c2, 0.0)?
            .broadcast_sub(&au.affine(c, 0.0)?)?;
        // D = 1 + 2c <a,b> + c^2 ||a||^2 ||b||^2
        let denom = ab
            .affine(2.0 * c, 1.0)?
            .broadcast_add(&a2.broadcast_mul(&b2)?.affine(c2, 0.0)?)?
            .maximum(self.config.min_norm)?;

        let shift = coef_a
            .broadcast_mul(a)?
            .broadcast_add(&coef_b.broadcast_mul(b)?)?
            .broadcast_div(&denom)?
            .affine(2.0, 0.0)?;
        Ok(u.broadcast_add(&shift)?)
    }
}
