//! Geodesic distances on the Poincare ball.
//!
//! - d(x, y) = 2 / sqrt(c) artanh(sqrt(c) ||(-x) (+) y||)
//! - d(x, H_{p,a}) = arsinh(2 sqrt(c) <(-p) (+) x, a> / ((1 - c||(-p) (+) x||^2) ||a||)) / sqrt(c)

use candle_core::{Tensor, D};

use super::PoincareBall;
use crate::error::ManifoldResult;
use crate::tensor_ops::{arsinh, artanh, axis, dot, norm, sq_norm};

impl PoincareBall {
    fn squeeze_unless(t: Tensor, dim: D, keepdim: bool) -> ManifoldResult<Tensor> {
        if keepdim {
            return Ok(t);
        }
        let ax = axis(&t, dim)?;
        Ok(t.squeeze(ax)?)
    }

    /// Geodesic distance between `x` and `y`.
    pub fn dist(&self, x: &Tensor, y: &Tensor, dim: D, keepdim: bool) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let sub = self.mobius_sub(x, y, dim)?;
        let sub_norm = norm(&sub, dim, self.config.min_norm)?;
        let d = artanh(&sub_norm.affine(sqrt_c, 0.0)?)?.affine(2.0 / sqrt_c, 0.0)?;
        Self::squeeze_unless(d, dim, keepdim)
    }

    /// Squared geodesic distance.
    pub fn dist2(&self, x: &Tensor, y: &Tensor, dim: D, keepdim: bool) -> ManifoldResult<Tensor> {
        Ok(self.dist(x, y, dim, keepdim)?.sqr()?)
    }

    /// Geodesic distance from the origin.
    pub fn dist0(&self, x: &Tensor, dim: D, keepdim: bool) -> ManifoldResult<Tensor> {
        let sqrt_c = self.sqrt_c();
        let x_norm = norm(x, dim, self.config.min_norm)?;
        let d = artanh(&x_norm.affine(sqrt_c, 0.0)?)?.affine(2.0 / sqrt_c, 0.0)?;
        Self::squeeze_unless(d, dim, keepdim)
    }

    /// Distance from `x` to the hyperplane through `p` orthogonal to `a`.
    ///
    /// With `signed` the result is positive on the side `a` points to. With
    /// `scaled` it is multiplied by `||a||`.
    #[allow(clippy::too_many_arguments)]
    pub fn dist2plane(
        &self,
        x: &Tensor,
        p: &Tensor,
        a: &Tensor,
        dim: D,
        signed: bool,
        scaled: bool,
        keepdim: bool,
    ) -> ManifoldResult<Tensor> {
        let c = self.c();
        let sqrt_c = self.sqrt_c();
        let min_norm = self.config.min_norm;

        let diff = self.mobius_sub(p, x, dim)?;
        let diff_norm2 = sq_norm(&diff, dim)?.maximum(min_norm)?;
        let mut diff_a = dot(&diff, a, dim)?;
        if !signed {
            diff_a = diff_a.abs()?;
        }
        let a_norm = norm(a, dim, min_norm)?;

        let num = diff_a.affine(2.0 * sqrt_c, 0.0)?;
        let denom = diff_norm2
            .affine(-c, 1.0)?
            .broadcast_mul(&a_norm)?
            .maximum(min_norm)?;
        let mut d = arsinh(&num.broadcast_div(&denom)?)?;
        if scaled {
            d = d.broadcast_mul(&a_norm)?;
        }
        let d = d.affine(1.0 / sqrt_c, 0.0)?;
        Self::squeeze_unless(d, dim, keepdim)
    }
}
