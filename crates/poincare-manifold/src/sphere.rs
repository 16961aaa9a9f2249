//! Unit sphere manifold, used for unit-norm constrained parameters such as
//! hyperplane normals.

use candle_core::{Tensor, D};

use crate::error::ManifoldResult;
use crate::tensor_ops::{dot, norm};

const MIN_NORM: f64 = 1e-15;

/// Unit sphere `{x : ||x|| = 1}` along the feature axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sphere;

impl Sphere {
    /// Normalize `x` onto the sphere.
    pub fn projx(&self, x: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        Ok(x.broadcast_div(&norm(x, dim, MIN_NORM)?)?)
    }

    /// Project `u` onto the tangent space at `x` (remove the radial part).
    pub fn proju(&self, x: &Tensor, u: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        let radial = dot(x, u, dim)?.broadcast_mul(x)?;
        Ok(u.broadcast_sub(&radial)?)
    }

    /// Euclidean gradient to Riemannian gradient.
    #[inline]
    pub fn egrad2rgrad(&self, x: &Tensor, grad: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        self.proju(x, grad, dim)
    }

    /// Retraction: step in the ambient space and renormalize.
    pub fn retr(&self, x: &Tensor, u: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        self.projx(&x.broadcast_add(u)?, dim)
    }

    /// Vector transport by projection onto the tangent space at `y`.
    #[inline]
    pub fn transp(&self, y: &Tensor, v: &Tensor, dim: D) -> ManifoldResult<Tensor> {
        self.proju(y, v, dim)
    }

    /// Check that every row has unit norm within `tol`.
    pub fn check_point(&self, x: &Tensor, dim: D, tol: f64) -> ManifoldResult<bool> {
        let dev = norm(x, dim, MIN_NORM)?
            .affine(1.0, -1.0)?
            .abs()?
            .flatten_all()?
            .max(0)?
            .to_dtype(candle_core::DType::F64)?
            .to_scalar::<f64>()?;
        Ok(dev <= tol)
    }
}
