//! Manifold-constrained trainable parameters.
//!
//! A [`ManifoldParameter`] pairs a candle [`Var`] with the manifold its rows
//! must stay on. Every write goes through [`ManifoldParameter::set`], which
//! projects before storing, so the constraint holds after each update.

use std::sync::Arc;

use candle_core::{Tensor, Var, D};

use crate::ball::PoincareBall;
use crate::error::ManifoldResult;
use crate::sphere::Sphere;

/// Manifold a parameter is constrained to. The feature axis is always the last one.
#[derive(Debug, Clone)]
pub enum Manifold {
    /// Unconstrained.
    Euclidean,
    /// Poincare ball, shared with the layers that use it.
    Ball(Arc<PoincareBall>),
    /// Unit sphere.
    Sphere(Sphere),
}

impl Manifold {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Manifold::Euclidean => "euclidean",
            Manifold::Ball(_) => "ball",
            Manifold::Sphere(_) => "sphere",
        }
    }

    /// Project `x` onto the manifold.
    pub fn projx(&self, x: &Tensor) -> ManifoldResult<Tensor> {
        match self {
            Manifold::Euclidean => Ok(x.clone()),
            Manifold::Ball(ball) => ball.projx(x, D::Minus1),
            Manifold::Sphere(sphere) => sphere.projx(x, D::Minus1),
        }
    }

    /// Convert a Euclidean gradient at `x` into a Riemannian one.
    ///
    /// On the ball this rescales by the inverse metric `1 / lambda_x^2`.
    pub fn egrad2rgrad(&self, x: &Tensor, grad: &Tensor) -> ManifoldResult<Tensor> {
        match self {
            Manifold::Euclidean => Ok(grad.clone()),
            Manifold::Ball(ball) => {
                let lam = ball.lambda_x(x, D::Minus1, true)?;
                Ok(grad.broadcast_div(&lam.sqr()?)?)
            }
            Manifold::Sphere(sphere) => sphere.egrad2rgrad(x, grad, D::Minus1),
        }
    }

    /// Move from `x` along tangent vector `u`.
    pub fn retr(&self, x: &Tensor, u: &Tensor) -> ManifoldResult<Tensor> {
        match self {
            Manifold::Euclidean => Ok(x.add(u)?),
            Manifold::Ball(ball) => {
                let y = ball.expmap(x, u, D::Minus1)?;
                ball.projx(&y, D::Minus1)
            }
            Manifold::Sphere(sphere) => sphere.retr(x, u, D::Minus1),
        }
    }

    /// Carry tangent vector `v` at `x` to the tangent space at `y`.
    pub fn transp(&self, x: &Tensor, y: &Tensor, v: &Tensor) -> ManifoldResult<Tensor> {
        match self {
            Manifold::Euclidean => Ok(v.clone()),
            Manifold::Ball(ball) => ball.transp(x, y, v, D::Minus1),
            Manifold::Sphere(sphere) => sphere.transp(y, v, D::Minus1),
        }
    }

    /// Whether `x` satisfies the constraint within `tol`.
    pub fn check_point(&self, x: &Tensor, tol: f64) -> ManifoldResult<bool> {
        match self {
            Manifold::Euclidean => Ok(true),
            Manifold::Ball(ball) => ball.check_point(x, D::Minus1, tol),
            Manifold::Sphere(sphere) => sphere.check_point(x, D::Minus1, tol),
        }
    }
}

/// Trainable tensor that keeps itself on a manifold.
///
/// Clones share storage with the original, so a layer can hand its
/// parameters to an optimizer and observe the updates.
#[derive(Debug, Clone)]
pub struct ManifoldParameter {
    var: Var,
    manifold: Manifold,
}

impl ManifoldParameter {
    /// Create a parameter from an initial value, projected onto `manifold`.
    pub fn new(init: &Tensor, manifold: Manifold) -> ManifoldResult<Self> {
        let value = manifold.projx(&init.detach())?;
        let var = Var::from_tensor(&value)?;
        Ok(Self { var, manifold })
    }

    /// Unconstrained parameter.
    pub fn euclidean(init: &Tensor) -> ManifoldResult<Self> {
        Self::new(init, Manifold::Euclidean)
    }

    /// Parameter on a shared Poincare ball.
    pub fn ball(init: &Tensor, ball: Arc<PoincareBall>) -> ManifoldResult<Self> {
        Self::new(init, Manifold::Ball(ball))
    }

    /// Parameter on the unit sphere.
    pub fn sphere(init: &Tensor) -> ManifoldResult<Self> {
        Self::new(init, Manifold::Sphere(Sphere))
    }

    /// Tracked tensor to use in forward passes.
    #[inline]
    pub fn as_tensor(&self) -> &Tensor {
        self.var.as_tensor()
    }

    /// Underlying candle variable.
    #[inline]
    pub fn var(&self) -> &Var {
        &self.var
    }

    #[inline]
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        self.var.as_tensor().dims()
    }

    /// Overwrite the value, projecting onto the manifold first.
    pub fn set(&self, value: &Tensor) -> ManifoldResult<()> {
        // candle refuses to set a variable from its own storage
        let projected = self.manifold.projx(&value.detach())?.copy()?;
        self.var.set(&projected)?;
        Ok(())
    }

    /// Re-project the current value in place.
    pub fn project(&self) -> ManifoldResult<()> {
        let current = self.var.as_tensor().detach();
        self.set(&current)
    }

    /// Whether the current value satisfies the constraint within `tol`.
    pub fn is_on_manifold(&self, tol: f64) -> ManifoldResult<bool> {
        self.manifold.check_point(self.var.as_tensor(), tol)
    }
}
