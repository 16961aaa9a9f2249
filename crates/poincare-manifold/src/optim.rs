//! Riemannian SGD for manifold-constrained candle parameters.
//!
//! Per parameter and step:
//! - Euclidean gradient -> Riemannian gradient (`egrad2rgrad`)
//! - Optional momentum buffer, transported along with the step
//! - Retraction back onto the manifold (`expmap` on the ball)
//! - Periodic re-projection of every parameter (`stabilize_every`)

use candle_core::backprop::GradStore;
use candle_core::Tensor;
use tracing::{debug, trace};

use crate::config::SgdConfig;
use crate::error::ManifoldResult;
use crate::parameter::ManifoldParameter;

/// A tracked parameter with its momentum buffer.
struct TrackedParam {
    param: ManifoldParameter,
    momentum: Option<Tensor>,
}

/// Riemannian stochastic gradient descent.
pub struct RiemannianSgd {
    config: SgdConfig,
    params: Vec<TrackedParam>,
    /// Global step counter (drives stabilization).
    step: usize,
}

impl RiemannianSgd {
    /// Create an optimizer after validating `config`.
    pub fn new(config: SgdConfig) -> ManifoldResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            params: Vec::new(),
            step: 0,
        })
    }

    /// Register a trainable parameter. The optimizer updates it through a
    /// shared handle, so the owning layer sees every step.
    pub fn add_param(&mut self, param: ManifoldParameter) {
        self.params.push(TrackedParam {
            param,
            momentum: None,
        });
    }

    /// Register several parameters at once.
    pub fn add_params<I: IntoIterator<Item = ManifoldParameter>>(&mut self, params: I) {
        for param in params {
            self.add_param(param);
        }
    }

    /// Backpropagate `loss` and perform one optimization step.
    pub fn step(&mut self, loss: &Tensor) -> ManifoldResult<()> {
        let grads = loss.backward()?;
        self.step_with_grads(&grads)
    }

    /// Perform one optimization step with precomputed gradients.
    ///
    /// Parameters without a gradient are left untouched.
    pub fn step_with_grads(&mut self, grads: &GradStore) -> ManifoldResult<()> {
        self.step += 1;
        let lr = self.config.learning_rate;
        let momentum = self.config.momentum;
        let dampening = self.config.dampening;

        let mut updated = 0usize;
        for tracked in &mut self.params {
            let grad = match grads.get(tracked.param.as_tensor()) {
                Some(g) => g.detach(),
                None => continue,
            };
            let manifold = tracked.param.manifold().clone();
            let x = tracked.param.as_tensor().detach();
            let rgrad = manifold.egrad2rgrad(&x, &grad)?;

            let direction = if momentum > 0.0 {
                let buf = match tracked.momentum.take() {
                    Some(buf) => buf
                        .affine(momentum, 0.0)?
                        .add(&rgrad.affine(1.0 - dampening, 0.0)?)?,
                    None => rgrad,
                };
                tracked.momentum = Some(buf.clone());
                buf
            } else {
                rgrad
            };

            let new_x = manifold.retr(&x, &direction.affine(-lr, 0.0)?)?;
            if let Some(buf) = tracked.momentum.take() {
                tracked.momentum = Some(manifold.transp(&x, &new_x, &buf)?.detach());
            }
            tracked.param.set(&new_x)?;
            updated += 1;
            trace!(manifold = manifold.name(), dims = ?x.dims(), "parameter updated");
        }

        debug!(step = self.step, updated, "riemannian sgd step");

        if let Some(every) = self.config.stabilize_every {
            if self.step % every == 0 {
                self.stabilize()?;
            }
        }
        Ok(())
    }

    /// Re-project every parameter and its momentum onto the manifold.
    pub fn stabilize(&mut self) -> ManifoldResult<()> {
        for tracked in &mut self.params {
            tracked.param.project()?;
            if let Some(buf) = tracked.momentum.take() {
                let x = tracked.param.as_tensor().detach();
                tracked.momentum = Some(tracked.param.manifold().transp(&x, &x, &buf)?);
            }
        }
        debug!(step = self.step, params = self.params.len(), "stabilized parameters");
        Ok(())
    }

    /// Drop all momentum buffers.
    pub fn reset_momentum(&mut self) {
        for tracked in &mut self.params {
            tracked.momentum = None;
        }
    }

    /// Get the current global step.
    pub fn global_step(&self) -> usize {
        self.step
    }

    /// Get the number of tracked parameters.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// Get the optimizer configuration.
    pub fn config(&self) -> &SgdConfig {
        &self.config
    }
}
