//! Weighted gyromidpoint (Einstein-style weighted Frechet mean approximation).
//!
//! With conformal factors `lambda_i`:
//!
//! `m = 1/2 (x) (sum w_i lambda_i x_i / sum w_i (lambda_i - 1))`
//!
//! In linear-combination mode the midpoint is additionally scaled by the
//! total weight, which turns the mean into a gyro-linear combination.

use candle_core::{Tensor, D};

use super::PoincareBall;
use crate::error::{ManifoldError, ManifoldResult};
use crate::tensor_ops::{axis, clamp_abs};

const DENOM_EPS: f64 = 1e-10;

impl PoincareBall {
    /// Weighted midpoint of `xs` over the `reduce` axes.
    ///
    /// `weights`, when given, broadcasts against `xs` and carries a size-1
    /// feature axis. `reduce = None` reduces over every axis except `dim`.
    /// Axes are resolved against the broadcast of `xs` and `weights`.
    pub fn weighted_midpoint(
        &self,
        xs: &Tensor,
        weights: Option<&Tensor>,
        reduce: Option<&[D]>,
        dim: D,
        keepdim: bool,
        lincomb: bool,
    ) -> ManifoldResult<Tensor> {
        let gamma = self.lambda_x(xs, dim, true)?;
        let (gw, gm1w) = match weights {
            Some(w) => (
                gamma.broadcast_mul(w)?,
                gamma.affine(1.0, -1.0)?.broadcast_mul(w)?,
            ),
            None => (gamma.clone(), gamma.affine(1.0, -1.0)?),
        };
        let num = gw.broadcast_mul(xs)?;

        let feature = axis(&num, dim)?;
        let mut axes = match reduce {
            Some(dims) => dims
                .iter()
                .map(|&d| axis(&num, d))
                .collect::<ManifoldResult<Vec<_>>>()?,
            None => (0..num.rank()).filter(|&a| a != feature).collect(),
        };
        axes.sort_unstable();
        axes.dedup();
        if axes.contains(&feature) {
            return Err(ManifoldError::InvalidInput(
                "cannot reduce over the feature axis".to_string(),
            ));
        }

        let num = num.sum_keepdim(axes.clone())?;
        let den = gm1w.sum_keepdim(axes.clone())?;
        let two_mean = num.broadcast_div(&clamp_abs(&den, DENOM_EPS)?)?;
        let mut mean = self.mobius_scale(0.5, &two_mean, dim)?;

        if lincomb {
            mean = match weights {
                Some(w) => {
                    let total = w.broadcast_as(gw.shape())?.sum_keepdim(axes.clone())?;
                    self.mobius_scalar_mul(&total, &mean, dim)?
                }
                None => {
                    let count: usize = axes.iter().map(|&a| gw.dims()[a]).product();
                    self.mobius_scale(count as f64, &mean, dim)?
                }
            };
        }

        if !keepdim {
            for &a in axes.iter().rev() {
                mean = mean.squeeze(a)?;
            }
        }
        Ok(mean)
    }
}
