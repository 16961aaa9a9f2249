//! Small differentiable helpers shared by the ball and sphere.
//!
//! Axes are addressed from the end of a tensor's shape with [`candle_core::D`]
//! so that operands of different rank broadcast the way the Mobius formulas
//! expect (`D::Minus1` is the last axis).

use candle_core::{Tensor, D};

use crate::error::{ManifoldError, ManifoldResult};

/// Distance of an axis from the end of the shape (`D::Minus1` -> 1).
#[inline]
pub fn from_end(dim: D) -> usize {
    match dim {
        D::Minus1 => 1,
        D::Minus2 => 2,
        D::Minus(k) => k,
    }
}

/// Resolve an axis addressed from the end into an absolute index of `t`.
pub fn axis(t: &Tensor, dim: D) -> ManifoldResult<usize> {
    let k = from_end(dim);
    let rank = t.rank();
    if k == 0 || k > rank {
        return Err(ManifoldError::InvalidAxis { axis: k, rank });
    }
    Ok(rank - k)
}

/// Squared Euclidean norm along `dim`, kept as a size-1 axis.
pub fn sq_norm(x: &Tensor, dim: D) -> ManifoldResult<Tensor> {
    let ax = axis(x, dim)?;
    Ok(x.sqr()?.sum_keepdim(ax)?)
}

/// Euclidean norm along `dim`, clamped from below by `min_norm`.
pub fn norm(x: &Tensor, dim: D, min_norm: f64) -> ManifoldResult<Tensor> {
    Ok(sq_norm(x, dim)?.maximum(min_norm * min_norm)?.sqrt()?)
}

/// Inner product of two broadcastable tensors along `dim`, kept as a size-1 axis.
pub fn dot(x: &Tensor, y: &Tensor, dim: D) -> ManifoldResult<Tensor> {
    let prod = x.broadcast_mul(y)?;
    let ax = axis(&prod, dim)?;
    Ok(prod.sum_keepdim(ax)?)
}

/// Elementwise sign with `sign(0) = 1`. Carries no gradient.
pub fn sign(x: &Tensor) -> ManifoldResult<Tensor> {
    Ok(x.ge(0.0)?.to_dtype(x.dtype())?.affine(2.0, -1.0)?)
}

/// `sign(x) * max(|x|, eps)`: keeps denominators away from zero without
/// flipping their sign.
pub fn clamp_abs(x: &Tensor, eps: f64) -> ManifoldResult<Tensor> {
    Ok(x.abs()?.maximum(eps)?.mul(&sign(x)?)?)
}

/// Inverse hyperbolic tangent, input clamped to `(-1, 1)`.
pub fn artanh(x: &Tensor) -> ManifoldResult<Tensor> {
    const BOUND: f64 = 1.0 - 1e-7;
    let x = x.clamp(-BOUND, BOUND)?;
    let num = x.affine(1.0, 1.0)?;
    let den = x.affine(-1.0, 1.0)?;
    Ok(num.div(&den)?.log()?.affine(0.5, 0.0)?)
}

/// Inverse hyperbolic sine, evaluated on `|x|` and re-signed for accuracy
/// at large negative inputs.
pub fn arsinh(x: &Tensor) -> ManifoldResult<Tensor> {
    let ax = x.abs()?;
    let inner = ax.sqr()?.affine(1.0, 1.0)?.sqrt()?.add(&ax)?;
    Ok(inner.log()?.mul(&sign(x)?)?)
}

/// Apply `w` as a right-multiplied linear map along the last axis:
/// `(..., in) x (in, out) -> (..., out)`.
pub fn matmul_last(x: &Tensor, w: &Tensor) -> ManifoldResult<Tensor> {
    let (w_in, w_out) = w.dims2()?;
    let dims = x.dims().to_vec();
    let Some(&x_in) = dims.last() else {
        return Err(ManifoldError::InvalidInput(
            "cannot apply a linear map to a scalar tensor".to_string(),
        ));
    };
    if x_in != w_in {
        return Err(ManifoldError::DimensionMismatch {
            expected: w_in,
            actual: x_in,
        });
    }
    let lead: usize = dims[..dims.len() - 1].iter().product();
    let mut out_dims = dims;
    if let Some(last) = out_dims.last_mut() {
        *last = w_out;
    }
    let flat = x.reshape((lead, x_in))?.matmul(&w.contiguous()?)?;
    Ok(flat.reshape(out_dims)?)
}
