//! Mobius linear map between two (possibly different) balls.
//!
//! | origins given | same ball | behaviour |
//! |---|---|---|
//! | both | yes | log at source -> `W` -> transport source to target -> exp at target |
//! | both | no  | log at source -> `W` -> exp at target |
//! | none | yes | Mobius matvec |
//! | none | no  | log at origin -> `W` -> exp at origin of the output ball |
//!
//! A bias point on the output ball is Mobius-added last when given. The
//! weight has shape `(in, out)` and is applied as `x W` in every branch.

use std::sync::Arc;

use candle_core::{Tensor, D};
use poincare_manifold::tensor_ops::matmul_last;
use poincare_manifold::PoincareBall;
use tracing::debug;

use crate::error::{LayerError, LayerResult};

/// Tangent-space origins of a Mobius linear map. Either both or neither.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearOrigins<'a> {
    pub source: Option<&'a Tensor>,
    pub target: Option<&'a Tensor>,
}

impl<'a> LinearOrigins<'a> {
    /// Use the ball origins.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(source: &'a Tensor, target: &'a Tensor) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
        }
    }
}

fn last_dim(t: &Tensor) -> LayerResult<usize> {
    t.dims().last().copied().ok_or_else(|| {
        LayerError::InvalidInput("expected a tensor with a feature axis, got a scalar".to_string())
    })
}

fn check_dim(t: &Tensor, expected: usize) -> LayerResult<()> {
    let actual = last_dim(t)?;
    if actual != expected {
        return Err(LayerError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Apply a Mobius linear map from `ball` to `ball_out`.
///
/// "Same ball" means `ball` and `ball_out` are the same shared instance.
pub fn mobius_linear(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    origins: &LinearOrigins<'_>,
    ball: &Arc<PoincareBall>,
    ball_out: &Arc<PoincareBall>,
) -> LayerResult<Tensor> {
    let (d_in, d_out) = weight.dims2()?;
    check_dim(input, d_in)?;
    if let Some(bias) = bias {
        check_dim(bias, d_out)?;
    }
    let same_ball = PoincareBall::same(ball, ball_out);
    let dim = D::Minus1;

    let output = match (origins.source, origins.target) {
        (Some(source), Some(target)) => {
            check_dim(source, d_in)?;
            check_dim(target, d_out)?;
            let tangent = ball.logmap(source, input, dim)?;
            let mut mapped = matmul_last(&tangent, weight)?;
            if same_ball {
                if d_in != d_out {
                    return Err(LayerError::BallMismatch(format!(
                        "transport between origins of one ball needs equal dimensions, \
                         got {d_in} -> {d_out}"
                    )));
                }
                mapped = ball.transp(source, target, &mapped, dim)?;
            }
            debug!(same_ball, d_in, d_out, "mobius linear through explicit origins");
            ball_out.expmap(target, &mapped, dim)?
        }
        (None, None) if same_ball => {
            debug!(d_in, d_out, "mobius linear via matvec");
            ball.mobius_matvec(weight, input)?
        }
        (None, None) => {
            debug!(d_in, d_out, "mobius linear between balls through the origin");
            let tangent = ball.logmap0(input, dim)?;
            ball_out.expmap0(&matmul_last(&tangent, weight)?, dim)?
        }
        _ => {
            return Err(LayerError::InvalidConfig(
                "source and target origins must be given together".to_string(),
            ))
        }
    };

    match bias {
        Some(bias) => Ok(ball_out.mobius_add(&output, bias, dim)?),
        None => Ok(output),
    }
}
