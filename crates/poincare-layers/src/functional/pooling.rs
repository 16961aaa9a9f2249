//! Mobius pooling over `(batch, channel, height, width)` feature maps.
//!
//! The channel axis is the ball axis: every spatial location holds one point.
//!
//! - Max pooling picks, per window, the point with the largest Euclidean norm
//!   (the one farthest from the origin) and gathers its full channel vector.
//! - Average pooling computes the gyromidpoint of every window:
//!   `1/2 (x) (sum lambda_x x / sum (lambda_x - 1))`. Padded positions carry
//!   zero weight, so border windows average only real points.

use candle_core::{DType, Tensor, D};
use poincare_manifold::tensor_ops::clamp_abs;
use poincare_manifold::PoincareBall;
use tracing::debug;

use crate::config::Pool2dConfig;
use crate::error::{LayerError, LayerResult};

/// Ball axis of a `(B, C, H, W)` map.
const CHANNEL_AXIS: D = D::Minus(3);
const DENOM_EPS: f64 = 1e-10;

/// Valid input positions of every output cell, one axis at a time.
struct Windows {
    rows: Vec<Vec<usize>>,
    cols: Vec<Vec<usize>>,
}

impl Windows {
    fn fixed(config: &Pool2dConfig, h: usize, w: usize) -> LayerResult<Self> {
        let (oh, ow) = config.output_size(h, w)?;
        let (sh, sw) = config.stride();
        Ok(Self {
            rows: fixed_axis(h, oh, config.kernel_size.0, sh, config.padding.0, config.dilation.0),
            cols: fixed_axis(w, ow, config.kernel_size.1, sw, config.padding.1, config.dilation.1),
        })
    }

    fn adaptive(output_size: (usize, usize), h: usize, w: usize) -> LayerResult<Self> {
        let (oh, ow) = output_size;
        if oh == 0 || ow == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "adaptive output size must be positive, got {output_size:?}"
            )));
        }
        Ok(Self {
            rows: adaptive_axis(h, oh),
            cols: adaptive_axis(w, ow),
        })
    }

    fn out_shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    fn check_non_empty(&self) -> LayerResult<()> {
        for (row, r) in self.rows.iter().enumerate() {
            for (col, c) in self.cols.iter().enumerate() {
                if r.is_empty() || c.is_empty() {
                    return Err(LayerError::EmptyPoolingWindow { row, col });
                }
            }
        }
        Ok(())
    }
}

fn fixed_axis(
    len: usize,
    out: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    dilation: usize,
) -> Vec<Vec<usize>> {
    (0..out)
        .map(|i| {
            (0..kernel)
                .filter_map(|k| {
                    let pos = (i * stride + k * dilation).checked_sub(padding)?;
                    (pos < len).then_some(pos)
                })
                .collect()
        })
        .collect()
}

fn adaptive_axis(len: usize, out: usize) -> Vec<Vec<usize>> {
    (0..out)
        .map(|i| {
            let start = i * len / out;
            let end = ((i + 1) * len).div_ceil(out);
            (start..end).collect()
        })
        .collect()
}

fn dims4(input: &Tensor) -> LayerResult<(usize, usize, usize, usize)> {
    match *input.dims() {
        [b, c, h, w] => Ok((b, c, h, w)),
        _ => Err(LayerError::InvalidInput(format!(
            "pooling expects a (batch, channel, height, width) tensor, got shape {:?}",
            input.dims()
        ))),
    }
}

// ========== MAX POOLING ==========

fn max_pool_select(input: &Tensor, windows: &Windows) -> LayerResult<(Tensor, Tensor)> {
    let (b, c, h, w) = dims4(input)?;
    windows.check_non_empty()?;
    let (oh, ow) = windows.out_shape();

    let scores = input
        .detach()
        .sqr()?
        .sum(1)?
        .to_dtype(DType::F64)?
        .flatten_all()?
        .to_vec1::<f64>()?;

    let mut indices = Vec::with_capacity(b * oh * ow);
    for batch in 0..b {
        let plane = &scores[batch * h * w..(batch + 1) * h * w];
        for rows in &windows.rows {
            for cols in &windows.cols {
                let mut best: Option<(usize, f64)> = None;
                for &r in rows {
                    for &col in cols {
                        let flat = r * w + col;
                        let score = plane[flat];
                        if score.is_nan() {
                            continue;
                        }
                        // strict comparison keeps the first maximum
                        if best.map_or(true, |(_, s)| score > s) {
                            best = Some((flat, score));
                        }
                    }
                }
                let flat = best.map(|(i, _)| i).unwrap_or(rows[0] * w + cols[0]);
                indices.push(flat as u32);
            }
        }
    }

    let device = input.device();
    let indices = Tensor::from_vec(indices, (b, 1, oh * ow), device)?;
    let gather_idx = indices.broadcast_as((b, c, oh * ow))?.contiguous()?;
    let out = input
        .reshape((b, c, h * w))?
        .gather(&gather_idx, 2)?
        .reshape((b, c, oh, ow))?;
    Ok((out, indices.reshape((b, 1, oh, ow))?))
}

/// Mobius max pooling: per window, keep the point with the largest norm.
pub fn mobius_max_pool2d(input: &Tensor, config: &Pool2dConfig) -> LayerResult<Tensor> {
    Ok(mobius_max_pool2d_with_indices(input, config)?.0)
}

/// Mobius max pooling that also returns the selected positions.
///
/// Indices are flat `h * W + w` offsets of shape `(B, 1, OH, OW)`: gathering
/// the input reshaped to `(B, C, H * W)` at the indices broadcast over channels
/// reproduces the pooled output.
pub fn mobius_max_pool2d_with_indices(
    input: &Tensor,
    config: &Pool2dConfig,
) -> LayerResult<(Tensor, Tensor)> {
    let (_, _, h, w) = dims4(input)?;
    let windows = Windows::fixed(config, h, w)?;
    debug!(input = ?input.dims(), output = ?windows.out_shape(), "mobius max pool");
    max_pool_select(input, &windows)
}

/// Adaptive Mobius max pooling to a fixed `(OH, OW)` output.
pub fn mobius_adaptive_max_pool2d(
    input: &Tensor,
    output_size: (usize, usize),
) -> LayerResult<Tensor> {
    Ok(mobius_adaptive_max_pool2d_with_indices(input, output_size)?.0)
}

/// Adaptive Mobius max pooling that also returns the selected positions.
pub fn mobius_adaptive_max_pool2d_with_indices(
    input: &Tensor,
    output_size: (usize, usize),
) -> LayerResult<(Tensor, Tensor)> {
    let (_, _, h, w) = dims4(input)?;
    let windows = Windows::adaptive(output_size, h, w)?;
    debug!(input = ?input.dims(), output = ?output_size, "mobius adaptive max pool");
    max_pool_select(input, &windows)
}

// ========== AVERAGE POOLING ==========

/// Sum `x` over the windows of one axis: output `i` adds the positions in
/// `windows[i]`. Windows shorter than the widest one read a zero slice
/// appended past the end of the axis.
fn window_sum(x: &Tensor, windows: &[Vec<usize>], axis: usize) -> LayerResult<Tensor> {
    let len = x.dim(axis)?;
    let padded = x.pad_with_zeros(axis, 0, 1)?;
    let width = windows.iter().map(Vec::len).max().unwrap_or(0);

    let mut total: Option<Tensor> = None;
    for k in 0..width {
        let ids: Vec<u32> = windows
            .iter()
            .map(|window| window.get(k).copied().unwrap_or(len) as u32)
            .collect();
        let ids = Tensor::from_vec(ids, windows.len(), x.device())?;
        let part = padded.index_select(&ids, axis)?;
        total = Some(match total {
            Some(t) => t.add(&part)?,
            None => part,
        });
    }
    total.ok_or_else(|| LayerError::InvalidInput("pooling window list is empty".to_string()))
}

fn avg_pool_midpoint(
    input: &Tensor,
    windows: &Windows,
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    dims4(input)?;
    windows.check_non_empty()?;
    let pool = |t: &Tensor| -> LayerResult<Tensor> {
        window_sum(&window_sum(t, &windows.rows, 2)?, &windows.cols, 3)
    };

    let lam = ball.lambda_x(input, CHANNEL_AXIS, true)?;
    let num = pool(&lam.broadcast_mul(input)?)?;
    let den = pool(&lam.affine(1.0, -1.0)?)?;

    let two_mean = num.broadcast_div(&clamp_abs(&den, DENOM_EPS)?)?;
    Ok(ball.mobius_scale(0.5, &two_mean, CHANNEL_AXIS)?)
}

/// Mobius average pooling: gyromidpoint of each window.
pub fn mobius_avg_pool2d(
    input: &Tensor,
    config: &Pool2dConfig,
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    let (_, _, h, w) = dims4(input)?;
    let windows = Windows::fixed(config, h, w)?;
    debug!(input = ?input.dims(), output = ?windows.out_shape(), "mobius avg pool");
    avg_pool_midpoint(input, &windows, ball)
}

/// Adaptive Mobius average pooling to a fixed `(OH, OW)` output.
pub fn mobius_adaptive_avg_pool2d(
    input: &Tensor,
    output_size: (usize, usize),
    ball: &PoincareBall,
) -> LayerResult<Tensor> {
    let (_, _, h, w) = dims4(input)?;
    let windows = Windows::adaptive(output_size, h, w)?;
    debug!(input = ?input.dims(), output = ?output_size, "mobius adaptive avg pool");
    avg_pool_midpoint(input, &windows, ball)
}
