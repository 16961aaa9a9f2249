//! 2D pooling window configuration.

use serde::{Deserialize, Serialize};

use crate::error::LayerError;

/// Window geometry of a 2D pooling pass, `(height, width)` per field.
///
/// # Example
/// ```
/// use poincare_layers::config::Pool2dConfig;
///
/// let config = Pool2dConfig::new(2);
/// assert_eq!(config.stride(), (2, 2));
/// assert_eq!(config.output_size(4, 4).unwrap(), (2, 2));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pool2dConfig {
    /// Window size.
    pub kernel_size: (usize, usize),

    /// Window step. `None` uses `kernel_size`.
    pub stride: Option<(usize, usize)>,

    /// Implicit padding on both sides. At most half the kernel.
    /// Default: (0, 0)
    pub padding: (usize, usize),

    /// Spacing between window elements.
    /// Default: (1, 1)
    pub dilation: (usize, usize),

    /// Use ceil instead of floor when computing the output size.
    /// Default: false
    pub ceil_mode: bool,
}

impl Pool2dConfig {
    /// Square window with stride equal to the kernel.
    pub fn new(kernel_size: usize) -> Self {
        Self {
            kernel_size: (kernel_size, kernel_size),
            stride: None,
            padding: (0, 0),
            dilation: (1, 1),
            ceil_mode: false,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some((stride, stride));
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = (padding, padding);
        self
    }

    pub fn with_dilation(mut self, dilation: usize) -> Self {
        self.dilation = (dilation, dilation);
        self
    }

    pub fn with_ceil_mode(mut self, ceil_mode: bool) -> Self {
        self.ceil_mode = ceil_mode;
        self
    }

    /// Effective stride.
    #[inline]
    pub fn stride(&self) -> (usize, usize) {
        self.stride.unwrap_or(self.kernel_size)
    }

    /// Validate the window geometry (fails on the first problem).
    pub fn validate(&self) -> Result<(), LayerError> {
        let (kh, kw) = self.kernel_size;
        let (sh, sw) = self.stride();
        let (dh, dw) = self.dilation;
        if kh == 0 || kw == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "kernel_size must be positive, got {:?}",
                self.kernel_size
            )));
        }
        if sh == 0 || sw == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "stride must be positive, got {:?}",
                (sh, sw)
            )));
        }
        if dh == 0 || dw == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "dilation must be positive, got {:?}",
                self.dilation
            )));
        }
        let (ph, pw) = self.padding;
        if ph > kh / 2 || pw > kw / 2 {
            return Err(LayerError::InvalidConfig(format!(
                "padding {:?} must be at most half of kernel_size {:?}",
                self.padding, self.kernel_size
            )));
        }
        Ok(())
    }

    /// Output `(height, width)` for an input of `h x w`.
    pub fn output_size(&self, h: usize, w: usize) -> Result<(usize, usize), LayerError> {
        self.validate()?;
        let (sh, sw) = self.stride();
        let (kh, kw) = self.kernel_size;
        let (ph, pw) = self.padding;
        let (dh, dw) = self.dilation;
        let oh = pooled_len(h, kh, sh, ph, dh, self.ceil_mode)?;
        let ow = pooled_len(w, kw, sw, pw, dw, self.ceil_mode)?;
        Ok((oh, ow))
    }
}

/// Output length along one axis.
///
/// In ceil mode the last window must start inside the input or the left padding.
fn pooled_len(
    len: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    dilation: usize,
    ceil_mode: bool,
) -> Result<usize, LayerError> {
    let span = dilation * (kernel - 1) + 1;
    let padded = len + 2 * padding;
    if padded < span {
        return Err(LayerError::InvalidInput(format!(
            "input length {len} with padding {padding} is smaller than the window span {span}"
        )));
    }
    let room = padded - span;
    let mut out = if ceil_mode {
        room.div_ceil(stride) + 1
    } else {
        room / stride + 1
    };
    if ceil_mode && (out - 1) * stride >= len + padding {
        out -= 1;
    }
    Ok(out)
}
