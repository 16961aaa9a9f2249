//! Error types for hyperbolic layers.
//!
//! Layer code runs on top of [`poincare_manifold`]; its errors and raw candle
//! errors both convert into [`LayerError`] so `?` works across the crate.

use poincare_manifold::ManifoldError;
use thiserror::Error;

/// Result type alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

/// Error type for layer construction and forward passes.
#[derive(Error, Debug)]
pub enum LayerError {
    // ========== Configuration Errors ==========
    /// Invalid layer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input and output dimensions are incompatible on a shared ball.
    #[error("Ball mismatch: {0}")]
    BallMismatch(String),

    // ========== Shape Errors ==========
    /// Feature dimension mismatch.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Full shape mismatch.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    // ========== Validation Errors ==========
    /// Invalid input tensor.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Average pooling window covers only padding.
    #[error("Pooling window at ({row}, {col}) contains no input positions")]
    EmptyPoolingWindow { row: usize, col: usize },

    /// A computed quantity is NaN or infinite.
    #[error("Non-finite values in {0}")]
    NonFinite(&'static str),

    // ========== Propagated Errors ==========
    /// Error raised by the manifold layer.
    #[error("Manifold error: {0}")]
    Manifold(#[from] ManifoldError),

    /// Error raised by the candle tensor engine.
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

impl LayerError {
    /// Shorthand for a shape mismatch.
    pub fn shape(context: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        LayerError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
