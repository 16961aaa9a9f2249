//! Error types for manifold operations.
//!
//! Every geometric operation is fallible because it is built from candle
//! tensor ops; candle errors convert into [`ManifoldError::Tensor`] so the
//! `?` operator works throughout the crate.

use thiserror::Error;

/// Result type alias for manifold operations.
pub type ManifoldResult<T> = Result<T, ManifoldError>;

/// Error type for ball/sphere geometry, constrained parameters and optimizers.
#[derive(Error, Debug)]
pub enum ManifoldError {
    // ========== Configuration Errors ==========
    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid curvature (must be negative and finite).
    #[error("Invalid curvature: {0} (must be negative)")]
    InvalidCurvature(f64),

    // ========== Shape Errors ==========
    /// Dimension mismatch between operands.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Full shape mismatch between operands.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Axis addressed from the end does not exist in the tensor.
    #[error("Invalid axis: -{axis} for tensor of rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    // ========== Validation Errors ==========
    /// Invalid input provided to a function.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========== Tensor Engine Errors ==========
    /// Error raised by the candle tensor engine.
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}
