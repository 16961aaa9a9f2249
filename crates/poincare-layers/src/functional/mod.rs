//! Stateless hyperbolic layer functions.
//!
//! - `pooling`: Mobius max/average pooling, fixed and adaptive windows
//! - `batch_norm`: Mobius batch normalization with running statistics
//! - `linear`: Mobius linear maps between balls

mod batch_norm;
mod linear;
mod pooling;


pub use self::batch_norm::{
    mobius_batch_norm, mobius_batch_norm1d, mobius_batch_norm2d, mobius_batch_norm_nd,
    RunningStatistics,
};
pub use self::linear::{mobius_linear, LinearOrigins};
pub use self::pooling::{
    mobius_adaptive_avg_pool2d, mobius_adaptive_max_pool2d,
    mobius_adaptive_max_pool2d_with_indices, mobius_avg_pool2d, mobius_max_pool2d,
    mobius_max_pool2d_with_indices,
};
