//! Hyperbolic neural-network layers on the Poincare ball.
//!
//! Layers take and return points of a [`poincare_manifold::PoincareBall`]
//! stored as candle tensors with the point coordinates on the channel axis.
//! Pooling, batch normalization and linear maps are also available as
//! stateless functions in [`functional`]. Module types own their parameters
//! as [`poincare_manifold::ManifoldParameter`]s so a
//! [`poincare_manifold::RiemannianSgd`] can train them.
//!
//! # Architecture
//!
//! - **config**: Serde-backed layer configuration with validation
//! - **error**: Error handling with LayerError
//! - **functional**: Pooling, batch normalization and linear maps as functions
//! - **pooling**: Max, average and adaptive Mobius pooling layers
//! - **batch_norm**: Mobius batch normalization with running statistics
//! - **linear**: Mobius linear maps between balls
//! - **hyperplanes**: Signed distances to learned Poincare hyperplanes
//! - **centroids**: Weighted gyromidpoints of learned centroids
//! - **graph**: Message passing and hyperbolic graph convolution
//!
//! # Example
//!
//! ```
//! use candle_core::{DType, Device, Tensor};
//! use poincare_layers::{LayerResult, MobiusAvgPool2d, Pool2dConfig};
//! use poincare_manifold::PoincareBall;
//!
//! fn example() -> LayerResult<()> {
//!     let ball = PoincareBall::shared(-1.0)?;
//!     let pool = MobiusAvgPool2d::new(Pool2dConfig::new(2), ball)?;
//!     let x = Tensor::full(0.1f32, (1, 3, 4, 4), &Device::Cpu)?;
//!     let y = pool.forward(&x)?;
//!     assert_eq!(y.dims(), &[1, 3, 2, 2]);
//!     assert_eq!(y.dtype(), DType::F32);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod batch_norm;
pub mod centroids;
pub mod config;
pub mod error;
pub mod functional;
pub mod graph;
pub mod hyperplanes;
pub mod linear;
pub mod nonlinearity;
pub mod pooling;

mod init;

// Re-exports for convenience
pub use batch_norm::MobiusBatchNorm;
pub use centroids::WeightedPoincareCentroids;
pub use config::{
    Aggregation, BatchNormConfig, GraphConvConfig, HyperplaneConfig, LinearConfig, Pool2dConfig,
    MAX_SPATIAL_RANK,
};
pub use error::{LayerError, LayerResult};
pub use functional::{LinearOrigins, RunningStatistics};
pub use graph::{EdgeIndex, GraphConv, HyperbolicGraphConv, MessagePassing};
pub use hyperplanes::Distance2PoincareHyperplanes;
pub use linear::MobiusLinear;
pub use nonlinearity::Nonlinearity;
pub use pooling::{
    MobiusAdaptiveAvgPool2d, MobiusAdaptiveMaxPool2d, MobiusAvgPool2d, MobiusMaxPool2d,
};
