//! Differentiable Poincare ball geometry over candle tensors.
//!
//! This crate provides the manifold layer the hyperbolic neural-network
//! layers are built on: Mobius gyrovector arithmetic, exponential and
//! logarithmic maps, parallel transport, geodesics, distances, weighted
//! midpoints, manifold-constrained parameters and a Riemannian optimizer.
//!
//! # Architecture
//!
//! - **config**: Ball numerics and optimizer configuration
//! - **error**: Error handling with ManifoldError
//! - **ball**: Poincare ball model with Mobius operations
//! - **sphere**: Unit sphere for unit-norm parameters
//! - **parameter**: Manifold-constrained candle variables
//! - **optim**: Riemannian SGD
//! - **tensor_ops**: Norms, inner products and inverse hyperbolic functions
//!
//! # Example
//!
//! ```
//! use candle_core::{Device, Tensor, D};
//! use poincare_manifold::{ManifoldResult, PoincareBall};
//!
//! fn example() -> ManifoldResult<()> {
//!     let ball = PoincareBall::shared(-1.0)?;
//!     let x = Tensor::new(&[[0.1f32, 0.2]], &Device::Cpu)?;
//!     let y = Tensor::new(&[[-0.3f32, 0.4]], &Device::Cpu)?;
//!     let d = ball.dist(&x, &y, D::Minus1, false)?;
//!     assert_eq!(d.dims(), &[1]);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod ball;
pub mod config;
pub mod error;
pub mod optim;
pub mod parameter;
pub mod sphere;
pub mod tensor_ops;

// Re-exports for convenience
pub use ball::PoincareBall;
pub use config::{BallConfig, SgdConfig};
pub use error::{ManifoldError, ManifoldResult};
pub use optim::RiemannianSgd;
pub use parameter::{Manifold, ManifoldParameter};
pub use sphere::Sphere;
