//! Configuration types for manifold geometry and optimization.
//!
//! - Poincare ball numerics (BallConfig)
//! - Riemannian SGD (SgdConfig)

mod ball;
mod optim;

pub use self::ball::BallConfig;
pub use self::optim::SgdConfig;
