//! PoincareBall implementation with Mobius gyrovector operations over candle tensors.
//!
//! # Poincare Ball Model
//!
//! The Poincare ball model represents hyperbolic space of curvature `-c` as
//! the open ball of radius `1/sqrt(c)`. Every operation here is built from
//! differentiable candle ops, so gradients flow through the geometry.
//!
//! # Mathematics
//!
//! - Mobius addition: x + y = ((1 + 2c<x,y> + c||y||^2)x + (1 - c||x||^2)y) /
//!   (1 + 2c<x,y> + c^2||x||^2||y||^2)
//! - Distance: d(x,y) = (2/sqrt(c)) * artanh(sqrt(c) * ||(-x) + y||)
//! - Exp map: Maps tangent vector at x to point on manifold
//! - Log map: Maps point y to tangent vector at x (inverse of exp map)
//!
//! # Module Structure
//!
//! - `types`: Core `PoincareBall` struct definition
//! - `arithmetic`: Mobius addition, scalar multiplication, matvec, gyration
//! - `maps`: Exponential and logarithmic maps, transport, geodesics
//! - `distance`: Point and hyperplane distances
//! - `midpoint`: Weighted gyromidpoint

mod arithmetic;
mod distance;
mod maps;
mod midpoint;
mod types;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod tests_roundtrip;

pub use self::types::PoincareBall;
