//! Mobius linear layer configuration.

use serde::{Deserialize, Serialize};

/// Configuration of a [`MobiusLinear`](crate::MobiusLinear) layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearConfig {
    /// Learn a bias point on the output ball.
    /// Default: true
    pub bias: bool,

    /// Learn source/target tangent-space origins instead of using the ball origins.
    /// Default: false
    pub learn_origin: bool,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            bias: true,
            learn_origin: false,
        }
    }
}
