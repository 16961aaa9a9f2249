//! Pointwise nonlinearities applied to Euclidean activations.

use candle_core::{Result, Tensor};
use candle_nn::{Activation, Module};

/// Activation between the mixing map and the centroid decoder of a graph
/// convolution.
#[derive(Debug, Clone, Default)]
pub enum Nonlinearity {
    #[default]
    Identity,
    Tanh,
    /// Any stock candle activation.
    Activation(Activation),
}

impl Module for Nonlinearity {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Self::Identity => Ok(xs.clone()),
            Self::Tanh => xs.tanh(),
            Self::Activation(act) => act.forward(xs),
        }
    }
}

impl From<Activation> for Nonlinearity {
    fn from(act: Activation) -> Self {
        Self::Activation(act)
    }
}
