//! Hyperbolic graph convolution configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayerError;

/// How messages arriving at a node are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Sum of incoming messages.
    #[default]
    Add,
    /// Mean of incoming messages (zero for isolated nodes).
    Mean,
    /// Feature-wise maximum of incoming messages (zero for isolated nodes).
    Max,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Mean => write!(f, "mean"),
            Self::Max => write!(f, "max"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = LayerError;

    /// Parses "add", "mean" or "max" (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" | "sum" => Ok(Self::Add),
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            _ => Err(LayerError::InvalidConfig(format!(
                "Invalid aggregation: '{s}'. Valid values: add, mean, max"
            ))),
        }
    }
}

/// Configuration of a [`HyperbolicGraphConv`](crate::graph::HyperbolicGraphConv).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphConvConfig {
    /// Message aggregation.
    /// Default: add
    pub aggregation: Aggregation,

    /// Number of basis centroids of the decoder. `None` uses `out_channels`.
    pub num_basis: Option<usize>,
}

impl GraphConvConfig {
    /// Resolved number of basis centroids.
    #[inline]
    pub fn num_basis(&self, out_channels: usize) -> usize {
        self.num_basis.unwrap_or(out_channels)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), LayerError> {
        if self.num_basis == Some(0) {
            return Err(LayerError::InvalidConfig(
                "num_basis must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
