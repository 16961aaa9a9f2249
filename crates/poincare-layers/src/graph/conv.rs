//! Hyperbolic graph convolution.
//!
//! Node points are turned into Euclidean activations by measuring their
//! distance to learned hyperplanes, activations are passed along the edges,
//! mixed linearly, and decoded back onto the output ball as a gyro-linear
//! combination of basis centroids:
//!
//! ```text
//! h_j   = d(x_j, H_neighbors)            per source node
//! a_i   = aggr_{j -> i} w_ij h_j
//! y_i   = basis(act(mix(a_i + d(x_i, H_loop))))
//! ```

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module};
use poincare_manifold::{ManifoldParameter, PoincareBall};
use rand::Rng;
use tracing::debug;

use super::euclidean::GraphConv;
use super::message_passing::{EdgeIndex, MessagePassing};
use crate::centroids::WeightedPoincareCentroids;
use crate::config::{Aggregation, GraphConvConfig, HyperplaneConfig};
use crate::error::{LayerError, LayerResult};
use crate::hyperplanes::Distance2PoincareHyperplanes;
use crate::init::rect_eye;
use crate::nonlinearity::Nonlinearity;

#[derive(Debug)]
pub struct HyperbolicGraphConv {
    in_channels: usize,
    out_channels: usize,
    config: GraphConvConfig,
    hyperplanes_loop: Distance2PoincareHyperplanes,
    hyperplanes_neighbors: Distance2PoincareHyperplanes,
    mixing_weight: ManifoldParameter,
    mixing_bias: ManifoldParameter,
    nonlinearity: Nonlinearity,
    basis: WeightedPoincareCentroids,
}

impl HyperbolicGraphConv {
    /// Graph convolution from points on `ball` to points on `ball_out`
    /// (`None` keeps `ball`).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        ball: Arc<PoincareBall>,
        ball_out: Option<Arc<PoincareBall>>,
        config: GraphConvConfig,
        nonlinearity: Nonlinearity,
        dtype: DType,
        device: &Device,
    ) -> LayerResult<Self> {
        Self::new_with_rng(
            in_channels,
            out_channels,
            ball,
            ball_out,
            config,
            nonlinearity,
            dtype,
            device,
            &mut rand::thread_rng(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        ball: Arc<PoincareBall>,
        ball_out: Option<Arc<PoincareBall>>,
        config: GraphConvConfig,
        nonlinearity: Nonlinearity,
        dtype: DType,
        device: &Device,
        rng: &mut R,
    ) -> LayerResult<Self> {
        config.validate()?;
        if out_channels == 0 {
            return Err(LayerError::InvalidConfig(
                "out_channels must be positive".to_string(),
            ));
        }
        let ball_out = ball_out.unwrap_or_else(|| Arc::clone(&ball));
        let num_basis = config.num_basis(out_channels);

        let planes = HyperplaneConfig {
            scaled: true,
            squared: false,
            ..Default::default()
        };
        let hyperplanes_loop = Distance2PoincareHyperplanes::new_with_rng(
            in_channels,
            num_basis,
            Arc::clone(&ball),
            planes.clone(),
            dtype,
            device,
            rng,
        )?;
        let hyperplanes_neighbors = Distance2PoincareHyperplanes::new_with_rng(
            in_channels,
            num_basis,
            ball,
            planes,
            dtype,
            device,
            rng,
        )?;
        let basis =
            WeightedPoincareCentroids::new(out_channels, num_basis, ball_out, true, dtype, device)?;
        let mixing = rect_eye(num_basis, num_basis, dtype, device)?;

        let layer = Self {
            in_channels,
            out_channels,
            mixing_weight: ManifoldParameter::euclidean(&mixing)?,
            mixing_bias: ManifoldParameter::euclidean(&Tensor::zeros(num_basis, dtype, device)?)?,
            config,
            hyperplanes_loop,
            hyperplanes_neighbors,
            nonlinearity,
            basis,
        };
        debug!(
            in_channels,
            out_channels,
            num_basis,
            aggregation = %layer.config.aggregation,
            "hyperbolic graph conv created"
        );
        Ok(layer)
    }

    /// Build a layer reproducing a Euclidean [`GraphConv`] in the ball.
    ///
    /// The aggregation is taken from `graph_conv`; `num_basis` overrides the
    /// default of one basis centroid per output channel.
    pub fn from_graph_conv(
        graph_conv: &GraphConv,
        nonlinearity: Nonlinearity,
        ball: Arc<PoincareBall>,
        ball_out: Option<Arc<PoincareBall>>,
        num_basis: Option<usize>,
    ) -> LayerResult<Self> {
        let config = GraphConvConfig {
            aggregation: graph_conv.aggregation(),
            num_basis,
        };
        let weight = graph_conv.weight();
        let layer = Self::new(
            graph_conv.in_channels(),
            graph_conv.out_channels(),
            ball,
            ball_out,
            config,
            nonlinearity,
            weight.dtype(),
            weight.device(),
        )?;
        layer.set_parameters_from_graph_conv(graph_conv)?;
        Ok(layer)
    }

    /// Identity mixing and identity basis centroids. Hyperplanes are kept.
    pub fn reset_parameters(&self) -> LayerResult<()> {
        self.basis.reset_parameters_identity()?;
        let w = self.mixing_weight.as_tensor();
        let (rows, cols) = w.dims2()?;
        self.mixing_weight.set(&rect_eye(rows, cols, w.dtype(), w.device())?)?;
        self.mixing_bias.set(&self.mixing_bias.as_tensor().zeros_like()?)?;
        Ok(())
    }

    /// Reset, then move the neighbour and self-loop maps of `graph_conv` into
    /// the two hyperplane sets.
    pub fn set_parameters_from_graph_conv(&self, graph_conv: &GraphConv) -> LayerResult<()> {
        if graph_conv.in_channels() != self.in_channels {
            return Err(LayerError::DimensionMismatch {
                expected: self.in_channels,
                actual: graph_conv.in_channels(),
            });
        }
        let num_basis = self.num_basis();
        if graph_conv.out_channels() != num_basis {
            return Err(LayerError::InvalidConfig(format!(
                "seeding needs one hyperplane per graph conv output, \
                 got {} outputs for {num_basis} planes",
                graph_conv.out_channels()
            )));
        }
        self.reset_parameters()?;
        self.hyperplanes_neighbors
            .set_parameters_from_linear_operator(&graph_conv.weight().t()?, None)?;
        self.hyperplanes_loop.set_parameters_from_linear_operator(
            graph_conv.lin_weight(),
            Some(graph_conv.lin_bias()),
        )?;
        debug!(num_basis, "hyperbolic graph conv seeded from graph conv");
        Ok(())
    }

    /// Map node points `(N, in)` on `ball` to `(N, out)` on `ball_out`.
    pub fn forward(
        &self,
        x: &Tensor,
        edges: &EdgeIndex,
        edge_weight: Option<&Tensor>,
    ) -> LayerResult<Tensor> {
        let h = self.hyperplanes_neighbors.forward(x)?;
        self.propagate(edges, x, &h, edge_weight)
    }

    fn mixing(&self) -> Linear {
        Linear::new(
            self.mixing_weight.as_tensor().clone(),
            Some(self.mixing_bias.as_tensor().clone()),
        )
    }

    /// All trainable parameters.
    pub fn parameters(&self) -> Vec<ManifoldParameter> {
        let mut params = self.hyperplanes_loop.parameters();
        params.extend(self.hyperplanes_neighbors.parameters());
        params.push(self.mixing_weight.clone());
        params.push(self.mixing_bias.clone());
        params.extend(self.basis.parameters());
        params
    }

    pub fn num_basis(&self) -> usize {
        self.basis.num_centroids()
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn hyperplanes_loop(&self) -> &Distance2PoincareHyperplanes {
        &self.hyperplanes_loop
    }

    pub fn hyperplanes_neighbors(&self) -> &Distance2PoincareHyperplanes {
        &self.hyperplanes_neighbors
    }

    pub fn basis(&self) -> &WeightedPoincareCentroids {
        &self.basis
    }

    #[inline]
    pub fn config(&self) -> &GraphConvConfig {
        &self.config
    }
}

impl MessagePassing for HyperbolicGraphConv {
    fn aggregation(&self) -> Aggregation {
        self.config.aggregation
    }

    fn update(&self, aggregated: &Tensor, x: &Tensor) -> LayerResult<Tensor> {
        let activations = aggregated.add(&self.hyperplanes_loop.forward(x)?)?;
        let mixed = self.mixing().forward(&activations)?;
        let activations = self.nonlinearity.forward(&mixed)?;
        self.basis.forward(&activations)
    }
}
