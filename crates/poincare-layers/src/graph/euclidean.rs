//! Euclidean graph convolution.
//!
//! `x'_i = lin(x_i) + aggr_{j -> i} (x_j W)`
//!
//! Used on its own or as the pretrained operator that seeds a
//! [`HyperbolicGraphConv`](super::HyperbolicGraphConv).

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module};
use poincare_manifold::ManifoldParameter;
use rand::Rng;
use rand_distr::Uniform;

use super::message_passing::{EdgeIndex, MessagePassing};
use crate::config::Aggregation;
use crate::error::{LayerError, LayerResult};
use crate::init::sample;

#[derive(Debug)]
pub struct GraphConv {
    /// Neighbour map `(in, out)`.
    weight: ManifoldParameter,
    /// Self-loop map `(out, in)`.
    lin_weight: ManifoldParameter,
    lin_bias: ManifoldParameter,
    aggregation: Aggregation,
}

impl GraphConv {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        aggregation: Aggregation,
        dtype: DType,
        device: &Device,
    ) -> LayerResult<Self> {
        let mut rng = rand::thread_rng();
        Self::new_with_rng(in_channels, out_channels, aggregation, dtype, device, &mut rng)
    }

    /// Uniform initialisation in `+-1/sqrt(in)` for every parameter.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        aggregation: Aggregation,
        dtype: DType,
        device: &Device,
        rng: &mut R,
    ) -> LayerResult<Self> {
        if in_channels == 0 || out_channels == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "channels must be positive, got {in_channels} -> {out_channels}"
            )));
        }
        let bound = 1.0 / (in_channels as f64).sqrt();
        let dist = Uniform::new(-bound, bound);
        let weight = sample(&dist, (in_channels, out_channels), dtype, device, rng)?;
        let lin_weight = sample(&dist, (out_channels, in_channels), dtype, device, rng)?;
        let lin_bias = sample(&dist, out_channels, dtype, device, rng)?;
        Self::from_tensors(&weight, &lin_weight, &lin_bias, aggregation)
    }

    /// Build from explicit parameters: `weight (in, out)`, `lin_weight (out, in)`,
    /// `lin_bias (out,)`.
    pub fn from_tensors(
        weight: &Tensor,
        lin_weight: &Tensor,
        lin_bias: &Tensor,
        aggregation: Aggregation,
    ) -> LayerResult<Self> {
        let (in_channels, out_channels) = weight.dims2()?;
        if lin_weight.dims() != [out_channels, in_channels] {
            return Err(LayerError::shape(
                "self-loop weight",
                &[out_channels, in_channels],
                lin_weight.dims(),
            ));
        }
        if lin_bias.dims() != [out_channels] {
            return Err(LayerError::shape("self-loop bias", &[out_channels], lin_bias.dims()));
        }
        Ok(Self {
            weight: ManifoldParameter::euclidean(weight)?,
            lin_weight: ManifoldParameter::euclidean(lin_weight)?,
            lin_bias: ManifoldParameter::euclidean(lin_bias)?,
            aggregation,
        })
    }

    /// Node features `(N, in)` to `(N, out)`.
    pub fn forward(
        &self,
        x: &Tensor,
        edges: &EdgeIndex,
        edge_weight: Option<&Tensor>,
    ) -> LayerResult<Tensor> {
        let h = x.matmul(self.weight.as_tensor())?;
        self.propagate(edges, x, &h, edge_weight)
    }

    fn lin(&self) -> Linear {
        Linear::new(
            self.lin_weight.as_tensor().clone(),
            Some(self.lin_bias.as_tensor().clone()),
        )
    }

    #[inline]
    pub fn weight(&self) -> &Tensor {
        self.weight.as_tensor()
    }

    #[inline]
    pub fn lin_weight(&self) -> &Tensor {
        self.lin_weight.as_tensor()
    }

    #[inline]
    pub fn lin_bias(&self) -> &Tensor {
        self.lin_bias.as_tensor()
    }

    pub fn in_channels(&self) -> usize {
        self.weight.dims()[0]
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dims()[1]
    }

    pub fn parameters(&self) -> Vec<ManifoldParameter> {
        vec![self.weight.clone(), self.lin_weight.clone(), self.lin_bias.clone()]
    }
}

impl MessagePassing for GraphConv {
    fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    fn update(&self, aggregated: &Tensor, x: &Tensor) -> LayerResult<Tensor> {
        Ok(self.lin().forward(x)?.add(aggregated)?)
    }
}
