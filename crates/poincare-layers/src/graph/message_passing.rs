//! Message passing over an edge list.
//!
//! 1. Message: per-edge features computed from the source node
//! 2. Aggregate: combine messages arriving at each target node
//! 3. Update: produce new node features from the aggregate and the node itself
//!
//! Everything stays in candle tensors so gradients flow through the
//! scatter/gather steps.

use candle_core::{Device, Tensor};
use tracing::trace;

use crate::config::Aggregation;
use crate::error::{LayerError, LayerResult};

/// Directed edges `source -> target` of a graph with `num_nodes` nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeIndex {
    sources: Vec<u32>,
    targets: Vec<u32>,
    num_nodes: usize,
}

impl EdgeIndex {
    /// Build from parallel source/target lists, rejecting out-of-range nodes.
    pub fn new(sources: Vec<u32>, targets: Vec<u32>, num_nodes: usize) -> LayerResult<Self> {
        if sources.len() != targets.len() {
            return Err(LayerError::InvalidInput(format!(
                "edge lists differ in length: {} sources, {} targets",
                sources.len(),
                targets.len()
            )));
        }
        if let Some(node) = sources
            .iter()
            .chain(targets.iter())
            .find(|&&n| n as usize >= num_nodes)
        {
            return Err(LayerError::InvalidInput(format!(
                "edge references node {node} but the graph has {num_nodes} nodes"
            )));
        }
        Ok(Self {
            sources,
            targets,
            num_nodes,
        })
    }

    /// Build from `(source, target)` pairs.
    pub fn from_pairs(pairs: &[(usize, usize)], num_nodes: usize) -> LayerResult<Self> {
        let mut sources = Vec::with_capacity(pairs.len());
        let mut targets = Vec::with_capacity(pairs.len());
        for &(s, t) in pairs {
            let (s, t) = match (u32::try_from(s), u32::try_from(t)) {
                (Ok(s), Ok(t)) => (s, t),
                _ => {
                    return Err(LayerError::InvalidInput(format!(
                        "node index out of range in edge ({s}, {t})"
                    )))
                }
            };
            sources.push(s);
            targets.push(t);
        }
        Self::new(sources, targets, num_nodes)
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[u32] {
        &self.sources
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    /// Number of incoming edges per node.
    pub fn in_degree(&self) -> Vec<usize> {
        let mut degree = vec![0usize; self.num_nodes];
        for &t in &self.targets {
            degree[t as usize] += 1;
        }
        degree
    }

    fn index_tensor(ids: &[u32], device: &Device) -> LayerResult<Tensor> {
        Ok(Tensor::from_slice(ids, ids.len(), device)?)
    }
}

/// Combine per-edge `messages` `(E, F)` into per-node features `(N, F)`.
///
/// Nodes without incoming edges receive zeros under every aggregation.
pub fn aggregate(
    aggregation: Aggregation,
    messages: &Tensor,
    edges: &EdgeIndex,
) -> LayerResult<Tensor> {
    let (e, f) = messages.dims2()?;
    if e != edges.num_edges() {
        return Err(LayerError::DimensionMismatch {
            expected: edges.num_edges(),
            actual: e,
        });
    }
    let n = edges.num_nodes();
    let (dtype, device) = (messages.dtype(), messages.device());
    if e == 0 {
        return Ok(Tensor::zeros((n, f), dtype, device)?);
    }

    let targets = EdgeIndex::index_tensor(edges.targets(), device)?;
    let summed = || -> LayerResult<Tensor> {
        Ok(Tensor::zeros((n, f), dtype, device)?.index_add(&targets, messages, 0)?)
    };

    let out = match aggregation {
        Aggregation::Add => summed()?,
        Aggregation::Mean => {
            let degree: Vec<f64> = edges
                .in_degree()
                .into_iter()
                .map(|d| d.max(1) as f64)
                .collect();
            let degree = Tensor::from_vec(degree, (n, 1), device)?.to_dtype(dtype)?;
            summed()?.broadcast_div(&degree)?
        }
        Aggregation::Max => {
            let mut incoming: Vec<Vec<u32>> = vec![Vec::new(); n];
            for (edge, &t) in edges.targets().iter().enumerate() {
                incoming[t as usize].push(edge as u32);
            }
            let rows = incoming
                .iter()
                .map(|ids| -> LayerResult<Tensor> {
                    if ids.is_empty() {
                        return Ok(Tensor::zeros((1, f), dtype, device)?);
                    }
                    let ids = EdgeIndex::index_tensor(ids, device)?;
                    Ok(messages.index_select(&ids, 0)?.max_keepdim(0)?)
                })
                .collect::<LayerResult<Vec<_>>>()?;
            Tensor::cat(&rows, 0)?
        }
    };
    trace!(%aggregation, edges = e, nodes = n, "messages aggregated");
    Ok(out)
}

/// Message-passing operator over node features.
///
/// Implementors supply [`message`](Self::message) and
/// [`update`](Self::update); [`propagate`](Self::propagate) routes source
/// features along the edges and calls them in order.
pub trait MessagePassing {
    /// How messages are combined at their target.
    fn aggregation(&self) -> Aggregation;

    /// Messages `(E, F)` from the gathered source features `h_j`.
    fn message(&self, h_j: &Tensor, edge_weight: Option<&Tensor>) -> LayerResult<Tensor> {
        match edge_weight {
            Some(w) => Ok(h_j.broadcast_mul(&w.unsqueeze(1)?)?),
            None => Ok(h_j.clone()),
        }
    }

    fn aggregate(&self, messages: &Tensor, edges: &EdgeIndex) -> LayerResult<Tensor> {
        aggregate(self.aggregation(), messages, edges)
    }

    /// New node features from the aggregated messages and the input `x`.
    fn update(&self, aggregated: &Tensor, x: &Tensor) -> LayerResult<Tensor>;

    /// Run message, aggregate and update for features `h` `(N, F)` derived
    /// from node inputs `x`.
    #[tracing::instrument(skip_all, fields(nodes = edges.num_nodes(), edges = edges.num_edges()))]
    fn propagate(
        &self,
        edges: &EdgeIndex,
        x: &Tensor,
        h: &Tensor,
        edge_weight: Option<&Tensor>,
    ) -> LayerResult<Tensor> {
        let (nodes, features) = h.dims2()?;
        if nodes != edges.num_nodes() {
            return Err(LayerError::DimensionMismatch {
                expected: edges.num_nodes(),
                actual: nodes,
            });
        }
        if let Some(w) = edge_weight {
            if w.dims() != [edges.num_edges()] {
                return Err(LayerError::shape("edge weight", &[edges.num_edges()], w.dims()));
            }
        }

        let aggregated = if edges.is_empty() {
            Tensor::zeros((nodes, features), h.dtype(), h.device())?
        } else {
            let sources = EdgeIndex::index_tensor(edges.sources(), h.device())?;
            let h_j = h.index_select(&sources, 0)?;
            let edge_weight = edge_weight.map(|w| w.to_dtype(h.dtype())).transpose()?;
            let messages = self.message(&h_j, edge_weight.as_ref())?;
            self.aggregate(&messages, edges)?
        };
        self.update(&aggregated, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn path() -> EdgeIndex {
        // 0 -> 1, 2 -> 1, 1 -> 2; node 0 has no incoming edges
        EdgeIndex::from_pairs(&[(0, 1), (2, 1), (1, 2)], 3).unwrap()
    }

    fn messages() -> Tensor {
        Tensor::new(&[[1.0f64, -2.0], [3.0, 0.5], [-1.0, 4.0]], &Device::Cpu).unwrap()
    }

    #[test]
    fn test_edge_index_validation() {
        assert!(EdgeIndex::new(vec![0, 1], vec![1], 2).is_err());
        assert!(EdgeIndex::from_pairs(&[(0, 3)], 3).is_err());
        let edges = path();
        assert_eq!(edges.num_edges(), 3);
        assert_eq!(edges.in_degree(), vec![0, 2, 1]);
    }

    #[test]
    fn test_add_aggregation() {
        let out = aggregate(Aggregation::Add, &messages(), &path()).unwrap();
        assert_eq!(
            out.to_vec2::<f64>().unwrap(),
            vec![vec![0.0, 0.0], vec![4.0, -1.5], vec![-1.0, 4.0]]
        );
    }

    #[test]
    fn test_mean_aggregation() {
        let out = aggregate(Aggregation::Mean, &messages(), &path()).unwrap();
        assert_eq!(
            out.to_vec2::<f64>().unwrap(),
            vec![vec![0.0, 0.0], vec![2.0, -0.75], vec![-1.0, 4.0]]
        );
    }

    #[test]
    fn test_max_aggregation() {
        let out = aggregate(Aggregation::Max, &messages(), &path()).unwrap();
        assert_eq!(
            out.to_vec2::<f64>().unwrap(),
            vec![vec![0.0, 0.0], vec![3.0, 0.5], vec![-1.0, 4.0]]
        );
    }

    #[test]
    fn test_empty_graph_aggregates_to_zero() {
        let edges = EdgeIndex::from_pairs(&[], 2).unwrap();
        let empty = Tensor::zeros((0, 3), DType::F32, &Device::Cpu).unwrap();
        let out = aggregate(Aggregation::Max, &empty, &edges).unwrap();
        assert_eq!(out.dims(), &[2, 3]);
    }

    struct SumNeighbours;

    impl MessagePassing for SumNeighbours {
        fn aggregation(&self) -> Aggregation {
            Aggregation::Add
        }

        fn update(&self, aggregated: &Tensor, x: &Tensor) -> LayerResult<Tensor> {
            Ok(aggregated.add(x)?)
        }
    }

    #[test]
    fn test_propagate_with_edge_weights() {
        let edges = path();
        let x = Tensor::new(&[[1.0f64], [10.0], [100.0]], &Device::Cpu).unwrap();
        let w = Tensor::new(&[2.0f64, 0.5, 1.0], &Device::Cpu).unwrap();
        let out = SumNeighbours.propagate(&edges, &x, &x, Some(&w)).unwrap();
        // node 1: 10 + 2 * 1 + 0.5 * 100; node 2: 100 + 10
        assert_eq!(out.to_vec2::<f64>().unwrap(), vec![vec![1.0], vec![62.0], vec![110.0]]);

        let ones = Tensor::ones(edges.num_edges(), DType::F64, &Device::Cpu).unwrap();
        let plain = SumNeighbours.propagate(&edges, &x, &x, None).unwrap();
        let weighted = SumNeighbours.propagate(&edges, &x, &x, Some(&ones)).unwrap();
        assert_eq!(plain.to_vec2::<f64>().unwrap(), weighted.to_vec2::<f64>().unwrap());

        let bad = Tensor::ones(2, DType::F64, &Device::Cpu).unwrap();
        assert!(SumNeighbours.propagate(&edges, &x, &x, Some(&bad)).is_err());
    }
}
