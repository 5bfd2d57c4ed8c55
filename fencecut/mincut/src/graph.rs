use core::fmt;

use ahash::RandomState;
use indexmap::IndexSet;
use smallvec::SmallVec;
use typed_index_collections::TiVec;

use crate::Node;

/// A directed edge of a [`Graph`]. The solvers return the edges that have to be cut.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CutEdge<N> {
    pub src: N,
    pub dst: N,
}

impl<N: fmt::Display> fmt::Display for CutEdge<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// A directed graph with a weight of at least 1 on every edge.
///
/// Nodes are dense indices `0..num_nodes`. There is at most one edge between two nodes, adding it
/// again only updates the weight.
#[derive(Clone, Debug)]
pub struct Graph<N: Node> {
    succs: TiVec<N, SmallVec<[(N, u64); 2]>>,
    num_edges: usize,
}

impl<N: Node> Graph<N> {
    pub fn with_nodes(num_nodes: usize) -> Graph<N> {
        Graph { succs: vec![SmallVec::new(); num_nodes].into(), num_edges: 0 }
    }

    pub fn num_nodes(&self) -> usize {
        self.succs.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = N> {
        (0..self.succs.len()).map(N::from)
    }

    /// Adds the edge `src -> dst`. A weight of 0 is raised to 1.
    pub fn add_edge(&mut self, src: N, dst: N, weight: u64) {
        let weight = weight.max(1);
        let succs = &mut self.succs[src];
        if let Some(edge) = succs.iter_mut().find(|(succ, _)| *succ == dst) {
            edge.1 = weight;
        } else {
            succs.push((dst, weight));
            self.num_edges += 1;
        }
    }

    pub fn weight(&self, src: N, dst: N) -> Option<u64> {
        self.succs[src].iter().find(|(succ, _)| *succ == dst).map(|&(_, weight)| weight)
    }

    /// The successors of `node` together with the weight of the connecting edge.
    pub fn succs(&self, node: N) -> impl Iterator<Item = (N, u64)> + '_ {
        self.succs[node].iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (CutEdge<N>, u64)> + '_ {
        self.succs.iter_enumerated().flat_map(|(src, succs)| {
            succs.iter().map(move |&(dst, weight)| (CutEdge { src, dst }, weight))
        })
    }
}

/// The edges selected by a solver.
///
/// Edges are kept in the order they were cut.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CutSet<N: Node> {
    edges: IndexSet<CutEdge<N>, RandomState>,
}

impl<N: Node> CutSet<N> {
    pub fn new() -> CutSet<N> {
        CutSet { edges: IndexSet::default() }
    }

    pub fn insert(&mut self, edge: CutEdge<N>) -> bool {
        self.edges.insert(edge)
    }

    pub fn contains(&self, src: N, dst: N) -> bool {
        self.edges.contains(&CutEdge { src, dst })
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = CutEdge<N>> + '_ {
        self.edges.iter().copied()
    }

    /// The summed weight of all cut edges in `graph`.
    pub fn weight(&self, graph: &Graph<N>) -> u64 {
        self.edges.iter().filter_map(|edge| graph.weight(edge.src, edge.dst)).sum()
    }

    pub fn to_sorted_vec(&self) -> Vec<CutEdge<N>> {
        let mut edges: Vec<_> = self.edges.iter().copied().collect();
        edges.sort_unstable();
        edges
    }
}

impl<N: Node> Default for CutSet<N> {
    fn default() -> Self {
        CutSet::new()
    }
}

impl<N: Node> Extend<CutEdge<N>> for CutSet<N> {
    fn extend<I: IntoIterator<Item = CutEdge<N>>>(&mut self, iter: I) {
        self.edges.extend(iter)
    }
}

impl<N: Node> FromIterator<CutEdge<N>> for CutSet<N> {
    fn from_iter<I: IntoIterator<Item = CutEdge<N>>>(iter: I) -> Self {
        CutSet { edges: iter.into_iter().collect() }
    }
}
