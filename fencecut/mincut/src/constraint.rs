use bitset::BitSet;

use crate::Node;

/// A chain of node sets `S0, S1, ..., Sk` that must be disconnected.
///
/// The constraint holds if no path of at least one edge leads from `S0` to a node of `S1` that in
/// turn reaches a node of `S2`, and so on up to `Sk`. Blocking any single hop is enough. A two set
/// chain is a plain source/sink constraint. A three set chain routes the sources through a set
/// of waypoints first.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constraint<N> {
    chain: Vec<Vec<N>>,
}

fn sorted<N: Node>(nodes: impl IntoIterator<Item = N>) -> Vec<N> {
    let mut nodes: Vec<_> = nodes.into_iter().collect();
    nodes.sort_unstable();
    nodes.dedup();
    nodes
}

impl<N: Node> Constraint<N> {
    pub fn new(sources: impl IntoIterator<Item = N>, sinks: impl IntoIterator<Item = N>) -> Self {
        Constraint { chain: vec![sorted(sources), sorted(sinks)] }
    }

    pub fn with_waypoints(
        sources: impl IntoIterator<Item = N>,
        waypoints: impl IntoIterator<Item = N>,
        sinks: impl IntoIterator<Item = N>,
    ) -> Self {
        Constraint { chain: vec![sorted(sources), sorted(waypoints), sorted(sinks)] }
    }

    /// Returns `None` if the chain has fewer than two sets.
    pub fn from_chain<I>(chain: impl IntoIterator<Item = I>) -> Option<Self>
    where
        I: IntoIterator<Item = N>,
    {
        let chain: Vec<_> = chain.into_iter().map(sorted).collect();
        (chain.len() >= 2).then_some(Constraint { chain })
    }

    pub fn sources(&self) -> &[N] {
        &self.chain[0]
    }

    pub fn sinks(&self) -> &[N] {
        &self.chain[self.chain.len() - 1]
    }

    pub fn chain(&self) -> &[Vec<N>] {
        &self.chain
    }

    pub fn num_hops(&self) -> usize {
        self.chain.len() - 1
    }

    /// Number of source/sink pairs. Used to sort constraints by how critical they are.
    pub fn num_pairs(&self) -> usize {
        self.sources().len().saturating_mul(self.sinks().len())
    }

    /// A constraint with an empty set can never be violated.
    pub fn is_trivial(&self) -> bool {
        self.chain.iter().any(|set| set.is_empty())
    }

    pub(crate) fn set(&self, idx: usize, num_nodes: usize) -> BitSet<N> {
        let mut res = BitSet::new_empty(num_nodes);
        for &node in &self.chain[idx] {
            res.insert(node);
        }
        res
    }
}
