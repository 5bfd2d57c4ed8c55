//! Reachability of constraint chains in a graph with some edges cut.

use std::collections::VecDeque;

use bitset::BitSet;
use typed_index_collections::TiVec;

use crate::{Constraint, CutSet, Graph, Node};

/// The nodes reachable by a path of at least one edge from a set of start nodes.
pub(crate) struct Reach<N: Node> {
    pub(crate) reached: BitSet<N>,
    parents: TiVec<N, Option<N>>,
}

pub(crate) fn reach<N: Node>(graph: &Graph<N>, from: &BitSet<N>, cut: &CutSet<N>) -> Reach<N> {
    let num_nodes = graph.num_nodes();
    let mut reached = BitSet::new_empty(num_nodes);
    let mut parents: TiVec<N, Option<N>> = vec![None; num_nodes].into();

    // Only successors are reached so that a start node counts as reached only if it lies on a
    // cycle.
    let mut todo: VecDeque<N> = from.iter().collect();
    while let Some(node) = todo.pop_front() {
        for (succ, _) in graph.succs(node) {
            if !cut.contains(node, succ) && reached.insert(succ) {
                parents[succ] = Some(node);
                todo.push_back(succ);
            }
        }
    }

    Reach { reached, parents }
}

/// The sets `S0 .. Sk` of a constraint chain restricted to what is still reachable:
/// `S(i+1) = chain(i+1) ∩ reach(S(i))`.
pub(crate) struct ChainWalk<N: Node> {
    pub(crate) sets: Vec<BitSet<N>>,
    reaches: Vec<Reach<N>>,
}

impl<N: Node> ChainWalk<N> {
    pub(crate) fn new(graph: &Graph<N>, constraint: &Constraint<N>, cut: &CutSet<N>) -> Self {
        let num_nodes = graph.num_nodes();
        let mut sets = vec![constraint.set(0, num_nodes)];
        let mut reaches = Vec::with_capacity(constraint.num_hops());
        for idx in 1..constraint.chain().len() {
            let reach = reach(graph, &sets[idx - 1], cut);
            let mut next = constraint.set(idx, num_nodes);
            next.intersect(&reach.reached);
            sets.push(next);
            reaches.push(reach);
        }
        ChainWalk { sets, reaches }
    }

    pub(crate) fn is_blocked(&self) -> bool {
        self.sets.last().map_or(true, |last| last.is_empty())
    }

    /// A path through all hops of the chain, if the chain is not blocked.
    pub(crate) fn witness(&self) -> Option<Vec<N>> {
        let mut target = self.sets.last()?.first()?;
        let mut path = Vec::new();
        for hop in (0..self.reaches.len()).rev() {
            let start = &self.sets[hop];
            let mut node = target;
            loop {
                path.push(node);
                node = match self.reaches[hop].parents[node] {
                    Some(parent) => parent,
                    None => unreachable!("{node} was reached without a parent"),
                };
                if start.contains(node) {
                    break;
                }
            }
            target = node;
        }
        path.push(target);
        path.reverse();
        Some(path)
    }
}
