use core::fmt;

use bitset::BitSet;
use log::error;
use smallvec::SmallVec;
use thiserror::Error;
use typed_index_collections::TiVec;

use crate::{Constraint, CutSet, Graph, Node};

/// A constraint that still has an open path after the cut was applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cut leaves constraint {constraint} open along {}", render_path(.path))]
pub struct CutViolation<N: Node> {
    /// Index of the violated constraint.
    pub constraint: usize,
    /// A path from a source through every hop of the chain to a sink.
    pub path: Vec<N>,
}

fn render_path<N: fmt::Display>(path: &[N]) -> String {
    let mut res = String::new();
    for (i, node) in path.iter().enumerate() {
        if i != 0 {
            res.push_str(" -> ");
        }
        res.push_str(&node.to_string());
    }
    res
}

/// Checks that `cut` blocks every constraint.
///
/// This recomputes reachability on its own instead of trusting the solvers: the graph is copied
/// without the cut edges and every chain is followed with a depth first search.
pub fn validate<N: Node>(
    graph: &Graph<N>,
    constraints: &[Constraint<N>],
    cut: &CutSet<N>,
) -> Result<(), CutViolation<N>> {
    let mut remaining: TiVec<N, SmallVec<[N; 2]>> =
        vec![SmallVec::new(); graph.num_nodes()].into();
    for (edge, _) in graph.edges() {
        if !cut.contains(edge.src, edge.dst) {
            remaining[edge.src].push(edge.dst);
        }
    }

    for (idx, constraint) in constraints.iter().enumerate() {
        if let Some(path) = open_path(&remaining, constraint) {
            let violation = CutViolation { constraint: idx, path };
            error!("{violation}");
            return Err(violation);
        }
    }
    Ok(())
}

fn open_path<N: Node>(
    succs: &TiVec<N, SmallVec<[N; 2]>>,
    constraint: &Constraint<N>,
) -> Option<Vec<N>> {
    let num_nodes = succs.len();
    let mut starts = Vec::with_capacity(constraint.chain().len());
    let mut parents = Vec::with_capacity(constraint.num_hops());

    let mut current = constraint.set(0, num_nodes);
    for idx in 1..constraint.chain().len() {
        let mut parent: TiVec<N, Option<N>> = vec![None; num_nodes].into();
        let mut reached = BitSet::new_empty(num_nodes);
        let mut stack: Vec<N> = current.iter().collect();
        while let Some(node) = stack.pop() {
            for &succ in &succs[node] {
                if reached.insert(succ) {
                    parent[succ] = Some(node);
                    stack.push(succ);
                }
            }
        }

        let mut next = constraint.set(idx, num_nodes);
        next.intersect(&reached);
        starts.push(current);
        parents.push(parent);
        current = next;
    }

    let mut target = current.first()?;
    let mut path = vec![];
    for (start, parent) in starts.iter().zip(&parents).rev() {
        let mut node = target;
        loop {
            path.push(node);
            node = match parent[node] {
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
