//! Minimum cuts for speculation barriers.
//!
//! The mitigation pass describes the places where speculation must be stopped as a [`Graph`]
//! (the instruction level control flow graph, weighted by how expensive a barrier on each edge
//! is) and a list of [`Constraint`]s (sets of nodes that must not reach each other). This crate
//! selects the edges to place barriers on.
//!
//! Two solvers share the [`MinCutSolver`] interface:
//!
//! * [`ExactSolver`] computes a minimum cut for every constraint with a maximum flow.
//! * [`GreedySolver`] cuts the heaviest edge of an open path until nothing is left open. It scales
//!   to functions with thousands of constraints.
//!
//! [`solve`] picks a solver by [`Strategy`] and always checks the result with [`validate`].

mod constraint;
mod exact;
mod graph;
mod greedy;
mod validate;
mod walk;

use core::fmt;
use core::hash::Hash;

use log::debug;

pub use crate::constraint::Constraint;
pub use crate::exact::ExactSolver;
pub use crate::graph::{CutEdge, CutSet, Graph};
pub use crate::greedy::{GreedyOrder, GreedySolver};
pub use crate::validate::{validate, CutViolation};

#[cfg(test)]
mod tests;

/// A node handle: a dense index that can be printed.
pub trait Node:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + From<usize> + Into<usize> + 'static
{
}

impl<T> Node for T where
    T: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + From<usize> + Into<usize> + 'static
{
}

pub trait MinCutSolver<N: Node> {
    fn name(&self) -> &'static str;

    /// Returns a set of edges that blocks every constraint.
    fn solve(&self, graph: &Graph<N>, constraints: &[Constraint<N>]) -> CutSet<N>;
}

pub const DEFAULT_EXACT_LIMIT: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Exact,
    Greedy(GreedyOrder),
    /// Use the exact solver for at most `exact_limit` constraints, the greedy solver otherwise.
    Auto { exact_limit: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Auto { exact_limit: DEFAULT_EXACT_LIMIT }
    }
}

impl Strategy {
    pub fn solver<N: Node>(self, num_constraints: usize) -> Box<dyn MinCutSolver<N>> {
        match self {
            Strategy::Exact => Box::new(ExactSolver),
            Strategy::Greedy(order) => Box::new(GreedySolver { order }),
            Strategy::Auto { exact_limit } if num_constraints <= exact_limit => {
                Box::new(ExactSolver)
            }
            Strategy::Auto { .. } => Box::new(GreedySolver { order: GreedyOrder::Criticality }),
        }
    }
}

/// Cuts every edge leaving a source of a constraint that is not already blocked.
///
/// This is always a valid cut. The greedy solver never returns more edges than this.
pub fn baseline<N: Node>(graph: &Graph<N>, constraints: &[Constraint<N>]) -> CutSet<N> {
    let uncut = CutSet::new();
    let mut cut = CutSet::new();
    for constraint in constraints {
        if walk::ChainWalk::new(graph, constraint, &uncut).is_blocked() {
            continue;
        }
        for &src in constraint.sources() {
            cut.extend(graph.succs(src).map(|(dst, _)| CutEdge { src, dst }));
        }
    }
    cut
}

/// Solves `constraints` with the solver selected by `strategy` and validates the result.
pub fn solve<N: Node>(
    graph: &Graph<N>,
    constraints: &[Constraint<N>],
    strategy: Strategy,
) -> Result<CutSet<N>, CutViolation<N>> {
    let solver = strategy.solver::<N>(constraints.len());
    debug!(
        "{} solver: {} constraints, {} nodes, {} edges",
        solver.name(),
        constraints.len(),
        graph.num_nodes(),
        graph.num_edges()
    );
    let cut = solver.solve(graph, constraints);
    validate(graph, constraints, &cut)?;
    debug!("cut {} edges with total weight {}", cut.len(), cut.weight(graph));
    Ok(cut)
}
