use log::{debug, trace};

use crate::walk::ChainWalk;
use crate::{baseline, Constraint, CutEdge, CutSet, Graph, MinCutSolver, Node};

#[cfg(test)]
mod tests;

/// The order in which the greedy solver processes constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GreedyOrder {
    /// The order the constraints were created in.
    #[default]
    Construction,
    /// Constraints with the fewest source/sink pairs first.
    Criticality,
}

/// Cuts open paths one edge at a time.
///
/// For every constraint, as long as some path through its chain survives, the heaviest edge on
/// that path is cut. Ties go to the edge closest to the sources. If the result ends up larger than
/// cutting every edge out of every source, that baseline is returned instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedySolver {
    pub order: GreedyOrder,
}

impl<N: Node> MinCutSolver<N> for GreedySolver {
    fn name(&self) -> &'static str {
        match self.order {
            GreedyOrder::Construction => "greedy",
            GreedyOrder::Criticality => "greedy (criticality order)",
        }
    }

    fn solve(&self, graph: &Graph<N>, constraints: &[Constraint<N>]) -> CutSet<N> {
        let mut order: Vec<usize> = (0..constraints.len()).collect();
        if self.order == GreedyOrder::Criticality {
            order.sort_by_key(|&idx| constraints[idx].num_pairs());
        }

        let mut cut = CutSet::new();
        for idx in order {
            while let Some(path) = ChainWalk::new(graph, &constraints[idx], &cut).witness() {
                let edge = heaviest_edge(graph, &path);
                trace!("constraint {idx}: cutting {edge}");
                cut.insert(edge);
            }
        }

        let baseline = baseline(graph, constraints);
        if baseline.len() < cut.len() {
            debug!("greedy cut has {} edges, using the {} edge baseline", cut.len(), baseline.len());
            return baseline;
        }
        cut
    }
}

fn heaviest_edge<N: Node>(graph: &Graph<N>, path: &[N]) -> CutEdge<N> {
    let mut best: Option<(CutEdge<N>, u64)> = None;
    for pair in path.windows(2) {
        let edge = CutEdge { src: pair[0], dst: pair[1] };
        let weight = graph.weight(edge.src, edge.dst).unwrap_or(1);
        if best.map_or(true, |(_, best_weight)| weight > best_weight) {
            best = Some((edge, weight));
        }
    }
    match best {
        Some((edge, _)) => edge,
        None => unreachable!("witness paths contain at least one edge"),
    }
}
