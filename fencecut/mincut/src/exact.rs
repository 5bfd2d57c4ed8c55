use ahash::{AHashMap, AHashSet};
use bitset::BitSet;
use log::trace;
use rs_graph::linkedlistgraph::{Edge, LinkedListGraph, Node as FlowNode};
use rs_graph::maxflow::pushrelabel::PushRelabel;
use rs_graph::maxflow::MaxFlow;
use rs_graph::{Buildable, Builder};
use typed_index_collections::TiVec;

use crate::walk::ChainWalk;
use crate::{Constraint, CutEdge, CutSet, Graph, MinCutSolver, Node};

#[cfg(test)]
mod tests;

/// Solves every constraint with a push-relabel maximum flow computation.
///
/// Constraints are processed in order. Each one is solved in the graph without the edges already
/// cut for earlier constraints. For a chain only the cheapest hop is cut, the one closest to the
/// sinks on ties. The result is a minimum weight cut for each single constraint but not
/// necessarily for all of them together.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactSolver;

impl<N: Node> MinCutSolver<N> for ExactSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn solve(&self, graph: &Graph<N>, constraints: &[Constraint<N>]) -> CutSet<N> {
        let mut cut = CutSet::new();
        for (idx, constraint) in constraints.iter().enumerate() {
            let walk = ChainWalk::new(graph, constraint, &cut);
            if walk.is_blocked() {
                continue;
            }

            let best = (0..constraint.num_hops())
                .rev()
                .map(|hop| hop_cut(graph, &cut, &walk.sets[hop], &walk.sets[hop + 1]))
                .min_by_key(|(_, weight)| *weight);
            if let Some((edges, weight)) = best {
                trace!("constraint {idx}: cutting {} edges with weight {weight}", edges.len());
                cut.extend(edges);
            }
        }
        cut
    }
}

/// A minimum weight set of edges that disconnects `sinks` from `sources`.
///
/// Every node is split into an inner and an outer half joined by an uncuttable edge. Graph edges
/// run from outer to inner halves. Sources are entered at their outer half and sinks are left from
/// their inner half, so only paths with at least one graph edge connect them.
fn hop_cut<N: Node>(
    graph: &Graph<N>,
    cut: &CutSet<N>,
    sources: &BitSet<N>,
    sinks: &BitSet<N>,
) -> (Vec<CutEdge<N>>, u64) {
    // heavier than every cut of the graph
    let uncuttable = graph.edges().fold(1u64, |sum, (_, weight)| sum.saturating_add(weight));

    let mut builder = LinkedListGraph::<usize>::new_builder();
    let source = builder.add_node();
    let sink = builder.add_node();
    let halves: TiVec<N, (FlowNode<usize>, FlowNode<usize>)> =
        graph.nodes().map(|_| (builder.add_node(), builder.add_node())).collect();

    let mut capacity: AHashMap<Edge<usize>, u64> = AHashMap::new();
    let mut candidates = Vec::new();
    for node in graph.nodes() {
        let (inner, outer) = halves[node];
        capacity.insert(builder.add_edge(inner, outer), uncuttable);
        for (succ, weight) in graph.succs(node) {
            if !cut.contains(node, succ) {
                capacity.insert(builder.add_edge(outer, halves[succ].0), weight);
                candidates.push(CutEdge { src: node, dst: succ });
            }
        }
    }
    for node in sources.iter() {
        capacity.insert(builder.add_edge(source, halves[node].1), uncuttable);
    }
    for node in sinks.iter() {
        capacity.insert(builder.add_edge(halves[node].0, sink), uncuttable);
    }
    let network = builder.into_graph();

    let mut maxflow = PushRelabel::<LinkedListGraph<usize>, u64>::new(&network);
    maxflow.solve(source, sink, |edge: Edge<usize>| capacity[&edge]);
    let flow = maxflow.value();
    debug_assert!(flow < uncuttable, "uncuttable path between sources and sinks");

    // `mincut` is the source side of the saturated network
    let source_side: AHashSet<FlowNode<usize>> = maxflow.mincut().into_iter().collect();
    let edges = candidates
        .into_iter()
        .filter(|edge| {
            source_side.contains(&halves[edge.src].1) && !source_side.contains(&halves[edge.dst].0)
        })
        .collect();
    (edges, flow)
}
