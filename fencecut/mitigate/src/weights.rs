use fir::{DominatorTree, Function, Inst, InstFlowGraph, LoopInfo};
use mincut::Graph;


/// How expensive a barrier on a control flow edge is.
///
/// When enabled, the weight of an edge is
/// `max(1, round(1000 * (loop_depth + 1)^loop_weight / (dom_depth + 1)^dominator_weight))`
/// using the smaller loop depth and the larger dominator tree depth of the two endpoints. Barriers
/// inside loops are thus more expensive and barriers deep in the dominator tree are cheaper.
/// Otherwise every edge has weight 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeWeights {
    pub enabled: bool,
    pub loop_weight: f64,
    pub dominator_weight: f64,
}

impl Default for EdgeWeights {
    fn default() -> Self {
        EdgeWeights { enabled: false, loop_weight: 1.0, dominator_weight: 1.0 }
    }
}

impl EdgeWeights {
    pub fn weight(&self, loop_depth: u32, dom_depth: u32) -> u64 {
        if !self.enabled {
            return 1;
        }
        let score = f64::from(loop_depth + 1).powf(self.loop_weight)
            / f64::from(dom_depth + 1).powf(self.dominator_weight);
        let weight = (score * 1000.0).round();
        if weight.is_finite() && weight >= 1.0 {
            weight.min(u32::MAX as f64) as u64
        } else {
            1
        }
    }
}

/// The instruction level control flow graph of `func` with weighted edges.
pub fn build_graph(
    func: &Function,
    inst_cfg: &InstFlowGraph,
    domtree: &DominatorTree,
    loops: &LoopInfo,
    weights: &EdgeWeights,
) -> Graph<Inst> {
    let mut graph = Graph::with_nodes(func.dfg.num_insts());
    for block in func.layout.blocks() {
        for src in func.layout.block_insts(block) {
            for dst in inst_cfg.succ_iter(src) {
                let dst_block = func.layout.inst_block(dst).unwrap_or(block);
                let loop_depth = loops.loop_depth(block).min(loops.loop_depth(dst_block));
                let dom_depth = domtree.depth(block).max(domtree.depth(dst_block));
                graph.add_edge(src, dst, weights.weight(loop_depth, dom_depth));
            }
        }
    }
    graph
}
