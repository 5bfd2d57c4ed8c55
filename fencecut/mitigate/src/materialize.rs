use ahash::RandomState;
use fir::{Block, Function, Inst, InstFlowGraph};
use indexmap::IndexSet;
use log::trace;
use mincut::{CutEdge, CutSet};

#[cfg(test)]
mod tests;

/// The provenance tag of the barriers inserted by [`materialize`].
pub const MITIGATION_TAG: &str = "fencecut-mitigate";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum MitigationPoint {
    /// Split the control flow edge between two blocks and fence the new block.
    SplitEdge(Block, Block),
    Before(Inst),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Materialized {
    pub fences: usize,
    pub edge_splits: usize,
}

/// Inserts a barrier for every edge in `cut`.
///
/// An edge into an instruction with several predecessors is split so that only the path through
/// the cut edge is fenced. Otherwise the barrier goes right before the destination, after any
/// phis. `inst_cfg` must describe `func` before any barrier was inserted.
pub fn materialize(
    func: &mut Function,
    inst_cfg: &InstFlowGraph,
    cut: &CutSet<Inst>,
    tag: &str,
) -> Materialized {
    let mut points: IndexSet<MitigationPoint, RandomState> = IndexSet::default();
    for edge in cut.to_sorted_vec() {
        points.insert(mitigation_point(func, inst_cfg, edge));
    }

    let mut res = Materialized::default();
    for point in points {
        let before = match point {
            MitigationPoint::SplitEdge(from, to) => {
                let block = func.split_edge(from, to);
                res.edge_splits += 1;
                match func.layout.first_inst(block) {
                    Some(jmp) => jmp,
                    None => unreachable!("split edges contain a jump"),
                }
            }
            MitigationPoint::Before(inst) => inst,
        };
        let fence = func.insert_fence_before(before, tag);
        trace!("%{}: {fence} inserted for {point:?}", func.name);
        res.fences += 1;
    }
    res
}

fn mitigation_point(func: &Function, inst_cfg: &InstFlowGraph, edge: CutEdge<Inst>) -> MitigationPoint {
    let CutEdge { src, dst } = edge;
    let (Some(src_block), Some(dst_block)) =
        (func.layout.inst_block(src), func.layout.inst_block(dst))
    else {
        unreachable!("cut edge {edge} is not part of the layout")
    };

    if inst_cfg.num_preds(dst) > 1 {
        debug_assert!(func.dfg.insts[src].is_terminator());
        debug_assert_eq!(func.layout.first_inst(dst_block), Some(dst));
        return MitigationPoint::SplitEdge(src_block, dst_block);
    }

    if func.dfg.insts[dst].is_phi() {
        if let Some(inst) = func.first_non_phi(dst_block) {
            return MitigationPoint::Before(inst);
        }
    }
    MitigationPoint::Before(dst)
}
