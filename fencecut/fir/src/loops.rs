//! Natural loop detection.
//!
//! A back edge is an edge `latch -> header` where `header` dominates `latch`. The body of the loop
//! headed by `header` consists of all blocks that can reach a latch without passing through the
//! header. Back edges that share a header form a single loop.

use bitset::BitSet;
use indexmap::IndexMap;
use typed_index_collections::TiVec;

use crate::{Block, ControlFlowGraph, DominatorTree, Function};

#[derive(Debug, Default)]
pub struct LoopInfo {
    /// Loop bodies keyed by their header, in layout order of the headers.
    loops: IndexMap<Block, BitSet<Block>, ahash::RandomState>,
    depth: TiVec<Block, u32>,
}

impl LoopInfo {
    pub fn compute(func: &Function, cfg: &ControlFlowGraph, domtree: &DominatorTree) -> LoopInfo {
        let num_blocks = func.layout.num_blocks();
        let mut loops: IndexMap<Block, BitSet<Block>, ahash::RandomState> = IndexMap::default();
        let mut worklist = Vec::new();

        for latch in func.layout.blocks() {
            if !domtree.is_reachable(latch) {
                continue;
            }
            for header in cfg.succ_iter(latch) {
                if !domtree.dominates(latch, header) {
                    continue;
                }

                let body = loops.entry(header).or_insert_with(|| {
                    let mut body = BitSet::new_empty(num_blocks);
                    body.insert(header);
                    body
                });

                if body.insert(latch) {
                    worklist.push(latch);
                }
                while let Some(bb) = worklist.pop() {
                    for pred in cfg.pred_iter(bb) {
                        if domtree.is_reachable(pred) && body.insert(pred) {
                            worklist.push(pred);
                        }
                    }
                }
            }
        }

        let mut depth: TiVec<Block, u32> = vec![0; num_blocks].into();
        for body in loops.values() {
            for bb in body {
                depth[bb] += 1;
            }
        }

        LoopInfo { loops, depth }
    }

    /// Number of loops that contain `block`. Blocks outside of any loop have depth 0.
    pub fn loop_depth(&self, block: Block) -> u32 {
        self.depth.get(block).copied().unwrap_or(0)
    }

    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    pub fn is_loop_header(&self, block: Block) -> bool {
        self.loops.contains_key(&block)
    }
}
