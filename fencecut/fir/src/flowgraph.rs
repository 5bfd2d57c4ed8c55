//! Control flow graphs.
//!
//! [`ControlFlowGraph`] records the edges between basic blocks. Most analyses of this crate work on
//! blocks, but the taint analyses and the mitigation solver reason about individual instructions:
//! [`InstFlowGraph`] lifts the block graph to instruction granularity. The successor of an ordinary
//! instruction is the next instruction in its block. The successors of a terminator are the first
//! instructions of its successor blocks.

use smallvec::SmallVec;
use typed_index_collections::TiVec;

use crate::{Block, Function, Inst};

#[derive(Clone, Debug, Default)]
struct CfgNode {
    predecessors: SmallVec<[Block; 4]>,
    successors: SmallVec<[Block; 2]>,
}

/// The block-level control flow graph of a function.
#[derive(Clone, Debug, Default)]
pub struct ControlFlowGraph {
    data: TiVec<Block, CfgNode>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(func: &Function) -> Self {
        let mut cfg = Self::new();
        cfg.compute(func);
        cfg
    }

    /// Compute the control flow graph of `func`.
    ///
    /// This will clear and overwrite any information already stored in this data structure.
    pub fn compute(&mut self, func: &Function) {
        self.data.clear();
        self.data.resize(func.layout.num_blocks(), CfgNode::default());

        for block in &func.layout {
            let Some(term) = func.layout.block_terminator(block) else { continue };
            for succ in func.dfg.insts[term].successors() {
                self.data[block].successors.push(succ);
                self.data[succ].predecessors.push(block);
            }
        }
    }

    pub fn pred_iter(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.data[block].predecessors.iter().copied()
    }

    pub fn succ_iter(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.data[block].successors.iter().copied()
    }

    pub fn num_preds(&self, block: Block) -> usize {
        self.data[block].predecessors.len()
    }
}

#[derive(Clone, Debug, Default)]
struct InstNode {
    predecessors: SmallVec<[Inst; 2]>,
    successors: SmallVec<[Inst; 2]>,
}

/// The control flow graph at instruction granularity.
///
/// Instructions that are not part of the layout have neither predecessors nor successors.
#[derive(Clone, Debug, Default)]
pub struct InstFlowGraph {
    data: TiVec<Inst, InstNode>,
}

impl InstFlowGraph {
    pub fn with_function(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let mut res = Self::default();
        res.compute(func, cfg);
        res
    }

    pub fn compute(&mut self, func: &Function, cfg: &ControlFlowGraph) {
        self.data.clear();
        self.data.resize(func.dfg.num_insts(), InstNode::default());

        for block in &func.layout {
            let mut insts = func.layout.block_insts(block).peekable();
            while let Some(inst) = insts.next() {
                if let Some(&next) = insts.peek() {
                    self.add_edge(inst, next);
                } else {
                    for succ in cfg.succ_iter(block) {
                        if let Some(first) = func.layout.first_inst(succ) {
                            self.add_edge(inst, first);
                        }
                    }
                }
            }
        }
    }

    fn add_edge(&mut self, from: Inst, to: Inst) {
        self.data[from].successors.push(to);
        self.data[to].predecessors.push(from);
    }

    pub fn succ_iter(&self, inst: Inst) -> impl Iterator<Item = Inst> + '_ {
        self.data[inst].successors.iter().copied()
    }

    pub fn pred_iter(&self, inst: Inst) -> impl Iterator<Item = Inst> + '_ {
        self.data[inst].predecessors.iter().copied()
    }

    pub fn successors(&self, inst: Inst) -> &[Inst] {
        &self.data[inst].successors
    }

    pub fn num_preds(&self, inst: Inst) -> usize {
        self.data[inst].predecessors.len()
    }

    pub fn num_insts(&self) -> usize {
        self.data.len()
    }
}
