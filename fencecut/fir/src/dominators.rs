//! Dominator tree of the block level control flow graph.
//!
//! Immediate dominators are found with the iterative algorithm of Cooper, Harvey and Kennedy
//! ("A Simple, Fast Dominance Algorithm") over a reverse postorder of the reachable blocks.

use bitset::BitSet;
use typed_index_collections::TiVec;

use crate::{Block, ControlFlowGraph, Function};


const UNREACHABLE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DomNode {
    /// Position in the reverse postorder, the entry block is 0.
    rpo: u32,
    /// `None` for the entry block and unreachable blocks.
    idom: Option<Block>,
    depth: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DominatorTree {
    nodes: TiVec<Block, DomNode>,
    postorder: Vec<Block>,
}

impl DominatorTree {
    pub fn with_function(func: &Function, cfg: &ControlFlowGraph) -> DominatorTree {
        let postorder = postorder(func, cfg);
        let mut nodes: TiVec<Block, DomNode> =
            vec![DomNode { rpo: UNREACHABLE, idom: None, depth: 0 }; func.layout.num_blocks()]
                .into();
        for (rpo, &block) in postorder.iter().rev().enumerate() {
            nodes[block].rpo = rpo as u32;
        }

        let Some((&entry, rest)) = postorder.split_last() else {
            return DominatorTree { nodes, postorder };
        };

        // a single pass suffices for reducible control flow
        let mut changed = true;
        while changed {
            changed = false;
            for &block in rest.iter().rev() {
                let mut preds = cfg
                    .pred_iter(block)
                    .filter(|&pred| pred == entry || nodes[pred].idom.is_some());
                let Some(first) = preds.next() else { continue };
                let idom = preds.fold(first, |idom, pred| common_dominator(&nodes, idom, pred));
                if nodes[block].idom != Some(idom) {
                    nodes[block].idom = Some(idom);
                    changed = true;
                }
            }
        }

        for &block in postorder.iter().rev() {
            nodes[block].depth = nodes[block].idom.map_or(0, |idom| nodes[idom].depth + 1);
        }

        DominatorTree { nodes, postorder }
    }

    /// The postorder of the reachable blocks the tree was computed from. The entry block is last.
    pub fn cfg_postorder(&self) -> &[Block] {
        &self.postorder
    }

    /// Returns `true` if `dominator` dominates `block`. Every reachable block dominates itself.
    pub fn dominates(&self, block: Block, dominator: Block) -> bool {
        let mut block = block;
        while self.nodes[block].rpo > self.nodes[dominator].rpo {
            match self.nodes[block].idom {
                Some(idom) => block = idom,
                None => return false,
            }
        }
        block == dominator
    }

    pub fn idom(&self, block: Block) -> Option<Block> {
        self.nodes[block].idom
    }

    /// Depth of `block` in the dominator tree. The entry block and unreachable blocks have
    /// depth 0.
    pub fn depth(&self, block: Block) -> u32 {
        self.nodes[block].depth
    }

    pub fn is_reachable(&self, block: Block) -> bool {
        self.nodes[block].rpo != UNREACHABLE
    }
}

/// Walks up the partially built tree from `a` and `b` until both meet.
fn common_dominator(nodes: &TiVec<Block, DomNode>, mut a: Block, mut b: Block) -> Block {
    while a != b {
        while nodes[a].rpo > nodes[b].rpo {
            a = parent(nodes, a);
        }
        while nodes[b].rpo > nodes[a].rpo {
            b = parent(nodes, b);
        }
    }
    a
}

fn parent(nodes: &TiVec<Block, DomNode>, block: Block) -> Block {
    match nodes[block].idom {
        Some(idom) => idom,
        None => unreachable!("{block} was not processed yet"),
    }
}

fn postorder(func: &Function, cfg: &ControlFlowGraph) -> Vec<Block> {
    let mut res = Vec::new();
    let Some(entry) = func.layout.entry_block() else { return res };
    let mut visited = BitSet::new_empty(func.layout.num_blocks());
    visited.insert(entry);

    let mut stack = vec![(entry, 0usize)];
    while let Some((block, next)) = stack.last_mut() {
        match cfg.succ_iter(*block).nth(*next) {
            Some(succ) => {
                *next += 1;
                if visited.insert(succ) {
                    stack.push((succ, 0));
                }
            }
            None => {
                res.push(*block);
                stack.pop();
            }
        }
    }
    res
}
