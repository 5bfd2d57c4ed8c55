//! Function layout.
//!
//! The order of basic blocks in a function and the order of instructions in a block is
//! determined by the `Layout` data structure defined in this module.

use typed_index_collections::TiVec;

use crate::{Block, Inst};


/// The `Layout` struct determines the layout of blocks and instructions in a function. It does not
/// contain definitions of instructions or blocks, but depends on `Inst` and `Block` entity
/// references being defined elsewhere.
///
/// This data structure determines:
///
/// - The order of blocks in the function.
/// - Which block contains a given instruction.
/// - The order of instructions with a block.
///
/// The first instruction of the first block is the entry point of the function.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    /// Linked list nodes for the layout order of blocks. Forms a doubly linked list, terminated in
    /// both ends by `None`.
    blocks: TiVec<Block, BlockNode>,

    /// Linked list nodes for the layout order of instructions. Forms a double linked list per
    /// block, terminated in both ends by `None`.
    insts: TiVec<Inst, InstNode>,

    first_block: Option<Block>,
    last_block: Option<Block>,
}

#[derive(Clone, Copy, Debug, Default)]
struct BlockNode {
    prev: Option<Block>,
    next: Option<Block>,
    first_inst: Option<Inst>,
    last_inst: Option<Inst>,
}

#[derive(Clone, Copy, Debug, Default)]
struct InstNode {
    block: Option<Block>,
    prev: Option<Inst>,
    next: Option<Inst>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks created, whether they are inserted or not.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// Methods for laying out blocks.
///
/// A new block starts out as *not inserted* in the block layout. Once a block has been inserted in
/// the layout, instructions can be added.
impl Layout {
    pub fn make_block(&mut self) -> Block {
        self.blocks.push_and_get_key(BlockNode::default())
    }

    pub fn append_new_block(&mut self) -> Block {
        let res = self.make_block();
        self.append_block(res);
        res
    }

    /// Is `block` currently part of the layout?
    pub fn is_block_inserted(&self, block: Block) -> bool {
        Some(block) == self.first_block || self.blocks[block].prev.is_some()
    }

    /// Insert `block` as the last block in the layout.
    pub fn append_block(&mut self, block: Block) {
        debug_assert!(
            !self.is_block_inserted(block),
            "Cannot append block that is already in the layout"
        );
        {
            let node = &mut self.blocks[block];
            debug_assert!(node.first_inst.is_none() && node.last_inst.is_none());
            node.prev = self.last_block;
            node.next = None;
        }
        if let Some(last) = self.last_block {
            self.blocks[last].next = Some(block);
        } else {
            self.first_block = Some(block);
        }
        self.last_block = Some(block);
    }

    /// Insert `block` in the layout *after* the existing block `after`.
    pub fn insert_block_after(&mut self, block: Block, after: Block) {
        debug_assert!(
            !self.is_block_inserted(block),
            "Cannot insert block that is already in the layout"
        );
        debug_assert!(self.is_block_inserted(after), "block Insertion point not in the layout");
        let before = self.blocks[after].next;
        {
            let node = &mut self.blocks[block];
            node.next = before;
            node.prev = Some(after);
        }
        self.blocks[after].next = Some(block);
        match before {
            None => self.last_block = Some(block),
            Some(b) => self.blocks[b].prev = Some(block),
        }
    }

    /// Return an iterator over all blocks in layout order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks { layout: self, next: self.first_block }
    }

    /// Get the function's entry block.
    /// This is simply the first block in the layout order.
    pub fn entry_block(&self) -> Option<Block> {
        self.first_block
    }

    pub fn last_block(&self) -> Option<Block> {
        self.last_block
    }

    pub fn next_block(&self, block: Block) -> Option<Block> {
        self.blocks[block].next
    }
}

/// Iterate over blocks in layout order. See [`Layout::blocks`].
pub struct Blocks<'f> {
    layout: &'f Layout,
    next: Option<Block>,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let block = self.next?;
        self.next = self.layout.next_block(block);
        Some(block)
    }
}

impl<'f> IntoIterator for &'f Layout {
    type Item = Block;
    type IntoIter = Blocks<'f>;

    fn into_iter(self) -> Blocks<'f> {
        self.blocks()
    }
}

/// Methods for arranging instructions.
///
/// An instruction starts out as *not inserted* in the layout. An instruction can be inserted into
/// a block at a given position.
impl Layout {
    /// Get the block containing `inst`, or `None` if `inst` is not inserted in the layout.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.insts.get(inst).and_then(|node| node.block)
    }

    fn ensure_inst(&mut self, inst: Inst) {
        if self.insts.len() <= usize::from(inst) {
            self.insts.resize(usize::from(inst) + 1, InstNode::default())
        }
    }

    /// Append `inst` to the end of `block`.
    pub fn append_inst_to_bb(&mut self, inst: Inst, block: Block) {
        self.ensure_inst(inst);
        debug_assert_eq!(self.inst_block(inst), None);
        debug_assert!(
            self.is_block_inserted(block),
            "Cannot append instructions to block not in layout"
        );

        let last = self.blocks[block].last_inst;
        {
            let inst_node = &mut self.insts[inst];
            inst_node.block = Some(block);
            inst_node.prev = last;
            inst_node.next = None;
        }
        match last {
            None => self.blocks[block].first_inst = Some(inst),
            Some(last) => self.insts[last].next = Some(inst),
        }
        self.blocks[block].last_inst = Some(inst);
    }

    /// Insert `inst` before the instruction `before` in the same block.
    pub fn prepend_inst(&mut self, inst: Inst, before: Inst) {
        self.ensure_inst(inst);
        debug_assert_eq!(self.inst_block(inst), None);
        let Some(block) = self.inst_block(before) else {
            unreachable!("instruction before insertion point not in the layout")
        };

        let after = self.insts[before].prev;
        {
            let inst_node = &mut self.insts[inst];
            inst_node.block = Some(block);
            inst_node.next = Some(before);
            inst_node.prev = after;
        }
        self.insts[before].prev = Some(inst);
        match after {
            None => self.blocks[block].first_inst = Some(inst),
            Some(a) => self.insts[a].next = Some(inst),
        }
    }

    pub fn first_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].first_inst
    }

    pub fn last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].last_inst
    }

    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts.get(inst).and_then(|node| node.next)
    }

    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts.get(inst).and_then(|node| node.prev)
    }

    /// Iterate over the instructions in `block` in layout order.
    pub fn block_insts(&self, block: Block) -> InstIter<'_> {
        InstIter {
            layout: self,
            head: self.blocks[block].first_inst,
            tail: self.blocks[block].last_inst,
        }
    }

    pub fn block_terminator(&self, block: Block) -> Option<Inst> {
        self.blocks[block].last_inst
    }
}

/// Iterate over instructions in a block in layout order. See [`Layout::block_insts`].
#[derive(Clone)]
pub struct InstIter<'f> {
    layout: &'f Layout,
    head: Option<Inst>,
    tail: Option<Inst>,
}

impl Iterator for InstIter<'_> {
    type Item = Inst;

    fn next(&mut self) -> Option<Inst> {
        let rval = self.head;
        if let Some(inst) = rval {
            if self.head == self.tail {
                self.head = None;
                self.tail = None;
            } else {
                self.head = self.layout.insts[inst].next;
            }
        }
        rval
    }
}

impl DoubleEndedIterator for InstIter<'_> {
    fn next_back(&mut self) -> Option<Inst> {
        let rval = self.tail;
        if let Some(inst) = rval {
            if self.head == self.tail {
                self.head = None;
                self.tail = None;
            } else {
                self.tail = self.layout.insts[inst].prev;
            }
        }
        rval
    }
}
