//! fencecut IR
//!
//! The fencecut IR (FIR) represents the bodies of functions as [SSA]. It is the program
//! representation the speculative taint analyses and the mitigation pass operate on. The design is
//! heavily inspired by the IR in [`cranelift`] but keeps just enough detail to reason about
//! memory accesses, control flow and data dependencies:
//!
//! * Values are untyped apart from a pointer/scalar distinction.
//! * Memory accesses carry the number of bytes they touch and whether they are known to stay in
//!   bounds of their allocation.
//! * Instructions the IR can not model are kept as `opaque` so that analyses can refuse them
//!   instead of silently ignoring their effects.
//!
//! Analyses never own instructions. They refer to them with the small [`Inst`]/[`Value`]/[`Block`]
//! handles defined in this crate.
//!
//! [`cranelift`]: https://github.com/bytecodealliance/wasmtime/tree/main/cranelift
//! [SSA]: https://en.wikipedia.org/wiki/Static_single_assignment_form

mod alias;
mod dfg;
mod dominators;
mod entities;
mod instructions;
mod intrinsics;
mod layout;
mod loops;

pub mod flowgraph;
pub mod write;

use core::fmt;

pub use crate::alias::{
    is_constant_address, AliasAnalysis, AliasResult, BasicAliasAnalysis, MemoryLocation,
};
pub use crate::dfg::{DataFlowGraph, Type, ValueDef};
pub use crate::dominators::DominatorTree;
pub use crate::entities::{AnyEntity, Block, FuncRef, Inst, Param, Value};
pub use crate::flowgraph::{ControlFlowGraph, InstFlowGraph};
pub use crate::instructions::{
    BinaryOp, CastOp, CmpOp, InstructionData, PhiNode, RmwOp, UnaryOp,
};
pub use crate::intrinsics::{FunctionSignature, Intrinsic};
pub use crate::layout::{Blocks, InstIter, Layout};
pub use crate::loops::LoopInfo;


/// Functions can be cloned, but it is not a very fast operation.
/// The clone will have all the same entity numbers as the original.
#[derive(Clone, Default)]
pub struct Function {
    pub name: String,

    /// Data flow graph containing the primary definition of all instructions and values.
    pub dfg: DataFlowGraph,

    /// Layout of blocks and instructions in the function body.
    pub layout: Layout,
}

impl Function {
    pub fn new() -> Function {
        Function::default()
    }

    pub fn with_name(name: String) -> Function {
        Function { name, ..Function::default() }
    }

    pub fn to_debug_string(&self) -> String {
        format!("{:?}", self)
    }

    /// Adds a signature which can later be used to declare an external function import.
    pub fn import_function(&mut self, signature: FunctionSignature) -> FuncRef {
        self.dfg.signatures.push_and_get_key(signature)
    }

    /// All instructions in layout order.
    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.layout.blocks().flat_map(|bb| self.layout.block_insts(bb))
    }

    /// The first instruction executed when the function is called.
    pub fn entry_inst(&self) -> Option<Inst> {
        self.layout.entry_block().and_then(|bb| self.layout.first_inst(bb))
    }

    /// The first instruction of `block` that is not a phi.
    pub fn first_non_phi(&self, block: Block) -> Option<Inst> {
        self.layout.block_insts(block).find(|&inst| !self.dfg.insts[inst].is_phi())
    }

    /// The memory accessed by `inst`, if it is a load, store or atomic.
    pub fn access_location(&self, inst: Inst) -> Option<MemoryLocation> {
        let data = &self.dfg.insts[inst];
        Some(MemoryLocation { ptr: data.pointer_operand()?, size: data.access_size()? })
    }

    /// Returns `true` if the memory access `inst` can never leave the bounds of the accessed
    /// object, even when executed speculatively.
    ///
    /// This is the case for accesses marked `inbounds` and for accesses to constant addresses.
    pub fn is_provably_inbounds(&self, inst: Inst) -> bool {
        match self.dfg.insts[inst] {
            InstructionData::Load { ptr, inbounds, .. }
            | InstructionData::Store { ptr, inbounds, .. } => {
                inbounds || is_constant_address(self, ptr)
            }
            InstructionData::AtomicRmw { ptr, .. } | InstructionData::CmpXchg { ptr, .. } => {
                is_constant_address(self, ptr)
            }
            _ => false,
        }
    }

    /// Replace the incoming edge `old_pred` of all phis in `bb` with `new_pred`.
    pub fn update_phi_edges(&mut self, bb: Block, old_pred: Block, new_pred: Block) {
        let Function { dfg, layout, .. } = self;
        for inst in layout.block_insts(bb) {
            if let InstructionData::PhiNode(ref mut node) = dfg.insts[inst] {
                let found = node.retarget_edge(old_pred, new_pred);
                debug_assert!(found, "phi {inst} has no edge from {old_pred}");
            } else {
                break;
            }
        }
    }

    /// Split the control flow edge `from -> to`.
    ///
    /// A new block that only contains a jump to `to` is placed after `from` in the layout. The
    /// terminator of `from` and the phis in `to` are updated to use the new block:
    ///
    /// ```text
    /// from:                   from:
    ///     br v1, to, other        br v1, new, other
    ///                         new:
    ///                             jmp to
    /// ```
    pub fn split_edge(&mut self, from: Block, to: Block) -> Block {
        let new_block = self.layout.make_block();
        self.layout.insert_block_after(new_block, from);
        let jmp = self.dfg.make_inst(InstructionData::Jump { destination: to });
        self.layout.append_inst_to_bb(jmp, new_block);

        if let Some(term) = self.layout.block_terminator(from) {
            self.dfg.insts[term].retarget(to, new_block);
        }
        self.update_phi_edges(to, from, new_block);
        new_block
    }

    /// Insert a speculation barrier right before `inst`.
    pub fn insert_fence_before(&mut self, inst: Inst, tag: &str) -> Inst {
        let fence = self.dfg.make_inst(InstructionData::Fence { tag: tag.into() });
        self.layout.prepend_inst(fence, inst);
        fence
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write::write_function(f, self)
    }
}
