use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::entities::{Block, FuncRef, Value};

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Iadd,
    Isub,
    Imul,
    Udiv,
    Sdiv,
    Urem,
    Srem,
    Iand,
    Ior,
    Ixor,
    Ishl,
    Ilshr,
    Iashr,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Frem,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 18] = [
        BinaryOp::Iadd,
        BinaryOp::Isub,
        BinaryOp::Imul,
        BinaryOp::Udiv,
        BinaryOp::Sdiv,
        BinaryOp::Urem,
        BinaryOp::Srem,
        BinaryOp::Iand,
        BinaryOp::Ior,
        BinaryOp::Ixor,
        BinaryOp::Ishl,
        BinaryOp::Ilshr,
        BinaryOp::Iashr,
        BinaryOp::Fadd,
        BinaryOp::Fsub,
        BinaryOp::Fmul,
        BinaryOp::Fdiv,
        BinaryOp::Frem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Iadd => "iadd",
            BinaryOp::Isub => "isub",
            BinaryOp::Imul => "imul",
            BinaryOp::Udiv => "udiv",
            BinaryOp::Sdiv => "sdiv",
            BinaryOp::Urem => "urem",
            BinaryOp::Srem => "srem",
            BinaryOp::Iand => "iand",
            BinaryOp::Ior => "ior",
            BinaryOp::Ixor => "ixor",
            BinaryOp::Ishl => "ishl",
            BinaryOp::Ilshr => "ilshr",
            BinaryOp::Iashr => "iashr",
            BinaryOp::Fadd => "fadd",
            BinaryOp::Fsub => "fsub",
            BinaryOp::Fmul => "fmul",
            BinaryOp::Fdiv => "fdiv",
            BinaryOp::Frem => "frem",
        }
    }

    /// Integer division and remainder. Their latency depends on the operands.
    pub fn is_int_division(self) -> bool {
        matches!(self, BinaryOp::Udiv | BinaryOp::Sdiv | BinaryOp::Urem | BinaryOp::Srem)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Fneg,
    Ineg,
    Inot,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Fneg, UnaryOp::Ineg, UnaryOp::Inot];

    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Fneg => "fneg",
            UnaryOp::Ineg => "ineg",
            UnaryOp::Inot => "inot",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastOp {
    Zext,
    Sext,
    Trunc,
    Bitcast,
    PtrToInt,
    IntToPtr,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    FpExt,
    FpTrunc,
}

impl CastOp {
    pub const ALL: [CastOp; 12] = [
        CastOp::Zext,
        CastOp::Sext,
        CastOp::Trunc,
        CastOp::Bitcast,
        CastOp::PtrToInt,
        CastOp::IntToPtr,
        CastOp::FpToSi,
        CastOp::FpToUi,
        CastOp::SiToFp,
        CastOp::UiToFp,
        CastOp::FpExt,
        CastOp::FpTrunc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CastOp::Zext => "zext",
            CastOp::Sext => "sext",
            CastOp::Trunc => "trunc",
            CastOp::Bitcast => "bitcast",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::FpToSi => "fptosi",
            CastOp::FpToUi => "fptoui",
            CastOp::SiToFp => "sitofp",
            CastOp::UiToFp => "uitofp",
            CastOp::FpExt => "fpext",
            CastOp::FpTrunc => "fptrunc",
        }
    }

    /// Casts that keep the address of a pointer intact.
    pub fn preserves_address(self) -> bool {
        matches!(self, CastOp::Bitcast | CastOp::PtrToInt | CastOp::IntToPtr)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Ieq,
    Ine,
    Iult,
    Iule,
    Iugt,
    Iuge,
    Islt,
    Isle,
    Isgt,
    Isge,
    Feq,
    Fne,
    Flt,
    Fle,
    Fgt,
    Fge,
}

impl CmpOp {
    pub const ALL: [CmpOp; 16] = [
        CmpOp::Ieq,
        CmpOp::Ine,
        CmpOp::Iult,
        CmpOp::Iule,
        CmpOp::Iugt,
        CmpOp::Iuge,
        CmpOp::Islt,
        CmpOp::Isle,
        CmpOp::Isgt,
        CmpOp::Isge,
        CmpOp::Feq,
        CmpOp::Fne,
        CmpOp::Flt,
        CmpOp::Fle,
        CmpOp::Fgt,
        CmpOp::Fge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CmpOp::Ieq => "ieq",
            CmpOp::Ine => "ine",
            CmpOp::Iult => "iult",
            CmpOp::Iule => "iule",
            CmpOp::Iugt => "iugt",
            CmpOp::Iuge => "iuge",
            CmpOp::Islt => "islt",
            CmpOp::Isle => "isle",
            CmpOp::Isgt => "isgt",
            CmpOp::Isge => "isge",
            CmpOp::Feq => "feq",
            CmpOp::Fne => "fne",
            CmpOp::Flt => "flt",
            CmpOp::Fle => "fle",
            CmpOp::Fgt => "fgt",
            CmpOp::Fge => "fge",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RmwOp {
    Xchg,
    Add,
    Sub,
    And,
    Or,
    Xor,
}

impl RmwOp {
    pub const ALL: [RmwOp; 6] =
        [RmwOp::Xchg, RmwOp::Add, RmwOp::Sub, RmwOp::And, RmwOp::Or, RmwOp::Xor];

    pub fn name(self) -> &'static str {
        match self {
            RmwOp::Xchg => "xchg",
            RmwOp::Add => "add",
            RmwOp::Sub => "sub",
            RmwOp::And => "and",
            RmwOp::Or => "or",
            RmwOp::Xor => "xor",
        }
    }
}

/// The incoming edges of a phi. Each predecessor block appears at most once.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PhiNode {
    pub edges: Vec<(Block, Value)>,
}

impl PhiNode {
    pub fn edge_val(&self, pred: Block) -> Option<Value> {
        self.edges.iter().find(|(bb, _)| *bb == pred).map(|(_, val)| *val)
    }

    /// Replaces the predecessor `old` with `new`. Returns whether `old` was an incoming edge.
    pub fn retarget_edge(&mut self, old: Block, new: Block) -> bool {
        match self.edges.iter_mut().find(|(bb, _)| *bb == old) {
            Some((bb, _)) => {
                *bb = new;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstructionData {
    // memory
    Load { ptr: Value, size: u32, inbounds: bool },
    Store { val: Value, ptr: Value, size: u32, inbounds: bool },
    AtomicRmw { op: RmwOp, ptr: Value, val: Value, size: u32 },
    CmpXchg { ptr: Value, expected: Value, replacement: Value, size: u32 },

    // control flow
    Branch { cond: Value, then_dst: Block, else_dst: Block },
    Switch { cond: Value, default: Block, cases: Vec<(i64, Block)> },
    Jump { destination: Block },
    Call { func_ref: FuncRef, args: Vec<Value> },
    CallIndirect { callee: Value, args: Vec<Value> },
    Ret { val: Option<Value> },
    Resume { val: Value },
    Unreachable,

    // pure data
    Unary { op: UnaryOp, arg: Value },
    Binary { op: BinaryOp, args: [Value; 2] },
    Cast { op: CastOp, arg: Value },
    Compare { op: CmpOp, args: [Value; 2] },
    Select { cond: Value, then_val: Value, else_val: Value },
    PhiNode(PhiNode),
    Freeze { arg: Value },
    Gep { base: Value, offsets: Vec<Value> },
    Alloca { size: u32 },
    ExtractElement { vector: Value, index: Value },
    InsertElement { vector: Value, elem: Value, index: Value },
    ShuffleVector { args: [Value; 2] },
    ExtractValue { aggregate: Value, index: u32 },
    InsertValue { aggregate: Value, elem: Value, index: u32 },

    LandingPad,
    /// A speculation barrier. The tag records why it was inserted.
    Fence { tag: Box<str> },
    /// Anything the IR does not model. Analyses refuse to reason about these.
    Opaque { mnemonic: Box<str>, args: Vec<Value> },
}

impl From<PhiNode> for InstructionData {
    fn from(node: PhiNode) -> Self {
        InstructionData::PhiNode(node)
    }
}

impl InstructionData {
    pub fn is_phi(&self) -> bool {
        matches!(self, InstructionData::PhiNode(_))
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionData::Branch { .. }
                | InstructionData::Switch { .. }
                | InstructionData::Jump { .. }
                | InstructionData::Ret { .. }
                | InstructionData::Resume { .. }
                | InstructionData::Unreachable
        )
    }

    /// Value operands in source order.
    pub fn arguments(&self) -> SmallVec<[Value; 4]> {
        match *self {
            InstructionData::Load { ptr, .. } => smallvec![ptr],
            InstructionData::Store { val, ptr, .. } => smallvec![val, ptr],
            InstructionData::AtomicRmw { ptr, val, .. } => smallvec![ptr, val],
            InstructionData::CmpXchg { ptr, expected, replacement, .. } => {
                smallvec![ptr, expected, replacement]
            }
            InstructionData::Branch { cond, .. } | InstructionData::Switch { cond, .. } => {
                smallvec![cond]
            }
            InstructionData::Jump { .. }
            | InstructionData::Unreachable
            | InstructionData::LandingPad
            | InstructionData::Alloca { .. }
            | InstructionData::Fence { .. } => SmallVec::new(),
            InstructionData::Call { ref args, .. } | InstructionData::Opaque { ref args, .. } => {
                args.iter().copied().collect()
            }
            InstructionData::CallIndirect { callee, ref args } => {
                let mut res: SmallVec<[Value; 4]> = smallvec![callee];
                res.extend(args.iter().copied());
                res
            }
            InstructionData::Ret { val } => val.into_iter().collect(),
            InstructionData::Resume { val } => smallvec![val],
            InstructionData::Unary { arg, .. }
            | InstructionData::Cast { arg, .. }
            | InstructionData::Freeze { arg } => smallvec![arg],
            InstructionData::Binary { args, .. }
            | InstructionData::Compare { args, .. }
            | InstructionData::ShuffleVector { args } => SmallVec::from_slice(&args),
            InstructionData::Select { cond, then_val, else_val } => {
                smallvec![cond, then_val, else_val]
            }
            InstructionData::PhiNode(ref node) => node.edges.iter().map(|(_, val)| *val).collect(),
            InstructionData::Gep { base, ref offsets } => {
                let mut res: SmallVec<[Value; 4]> = smallvec![base];
                res.extend(offsets.iter().copied());
                res
            }
            InstructionData::ExtractElement { vector, index } => smallvec![vector, index],
            InstructionData::InsertElement { vector, elem, index } => {
                smallvec![vector, elem, index]
            }
            InstructionData::ExtractValue { aggregate, .. } => smallvec![aggregate],
            InstructionData::InsertValue { aggregate, elem, .. } => smallvec![aggregate, elem],
        }
    }

    /// The address operand of instructions that access memory.
    pub fn pointer_operand(&self) -> Option<Value> {
        match *self {
            InstructionData::Load { ptr, .. }
            | InstructionData::Store { ptr, .. }
            | InstructionData::AtomicRmw { ptr, .. }
            | InstructionData::CmpXchg { ptr, .. } => Some(ptr),
            _ => None,
        }
    }

    /// Number of bytes accessed by a memory instruction.
    pub fn access_size(&self) -> Option<u32> {
        match *self {
            InstructionData::Load { size, .. }
            | InstructionData::Store { size, .. }
            | InstructionData::AtomicRmw { size, .. }
            | InstructionData::CmpXchg { size, .. } => Some(size),
            _ => None,
        }
    }

    /// Successor blocks of a terminator. Duplicate targets are reported once.
    pub fn successors(&self) -> SmallVec<[Block; 2]> {
        let mut res: SmallVec<[Block; 2]> = match *self {
            InstructionData::Branch { then_dst, else_dst, .. } => smallvec![then_dst, else_dst],
            InstructionData::Switch { default, ref cases, .. } => {
                let mut res: SmallVec<[Block; 2]> = smallvec![default];
                res.extend(cases.iter().map(|(_, bb)| *bb));
                res
            }
            InstructionData::Jump { destination } => smallvec![destination],
            _ => return SmallVec::new(),
        };
        let mut i = 0;
        while i < res.len() {
            if res[..i].contains(&res[i]) {
                res.remove(i);
            } else {
                i += 1;
            }
        }
        res
    }

    /// Redirects every edge to `old` so it targets `new` instead.
    pub fn retarget(&mut self, old: Block, new: Block) {
        let retarget = |bb: &mut Block| {
            if *bb == old {
                *bb = new
            }
        };
        match self {
            InstructionData::Branch { then_dst, else_dst, .. } => {
                retarget(then_dst);
                retarget(else_dst);
            }
            InstructionData::Switch { default, cases, .. } => {
                retarget(default);
                cases.iter_mut().for_each(|(_, bb)| retarget(bb));
            }
            InstructionData::Jump { destination } => retarget(destination),
            _ => (),
        }
    }

    /// The mnemonic used by the textual representation.
    pub fn mnemonic(&self) -> &str {
        match self {
            InstructionData::Load { .. } => "load",
            InstructionData::Store { .. } => "store",
            InstructionData::AtomicRmw { .. } => "atomic_rmw",
            InstructionData::CmpXchg { .. } => "cmpxchg",
            InstructionData::Branch { .. } => "br",
            InstructionData::Switch { .. } => "switch",
            InstructionData::Jump { .. } => "jmp",
            InstructionData::Call { .. } => "call",
            InstructionData::CallIndirect { .. } => "call_indirect",
            InstructionData::Ret { .. } => "ret",
            InstructionData::Resume { .. } => "resume",
            InstructionData::Unreachable => "unreachable",
            InstructionData::Unary { op, .. } => op.name(),
            InstructionData::Binary { op, .. } => op.name(),
            InstructionData::Cast { op, .. } => op.name(),
            InstructionData::Compare { op, .. } => op.name(),
            InstructionData::Select { .. } => "select",
            InstructionData::PhiNode(_) => "phi",
            InstructionData::Freeze { .. } => "freeze",
            InstructionData::Gep { .. } => "gep",
            InstructionData::Alloca { .. } => "alloca",
            InstructionData::ExtractElement { .. } => "extractelement",
            InstructionData::InsertElement { .. } => "insertelement",
            InstructionData::ShuffleVector { .. } => "shufflevector",
            InstructionData::ExtractValue { .. } => "extractvalue",
            InstructionData::InsertValue { .. } => "insertvalue",
            InstructionData::LandingPad => "landingpad",
            InstructionData::Fence { .. } => "lfence",
            InstructionData::Opaque { mnemonic, .. } => mnemonic,
        }
    }
}

impl fmt::Display for PhiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (bb, val) in &self.edges {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "[{val}, {bb}]")?;
        }
        Ok(())
    }
}
