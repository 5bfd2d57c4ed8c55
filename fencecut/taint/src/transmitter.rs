use fir::{Function, Inst, InstructionData, Value};
use smallvec::{smallvec, SmallVec};

use crate::rules::{transmit_rule, TransmitRule};
use crate::{TaintError, TaintResult};


/// How reliably an attacker observes an operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransmitterKind {
    /// Only observable in some contexts (stored values, call arguments, returned values).
    Pseudo,
    /// Always observable (addresses, branch conditions, divider operands).
    Strong,
}

/// An operand of an instruction that leaks through a side channel if it is secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransmitterOperand {
    pub kind: TransmitterKind,
    pub value: Value,
}

impl TransmitterOperand {
    fn strong(value: Value) -> TransmitterOperand {
        TransmitterOperand { kind: TransmitterKind::Strong, value }
    }

    fn pseudo(value: Value) -> TransmitterOperand {
        TransmitterOperand { kind: TransmitterKind::Pseudo, value }
    }
}

pub type TransmitterOperands = SmallVec<[TransmitterOperand; 4]>;

/// Classifies the operands of `inst` that an attacker can observe.
///
/// Calls to intrinsics without a rule and opaque instructions are rejected.
pub fn transmitter_operands(func: &Function, inst: Inst) -> TaintResult<TransmitterOperands> {
    let res = match func.dfg.insts[inst] {
        InstructionData::Load { ptr, .. }
        | InstructionData::AtomicRmw { ptr, .. }
        | InstructionData::CmpXchg { ptr, .. } => smallvec![TransmitterOperand::strong(ptr)],

        InstructionData::Store { val, ptr, .. } => {
            let mut res = smallvec![TransmitterOperand::strong(ptr)];
            if !func.is_provably_inbounds(inst) {
                res.push(TransmitterOperand::pseudo(val));
            }
            res
        }

        InstructionData::Branch { cond, .. } | InstructionData::Switch { cond, .. } => {
            smallvec![TransmitterOperand::strong(cond)]
        }

        InstructionData::Call { func_ref, ref args } => {
            let sig = &func.dfg.signatures[func_ref];
            match sig.intrinsic {
                None => args.iter().map(|&arg| TransmitterOperand::pseudo(arg)).collect(),
                Some(intrinsic) => {
                    let Some(rule) = transmit_rule(intrinsic) else {
                        return Err(TaintError::UnhandledIntrinsic {
                            inst,
                            name: sig.name.clone(),
                        });
                    };
                    match rule {
                        TransmitRule::None => SmallVec::new(),
                        TransmitRule::All(kind) => args
                            .iter()
                            .map(|&value| TransmitterOperand { kind, value })
                            .collect(),
                        TransmitRule::Args(positions) => positions
                            .iter()
                            .filter_map(|&(pos, kind)| {
                                args.get(pos).map(|&value| TransmitterOperand { kind, value })
                            })
                            .collect(),
                    }
                }
            }
        }

        InstructionData::CallIndirect { callee, ref args } => {
            let mut res: TransmitterOperands = smallvec![TransmitterOperand::strong(callee)];
            res.extend(args.iter().map(|&arg| TransmitterOperand::pseudo(arg)));
            res
        }

        InstructionData::Ret { val: Some(val) } | InstructionData::Resume { val } => {
            smallvec![TransmitterOperand::pseudo(val)]
        }

        // the divider has data dependent timing
        InstructionData::Binary { op, args } if op.is_int_division() => {
            args.iter().map(|&arg| TransmitterOperand::strong(arg)).collect()
        }

        InstructionData::Binary { .. }
        | InstructionData::Unary { .. }
        | InstructionData::Cast { .. }
        | InstructionData::Compare { .. }
        | InstructionData::Select { .. }
        | InstructionData::PhiNode(_)
        | InstructionData::Freeze { .. }
        | InstructionData::Gep { .. }
        | InstructionData::Alloca { .. }
        | InstructionData::ExtractElement { .. }
        | InstructionData::InsertElement { .. }
        | InstructionData::ShuffleVector { .. }
        | InstructionData::ExtractValue { .. }
        | InstructionData::InsertValue { .. }
        | InstructionData::LandingPad
        | InstructionData::Fence { .. }
        | InstructionData::Jump { .. }
        | InstructionData::Ret { val: None }
        | InstructionData::Unreachable => SmallVec::new(),

        InstructionData::Opaque { ref mnemonic, .. } => {
            return Err(TaintError::UnhandledInstruction { inst, kind: mnemonic.to_string() })
        }
    };

    Ok(res)
}

/// The strongest observation of a secret operand of a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransmitterClass {
    /// The instruction has transmitter operands but none of them is secret.
    Safe,
    Pseudo,
    Strong,
}

/// Summarizes the transmitter operands of an instruction given a secrecy predicate.
///
/// Returns `None` for instructions without transmitter operands.
pub fn classify_transmitter(
    operands: &[TransmitterOperand],
    mut secret: impl FnMut(Value) -> bool,
) -> Option<TransmitterClass> {
    operands
        .iter()
        .map(|op| {
            if !secret(op.value) {
                TransmitterClass::Safe
            } else if op.kind == TransmitterKind::Strong {
                TransmitterClass::Strong
            } else {
                TransmitterClass::Pseudo
            }
        })
        .max()
}
