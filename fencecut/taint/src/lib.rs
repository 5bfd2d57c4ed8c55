//! Speculative taint analyses.
//!
//! This crate decides which values of a [`Function`](fir::Function) an attacker must not observe.
//! It consists of three parts:
//!
//! * The transmitter classifier ([`transmitter_operands`]) lists the operands of an instruction
//!   that leak through a side channel (addresses, branch conditions, divider operands, ...).
//! * [`NonspeculativeTaint`] computes the values that are public even on the architectural path.
//!   Everything else is potentially secret.
//! * [`SpeculativeTaint`] computes the values that only become secret when a load speculatively
//!   reads out of bounds, together with the loads that caused it.
//!
//! Both analyses are flow insensitive fixed point iterations over a single function. They are
//! recomputed from scratch whenever the function changes.

mod error;
mod incoming;
mod nonspeculative;
pub mod rules;
mod speculative;
mod transmitter;

use fir::{AliasResult, Function, Inst, InstructionData, Value};
use smallvec::{smallvec, SmallVec};

pub use crate::error::{TaintError, TaintResult};
pub use crate::incoming::{incoming_load_insts, incoming_loads, ValueSet};
pub use crate::nonspeculative::NonspeculativeTaint;
pub use crate::speculative::SpeculativeTaint;
pub use crate::transmitter::{
    classify_transmitter, transmitter_operands, TransmitterClass, TransmitterKind,
    TransmitterOperand, TransmitterOperands,
};

#[cfg(test)]
mod tests;

/// How `MayAlias` answers of the alias oracle are treated.
///
/// `Optimistic` is unsound and has fewer mitigations as a result. There is no default, every
/// caller has to pick one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AliasPolicy {
    /// Only `MustAlias` proves that two accesses touch the same bytes and every `MayAlias` store
    /// can forward taint to a load.
    Sound,
    /// `MayAlias` is treated like `MustAlias`: it makes values public and it does not forward
    /// speculative taint.
    Optimistic,
}

impl AliasPolicy {
    /// Whether the nonspeculative analysis may treat both accesses as the same location.
    pub fn same_location(self, res: AliasResult) -> bool {
        match res {
            AliasResult::MustAlias => true,
            AliasResult::MayAlias => self == AliasPolicy::Optimistic,
            AliasResult::NoAlias => false,
        }
    }

    /// Whether a store may forward speculative taint to a load.
    pub fn forwards_taint(self, res: AliasResult) -> bool {
        match res {
            AliasResult::MustAlias => true,
            AliasResult::MayAlias => self == AliasPolicy::Sound,
            AliasResult::NoAlias => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaintConfig {
    /// Assume every call follows a calling convention that only passes public values: call
    /// arguments, call results and returned values are public.
    pub strict_calling_conv: bool,
    pub alias_policy: AliasPolicy,
}

impl TaintConfig {
    pub fn new(alias_policy: AliasPolicy) -> TaintConfig {
        TaintConfig { strict_calling_conv: false, alias_policy }
    }
}

/// The values a memory access moves between registers and memory.
pub(crate) fn access_values(func: &Function, inst: Inst) -> SmallVec<[Value; 3]> {
    let res = func.dfg.inst_result(inst);
    match func.dfg.insts[inst] {
        InstructionData::Load { .. } => res.into_iter().collect(),
        InstructionData::Store { val, .. } => smallvec![val],
        InstructionData::AtomicRmw { val, .. } => res.into_iter().chain([val]).collect(),
        InstructionData::CmpXchg { expected, replacement, .. } => {
            res.into_iter().chain([expected, replacement]).collect()
        }
        _ => SmallVec::new(),
    }
}

/// Whether `inst` reads memory into its result.
pub(crate) fn is_memory_read(data: &InstructionData) -> bool {
    matches!(
        data,
        InstructionData::Load { .. }
            | InstructionData::AtomicRmw { .. }
            | InstructionData::CmpXchg { .. }
    )
}
