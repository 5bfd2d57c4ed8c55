//! Alias queries.
//!
//! Analyses ask whether two memory accesses may touch the same bytes through the
//! [`AliasAnalysis`] trait. [`BasicAliasAnalysis`] is a purely local oracle: it decomposes each
//! address into an underlying object and a byte offset and compares those.

use smallvec::SmallVec;

use crate::{Function, InstructionData, Value, ValueDef};

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

/// The bytes accessed by a memory instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryLocation {
    pub ptr: Value,
    pub size: u32,
}

pub trait AliasAnalysis {
    fn alias(&self, func: &Function, a: MemoryLocation, b: MemoryLocation) -> AliasResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BasicAliasAnalysis;

/// An address decomposed into `base + offset`. `offset` is `None` if any of the offsets is not a
/// constant; `dynamic` then lists the non-constant parts in order.
#[derive(Debug, PartialEq, Eq)]
struct DecomposedAddress {
    base: Value,
    offset: Option<i64>,
    dynamic: SmallVec<[Value; 2]>,
}

fn decompose(func: &Function, mut ptr: Value) -> DecomposedAddress {
    let mut const_offset = 0i64;
    let mut all_const = true;
    let mut dynamic = SmallVec::new();
    while let Some(inst) = func.dfg.value_inst(ptr) {
        match func.dfg.insts[inst] {
            InstructionData::Gep { base, ref offsets } => {
                for &off in offsets.iter().rev() {
                    match func.dfg.value_def(off) {
                        ValueDef::Const(val) => const_offset = const_offset.wrapping_add(val),
                        _ => {
                            all_const = false;
                            dynamic.push(off);
                        }
                    }
                }
                ptr = base;
            }
            InstructionData::Cast { op, arg } if op.preserves_address() => ptr = arg,
            _ => break,
        }
    }
    dynamic.reverse();
    DecomposedAddress { base: ptr, offset: all_const.then_some(const_offset), dynamic }
}

/// Allocas and globals are distinct objects: two different ones never overlap.
fn is_identified_object(func: &Function, val: Value) -> bool {
    match func.dfg.value_def(val) {
        ValueDef::Global(_) => true,
        ValueDef::Result(inst) => matches!(func.dfg.insts[inst], InstructionData::Alloca { .. }),
        _ => false,
    }
}

impl AliasAnalysis for BasicAliasAnalysis {
    fn alias(&self, func: &Function, a: MemoryLocation, b: MemoryLocation) -> AliasResult {
        if a.ptr == b.ptr {
            return if a.size == b.size { AliasResult::MustAlias } else { AliasResult::MayAlias };
        }

        let addr_a = decompose(func, a.ptr);
        let addr_b = decompose(func, b.ptr);

        if addr_a.base != addr_b.base {
            if is_identified_object(func, addr_a.base) && is_identified_object(func, addr_b.base)
            {
                return AliasResult::NoAlias;
            }
            return AliasResult::MayAlias;
        }

        match (addr_a.offset, addr_b.offset) {
            (Some(off_a), Some(off_b)) => {
                if off_a == off_b {
                    if a.size == b.size {
                        AliasResult::MustAlias
                    } else {
                        AliasResult::MayAlias
                    }
                } else if off_a.saturating_add(a.size as i64) <= off_b
                    || off_b.saturating_add(b.size as i64) <= off_a
                {
                    AliasResult::NoAlias
                } else {
                    AliasResult::MayAlias
                }
            }
            _ if addr_a == addr_b && a.size == b.size => AliasResult::MustAlias,
            _ => AliasResult::MayAlias,
        }
    }
}

/// Is `ptr` an address that can be computed without consulting memory or parameters? Such
/// addresses are rooted at a global, an alloca or a constant and only offset by constants.
pub fn is_constant_address(func: &Function, ptr: Value) -> bool {
    let addr = decompose(func, ptr);
    if addr.offset.is_none() {
        return false;
    }
    match func.dfg.value_def(addr.base) {
        ValueDef::Global(_) | ValueDef::Const(_) => true,
        ValueDef::Result(inst) => matches!(func.dfg.insts[inst], InstructionData::Alloca { .. }),
        ValueDef::Param(_) | ValueDef::Invalid => false,
    }
}
