use fir::{Function, InstructionData, Value, ValueDef};
use indexmap::IndexSet;

pub type ValueSet = IndexSet<Value, ahash::RandomState>;

/// The values `val` is computed from without going through memory or a call.
///
/// The walk follows the operands of pure instructions backwards and stops at loads, atomics,
/// call results, landing pads and function parameters, which are returned. Constants and
/// global addresses are dropped.
pub fn incoming_loads(func: &Function, val: Value) -> ValueSet {
    let mut res = ValueSet::default();
    let mut visited = ValueSet::default();
    let mut stack = vec![val];

    while let Some(val) = stack.pop() {
        if !visited.insert(val) {
            continue;
        }

        let inst = match func.dfg.value_def(val) {
            ValueDef::Result(inst) => inst,
            ValueDef::Param(_) => {
                res.insert(val);
                continue;
            }
            ValueDef::Const(_) | ValueDef::Global(_) | ValueDef::Invalid => continue,
        };

        match func.dfg.insts[inst] {
            InstructionData::Load { .. }
            | InstructionData::AtomicRmw { .. }
            | InstructionData::CmpXchg { .. }
            | InstructionData::Call { .. }
            | InstructionData::CallIndirect { .. }
            | InstructionData::LandingPad
            | InstructionData::Opaque { .. } => {
                res.insert(val);
            }
            ref data => stack.extend(data.arguments()),
        }
    }

    res
}

/// Like [`incoming_loads`] but only returns results of load instructions.
pub fn incoming_load_insts(func: &Function, val: Value) -> impl Iterator<Item = fir::Inst> + '_ {
    incoming_loads(func, val).into_iter().filter_map(|val| {
        let inst = func.dfg.value_inst(val)?;
        matches!(func.dfg.insts[inst], InstructionData::Load { .. }).then_some(inst)
    })
}
