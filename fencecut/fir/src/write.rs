//! Converting FIR to text.
//!
//! The `write` module provides the `write_function` function which converts an IR `Function` to an
//! equivalent textual form. This textual form can be read back by the `fir_reader` crate.

use core::fmt::{self, Write};

use crate::{Block, Function, Inst, InstructionData, Type, Value, ValueDef};

#[cfg(test)]
mod tests;

/// Write `func` to `w` as equivalent text.
pub fn write_function(w: &mut dyn Write, func: &Function) -> fmt::Result {
    write!(w, "function %{}(", func.name)?;
    let mut seen = false;
    for param in func.dfg.params() {
        if seen {
            write!(w, ", ")?;
        } else {
            seen = true
        }
        write_typed_value(w, func, param)?;
    }
    writeln!(w, ") {{")?;

    let mut any = write_preamble(w, func)?;
    for block in &func.layout {
        if any {
            writeln!(w)?;
        }
        write_block(w, func, block)?;
        any = true;
    }
    writeln!(w, "}}")
}

/// Signatures and constants. Returns whether anything was written.
fn write_preamble(w: &mut dyn Write, func: &Function) -> Result<bool, fmt::Error> {
    let mut any = false;

    for (sig, sig_data) in func.dfg.signatures.iter_enumerated() {
        any = true;
        writeln!(w, "    {} = {}", sig, sig_data)?;
    }

    for val in func.dfg.values() {
        match func.dfg.value_def(val) {
            ValueDef::Const(def) => writeln!(w, "    {} = iconst {}", val, def)?,
            ValueDef::Global(idx) => {
                writeln!(w, "    {}:ptr = global %{}", val, func.dfg.global_name(idx))?
            }
            _ => continue,
        }
        any = true;
    }

    Ok(any)
}

fn write_typed_value(w: &mut dyn Write, func: &Function, val: Value) -> fmt::Result {
    match func.dfg.value_type(val) {
        Type::Ptr => write!(w, "{}:ptr", val),
        Type::Scalar => write!(w, "{}", val),
    }
}

fn write_block(w: &mut dyn Write, func: &Function, block: Block) -> fmt::Result {
    writeln!(w, "{}:", block)?;
    for inst in func.layout.block_insts(block) {
        write_instruction(w, func, inst, 4)?;
    }
    Ok(())
}

pub fn write_instruction(
    w: &mut dyn Write,
    func: &Function,
    inst: Inst,
    indent: usize,
) -> fmt::Result {
    write!(w, "{1:0$}", indent, "")?;
    if let Some(res) = func.dfg.inst_result(inst) {
        write_typed_value(w, func, res)?;
        write!(w, " = ")?;
    }
    match func.dfg.insts[inst] {
        InstructionData::Opaque { ref mnemonic, .. } => write!(w, "opaque \"{}\"", mnemonic)?,
        ref data => write!(w, "{}", data.mnemonic())?,
    }
    write_operands(w, func, inst)?;
    writeln!(w)
}

fn write_list(w: &mut dyn Write, vals: &[Value]) -> fmt::Result {
    let mut first = true;
    for val in vals {
        if !first {
            write!(w, ", ")?;
        }
        first = false;
        write!(w, "{}", val)?;
    }
    Ok(())
}

fn write_access_flags(w: &mut dyn Write, size: u32, inbounds: bool) -> fmt::Result {
    if size != 8 {
        write!(w, " size {}", size)?;
    }
    if inbounds {
        write!(w, " inbounds")?;
    }
    Ok(())
}

/// Write the operands of `inst` to `w` with a prepended space.
pub fn write_operands(w: &mut dyn Write, func: &Function, inst: Inst) -> fmt::Result {
    match func.dfg.insts[inst] {
        InstructionData::Load { ptr, size, inbounds } => {
            write!(w, " {}", ptr)?;
            write_access_flags(w, size, inbounds)
        }
        InstructionData::Store { val, ptr, size, inbounds } => {
            write!(w, " {}, {}", val, ptr)?;
            write_access_flags(w, size, inbounds)
        }
        InstructionData::AtomicRmw { op, ptr, val, size } => {
            write!(w, " {} {}, {}", op.name(), ptr, val)?;
            write_access_flags(w, size, false)
        }
        InstructionData::CmpXchg { ptr, expected, replacement, size } => {
            write!(w, " {}, {}, {}", ptr, expected, replacement)?;
            write_access_flags(w, size, false)
        }
        InstructionData::Branch { cond, then_dst, else_dst } => {
            write!(w, " {}, {}, {}", cond, then_dst, else_dst)
        }
        InstructionData::Switch { cond, default, ref cases } => {
            write!(w, " {}, {}, [", cond, default)?;
            let mut first = true;
            for (val, dst) in cases {
                if !first {
                    write!(w, ", ")?;
                }
                first = false;
                write!(w, "{}: {}", val, dst)?;
            }
            write!(w, "]")
        }
        InstructionData::Jump { destination } => write!(w, " {}", destination),
        InstructionData::Call { func_ref, ref args } => {
            write!(w, " {}(", func_ref)?;
            write_list(w, args)?;
            write!(w, ")")
        }
        InstructionData::CallIndirect { callee, ref args } => {
            write!(w, " {}(", callee)?;
            write_list(w, args)?;
            write!(w, ")")
        }
        InstructionData::Ret { val: Some(val) } | InstructionData::Resume { val } => {
            write!(w, " {}", val)
        }
        InstructionData::Ret { val: None }
        | InstructionData::Unreachable
        | InstructionData::LandingPad => Ok(()),
        InstructionData::Unary { arg, .. }
        | InstructionData::Cast { arg, .. }
        | InstructionData::Freeze { arg } => write!(w, " {}", arg),
        InstructionData::Binary { args, .. }
        | InstructionData::Compare { args, .. }
        | InstructionData::ShuffleVector { args } => write!(w, " {}, {}", args[0], args[1]),
        InstructionData::Select { cond, then_val, else_val } => {
            write!(w, " {}, {}, {}", cond, then_val, else_val)
        }
        InstructionData::PhiNode(ref node) => write!(w, " {}", node),
        InstructionData::Gep { base, ref offsets } => {
            write!(w, " {}", base)?;
            for off in offsets {
                write!(w, ", {}", off)?;
            }
            Ok(())
        }
        InstructionData::Alloca { size } => write!(w, " {}", size),
        InstructionData::ExtractElement { vector, index } => write!(w, " {}, {}", vector, index),
        InstructionData::InsertElement { vector, elem, index } => {
            write!(w, " {}, {}, {}", vector, elem, index)
        }
        InstructionData::ExtractValue { aggregate, index } => {
            write!(w, " {}, {}", aggregate, index)
        }
        InstructionData::InsertValue { aggregate, elem, index } => {
            write!(w, " {}, {}, {}", aggregate, elem, index)
        }
        InstructionData::Fence { ref tag } => write!(w, " \"{}\"", tag),
        InstructionData::Opaque { ref args, .. } => {
            write!(w, "(")?;
            write_list(w, args)?;
            write!(w, ")")
        }
    }
}
