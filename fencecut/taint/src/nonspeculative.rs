use bitset::BitSet;
use fir::{AliasAnalysis, Function, Inst, InstructionData, Value};
use log::{debug, trace};

use crate::rules::{call_taint_rule, TaintRule};
use crate::{access_values, is_memory_read, transmitter_operands, TaintConfig, TaintError, TaintResult};

#[cfg(test)]
mod tests;

/// The instructions whose results are public even without misspeculation.
///
/// Every instruction result outside of this set is potentially secret. Values that are not
/// instruction results (parameters, constants, globals) are always public.
#[derive(Debug, Clone)]
pub struct NonspeculativeTaint {
    public: BitSet<Inst>,
    iterations: u32,
}

impl NonspeculativeTaint {
    pub fn compute(
        func: &Function,
        aa: &dyn AliasAnalysis,
        config: &TaintConfig,
    ) -> TaintResult<NonspeculativeTaint> {
        let mut solver = Solver {
            func,
            aa,
            config,
            public: BitSet::new_empty(func.dfg.num_insts()),
            propagated_mem: BitSet::new_empty(func.dfg.num_insts()),
        };

        solver.seed()?;

        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut changed = solver.propagate_calls()?;
            changed |= solver.propagate_memory();
            changed |= solver.propagate_operands()?;
            if !changed {
                break;
            }
        }

        debug!(
            "%{}: {} public instructions after {} iterations",
            func.name,
            solver.public.count(),
            iterations
        );

        Ok(NonspeculativeTaint { public: solver.public, iterations })
    }

    /// Whether `val` may be secret on the architectural path.
    pub fn secret(&self, func: &Function, val: Value) -> bool {
        func.dfg.value_inst(val).map_or(false, |inst| !self.public.contains(inst))
    }

    pub fn is_public(&self, inst: Inst) -> bool {
        self.public.contains(inst)
    }

    pub fn public_insts(&self) -> &BitSet<Inst> {
        &self.public
    }

    /// The number of rounds the fixed point iteration needed.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

struct Solver<'a> {
    func: &'a Function,
    aa: &'a dyn AliasAnalysis,
    config: &'a TaintConfig,
    public: BitSet<Inst>,
    /// Memory reads whose public result was already propagated to aliasing accesses.
    propagated_mem: BitSet<Inst>,
}

impl Solver<'_> {
    fn mark_public(&mut self, val: Value) -> bool {
        match self.func.dfg.value_inst(val) {
            Some(inst) => {
                let changed = self.public.insert(inst);
                if changed {
                    trace!("{val} ({inst}) is public");
                }
                changed
            }
            None => false,
        }
    }

    fn mark_all_public(&mut self, vals: impl IntoIterator<Item = Value>) -> bool {
        vals.into_iter().fold(false, |changed, val| self.mark_public(val) | changed)
    }

    fn seed(&mut self) -> TaintResult<()> {
        for inst in self.func.insts() {
            // transmitted values must be public, otherwise they would already be leaked
            for op in transmitter_operands(self.func, inst)? {
                self.mark_public(op.value);
            }

            // addresses and exception objects are public
            if let Some(res) = self.func.dfg.inst_result(inst) {
                if self.func.dfg.is_ptr(res)
                    || matches!(self.func.dfg.insts[inst], InstructionData::LandingPad)
                {
                    self.public.insert(inst);
                }
            }
        }
        Ok(())
    }

    fn propagate_calls(&mut self) -> TaintResult<bool> {
        let func = self.func;
        let mut changed = false;
        for inst in func.insts() {
            match func.dfg.insts[inst] {
                InstructionData::Call { func_ref, ref args } => {
                    if func.dfg.signatures[func_ref].intrinsic.is_none() {
                        changed |= self.propagate_call_conv(inst, args);
                        continue;
                    }
                    match call_taint_rule(func, inst)? {
                        Some(TaintRule::Passthrough) if self.public.contains(inst) => {
                            changed |= self.mark_all_public(args.iter().copied());
                        }
                        Some(TaintRule::Annotation) if self.public.contains(inst) => {
                            if let Some(&arg) = args.first() {
                                changed |= self.mark_public(arg);
                            }
                        }
                        _ => (),
                    }
                }
                InstructionData::CallIndirect { ref args, .. } => {
                    changed |= self.propagate_call_conv(inst, args)
                }
                InstructionData::Ret { val: Some(val) } if self.config.strict_calling_conv => {
                    changed |= self.mark_public(val)
                }
                _ => (),
            }
        }
        Ok(changed)
    }

    fn propagate_call_conv(&mut self, inst: Inst, args: &[Value]) -> bool {
        if !self.config.strict_calling_conv {
            return false;
        }
        let mut changed = self.mark_all_public(args.iter().copied());
        if self.func.dfg.has_result(inst) {
            changed |= self.public.insert(inst);
        }
        changed
    }

    /// A public memory read makes the accessed location public. Every access that definitely
    /// touches the same location moves public values as well.
    fn propagate_memory(&mut self) -> bool {
        let func = self.func;
        let mut changed = false;
        for src in func.insts() {
            if !is_memory_read(&func.dfg.insts[src])
                || !self.public.contains(src)
                || !self.propagated_mem.insert(src)
            {
                continue;
            }
            let Some(src_loc) = func.access_location(src) else { continue };
            changed |= self.mark_all_public(access_values(func, src));

            for dst in func.insts() {
                if dst == src {
                    continue;
                }
                let Some(dst_loc) = func.access_location(dst) else { continue };
                let alias = self.aa.alias(func, src_loc, dst_loc);
                if self.config.alias_policy.same_location(alias) {
                    changed |= self.mark_all_public(access_values(func, dst));
                }
            }
        }
        changed
    }

    /// Operands of pure instructions with a public result are public.
    fn propagate_operands(&mut self) -> TaintResult<bool> {
        let func = self.func;
        let mut changed = false;
        for inst in func.insts() {
            let data = &func.dfg.insts[inst];
            match data {
                // address computations are public regardless of their result
                InstructionData::Gep { .. } => changed |= self.mark_all_public(data.arguments()),

                InstructionData::Binary { .. }
                | InstructionData::Unary { .. }
                | InstructionData::Cast { .. }
                | InstructionData::Compare { .. }
                | InstructionData::Select { .. }
                | InstructionData::PhiNode(_)
                | InstructionData::Freeze { .. } => {
                    if self.public.contains(inst) {
                        changed |= self.mark_all_public(data.arguments());
                    }
                }

                // handled by the call and memory rules
                InstructionData::Call { .. }
                | InstructionData::CallIndirect { .. }
                | InstructionData::Load { .. }
                | InstructionData::Store { .. }
                | InstructionData::AtomicRmw { .. }
                | InstructionData::CmpXchg { .. }
                | InstructionData::Alloca { .. }
                | InstructionData::LandingPad => (),

                // TODO: track the lanes/fields of vectors and aggregates individually
                InstructionData::ExtractElement { .. }
                | InstructionData::InsertElement { .. }
                | InstructionData::ShuffleVector { .. }
                | InstructionData::ExtractValue { .. }
                | InstructionData::InsertValue { .. } => (),

                InstructionData::Branch { .. }
                | InstructionData::Switch { .. }
                | InstructionData::Jump { .. }
                | InstructionData::Ret { .. }
                | InstructionData::Resume { .. }
                | InstructionData::Unreachable
                | InstructionData::Fence { .. } => (),

                InstructionData::Opaque { mnemonic, .. } => {
                    return Err(TaintError::UnhandledInstruction {
                        inst,
                        kind: mnemonic.to_string(),
                    })
                }
            }
        }
        Ok(changed)
    }
}
