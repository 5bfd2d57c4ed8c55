use bitset::BitSet;
use fir::{AliasAnalysis, Function, Inst, InstructionData, MemoryLocation, Value};
use indexmap::IndexMap;
use log::{debug, trace};
use smallvec::SmallVec;
use typed_index_collections::TiVec;

use crate::rules::{call_taint_rule, TaintRule};
use crate::{is_memory_read, TaintConfig, TaintError, TaintResult};

#[cfg(test)]
mod tests;

/// The instructions whose results are secret if a load speculatively reads out of bounds.
///
/// Every memory read that is not provably in bounds is a root of the taint. The taint flows
/// forward through pure instructions, intrinsics that compute their result from their arguments
/// and stores to locations that later loads may read. For every tainted instruction the root
/// loads it depends on are recorded.
#[derive(Debug, Clone)]
pub struct SpeculativeTaint {
    taints: IndexMap<Inst, BitSet<Inst>, ahash::RandomState>,
}

impl SpeculativeTaint {
    pub fn compute(
        func: &Function,
        aa: &dyn AliasAnalysis,
        config: &TaintConfig,
    ) -> TaintResult<SpeculativeTaint> {
        let mut users: TiVec<Value, SmallVec<[Inst; 2]>> =
            vec![SmallVec::new(); func.dfg.num_values()].into();
        let mut reads: Vec<(Inst, MemoryLocation)> = Vec::new();
        let mut roots = Vec::new();

        for inst in func.insts() {
            let data = &func.dfg.insts[inst];
            match data {
                InstructionData::Opaque { mnemonic, .. } => {
                    return Err(TaintError::UnhandledInstruction {
                        inst,
                        kind: mnemonic.to_string(),
                    })
                }
                InstructionData::Call { .. } => {
                    call_taint_rule(func, inst)?;
                }
                _ => (),
            }

            for arg in data.arguments() {
                users[arg].push(inst);
            }

            if is_memory_read(data) {
                if let Some(loc) = func.access_location(inst) {
                    reads.push((inst, loc));
                }
                if !func.is_provably_inbounds(inst) {
                    roots.push(inst);
                }
            }
        }

        let mut solver = Solver {
            func,
            aa,
            config,
            users,
            reads,
            taints: IndexMap::default(),
            worklist: Vec::new(),
        };

        for root in roots {
            let mut cause = BitSet::new_empty(func.dfg.num_insts());
            cause.insert(root);
            solver.taint(root, &cause);
        }
        solver.solve()?;

        debug!("%{}: {} speculatively secret instructions", func.name, solver.taints.len());
        Ok(SpeculativeTaint { taints: solver.taints })
    }

    /// Whether `val` is secret when executed on a mispredicted path.
    pub fn secret(&self, func: &Function, val: Value) -> bool {
        func.dfg.value_inst(val).map_or(false, |inst| self.taints.contains_key(&inst))
    }

    pub fn is_tainted(&self, inst: Inst) -> bool {
        self.taints.contains_key(&inst)
    }

    /// The out-of-bounds loads that cause the taint of `inst`.
    pub fn taints(&self, inst: Inst) -> Option<&BitSet<Inst>> {
        self.taints.get(&inst)
    }

    pub fn tainted_insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.taints.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.taints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taints.is_empty()
    }
}

struct Solver<'a> {
    func: &'a Function,
    aa: &'a dyn AliasAnalysis,
    config: &'a TaintConfig,
    users: TiVec<Value, SmallVec<[Inst; 2]>>,
    reads: Vec<(Inst, MemoryLocation)>,
    taints: IndexMap<Inst, BitSet<Inst>, ahash::RandomState>,
    worklist: Vec<Inst>,
}

impl Solver<'_> {
    fn taint(&mut self, inst: Inst, cause: &BitSet<Inst>) {
        let num_insts = self.func.dfg.num_insts();
        let entry = self.taints.entry(inst).or_insert_with(|| BitSet::new_empty(num_insts));
        if entry.union(cause) {
            trace!("{inst} is speculatively secret");
            self.worklist.push(inst);
        }
    }

    fn solve(&mut self) -> TaintResult<()> {
        let func = self.func;
        while let Some(inst) = self.worklist.pop() {
            let Some(val) = func.dfg.inst_result(inst) else { continue };
            let cause = self.taints[&inst].clone();

            for i in 0..self.users[val].len() {
                let user = self.users[val][i];
                match func.dfg.insts[user] {
                    InstructionData::Binary { .. }
                    | InstructionData::Unary { .. }
                    | InstructionData::Cast { .. }
                    | InstructionData::Compare { .. }
                    | InstructionData::Select { .. }
                    | InstructionData::PhiNode(_)
                    | InstructionData::Freeze { .. }
                    | InstructionData::Gep { .. }
                    | InstructionData::ExtractElement { .. }
                    | InstructionData::InsertElement { .. }
                    | InstructionData::ShuffleVector { .. }
                    | InstructionData::ExtractValue { .. }
                    | InstructionData::InsertValue { .. } => self.taint(user, &cause),

                    InstructionData::Call { ref args, .. } => {
                        match call_taint_rule(func, user)? {
                            Some(TaintRule::Passthrough) => self.taint(user, &cause),
                            Some(TaintRule::Annotation) if args.first() == Some(&val) => {
                                self.taint(user, &cause)
                            }
                            _ => (),
                        }
                    }

                    InstructionData::Store { val: stored, .. }
                    | InstructionData::AtomicRmw { val: stored, .. }
                    | InstructionData::CmpXchg { replacement: stored, .. }
                        if stored == val =>
                    {
                        self.forward_store(user, &cause)
                    }

                    // call results, landing pads and values loaded from a tainted address are
                    // not tainted themselves, the address is a transmitter instead
                    InstructionData::Load { .. }
                    | InstructionData::Store { .. }
                    | InstructionData::AtomicRmw { .. }
                    | InstructionData::CmpXchg { .. }
                    | InstructionData::CallIndirect { .. }
                    | InstructionData::Alloca { .. }
                    | InstructionData::LandingPad
                    | InstructionData::Branch { .. }
                    | InstructionData::Switch { .. }
                    | InstructionData::Jump { .. }
                    | InstructionData::Ret { .. }
                    | InstructionData::Resume { .. }
                    | InstructionData::Unreachable
                    | InstructionData::Fence { .. } => (),

                    InstructionData::Opaque { ref mnemonic, .. } => {
                        return Err(TaintError::UnhandledInstruction {
                            inst: user,
                            kind: mnemonic.to_string(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// A secret value stored to memory taints every read that may observe it.
    fn forward_store(&mut self, store: Inst, cause: &BitSet<Inst>) {
        let Some(loc) = self.func.access_location(store) else { return };
        for i in 0..self.reads.len() {
            let (read, read_loc) = self.reads[i];
            if read == store {
                continue;
            }
            let alias = self.aa.alias(self.func, loc, read_loc);
            if self.config.alias_policy.forwards_taint(alias) {
                self.taint(read, cause);
            }
        }
    }
}
