//! Derives the constraints of the min cut problem from the taint analyses.

use ahash::RandomState;
use bitset::BitSet;
use fir::{Function, Inst, InstFlowGraph, InstructionData, ValueDef};
use indexmap::{IndexMap, IndexSet};
use log::{trace, warn};
use mincut::Constraint;
use smallvec::SmallVec;
use taint::rules::has_no_effect;
use taint::{
    incoming_load_insts, incoming_loads, transmitter_operands, NonspeculativeTaint,
    SpeculativeTaint, TaintResult,
};

use crate::{Analyses, ConstraintKind, EnabledConstraints};


/// Stores whose address is not provably in bounds, classified by their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreClasses {
    /// The value may be secret on the architectural path.
    pub nonspeculative_secret: Vec<Inst>,
    /// The value is only secret under misspeculation.
    pub speculative_secret: Vec<Inst>,
    pub public: Vec<Inst>,
}

impl StoreClasses {
    pub fn secret(&self) -> impl Iterator<Item = Inst> + '_ {
        self.nonspeculative_secret.iter().chain(&self.speculative_secret).copied()
    }
}

/// Classifies the stores to addresses that are not provably in bounds.
///
/// A stored value is secret if one of the values it is computed from is secret. Loads from the
/// address the store writes to are ignored. Stores for which this disagrees with the taint
/// analyses are skipped.
pub fn classify_stores(
    func: &Function,
    nst: &NonspeculativeTaint,
    st: &SpeculativeTaint,
) -> StoreClasses {
    let mut res = StoreClasses::default();
    for inst in func.insts() {
        let InstructionData::Store { val, ptr, .. } = func.dfg.insts[inst] else { continue };
        if func.is_provably_inbounds(inst) || func.dfg.value_inst(val).is_none() {
            continue;
        }

        let mut nonspeculative = false;
        let mut speculative = false;
        for op in incoming_loads(func, val) {
            let reloads_dst = func.dfg.value_inst(op).map_or(false, |load| {
                matches!(func.dfg.insts[load], InstructionData::Load { ptr: src, .. } if src == ptr)
            });
            if reloads_dst {
                continue;
            }
            if nst.secret(func, op) {
                nonspeculative = true;
                break;
            }
            speculative |= st.secret(func, op);
        }

        if nonspeculative && !nst.secret(func, val) {
            warn!("%{}: {inst} stores a public value computed from a secret", func.name);
            continue;
        }
        if speculative && !st.secret(func, val) {
            warn!(
                "%{}: {inst} stores a public value computed from a speculative secret",
                func.name
            );
            continue;
        }

        if nonspeculative {
            res.nonspeculative_secret.push(inst)
        } else if speculative {
            res.speculative_secret.push(inst)
        } else {
            res.public.push(inst)
        }
    }
    res
}

pub type Transmitters = IndexMap<Inst, SmallVec<[Inst; 2]>, RandomState>;

/// Transmitters with at least one speculatively secret operand, mapped to the instructions that
/// compute those operands.
pub fn secret_transmitters(func: &Function, st: &SpeculativeTaint) -> TaintResult<Transmitters> {
    let mut res = Transmitters::default();
    for inst in func.insts() {
        for op in transmitter_operands(func, inst)? {
            if let Some(op_inst) = func.dfg.value_inst(op.value).filter(|&i| st.is_tainted(i)) {
                res.entry(inst).or_default().push(op_inst);
            }
        }
    }
    Ok(res)
}

/// Instructions that transfer control out of the function: returns and calls that may have an
/// effect.
pub fn control_sinks(func: &Function) -> Vec<Inst> {
    func.insts()
        .filter(|&inst| match func.dfg.insts[inst] {
            InstructionData::Call { .. } => func
                .dfg
                .call_signature(inst)
                .and_then(|sig| sig.intrinsic)
                .map_or(true, |intrinsic| !has_no_effect(intrinsic)),
            InstructionData::CallIndirect { .. } | InstructionData::Ret { .. } => true,
            _ => false,
        })
        .collect()
}

/// All instructions reachable from `start`, including `start` itself.
fn reachable_from(inst_cfg: &InstFlowGraph, start: Inst) -> BitSet<Inst> {
    let mut seen = BitSet::new_empty(inst_cfg.num_insts());
    let mut stack = vec![start];
    while let Some(inst) = stack.pop() {
        if seen.insert(inst) {
            stack.extend(inst_cfg.succ_iter(inst));
        }
    }
    seen
}

/// All instructions that reach `target` by at least one edge.
fn reaching(inst_cfg: &InstFlowGraph, target: Inst) -> BitSet<Inst> {
    let mut seen = BitSet::new_empty(inst_cfg.num_insts());
    let mut stack: Vec<Inst> = inst_cfg.pred_iter(target).collect();
    while let Some(inst) = stack.pop() {
        if seen.insert(inst) {
            stack.extend(inst_cfg.pred_iter(inst));
        }
    }
    seen
}

/// The earliest points a fence can be placed at to protect the memory access `access`.
///
/// These are the instructions that define the address of the access (the entry instruction
/// stands in for parameters) and the branches that decide whether the access is executed at
/// all. Only instructions that can reach the access are returned.
pub fn access_sources(func: &Function, inst_cfg: &InstFlowGraph, access: Inst) -> Vec<Inst> {
    let reach = reaching(inst_cfg, access);
    let mut sources = BitSet::new_empty(inst_cfg.num_insts());

    if let Some(ptr) = func.dfg.insts[access].pointer_operand() {
        for val in incoming_loads(func, ptr) {
            match func.dfg.value_def(val) {
                ValueDef::Result(inst) => {
                    sources.insert(inst);
                }
                ValueDef::Param(_) => {
                    if let Some(entry) = func.entry_inst() {
                        sources.insert(entry);
                    }
                }
                ValueDef::Const(_) | ValueDef::Global(_) | ValueDef::Invalid => (),
            }
        }
    }

    for inst in reach.iter() {
        if func.dfg.insts[inst].is_terminator()
            && inst_cfg.succ_iter(inst).any(|succ| !reach.contains(succ))
        {
            sources.insert(inst);
        }
    }

    sources.intersect(&reach);
    sources.iter().collect()
}

/// The constraints of one function, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    constraints: IndexSet<Constraint<Inst>, RandomState>,
    pub store_to_transmitter: usize,
    pub store_to_control: usize,
    pub load_to_transmitter: usize,
}

impl Constraints {
    fn add(&mut self, kind: ConstraintKind, constraint: Constraint<Inst>) {
        if constraint.is_trivial() || !self.constraints.insert(constraint) {
            return;
        }
        trace!("{kind} constraint: {:?}", self.constraints.last());
        match kind {
            ConstraintKind::StoreToTransmitter => self.store_to_transmitter += 1,
            ConstraintKind::StoreToControl => self.store_to_control += 1,
            ConstraintKind::LoadToTransmitter => self.load_to_transmitter += 1,
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Constraint<Inst>> + '_ {
        self.constraints.iter()
    }

    pub fn into_vec(self) -> Vec<Constraint<Inst>> {
        self.constraints.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

pub fn extract_constraints(
    func: &Function,
    analyses: &Analyses,
    stores: &StoreClasses,
    enabled: &EnabledConstraints,
) -> TaintResult<Constraints> {
    let inst_cfg = &analyses.inst_cfg;
    let mut res = Constraints::default();

    if enabled.store_to_transmitter {
        for store in stores.secret() {
            let reached = reachable_from(inst_cfg, store);
            let mut transmitters = Vec::new();
            for inst in reached.iter() {
                let vulnerable = transmitter_operands(func, inst)?.iter().any(|op| {
                    incoming_load_insts(func, op.value).any(|load| reached.contains(load))
                });
                if vulnerable {
                    transmitters.push(inst);
                }
            }
            res.add(ConstraintKind::StoreToTransmitter, Constraint::new([store], transmitters));
        }
    }

    if enabled.store_to_control {
        let constraint = Constraint::new(stores.secret(), control_sinks(func));
        res.add(ConstraintKind::StoreToControl, constraint);
    }

    if enabled.load_to_transmitter {
        let entry = func.entry_inst();
        let mut source_cache: IndexMap<Inst, Vec<Inst>, RandomState> = IndexMap::default();
        for (&transmitter, ops) in &secret_transmitters(func, &analyses.st)? {
            let mut loads = BitSet::new_empty(func.dfg.num_insts());
            for &op in ops {
                if let Some(roots) = analyses.st.taints(op) {
                    loads.union(roots);
                }
            }

            for load in loads.iter() {
                let sources = if Some(load) == entry {
                    &[][..]
                } else {
                    source_cache
                        .entry(load)
                        .or_insert_with(|| access_sources(func, inst_cfg, load))
                        .as_slice()
                };
                let constraint = if sources.is_empty() {
                    Constraint::new([load], [transmitter])
                } else {
                    Constraint::with_waypoints(sources.iter().copied(), [load], [transmitter])
                };
                res.add(ConstraintKind::LoadToTransmitter, constraint);
            }
        }
    }

    Ok(res)
}
