//! The speculative leak mitigation pass.
//!
//! [`mitigate_function`] runs the whole pipeline on one function:
//!
//! 1. the taint analyses of the `taint` crate decide which values are secret,
//! 2. [`extract_constraints`] turns the secrets, out-of-bounds accesses and transmitters into
//!    constraints on the instruction level control flow graph,
//! 3. a `mincut` solver picks the control flow edges to cut and validates its choice,
//! 4. [`materialize`] inserts a barrier for every cut edge.
//!
//! Functions are independent of each other. Nothing is cached between two calls.

mod config;
mod error;
mod extract;
mod materialize;
mod stats;
mod weights;

use std::time::Instant;

use fir::{
    is_constant_address, AliasAnalysis, ControlFlowGraph, DominatorTree, Function,
    InstFlowGraph, InstructionData, LoopInfo,
};
use log::debug;
use taint::{
    classify_transmitter, transmitter_operands, NonspeculativeTaint, SpeculativeTaint,
    TaintConfig, TaintResult, TransmitterClass,
};

pub use crate::config::{ConstraintKind, EnabledConstraints, MitigationConfig};
pub use crate::error::{MitigationError, MitigationResult};
pub use crate::extract::{
    access_sources, classify_stores, control_sinks, extract_constraints, secret_transmitters,
    Constraints, StoreClasses, Transmitters,
};
pub use crate::materialize::{materialize, Materialized, MITIGATION_TAG};
pub use crate::stats::{AccessStats, ConstraintStats, MitigationStats, TransmitterStats};
pub use crate::weights::{build_graph, EdgeWeights};


/// The analyses of a function the pass depends on.
///
/// They describe the function as it was before barriers were inserted.
pub struct Analyses {
    pub cfg: ControlFlowGraph,
    pub inst_cfg: InstFlowGraph,
    pub domtree: DominatorTree,
    pub loops: LoopInfo,
    pub nst: NonspeculativeTaint,
    pub st: SpeculativeTaint,
}

impl Analyses {
    pub fn compute(
        func: &Function,
        aa: &dyn AliasAnalysis,
        config: &TaintConfig,
    ) -> TaintResult<Analyses> {
        let cfg = ControlFlowGraph::with_function(func);
        let inst_cfg = InstFlowGraph::with_function(func, &cfg);
        let domtree = DominatorTree::with_function(func, &cfg);
        let loops = LoopInfo::compute(func, &cfg, &domtree);
        let nst = NonspeculativeTaint::compute(func, aa, config)?;
        let st = SpeculativeTaint::compute(func, aa, config)?;
        Ok(Analyses { cfg, inst_cfg, domtree, loops, nst, st })
    }
}

/// Inserts the barriers needed to stop speculative leaks from `func`.
///
/// On error `func` is left unchanged.
pub fn mitigate_function(
    func: &mut Function,
    aa: &dyn AliasAnalysis,
    config: &MitigationConfig,
) -> MitigationResult<MitigationStats> {
    if config.skips(&func.name) {
        debug!("%{}: skipped", func.name);
        return Ok(MitigationStats::skipped(&func.name));
    }

    let analyses = Analyses::compute(func, aa, &config.taint)?;
    let stores = classify_stores(func, &analyses.nst, &analyses.st);
    let mut stats = collect_stats(func, &analyses, &stores)?;

    let constraints = extract_constraints(func, &analyses, &stores, &config.constraints)?;
    stats.constraints = ConstraintStats {
        store_to_transmitter: constraints.store_to_transmitter,
        store_to_control: constraints.store_to_control,
        load_to_transmitter: constraints.load_to_transmitter,
    };
    debug!("%{}: {} constraints", func.name, constraints.len());
    let constraints = constraints.into_vec();

    let graph = build_graph(
        func,
        &analyses.inst_cfg,
        &analyses.domtree,
        &analyses.loops,
        &config.weights,
    );
    let solver = config.strategy.solver::<fir::Inst>(constraints.len());
    stats.solver = solver.name().to_owned();
    let start = Instant::now();
    let cut = solver.solve(&graph, &constraints);
    stats.solve_time = start.elapsed();
    let start = Instant::now();
    mincut::validate(&graph, &constraints, &cut)?;
    stats.validate_time = start.elapsed();
    stats.cut_edges = cut.len();

    let Materialized { fences, edge_splits } =
        materialize(func, &analyses.inst_cfg, &cut, MITIGATION_TAG);
    stats.fences = fences;
    stats.edge_splits = edge_splits;
    debug!(
        "%{}: inserted {fences} fences ({edge_splits} split edges) in {:.3}s",
        func.name,
        stats.solve_time.as_secs_f64()
    );
    Ok(stats)
}

fn collect_stats(
    func: &Function,
    analyses: &Analyses,
    stores: &StoreClasses,
) -> TaintResult<MitigationStats> {
    let Analyses { nst, st, .. } = analyses;
    let mut stats = MitigationStats { function: func.name.clone(), ..Default::default() };

    for inst in func.insts() {
        stats.instructions += 1;
        if let Some(val) = func.dfg.inst_result(inst) {
            stats.nonspeculative_secrets += usize::from(nst.secret(func, val));
            stats.speculative_secrets += usize::from(st.secret(func, val));
        }

        let operands = transmitter_operands(func, inst)?;
        match classify_transmitter(&operands, |val| st.secret(func, val)) {
            Some(TransmitterClass::Safe) => stats.transmitters.safe += 1,
            Some(TransmitterClass::Pseudo) => stats.transmitters.pseudo += 1,
            Some(TransmitterClass::Strong) => stats.transmitters.strong += 1,
            None => (),
        }

        if let InstructionData::Load { ptr, .. } = func.dfg.insts[inst] {
            if is_constant_address(func, ptr) {
                stats.loads.constant += 1;
            } else if st.is_tainted(inst) {
                stats.loads.nonconstant_secret += 1;
            } else {
                stats.loads.nonconstant_public += 1;
            }
        }
    }

    stats.stores = AccessStats {
        constant: func
            .insts()
            .filter(|&inst| match func.dfg.insts[inst] {
                InstructionData::Store { ptr, .. } => is_constant_address(func, ptr),
                _ => false,
            })
            .count(),
        nonconstant_public: stores.public.len(),
        nonconstant_secret: stores.secret().count(),
    };
    Ok(stats)
}
