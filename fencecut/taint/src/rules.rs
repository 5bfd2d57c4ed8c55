//! Per-intrinsic rule tables.
//!
//! Every table is an exhaustive `match` over [`Intrinsic`] so that adding a builtin forces a
//! decision in each of them. `Intrinsic::Unknown` never has a rule.

use fir::Intrinsic;

use crate::TransmitterKind;

/// Which arguments of an intrinsic call an attacker can observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransmitRule {
    /// No argument is observable.
    None,
    /// The listed argument positions are observable.
    Args(&'static [(usize, TransmitterKind)]),
    /// Every argument is observable with the given strength.
    All(TransmitterKind),
}

/// How the taint of an intrinsic call result relates to the taint of its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaintRule {
    /// The result is computed from all arguments.
    Passthrough,
    /// The intrinsic only has side effects. A call that produces a value is malformed.
    Invalid,
    /// The result is the first argument.
    Annotation,
}

const SIZE_ARG: &[(usize, TransmitterKind)] = &[(2, TransmitterKind::Strong)];
const MASKED_ACCESS: &[(usize, TransmitterKind)] =
    &[(0, TransmitterKind::Strong), (1, TransmitterKind::Pseudo)];
const FIRST_ARG: &[(usize, TransmitterKind)] = &[(0, TransmitterKind::Pseudo)];

pub fn transmit_rule(intrinsic: Intrinsic) -> Option<TransmitRule> {
    use Intrinsic::*;

    let rule = match intrinsic {
        // only the length decides which cache lines are touched
        Memset | Memcpy | Memmove => TransmitRule::Args(SIZE_ARG),
        MaskedLoad | MaskedGather => TransmitRule::Args(MASKED_ACCESS),
        EhTypeidFor => TransmitRule::Args(FIRST_ARG),
        ConstrainedFdiv => TransmitRule::All(TransmitterKind::Strong),

        Lfence | Mfence | Annotation | Assume | DbgValue | LifetimeStart | LifetimeEnd
        | Stacksave | Stackrestore | Vastart | Vaend => TransmitRule::None,

        Ctpop | Ctlz | Cttz | Bswap | Bitreverse | Fshl | Fshr | Umin | Umax | Smin | Smax | Abs
        | Fabs | Floor | Fmuladd | UaddSat | UsubSat | UaddWithOverflow | UmulWithOverflow
        | VectorReduceAdd | VectorReduceMul | VectorReduceAnd | VectorReduceOr
        | VectorReduceXor | VectorReduceUmax | VectorReduceUmin | VectorReduceSmax
        | VectorReduceSmin | Aesenc | Aesenclast | Aeskeygenassist | Pclmulqdq | Rdrand
        | ConstrainedFadd | ConstrainedFsub | ConstrainedFmul => TransmitRule::None,

        Unknown => return None,
    };
    Some(rule)
}

pub fn taint_rule(intrinsic: Intrinsic) -> Option<TaintRule> {
    use Intrinsic::*;

    let rule = match intrinsic {
        Memset | Memcpy | Memmove | Lfence | Mfence | Assume | DbgValue | LifetimeStart
        | LifetimeEnd | Stackrestore | Vastart | Vaend => TaintRule::Invalid,

        Annotation => TaintRule::Annotation,

        Ctpop | Ctlz | Cttz | Bswap | Bitreverse | Fshl | Fshr | Umin | Umax | Smin | Smax | Abs
        | Fabs | Floor | Fmuladd | UaddSat | UsubSat | UaddWithOverflow | UmulWithOverflow
        | VectorReduceAdd | VectorReduceMul | VectorReduceAnd | VectorReduceOr
        | VectorReduceXor | VectorReduceUmax | VectorReduceUmin | VectorReduceSmax
        | VectorReduceSmin | Aesenc | Aesenclast | Aeskeygenassist | Pclmulqdq | Rdrand
        | MaskedLoad | MaskedGather | EhTypeidFor | Stacksave | ConstrainedFadd
        | ConstrainedFsub | ConstrainedFmul | ConstrainedFdiv => TaintRule::Passthrough,

        Unknown => return None,
    };
    Some(rule)
}

/// Calls to these intrinsics do not need to wait for earlier out-of-bounds stores to resolve.
pub fn has_no_effect(intrinsic: Intrinsic) -> bool {
    use Intrinsic::*;

    match intrinsic {
        Lfence | Mfence | Annotation | Assume | DbgValue | LifetimeStart | LifetimeEnd
        | Vastart | Vaend | Ctpop | Ctlz | Cttz | Bswap | Bitreverse | Fshl | Fshr | Umin | Umax
        | Smin | Smax | Abs | Fabs | Floor | Fmuladd | UaddSat | UsubSat | UaddWithOverflow
        | UmulWithOverflow | VectorReduceAdd | VectorReduceMul | VectorReduceAnd
        | VectorReduceOr | VectorReduceXor | VectorReduceUmax | VectorReduceUmin
        | VectorReduceSmax | VectorReduceSmin | Aesenc | Aesenclast | Aeskeygenassist
        | Pclmulqdq | Rdrand | ConstrainedFadd | ConstrainedFsub | ConstrainedFmul
        | ConstrainedFdiv => true,

        Memset | Memcpy | Memmove | MaskedLoad | MaskedGather | EhTypeidFor | Stacksave
        | Stackrestore | Unknown => false,
    }
}

/// The taint rule of the call `inst`, or `None` if `inst` is not an intrinsic call that
/// produces a value.
pub(crate) fn call_taint_rule(
    func: &fir::Function,
    inst: fir::Inst,
) -> crate::TaintResult<Option<TaintRule>> {
    let fir::InstructionData::Call { func_ref, .. } = func.dfg.insts[inst] else {
        return Ok(None);
    };
    let sig = &func.dfg.signatures[func_ref];
    let Some(intrinsic) = sig.intrinsic else { return Ok(None) };
    if !func.dfg.has_result(inst) {
        return Ok(None);
    }

    match taint_rule(intrinsic) {
        Some(TaintRule::Invalid) | None => {
            Err(crate::TaintError::UnhandledIntrinsic { inst, name: sig.name.clone() })
        }
        rule => Ok(rule),
    }
}
