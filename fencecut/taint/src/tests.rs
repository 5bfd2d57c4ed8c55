use std::fmt::Write;

use expect_test::expect;
use fir::{BasicAliasAnalysis, Function, Intrinsic};
use fir_reader::parse_function;

use crate::rules::{has_no_effect, taint_rule, transmit_rule};
use crate::{
    transmitter_operands, AliasPolicy, NonspeculativeTaint, SpeculativeTaint, TaintConfig,
    TaintError,
};

pub(crate) fn parse(src: &str) -> Function {
    match parse_function(src) {
        Ok(func) => func,
        Err(err) => panic!("invalid test function: {err}"),
    }
}

/// One line per instruction result: `sec v3` or `pub v3`.
pub(crate) fn render_secrets(func: &Function, secret: impl Fn(fir::Value) -> bool) -> String {
    let mut res = String::new();
    for inst in func.insts() {
        if let Some(val) = func.dfg.inst_result(inst) {
            let label = if secret(val) { "sec" } else { "pub" };
            writeln!(res, "{label} {val}").unwrap();
        }
    }
    res
}

pub(crate) fn sound() -> TaintConfig {
    TaintConfig::new(AliasPolicy::Sound)
}

const POINTER_CHASE: &str = "function %chase(v0:ptr, v1) {
block0:
    v2:ptr = gep v0, v1
    v3 = load v2
    v4:ptr = gep v0, v3
    v5 = load v4
    ret v5
}";

#[test]
fn public_load_is_speculatively_secret() {
    let func = parse(POINTER_CHASE);
    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    let st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();

    let loaded = func.dfg.inst_result(1usize.into()).unwrap();
    let addr = func.dfg.inst_result(2usize.into()).unwrap();
    for val in [loaded, addr] {
        assert!(!nst.secret(&func, val), "{val} must be architecturally public");
        assert!(st.secret(&func, val), "{val} must be speculatively secret");
    }
}

const UNKNOWN_INTRINSIC: &str = "function %unknown(v0) {
    fn0 = intrinsic %frobnicate(1) -> 1
block0:
    v1 = call fn0(v0)
    ret v1
}";

#[test]
fn unknown_intrinsic_is_rejected() {
    let func = parse(UNKNOWN_INTRINSIC);
    let expected =
        TaintError::UnhandledIntrinsic { inst: 0usize.into(), name: "frobnicate".to_owned() };

    assert_eq!(transmitter_operands(&func, 0usize.into()), Err(expected.clone()));
    assert_eq!(
        NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap_err(),
        expected
    );
    assert_eq!(
        SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap_err(),
        expected
    );
    expect!["unhandled intrinsic 'frobnicate' called by inst0"].assert_eq(&expected.to_string());
}

#[test]
fn opaque_instructions_are_rejected() {
    let func = parse(
        "function %opaque(v0:ptr) {
        block0:
            v1 = opaque \"va_arg\"(v0)
            ret v1
        }",
    );
    let expected = TaintError::UnhandledInstruction { inst: 0usize.into(), kind: "va_arg".to_owned() };
    assert_eq!(transmitter_operands(&func, 0usize.into()), Err(expected.clone()));
    assert_eq!(
        NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap_err(),
        expected
    );
    assert_eq!(
        SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap_err(),
        expected
    );
}

#[test]
fn void_unknown_intrinsic_only_fails_classification() {
    let func = parse(
        "function %void(v0) {
            fn0 = intrinsic %frobnicate(1) -> 0
        block0:
            call fn0(v0)
            ret
        }",
    );
    assert!(transmitter_operands(&func, 0usize.into()).is_err());
    assert!(SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).is_ok());
}

#[test]
fn rule_tables_cover_known_intrinsics() {
    for &intrinsic in Intrinsic::KNOWN {
        assert!(transmit_rule(intrinsic).is_some(), "{intrinsic:?} has no transmit rule");
        assert!(taint_rule(intrinsic).is_some(), "{intrinsic:?} has no taint rule");
    }
    assert_eq!(transmit_rule(Intrinsic::Unknown), None);
    assert_eq!(taint_rule(Intrinsic::Unknown), None);
    assert!(!has_no_effect(Intrinsic::Unknown));
    assert!(!has_no_effect(Intrinsic::Memcpy));
    assert!(has_no_effect(Intrinsic::Ctpop));
}

const MIXED: &str = "function %mixed(v0:ptr, v1:ptr, v2) {
    fn0 = fn %ext(1) -> 1
    fn1 = intrinsic %umax(2) -> 1
block0:
    v3:ptr = gep v0, v2
    v4 = load v3
    v5 = call fn1(v4, v2)
    v6 = call fn0(v5)
    store v6, v1 inbounds
    v7 = load v1
    v8 = iadd v7, v5
    v9 = islt v8, v2
    br v9, block1, block2

block1:
    v10 = udiv v4, v2
    ret v10

block2:
    ret
}";

#[test]
fn analyses_are_idempotent() {
    let func = parse(MIXED);
    for policy in [AliasPolicy::Sound, AliasPolicy::Optimistic] {
        for strict_calling_conv in [false, true] {
            let config = TaintConfig { strict_calling_conv, alias_policy: policy };
            let nst1 = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
            let nst2 = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
            assert_eq!(nst1.public_insts(), nst2.public_insts());

            let st1 = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
            let st2 = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
            let insts: Vec<_> = st1.tainted_insts().collect();
            assert_eq!(insts, st2.tainted_insts().collect::<Vec<_>>());
            for inst in insts {
                assert_eq!(st1.taints(inst), st2.taints(inst));
            }
        }
    }
}

#[test]
fn weaker_assumptions_never_shrink_public_values() {
    let func = parse(MIXED);
    let base = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    let strict = TaintConfig { strict_calling_conv: true, alias_policy: AliasPolicy::Sound };
    let strict = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &strict).unwrap();
    let optimistic = TaintConfig::new(AliasPolicy::Optimistic);
    let optimistic = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &optimistic).unwrap();

    assert!(strict.public_insts().superset(base.public_insts()));
    for inst in func.insts().filter(|&inst| base.is_public(inst)) {
        assert!(optimistic.is_public(inst), "{inst} is only public with sound aliasing");
    }

    let sound_st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    let optimistic = TaintConfig::new(AliasPolicy::Optimistic);
    let optimistic_st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &optimistic).unwrap();
    for inst in optimistic_st.tainted_insts() {
        assert!(sound_st.is_tainted(inst), "{inst} is only tainted with optimistic aliasing");
    }
}
