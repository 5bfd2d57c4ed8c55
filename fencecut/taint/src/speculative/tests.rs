use std::fmt::Write;

use expect_test::expect;
use fir::BasicAliasAnalysis;

use crate::tests::{parse, render_secrets, sound};
use crate::{AliasPolicy, SpeculativeTaint, TaintConfig};

const FORWARD: &str = "function %forward(v0:ptr, v1, v2:ptr) {
    fn0 = intrinsic %ctpop(1) -> 1
    fn1 = fn %ext(1) -> 1
    v3 = iconst 0

block0:
    v4:ptr = gep v0, v1
    v5 = load v4
    v6:ptr = alloca 8
    store v5, v6 inbounds
    v7 = load v6 inbounds
    v8 = iadd v7, v3
    v9 = call fn0(v8)
    v10 = call fn1(v9)
    v11 = load v6 size 4
    ret v10
}";

#[test]
fn taint_flows_through_memory_and_intrinsics() {
    let func = parse(FORWARD);
    let st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    let expected = expect![[r#"
        pub v4
        sec v5
        pub v6
        sec v7
        sec v8
        sec v9
        pub v10
        sec v11
    "#]];
    expected.assert_eq(&render_secrets(&func, |val| st.secret(&func, val)));

    let roots = st.taints(func.dfg.value_inst(9usize.into()).unwrap()).unwrap();
    assert_eq!(format!("{roots:?}"), "{inst1}");
}

#[test]
fn optimistic_aliasing_drops_may_alias_forwarding() {
    let func = parse(FORWARD);
    let config = TaintConfig::new(AliasPolicy::Optimistic);
    let st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
    assert!(st.secret(&func, 7usize.into()));
    assert!(!st.secret(&func, 11usize.into()));
}

#[test]
fn root_causes_merge_in_loops() {
    let func = parse(
        "function %walk(v0:ptr, v1) {
            v2 = iconst 1

        block0:
            v3 = load v0
            jmp block1

        block1:
            v4 = phi [v3, block0], [v6, block1]
            v5:ptr = gep v0, v4
            v6 = load v5
            v7 = iadd v4, v2
            v8 = ine v7, v1
            br v8, block1, block2

        block2:
            ret v7
        }",
    );
    let st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();

    let mut actual = String::new();
    for inst in func.insts() {
        if let Some(roots) = st.taints(inst) {
            let val = func.dfg.inst_result(inst).unwrap();
            writeln!(actual, "{val} <- {roots:?}").unwrap();
        }
    }
    let expected = expect![[r#"
        v3 <- {inst0}
        v4 <- {inst0, inst4}
        v5 <- {inst0, inst4}
        v6 <- {inst4}
        v7 <- {inst0, inst4}
        v8 <- {inst0, inst4}
    "#]];
    expected.assert_eq(&actual);
}

#[test]
fn inbounds_and_constant_loads_are_not_roots() {
    let func = parse(
        "function %safe(v0:ptr) {
            v1:ptr = global %table
            v2 = iconst 16

        block0:
            v3 = load v0 inbounds
            v4:ptr = gep v1, v2
            v5 = load v4
            v6 = iadd v3, v5
            ret v6
        }",
    );
    let st = SpeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    assert!(st.is_empty());
}
