use expect_test::expect;
use fir::BasicAliasAnalysis;

use crate::tests::{parse, render_secrets, sound};
use crate::{AliasPolicy, NonspeculativeTaint, TaintConfig};

#[test]
fn operands_of_public_values_are_public() {
    let func = parse(
        "function %table(v0:ptr, v1:ptr, v2) {
            v3 = iconst 3
        block0:
            v4 = load v1
            v5 = load v1 size 4
            v6 = ishl v4, v3
            v7 = iadd v6, v2
            v8:ptr = gep v0, v7
            v9 = load v8
            v10 = imul v5, v9
            ret
        }",
    );
    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    // v10 is never observed, so neither are its operands
    let expected = expect![[r#"
        pub v4
        sec v5
        pub v6
        pub v7
        pub v8
        sec v9
        sec v10
    "#]];
    expected.assert_eq(&render_secrets(&func, |val| nst.secret(&func, val)));
}

const MUST_ALIAS: &str = "function %spill(v0:ptr, v1:ptr) {
block0:
    v2 = load v0
    store v2, v1 inbounds
    v3 = load v1
    v4:ptr = gep v0, v3
    v5 = load v4
    v6 = load v0 size 4
    store v6, v1 size 4 inbounds
    ret
}";

#[test]
fn landing_pads_are_public() {
    let func = parse(
        "function %cleanup(v0:ptr) {
        block0:
            v1 = landingpad
            v2 = extractvalue v1, 0
            v3 = load v0
            v4 = insertvalue v1, v3, 1
            ret
        }",
    );
    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    // nothing observes the aggregate, only the exception object itself is public
    let expected = expect![[r#"
        pub v1
        sec v2
        sec v3
        sec v4
    "#]];
    expected.assert_eq(&render_secrets(&func, |val| nst.secret(&func, val)));
}

#[test]
fn public_reloads_make_stored_values_public() {
    let func = parse(MUST_ALIAS);
    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    // the reload of v6 has a different size, which is only a may-alias
    let expected = expect![[r#"
        pub v2
        pub v3
        pub v4
        sec v5
        sec v6
    "#]];
    expected.assert_eq(&render_secrets(&func, |val| nst.secret(&func, val)));
    assert!(nst.iterations() >= 2);
}

#[test]
fn optimistic_aliasing_trusts_may_alias() {
    let func = parse(MUST_ALIAS);
    let config = TaintConfig::new(AliasPolicy::Optimistic);
    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
    let expected = expect![[r#"
        pub v2
        pub v3
        pub v4
        pub v5
        pub v6
    "#]];
    expected.assert_eq(&render_secrets(&func, |val| nst.secret(&func, val)));
}

#[test]
fn calling_convention() {
    let func = parse(
        "function %conv(v0) {
            fn0 = fn %ext(1) -> 1
            fn1 = intrinsic %annotation(2) -> 1
        block0:
            v1 = iadd v0, v0
            v2 = call fn0(v1)
            v3 = isub v0, v0
            v4 = call fn1(v3, v0)
            v5 = ineg v4
            ret v5
        }",
    );

    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &sound()).unwrap();
    let expected = expect![[r#"
        pub v1
        sec v2
        pub v3
        pub v4
        pub v5
    "#]];
    expected.assert_eq(&render_secrets(&func, |val| nst.secret(&func, val)));

    let config = TaintConfig { strict_calling_conv: true, alias_policy: AliasPolicy::Sound };
    let nst = NonspeculativeTaint::compute(&func, &BasicAliasAnalysis, &config).unwrap();
    assert!(!nst.secret(&func, func.dfg.inst_result(1usize.into()).unwrap()));
}
