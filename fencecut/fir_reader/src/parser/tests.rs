use expect_test::{expect, Expect};

use crate::{parse_function, parse_functions};

fn check_roundtrip(src: &str) {
    let func = match parse_function(src) {
        Ok(func) => func,
        Err(err) => panic!("failed to parse:\n{src}\n{err}"),
    };
    assert_eq!(func.to_debug_string(), src);
}

fn check_error(src: &str, expect: Expect) {
    let err = parse_function(src).expect_err("parsing should fail");
    expect.assert_eq(&err.to_string());
}

#[test]
fn roundtrip_memory_and_calls() {
    check_roundtrip(
        r#"function %lookup(v0:ptr, v1) {
    fn0 = fn %helper(2) -> 1
    fn1 = intrinsic %memset(3) -> 0
    v2 = iconst 8
    v3:ptr = global %table

block0:
    v4:ptr = gep v3, v1
    v5 = load v4 size 1
    v6 = call fn0(v5, v2)
    call fn1(v0, v6, v2)
    store v6, v0 inbounds
    v7 = atomic_rmw xchg v0, v5
    v8 = cmpxchg v0, v5, v7 size 4
    v9:ptr = alloca 16
    v10 = call_indirect v9(v8)
    call_indirect v9()
    ret v10
}
"#,
    );
}

#[test]
fn roundtrip_control_flow() {
    check_roundtrip(
        r#"function %select(v0, v1) {
    v2 = iconst 0
    v3 = iconst -1

block0:
    v4 = islt v0, v2
    br v4, block1, block2

block1:
    switch v1, block3, [0: block2, 7: block3]

block2:
    v5 = phi [v0, block0], [v3, block1]
    lfence "manual"
    jmp block3

block3:
    v6 = phi [v2, block1], [v5, block2]
    v7 = select v4, v6, v3
    v8 = freeze v7
    v9 = landingpad
    v10 = insertvalue v9, v8, 1
    v11 = extractvalue v10, 0
    v12 = opaque "va_arg"(v11)
    opaque "fake_use"(v12)
    resume v10
}
"#,
    );
}

#[test]
fn roundtrip_arith() {
    check_roundtrip(
        r#"function %arith(v0, v1) {
block0:
    v2 = sdiv v0, v1
    v3 = frem v2, v1
    v4 = fneg v3
    v5 = sitofp v4
    v6 = shufflevector v5, v5
    v7 = extractelement v6, v1
    v8 = insertelement v6, v7, v1
    v9 = fge v8, v0
    ret v9
}
"#,
    );
}

#[test]
fn comments_and_blank_lines() {
    let func = parse_function(
        "; leading comment
        function %f() { ; empty signature
        block0: ; entry
            ret
        }",
    )
    .unwrap();
    let expected = expect![[r#"
        function %f() {
        block0:
            ret
        }
    "#]];
    expected.assert_eq(&func.to_debug_string());
}

#[test]
fn multiple_functions() {
    let funcs = parse_functions(
        "function %a() {
        block0:
            ret
        }
        function %b(v0) {
        block0:
            ret v0
        }",
    )
    .unwrap();
    let names: Vec<_> = funcs.iter().map(|func| func.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(funcs[1].dfg.params().len(), 1);
}

#[test]
fn undefined_value() {
    check_error(
        "function %f() {
        block0:
            ret v0
        }",
        expect!["4: undefined value v0"],
    );
}

#[test]
fn missing_terminator() {
    check_error(
        "function %f(v0) {
        block0:
            v1 = iadd v0, v0
        }",
        expect!["4: block0 does not end with a terminator"],
    );
}

#[test]
fn terminator_in_the_middle() {
    check_error(
        "function %f() {
        block0:
            ret
            unreachable
        }",
        expect!["5: terminator in the middle of block0"],
    );
}

#[test]
fn undefined_block() {
    check_error(
        "function %f() {
        block0:
            jmp block4
        }",
        expect!["4: block0 jumps to undefined block4"],
    );
}

#[test]
fn call_results_must_match_signature() {
    check_error(
        "function %f(v0) {
            fn0 = fn %g(1) -> 0
        block0:
            v1 = call fn0(v0)
            ret
        }",
        expect!["4: 'call' does not produce a result value"],
    );
    check_error(
        "function %f(v0) {
            fn0 = fn %g(1) -> 1
        block0:
            call fn0(v0, v0)
            ret
        }",
        expect!["4: fn0 expects 1 arguments, 2 given"],
    );
    check_error(
        "function %f(v0) {
        block0:
            call fn3(v0)
            ret
        }",
        expect!["3: fn3 is not declared"],
    );
}

#[test]
fn results_required_and_forbidden() {
    check_error(
        "function %f(v0, v1) {
        block0:
            iadd v0, v1
            ret
        }",
        expect!["3: 'iadd' produces a result value"],
    );
    check_error(
        "function %f(v0:ptr, v1) {
        block0:
            v2 = store v1, v0
            ret
        }",
        expect!["3: 'store' does not produce a result value"],
    );
}

#[test]
fn duplicate_definitions() {
    check_error(
        "function %f(v0) {
            v0 = iconst 1
        block0:
            ret
        }",
        expect!["2: duplicate definition of v0"],
    );
    check_error(
        "function %f() {
        block0:
            jmp block0
        block0:
            ret
        }",
        expect!["4: duplicate definition of block0"],
    );
}

#[test]
fn signatures_in_order() {
    check_error(
        "function %f() {
            fn1 = fn %g(0)
        block0:
            ret
        }",
        expect!["2: expected fn0 to be declared next, found fn1"],
    );
}

#[test]
fn unknown_opcode() {
    check_error(
        "function %f(v0) {
        block0:
            v1 = frobnicate v0
            ret
        }",
        expect!["3: unknown opcode 'frobnicate'"],
    );
}

#[test]
fn lexer_errors() {
    check_error(
        "function %f() {
        block0:
            lfence \"oops
            ret
        }",
        expect!["3: unterminated string"],
    );
    check_error("function %f() { # }", expect!["1: invalid character"]);
    check_error(
        "function %f(v0) {
        block0:
            ret v00
        }",
        expect!["3: malformed entity reference"],
    );
}
