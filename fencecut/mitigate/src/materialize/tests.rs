use expect_test::{expect, Expect};
use fir::{ControlFlowGraph, Inst, InstFlowGraph};
use mincut::{CutEdge, CutSet};

use crate::tests::parse;
use crate::{materialize, Materialized, MITIGATION_TAG};

fn check(src: &str, edges: &[(usize, usize)], tag: &str, expect: Expect) -> Materialized {
    let mut func = parse(src);
    let cfg = ControlFlowGraph::with_function(&func);
    let inst_cfg = InstFlowGraph::with_function(&func, &cfg);
    let cut: CutSet<Inst> =
        edges.iter().map(|&(src, dst)| CutEdge { src: src.into(), dst: dst.into() }).collect();
    let res = materialize(&mut func, &inst_cfg, &cut, tag);
    expect.assert_eq(&func.to_debug_string());
    res
}

const JOIN: &str = "function %join(v0, v1:ptr) {
block0:
    br v0, block1, block2

block1:
    v2 = load v1
    jmp block2

block2:
    v3 = phi [v0, block0], [v2, block1]
    v4 = iadd v3, v0
    ret v4
}";

#[test]
fn edges_into_joins_are_split() {
    let res = check(
        JOIN,
        &[(0, 3)],
        MITIGATION_TAG,
        expect![[r#"
            function %join(v0, v1:ptr) {
            block0:
                br v0, block1, block3

            block3:
                lfence "fencecut-mitigate"
                jmp block2

            block1:
                v2 = load v1
                jmp block2

            block2:
                v3 = phi [v0, block3], [v2, block1]
                v4 = iadd v3, v0
                ret v4
            }
        "#]],
    );
    assert_eq!(res, Materialized { fences: 1, edge_splits: 1 });
}

#[test]
fn straight_edges_fence_the_destination() {
    let res = check(
        JOIN,
        &[(0, 1), (3, 4)],
        "manual",
        expect![[r#"
            function %join(v0, v1:ptr) {
            block0:
                br v0, block1, block2

            block1:
                lfence "manual"
                v2 = load v1
                jmp block2

            block2:
                v3 = phi [v0, block0], [v2, block1]
                lfence "manual"
                v4 = iadd v3, v0
                ret v4
            }
        "#]],
    );
    assert_eq!(res, Materialized { fences: 2, edge_splits: 0 });
}

#[test]
fn fences_go_after_phis_and_are_shared() {
    let res = check(
        "function %single(v0) {
        block0:
            jmp block1

        block1:
            v1 = phi [v0, block0]
            v2 = iadd v1, v0
            ret v2
        }",
        &[(0, 1), (1, 2)],
        MITIGATION_TAG,
        expect![[r#"
            function %single(v0) {
            block0:
                jmp block1

            block1:
                v1 = phi [v0, block0]
                lfence "fencecut-mitigate"
                v2 = iadd v1, v0
                ret v2
            }
        "#]],
    );
    assert_eq!(res, Materialized { fences: 1, edge_splits: 0 });
}

#[test]
fn empty_cut_changes_nothing() {
    let res = check(
        JOIN,
        &[],
        MITIGATION_TAG,
        expect![[r#"
            function %join(v0, v1:ptr) {
            block0:
                br v0, block1, block2

            block1:
                v2 = load v1
                jmp block2

            block2:
                v3 = phi [v0, block0], [v2, block1]
                v4 = iadd v3, v0
                ret v4
            }
        "#]],
    );
    assert_eq!(res, Materialized::default());
}

#[test]
fn back_edges_are_split() {
    let res = check(
        "function %spin(v0, v1:ptr) {
        block0:
            jmp block1

        block1:
            v2 = phi [v0, block0], [v3, block1]
            v3 = load v1
            br v3, block1, block2

        block2:
            ret v2
        }",
        &[(3, 1)],
        MITIGATION_TAG,
        expect![[r#"
            function %spin(v0, v1:ptr) {
            block0:
                jmp block1

            block1:
                v2 = phi [v0, block0], [v3, block3]
                v3 = load v1
                br v3, block3, block2

            block3:
                lfence "fencecut-mitigate"
                jmp block1

            block2:
                ret v2
            }
        "#]],
    );
    assert_eq!(res, Materialized { fences: 1, edge_splits: 1 });
}

#[test]
fn branches_to_one_block_are_not_split() {
    let res = check(
        "function %same(v0, v1) {
        block0:
            br v0, block1, block1

        block1:
            ret v1
        }",
        &[(0, 1)],
        MITIGATION_TAG,
        expect![[r#"
            function %same(v0, v1) {
            block0:
                br v0, block1, block1

            block1:
                lfence "fencecut-mitigate"
                ret v1
            }
        "#]],
    );
    assert_eq!(res, Materialized { fences: 1, edge_splits: 0 });
}
