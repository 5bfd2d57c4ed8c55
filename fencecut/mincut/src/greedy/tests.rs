use crate::tests::{graph, nodes, render};
use crate::{Constraint, GreedyOrder, GreedySolver, MinCutSolver};

#[test]
fn falls_back_to_baseline() {
    let graph = graph(
        6,
        &[(0, 1, 1), (1, 2, 5), (1, 3, 5), (1, 4, 5), (2, 5, 1), (3, 5, 1), (4, 5, 1)],
    );
    let constraints = [Constraint::new(nodes(&[0]), nodes(&[5]))];
    let cut = GreedySolver::default().solve(&graph, &constraints);
    assert_eq!(render(&cut), "inst0 -> inst1\n");
}

#[test]
fn criticality_order_solves_narrow_constraints_first() {
    let graph = graph(7, &[(0, 2, 5), (2, 3, 1), (5, 6, 1)]);
    let constraints = [
        Constraint::new(nodes(&[0, 5]), nodes(&[3, 6])),
        Constraint::new(nodes(&[2]), nodes(&[3])),
    ];

    let construction =
        GreedySolver { order: GreedyOrder::Construction }.solve(&graph, &constraints);
    let expected = expect_test::expect![[r#"
        inst0 -> inst2
        inst2 -> inst3
        inst5 -> inst6
    "#]];
    expected.assert_eq(&render(&construction));

    let criticality = GreedySolver { order: GreedyOrder::Criticality }.solve(&graph, &constraints);
    let expected = expect_test::expect![[r#"
        inst2 -> inst3
        inst5 -> inst6
    "#]];
    expected.assert_eq(&render(&criticality));
}
