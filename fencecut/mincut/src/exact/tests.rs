use crate::tests::{graph, nodes, render};
use crate::{Constraint, ExactSolver, MinCutSolver};

#[test]
fn later_constraints_reuse_earlier_cuts() {
    let graph = graph(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 5)]);
    let constraints = [
        Constraint::new(nodes(&[1]), nodes(&[3])),
        Constraint::new(nodes(&[0]), nodes(&[3])),
    ];
    let cut = ExactSolver.solve(&graph, &constraints);
    assert_eq!(render(&cut), "inst1 -> inst2\n");
}

#[test]
fn multiple_sources_and_sinks() {
    // 0 and 1 both flow through the bottleneck 2 -> 3 before fanning out to 4 and 5
    let graph = graph(
        6,
        &[(0, 2, 3), (1, 2, 3), (2, 3, 2), (3, 4, 3), (3, 5, 3), (0, 4, 10), (1, 5, 1)],
    );
    let constraints = [Constraint::new(nodes(&[0, 1]), nodes(&[4, 5]))];
    let cut = ExactSolver.solve(&graph, &constraints);
    let expected = expect_test::expect![[r#"
        inst0 -> inst4
        inst1 -> inst5
        inst2 -> inst3
    "#]];
    expected.assert_eq(&render(&cut));
    assert_eq!(cut.weight(&graph), 13);
}

#[test]
fn cheapest_hop_of_a_chain_is_cut() {
    let graph = graph(5, &[(0, 1, 1), (1, 2, 4), (2, 3, 4), (2, 4, 4)]);
    let constraints = [Constraint::with_waypoints(nodes(&[0]), nodes(&[2]), nodes(&[3, 4]))];
    let cut = ExactSolver.solve(&graph, &constraints);
    assert_eq!(render(&cut), "inst0 -> inst1\n");
}

#[test]
fn ties_prefer_the_hop_next_to_the_sinks() {
    let graph = graph(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 1)]);
    let constraints = [Constraint::with_waypoints(nodes(&[0]), nodes(&[1]), nodes(&[3]))];
    let cut = ExactSolver.solve(&graph, &constraints);
    assert_eq!(render(&cut), "inst1 -> inst2\n");
}
