use std::fmt::Write;

use expect_test::expect;
use fir::Inst;
use proptest::prelude::*;

use crate::{
    baseline, solve, validate, Constraint, CutEdge, CutSet, GreedyOrder, Graph, MinCutSolver,
};

pub(crate) fn graph(num_nodes: usize, edges: &[(usize, usize, u64)]) -> Graph<Inst> {
    let mut graph = Graph::with_nodes(num_nodes);
    for &(src, dst, weight) in edges {
        graph.add_edge(src.into(), dst.into(), weight);
    }
    graph
}

pub(crate) fn nodes(nodes: &[usize]) -> Vec<Inst> {
    nodes.iter().map(|&node| node.into()).collect()
}

pub(crate) fn render(cut: &CutSet<Inst>) -> String {
    let mut res = String::new();
    for edge in cut.to_sorted_vec() {
        writeln!(res, "{edge}").unwrap();
    }
    res
}

const ALL_STRATEGIES: [crate::Strategy; 3] = [
    crate::Strategy::Exact,
    crate::Strategy::Greedy(GreedyOrder::Construction),
    crate::Strategy::Greedy(GreedyOrder::Criticality),
];

#[test]
fn straight_line() {
    // store -> load -> ret
    let graph = graph(3, &[(0, 1, 1), (1, 2, 1)]);
    let constraints = [Constraint::new(nodes(&[0]), nodes(&[1]))];
    for strategy in ALL_STRATEGIES {
        let cut = solve(&graph, &constraints, strategy).unwrap();
        assert_eq!(render(&cut), "inst0 -> inst1\n", "{strategy:?}");
    }
}

#[test]
fn diamond() {
    let graph = graph(4, &[(0, 1, 1), (0, 2, 1), (1, 3, 1), (2, 3, 1)]);
    let constraints = [Constraint::new(nodes(&[0]), nodes(&[3]))];
    let expected = expect![[r#"
        inst0 -> inst1
        inst0 -> inst2
    "#]];
    for strategy in ALL_STRATEGIES {
        let cut = solve(&graph, &constraints, strategy).unwrap();
        expected.assert_eq(&render(&cut));
    }
}

#[test]
fn weighted_diamond() {
    let graph = graph(4, &[(0, 1, 5), (0, 2, 5), (1, 3, 1), (2, 3, 1)]);
    let constraints = [Constraint::new(nodes(&[0]), nodes(&[3]))];

    let exact = solve(&graph, &constraints, crate::Strategy::Exact).unwrap();
    let expected = expect![[r#"
        inst1 -> inst3
        inst2 -> inst3
    "#]];
    expected.assert_eq(&render(&exact));
    assert_eq!(exact.weight(&graph), 2);

    let greedy =
        solve(&graph, &constraints, crate::Strategy::Greedy(GreedyOrder::Construction)).unwrap();
    assert_eq!(greedy.len(), 2);
    assert_eq!(greedy.weight(&graph), 10);
}

#[test]
fn sources_can_be_their_own_sinks() {
    let graph = graph(3, &[(0, 1, 1), (1, 0, 1), (1, 2, 1)]);
    let constraints = [Constraint::new(nodes(&[0]), nodes(&[0]))];
    for strategy in ALL_STRATEGIES {
        let cut = solve(&graph, &constraints, strategy).unwrap();
        assert_eq!(render(&cut), "inst0 -> inst1\n", "{strategy:?}");
    }

    // without a cycle there is nothing to cut
    let graph = self::graph(2, &[(0, 1, 1)]);
    let constraints = [Constraint::new(nodes(&[0]), nodes(&[0]))];
    assert!(solve(&graph, &constraints, crate::Strategy::Exact).unwrap().is_empty());
}

#[test]
fn every_hop_of_a_chain_counts() {
    // 0 -> 1 -> 2 -> 3, with the waypoint 1
    let graph = graph(4, &[(0, 1, 10), (1, 2, 1), (2, 3, 10)]);
    let constraints = [Constraint::with_waypoints(nodes(&[0]), nodes(&[1]), nodes(&[3]))];
    let cut = solve(&graph, &constraints, crate::Strategy::Exact).unwrap();
    assert_eq!(render(&cut), "inst1 -> inst2\n");

    // a sink that is reachable from the sources but not from the waypoints is fine
    let graph = self::graph(4, &[(0, 1, 1), (0, 3, 1)]);
    let constraints = [Constraint::with_waypoints(nodes(&[0]), nodes(&[1]), nodes(&[3]))];
    assert!(validate(&graph, &constraints, &CutSet::new()).is_ok());
}

#[test]
fn violations_name_a_witness() {
    let graph = graph(4, &[(0, 1, 1), (0, 2, 1), (1, 3, 1), (2, 3, 1)]);
    let constraints = [
        Constraint::new(nodes(&[1]), nodes(&[3])),
        Constraint::new(nodes(&[0]), nodes(&[3])),
    ];
    let cut: CutSet<Inst> = [CutEdge { src: 0usize.into(), dst: 1usize.into() }]
        .into_iter()
        .chain([CutEdge { src: 1usize.into(), dst: 3usize.into() }])
        .collect();

    let err = validate(&graph, &constraints, &cut).unwrap_err();
    assert_eq!(err.constraint, 1);
    assert_eq!(err.path, nodes(&[0, 2, 3]));
    assert_eq!(err.to_string(), "cut leaves constraint 1 open along inst0 -> inst2 -> inst3");
}

#[test]
fn chains_need_a_source_and_a_sink_set() {
    assert_eq!(Constraint::<Inst>::from_chain(Vec::<Vec<Inst>>::new()), None);
    assert_eq!(Constraint::from_chain([nodes(&[0, 1])]), None);
    let chain = Constraint::from_chain([nodes(&[2, 0]), nodes(&[1]), nodes(&[3, 3])]).unwrap();
    assert_eq!(chain, Constraint::with_waypoints(nodes(&[0, 2]), nodes(&[1]), nodes(&[3])));
    assert_eq!(chain.num_hops(), 2);
}

#[test]
fn auto_strategy_switches_on_constraint_count() {
    let strategy = crate::Strategy::Auto { exact_limit: 2 };
    assert_eq!(strategy.solver::<Inst>(2).name(), "exact");
    assert_eq!(strategy.solver::<Inst>(3).name(), "greedy (criticality order)");
}

fn arb_problem(max_sets: usize) -> impl Strategy<Value = (Graph<Inst>, Vec<Constraint<Inst>>)> {
    (2usize..14)
        .prop_flat_map(move |num_nodes| {
            let edge = (0..num_nodes, 0..num_nodes, 1u64..6);
            let edges = prop::collection::vec(edge, 0..num_nodes * 3);
            let set = prop::collection::vec(0..num_nodes, 1..4);
            let chain = prop::collection::vec(set, 2..=max_sets);
            let constraints = prop::collection::vec(chain, 1..5);
            (Just(num_nodes), edges, constraints)
        })
        .prop_map(|(num_nodes, edges, chains)| {
            let graph = graph(num_nodes, &edges);
            let constraints = chains
                .into_iter()
                .filter_map(|chain| Constraint::from_chain(chain.into_iter().map(|set| nodes(&set))))
                .collect();
            (graph, constraints)
        })
}

proptest! {
    #[test]
    fn solvers_block_every_constraint((graph, constraints) in arb_problem(3)) {
        for strategy in ALL_STRATEGIES {
            let cut = strategy.solver::<Inst>(constraints.len()).solve(&graph, &constraints);
            prop_assert!(
                validate(&graph, &constraints, &cut).is_ok(),
                "{strategy:?} left a path open:\n{}", render(&cut)
            );
        }
    }

    #[test]
    fn greedy_never_exceeds_baseline((graph, constraints) in arb_problem(3)) {
        let baseline = baseline(&graph, &constraints);
        prop_assert!(validate(&graph, &constraints, &baseline).is_ok());
        for order in [GreedyOrder::Construction, GreedyOrder::Criticality] {
            let cut = crate::GreedySolver { order }.solve(&graph, &constraints);
            prop_assert!(cut.len() <= baseline.len());
        }
    }

    #[test]
    fn exact_cut_is_minimal_for_one_constraint((graph, constraints) in arb_problem(2)) {
        let constraints = &constraints[..1];
        let exact = crate::ExactSolver.solve(&graph, constraints).weight(&graph);
        let greedy = crate::GreedySolver::default().solve(&graph, constraints).weight(&graph);
        prop_assert!(exact <= greedy);
        prop_assert!(exact <= baseline(&graph, constraints).weight(&graph));
    }

    #[test]
    fn empty_cut_is_valid_iff_nothing_is_reachable((graph, constraints) in arb_problem(3)) {
        let uncut = CutSet::new();
        prop_assert_eq!(
            validate(&graph, &constraints, &uncut).is_ok(),
            baseline(&graph, &constraints).is_empty()
        );
    }
}
