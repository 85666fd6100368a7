use mq_core::CoreError;
use mq_core::config::{DecoderConfig, ErasureConfig};
use mq_core::erasure::ErasureDecoder;
use mq_core::graph::GraphState;
use mq_core::hybrid::{HybridDecoder, PatternOutcome};
use mq_core::loss::LossPattern;
use mq_core::strategy::Strategy;

fn ordered_strategies(graph: &GraphState, distance: usize) -> Vec<Strategy> {
    ErasureDecoder::new(graph.clone(), distance, 0, ErasureConfig::default())
        .unwrap()
        .run()
        .unwrap()
        .strategies_ordered
}

fn decoder(graph: GraphState, order: Vec<usize>, distance: usize, config: DecoderConfig) -> HybridDecoder {
    let strategies = ordered_strategies(&graph, distance);
    HybridDecoder::new(graph, strategies, order, distance, config).unwrap()
}

#[test]
fn path_of_six_terminates_within_order_length() {
    let hybrid = decoder(
        GraphState::linear(6),
        vec![1, 2, 3, 4, 5],
        2,
        DecoderConfig::default(),
    );
    let report = hybrid.run();
    let max = report.max_number_of_m_dec.unwrap();
    assert!(max <= 5);
    assert!(report.peak_stored <= max);
    assert!(report.all_min_loss_patterns.iter().all(|p| p.len() <= 2));
}

#[test]
fn empty_pattern_costs_nothing() {
    for n in 2..7 {
        let order: Vec<usize> = (1..n).rev().collect();
        let hybrid = decoder(GraphState::linear(n), order, 2, DecoderConfig::default());
        let outcomes = hybrid.outcomes();
        let empty = outcomes
            .iter()
            .find(|(p, _)| p.is_empty())
            .map(|(_, o)| *o);
        assert_eq!(
            empty,
            Some(PatternOutcome::Decoded {
                matter: 0,
                peak_stored: 0
            })
        );
    }
}

#[test]
fn unknown_qubit_in_order_is_rejected() {
    let graph = GraphState::linear(4);
    let strategies = ordered_strategies(&graph, 1);
    let err = HybridDecoder::new(graph, strategies, vec![1, 2, 9], 1, DecoderConfig::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::Configuration(_)));
}

#[test]
fn oversized_budget_is_rejected() {
    let graph = GraphState::linear(4);
    let strategies = ordered_strategies(&graph, 1);
    let config = DecoderConfig {
        max_loss: Some(4),
        ..DecoderConfig::default()
    };
    let err = HybridDecoder::new(graph, strategies, vec![1, 2, 3], 1, config).unwrap_err();
    assert!(matches!(err, CoreError::Configuration(_)));
}

#[test]
fn repeated_runs_agree() {
    let hybrid = decoder(
        GraphState::linear(6),
        vec![5, 3, 1, 2, 4],
        2,
        DecoderConfig::default(),
    );
    assert_eq!(hybrid.run(), hybrid.run());
    assert_eq!(hybrid.outcomes(), hybrid.clone().outcomes());
}

#[test]
fn worst_case_grows_with_budget() {
    let mut graph = GraphState::linear(6);
    graph.add_edge(0, 3).unwrap();
    let strategies = ordered_strategies(&graph, 3);
    let order = vec![2, 4, 1, 5, 3];

    let mut previous = 0;
    for max_loss in 0..=3 {
        let config = DecoderConfig {
            max_loss: Some(max_loss),
            ..DecoderConfig::default()
        };
        let report = HybridDecoder::new(graph.clone(), strategies.clone(), order.clone(), 3, config)
            .unwrap()
            .run();
        let max = report.max_number_of_m_dec.unwrap_or(0);
        assert!(max >= previous, "budget {max_loss} lowered the maximum");
        previous = max;
    }
}

#[test]
fn pattern_outcomes_do_not_depend_on_budget() {
    let graph = GraphState::star(5);
    let strategies = ordered_strategies(&graph, 2);
    let run = |max_loss| {
        let config = DecoderConfig {
            max_loss: Some(max_loss),
            ..DecoderConfig::default()
        };
        HybridDecoder::new(graph.clone(), strategies.clone(), vec![4, 2, 3, 1], 2, config)
            .unwrap()
            .outcomes()
    };
    let small = run(1);
    let large = run(2);
    for (pattern, outcome) in &small {
        let again = large.iter().find(|(p, _)| p == pattern).map(|(_, o)| o);
        assert_eq!(again, Some(outcome), "pattern {pattern}");
    }
}

#[test]
fn losing_the_first_measured_qubit_is_survivable() {
    // X0 X2 Z3 reads the logical X without qubit 1.
    let hybrid = decoder(GraphState::linear(5), vec![1, 2, 3, 4], 1, DecoderConfig::default());
    let outcome = hybrid
        .outcomes()
        .into_iter()
        .find(|(p, _)| *p == LossPattern::new(vec![1]))
        .map(|(_, o)| o);
    assert!(matches!(outcome, Some(PatternOutcome::Decoded { .. })));
}
