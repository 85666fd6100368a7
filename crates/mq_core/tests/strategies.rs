use mq_core::config::{ErasureConfig, LogicalTarget, RankingPolicy};
use mq_core::erasure::ErasureDecoder;
use mq_core::gf2::dot;
use mq_core::graph::GraphState;
use mq_core::pauli::PauliString;
use mq_core::Pauli;

fn generators(graph: &GraphState) -> Vec<PauliString> {
    let (h_x, h_z) = graph.stabilizer_matrices();
    (0..graph.num_qubits())
        .map(|i| PauliString::from_parts(h_x.row(i).clone(), h_z.row(i).clone()).unwrap())
        .collect()
}

fn check_graph(graph: GraphState, distance: usize) {
    let stabilizers = generators(&graph);
    let n = graph.num_qubits();
    let erasure = ErasureDecoder::new(graph, distance, 0, ErasureConfig::default()).unwrap();

    let mut logical_x = PauliString::identity(n);
    logical_x.set(0, Pauli::X);
    let mut logical_z = PauliString::identity(n);
    logical_z.set(0, Pauli::Z);

    for pattern in erasure.loss_patterns() {
        let (_, strategies) = erasure.run_specific_loss_pattern(pattern).unwrap();
        for s in &strategies {
            let op = s.operator();
            assert!(s.covers(pattern), "{s} touches {pattern}");
            for g in &stabilizers {
                assert!(op.commutes_with(g), "{s} anticommutes with {g}");
            }

            // Binary dot products against the logical operators: the input
            // component must equal the logical Pauli.
            let x_part = dot(op.x_bits(), logical_x.x_bits());
            let z_part = dot(op.z_bits(), logical_z.z_bits());
            match s.logical() {
                LogicalTarget::X => assert!(x_part && !z_part),
                LogicalTarget::Y => assert!(x_part && z_part),
                LogicalTarget::Z => assert!(!x_part && z_part),
            }
        }
    }
}

#[test]
fn path_strategies_are_valid_logical_operators() {
    check_graph(GraphState::linear(6), 2);
}

#[test]
fn ring_strategies_are_valid_logical_operators() {
    let mut ring = GraphState::linear(6);
    ring.add_edge(0, 5).unwrap();
    check_graph(ring, 2);
}

#[test]
fn complemented_star_strategies_are_valid_logical_operators() {
    let mut graph = GraphState::star(5);
    graph.local_complement(0).unwrap();
    check_graph(graph, 3);
}

#[test]
fn per_pattern_lists_are_ranked() {
    let erasure = ErasureDecoder::new(GraphState::linear(5), 2, 0, ErasureConfig::default()).unwrap();
    let table = erasure.run().unwrap();
    for entry in &table.patterns {
        for pair in entry.strategies.windows(2) {
            assert!(RankingPolicy::ZTail.compare(&pair[0], &pair[1]).is_le());
        }
    }
    table.validate().unwrap();
}

#[test]
fn y_target_produces_y_on_input() {
    let config = ErasureConfig {
        targets: vec![LogicalTarget::Y],
        ..ErasureConfig::default()
    };
    let erasure = ErasureDecoder::new(GraphState::star(4), 1, 0, config).unwrap();
    let table = erasure.run().unwrap();
    assert!(!table.strategies_ordered.is_empty());
    assert!(
        table
            .strategies_ordered
            .iter()
            .all(|s| s.measurement(0) == Pauli::Y)
    );
}

/// Lightest strategy weight per logical target, by walking the whole
/// stabilizer group.
fn lightest_by_group(
    stabilizers: &[PauliString],
    pattern: &mq_core::loss::LossPattern,
    target: LogicalTarget,
) -> Option<usize> {
    let n = stabilizers.len();
    (0u32..1 << n)
        .filter_map(|mask| {
            let mut op = PauliString::identity(n);
            for (i, g) in stabilizers.iter().enumerate() {
                if mask >> i & 1 == 1 {
                    op.multiply_assign(g);
                }
            }
            let lost_free = pattern.qubits().iter().all(|&q| op.get(q).is_identity());
            let weight = (1..n).filter(|&q| !op.get(q).is_identity()).count();
            (lost_free && op.get(0) == target.pauli()).then_some(weight)
        })
        .min()
}

#[test]
fn derived_lists_start_at_the_minimum_weight() {
    let mut graph = GraphState::linear(8);
    graph.add_edge(0, 4).unwrap();
    graph.add_edge(2, 7).unwrap();
    let stabilizers = generators(&graph);
    // Small enough that the loss-free cosets are searched by weight.
    let config = ErasureConfig {
        max_candidates_per_target: 32,
        max_strategies_per_target: 1,
        ..ErasureConfig::default()
    };
    let erasure = ErasureDecoder::new(graph, 2, 0, config).unwrap();

    for pattern in erasure.loss_patterns() {
        let (_, strategies) = erasure.run_specific_loss_pattern(pattern).unwrap();
        for target in [LogicalTarget::X, LogicalTarget::Z] {
            let derived = strategies
                .iter()
                .filter(|s| s.logical() == target)
                .map(|s| s.weight())
                .min();
            assert_eq!(
                derived,
                lightest_by_group(&stabilizers, pattern, target),
                "{target:?} under {pattern}"
            );
        }
    }
}
