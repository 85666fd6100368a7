//! Merging of strategy chunks into a single strategy table.

use crate::config::RankingPolicy;
use crate::loss::LossPattern;
use crate::strategy::{PatternStrategies, Strategy, StrategyChunk, StrategyTable, ordered_union};
use crate::{CoreError, CoreResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

/// How many missing indices are named individually in the log.
const MISSING_REPORT_LIMIT: usize = 20;

/// A merged table and the loss-pattern indices no chunk covered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedTable {
    pub table: StrategyTable,
    pub missing: Vec<usize>,
}

impl MergedTable {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Metadata every chunk of one run must agree on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChunkShape {
    n_qbts: usize,
    distance: usize,
    in_qbt: usize,
    total: usize,
}

impl ChunkShape {
    fn of(chunk: &StrategyChunk) -> Self {
        Self {
            n_qbts: chunk.n_qbts,
            distance: chunk.distance,
            in_qbt: chunk.in_qbt,
            total: chunk.n_loss_patterns_total,
        }
    }
}

/// Pattern entries and failures collected from consistent chunks.
struct Collected {
    shape: ChunkShape,
    patterns: Vec<PatternStrategies>,
    undecodable: Vec<LossPattern>,
    missing: Vec<usize>,
}

fn collect(chunks: Vec<StrategyChunk>) -> CoreResult<Collected> {
    let Some(first) = chunks.first() else {
        return Err(CoreError::InconsistentChunks("no chunks to merge".into()));
    };
    let shape = ChunkShape::of(first);

    let mut covered = vec![false; shape.total];
    let mut patterns = Vec::new();
    let mut undecodable = Vec::new();

    for (i, chunk) in chunks.into_iter().enumerate() {
        let other = ChunkShape::of(&chunk);
        if other != shape {
            return Err(CoreError::InconsistentChunks(format!(
                "chunk {i} [{}, {}) has {other:?}, expected {shape:?}",
                chunk.idx_min, chunk.idx_max
            )));
        }
        let hi = chunk.idx_max.min(shape.total);
        for slot in &mut covered[chunk.idx_min.min(hi)..hi] {
            *slot = true;
        }
        patterns.extend(chunk.patterns);
        undecodable.extend(chunk.failed);
    }

    // Overlapping chunks repeat patterns; keep one entry per index.
    patterns.sort_by_key(|p| p.index);
    patterns.dedup_by_key(|p| p.index);
    undecodable.sort();
    undecodable.dedup();

    let missing: Vec<usize> = covered
        .iter()
        .enumerate()
        .filter(|&(_, &c)| !c)
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        let shown = &missing[..missing.len().min(MISSING_REPORT_LIMIT)];
        warn!(
            missing = missing.len(),
            first = ?shown,
            "loss patterns not covered by any chunk"
        );
    }

    Ok(Collected {
        shape,
        patterns,
        undecodable,
        missing,
    })
}

fn assemble(collected: Collected, ranking: RankingPolicy) -> MergedTable {
    let strategies_ordered = ordered_union(
        collected.patterns.iter().map(|p| p.strategies.as_slice()),
        ranking,
    );
    info!(
        patterns = collected.patterns.len(),
        unique_strategies = strategies_ordered.len(),
        undecodable = collected.undecodable.len(),
        "merged strategy chunks"
    );

    MergedTable {
        table: StrategyTable {
            n_qbts: collected.shape.n_qbts,
            distance: collected.shape.distance,
            in_qbt: collected.shape.in_qbt,
            patterns: collected.patterns,
            strategies_ordered,
            undecodable: collected.undecodable,
        },
        missing: collected.missing,
    }
}

/// Merges chunks, keeping every unique strategy.
///
/// # Errors
///
/// `InconsistentChunks` if the list is empty or the chunks disagree on
/// qubit count, distance, input qubit or total pattern count. Missing
/// coverage is not an error; it is returned in `missing` and logged.
pub fn merge_chunks(chunks: Vec<StrategyChunk>, ranking: RankingPolicy) -> CoreResult<MergedTable> {
    Ok(assemble(collect(chunks)?, ranking))
}

/// Merges chunks keeping one sampled strategy per loss pattern.
///
/// For each pattern, one strategy is drawn uniformly from the `top_x`
/// lightest that cover it. Draws use a `StdRng` seeded with `seed` and run in
/// pattern-index order, so the result depends only on the chunks and the
/// seed.
///
/// # Arguments
///
/// * `top_x` - How many of the lightest covering strategies to draw from.
/// * `seed` - Seed for the `StdRng`.
/// * `ranking` - Order used to pick the lightest and to rank the union.
pub fn merge_chunks_sampled(
    chunks: Vec<StrategyChunk>,
    top_x: usize,
    seed: u64,
    ranking: RankingPolicy,
) -> CoreResult<MergedTable> {
    if top_x == 0 {
        return Err(CoreError::Configuration("top_x must be positive".into()));
    }
    let mut collected = collect(chunks)?;
    let mut rng = StdRng::seed_from_u64(seed);

    for entry in &mut collected.patterns {
        let mut candidates: Vec<Strategy> = entry
            .strategies
            .iter()
            .filter(|s| s.covers(&entry.loss))
            .cloned()
            .collect();
        ranking.rank(&mut candidates);
        candidates.truncate(top_x);
        entry.strategies = candidates.choose(&mut rng).cloned().into_iter().collect();
    }
    collected.patterns.retain(|p| !p.strategies.is_empty());

    Ok(assemble(collected, ranking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErasureConfig;
    use crate::erasure::ErasureDecoder;
    use crate::graph::GraphState;

    fn chunks(graph: GraphState, distance: usize, size: usize) -> Vec<StrategyChunk> {
        let erasure = ErasureDecoder::new(graph, distance, 0, ErasureConfig::default()).unwrap();
        let total = erasure.loss_patterns().len();
        (0..total)
            .step_by(size)
            .map(|lo| erasure.compute_chunk(lo, lo + size).unwrap())
            .collect()
    }

    #[test]
    fn chunked_merge_matches_single_run() {
        let graph = GraphState::linear(5);
        let whole = ErasureDecoder::new(graph.clone(), 2, 0, ErasureConfig::default())
            .unwrap()
            .run()
            .unwrap();
        let merged = merge_chunks(chunks(graph, 2, 3), RankingPolicy::ZTail).unwrap();
        assert!(merged.is_complete());
        assert_eq!(merged.table, whole);
    }

    #[test]
    fn reports_missing_indices() {
        let mut parts = chunks(GraphState::linear(4), 2, 2);
        parts.remove(1);
        let merged = merge_chunks(parts, RankingPolicy::ZTail).unwrap();
        assert_eq!(merged.missing, vec![2, 3]);
    }

    #[test]
    fn rejects_mismatched_metadata() {
        let mut parts = chunks(GraphState::linear(4), 2, 2);
        parts[1].distance = 1;
        let err = merge_chunks(parts, RankingPolicy::ZTail).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentChunks(_)));
        assert!(merge_chunks(Vec::new(), RankingPolicy::ZTail).is_err());
    }

    #[test]
    fn sampled_merge_is_seeded() {
        let parts = chunks(GraphState::star(5), 2, 4);
        let a = merge_chunks_sampled(parts.clone(), 3, 42, RankingPolicy::ZTail).unwrap();
        let b = merge_chunks_sampled(parts.clone(), 3, 42, RankingPolicy::ZTail).unwrap();
        assert_eq!(a, b);

        let full = merge_chunks(parts, RankingPolicy::ZTail).unwrap();
        for entry in &a.table.patterns {
            assert_eq!(entry.strategies.len(), 1);
            assert!(entry.strategies[0].covers(&entry.loss));
        }
        assert!(a.table.strategies_ordered.len() <= full.table.strategies_ordered.len());
    }

    #[test]
    fn sampled_merge_with_top_one_takes_the_lightest() {
        let parts = chunks(GraphState::star(4), 1, 10);
        let merged = merge_chunks_sampled(parts.clone(), 1, 7, RankingPolicy::ZTail).unwrap();
        for (sampled, full) in merged.table.patterns.iter().zip(&parts[0].patterns) {
            assert_eq!(sampled.strategies[0], full.strategies[0]);
        }
    }
}
