//! Strategy-table production for catalogued graphs.
//!
//! Computes strategy tables either in one pass or as independent chunks of
//! the loss-pattern index range, and merges chunk files back into a single
//! table (exhaustively or by seeded sampling). Outputs are JSON files named
//! after the graph so later decode runs can find them.

use anyhow::{Result, bail};
use mq_common::defaults::INPUT_QUBIT;
use mq_core::config::ErasureConfig;
use mq_core::erasure::ErasureDecoder;
use mq_core::loss::count_loss_patterns;
use mq_core::merge::{MergedTable, merge_chunks, merge_chunks_sampled};
use mq_io::graphs::GraphEntry;
use mq_io::store::{
    chunk_path, find_chunk_files, load_chunks, sampled_table_path, save_json, table_path,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

fn erasure_decoder(entry: &GraphEntry, config: &ErasureConfig) -> Result<ErasureDecoder> {
    let graph = entry.build_graph()?;
    Ok(ErasureDecoder::new(
        graph,
        entry.distance,
        INPUT_QUBIT,
        config.clone(),
    )?)
}

/// Computes the full strategy table and writes it next to the other
/// outputs for `name`.
pub fn compute_table(
    name: &str,
    entry: &GraphEntry,
    config: &ErasureConfig,
    out_dir: &Path,
) -> Result<PathBuf> {
    let start = Instant::now();
    let erasure = erasure_decoder(entry, config)?;
    info!(
        graph = name,
        qubits = entry.num_qubits(),
        distance = entry.distance,
        patterns = erasure.loss_patterns().len(),
        "computing strategy table"
    );

    let table = erasure.run()?;
    if !table.undecodable.is_empty() {
        warn!(
            graph = name,
            undecodable = table.undecodable.len(),
            "some loss patterns have no strategy"
        );
    }

    let path = table_path(out_dir, name);
    save_json(&path, &table)?;
    info!(
        path = %path.display(),
        strategies = table.strategies_ordered.len(),
        elapsed = ?start.elapsed(),
        "strategy table written"
    );
    Ok(path)
}

/// Computes strategies for loss patterns `[idx_min, idx_max)`.
pub fn compute_chunk(
    name: &str,
    entry: &GraphEntry,
    config: &ErasureConfig,
    idx_min: usize,
    idx_max: usize,
    out_dir: &Path,
) -> Result<PathBuf> {
    if idx_min >= idx_max {
        bail!("empty chunk range [{idx_min}, {idx_max})");
    }
    let erasure = erasure_decoder(entry, config)?;
    let chunk = erasure.compute_chunk(idx_min, idx_max)?;

    // Named after the requested range so a job plan maps one-to-one onto
    // output files, even when the last range is clamped.
    let path = chunk_path(out_dir, name, idx_min, idx_max);
    save_json(&path, &chunk)?;
    info!(path = %path.display(), patterns = chunk.patterns.len(), "chunk written");
    Ok(path)
}

fn report_merge(name: &str, merged: &MergedTable, path: &Path) {
    if merged.is_complete() {
        info!(graph = name, path = %path.display(), "all loss patterns covered");
    } else {
        warn!(
            graph = name,
            missing = merged.missing.len(),
            "merged table is incomplete; rerun the missing chunks"
        );
    }
}

/// Merges every chunk file of `name` in `chunk_dir` into one table.
pub fn merge(
    name: &str,
    config: &ErasureConfig,
    chunk_dir: &Path,
    out_dir: &Path,
) -> Result<PathBuf> {
    let files = find_chunk_files(chunk_dir, name)?;
    if files.is_empty() {
        bail!("no chunk files for {name:?} in {}", chunk_dir.display());
    }
    info!(graph = name, chunks = files.len(), "merging chunks");

    let merged = merge_chunks(load_chunks(&files)?, config.ranking)?;
    let path = table_path(out_dir, name);
    save_json(&path, &merged.table)?;
    report_merge(name, &merged, &path);
    Ok(path)
}

/// Merges chunk files keeping one sampled strategy per loss pattern.
pub fn merge_sampled(
    name: &str,
    config: &ErasureConfig,
    chunk_dir: &Path,
    out_dir: &Path,
    top: usize,
    seed: u64,
) -> Result<PathBuf> {
    let files = find_chunk_files(chunk_dir, name)?;
    if files.is_empty() {
        bail!("no chunk files for {name:?} in {}", chunk_dir.display());
    }
    info!(graph = name, chunks = files.len(), top, seed, "sampled merge");

    let merged = merge_chunks_sampled(load_chunks(&files)?, top, seed, config.ranking)?;
    let path = sampled_table_path(out_dir, name);
    save_json(&path, &merged.table)?;
    report_merge(name, &merged, &path);
    Ok(path)
}

/// Half-open index ranges covering `total` patterns in steps of
/// `chunk_size`.
pub fn plan_jobs(total: usize, chunk_size: usize) -> Result<Vec<(usize, usize)>> {
    if chunk_size == 0 {
        bail!("chunk size must be positive");
    }
    Ok((0..total.div_ceil(chunk_size))
        .map(|job| (job * chunk_size, ((job + 1) * chunk_size).min(total)))
        .collect())
}

/// Prints the chunk plan for `name`.
pub fn print_plan(name: &str, entry: &GraphEntry, chunk_size: usize) -> Result<()> {
    let total = count_loss_patterns(entry.num_qubits(), entry.distance);
    let total = usize::try_from(total)?;
    let jobs = plan_jobs(total, chunk_size)?;

    println!("Graph: {name}");
    println!("Qubits: {}, distance: {}", entry.num_qubits(), entry.distance);
    println!("Loss patterns: {total}");
    println!("Chunk size: {chunk_size}");
    println!("Jobs: {}", jobs.len());
    for (job, (lo, hi)) in jobs.iter().enumerate() {
        println!("  job {job:4}: chunk {name:?} {lo} {hi}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_core::strategy::StrategyTable;
    use mq_io::graphs::EdgeSpec;
    use mq_io::store::load_json;

    fn path_entry() -> GraphEntry {
        GraphEntry {
            graph_edges: EdgeSpec::Pairs(vec![(0, 1), (1, 2), (2, 3), (3, 4)]),
            last_node: 4,
            distance: 2,
            filename: None,
        }
    }

    #[test]
    fn plan_covers_every_index_once() {
        assert_eq!(plan_jobs(10, 4).unwrap(), vec![(0, 4), (4, 8), (8, 10)]);
        assert_eq!(plan_jobs(8, 4).unwrap().len(), 2);
        assert!(plan_jobs(0, 4).unwrap().is_empty());
        assert!(plan_jobs(5, 0).is_err());
    }

    #[test]
    fn chunked_run_reproduces_full_table() {
        let dir = tempfile::tempdir().unwrap();
        let entry = path_entry();
        let config = ErasureConfig::default();

        let full_dir = dir.path().join("full");
        std::fs::create_dir(&full_dir).unwrap();
        let full: StrategyTable =
            load_json(compute_table("p5", &entry, &config, &full_dir).unwrap()).unwrap();

        let total = usize::try_from(count_loss_patterns(entry.num_qubits(), entry.distance)).unwrap();
        for (lo, hi) in plan_jobs(total, 3).unwrap() {
            compute_chunk("p5", &entry, &config, lo, hi, dir.path()).unwrap();
        }
        let merged: StrategyTable =
            load_json(merge("p5", &config, dir.path(), dir.path()).unwrap()).unwrap();
        assert_eq!(merged, full);

        let sampled: StrategyTable = load_json(
            merge_sampled("p5", &config, dir.path(), dir.path(), 2, 42).unwrap(),
        )
        .unwrap();
        assert!(sampled.strategies_ordered.len() <= full.strategies_ordered.len());
    }

    #[test]
    fn merge_without_chunks_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(merge("p5", &ErasureConfig::default(), dir.path(), dir.path()).is_err());
    }
}
