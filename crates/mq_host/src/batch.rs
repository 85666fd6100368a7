//! Parallel evaluation of measurement orders.
//!
//! Each order is independent: a worker clones the graph and strategy list,
//! builds its own decoder and reports one `{matt, loss}` entry. A failing
//! order is logged and written as the failure sentinel; its siblings carry
//! on.

use crate::config::RunConfig;
use crate::stats::MatterStats;
use anyhow::{Context, Result, bail};
use mq_common::defaults::{FAILED_MATTER_SENTINEL, INPUT_QUBIT};
use mq_core::config::DecoderConfig;
use mq_core::erasure::ErasureDecoder;
use mq_core::graph::GraphState;
use mq_core::hybrid::{DecoderReport, HybridDecoder};
use mq_core::strategy::{Strategy, StrategyTable};
use mq_io::graphs::GraphEntry;
use mq_io::loader::{MeasurementOrder, load_orders, select_range};
use mq_io::store::{ResultRecord, load_json, results_path, save_json, table_path};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// What a decode run evaluates and where it writes.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    pub idx_min: usize,
    pub idx_max: usize,

    /// Strategy table to use instead of the one named after the graph.
    pub strategies: Option<PathBuf>,

    /// Measurement-order CSV to use instead of the catalogue's.
    pub orders: Option<PathBuf>,

    pub output: Option<PathBuf>,

    /// Evaluate at most this many orders of the range.
    pub limit: Option<usize>,
}

/// Result of one measurement order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderResult {
    pub index: usize,
    pub matter: i64,
    pub loss: usize,
    pub expected: Option<i64>,
}

impl OrderResult {
    pub fn mismatch(&self) -> bool {
        self.expected.is_some_and(|e| e != self.matter)
    }
}

/// Runs the tree-search decoder for one order.
pub fn evaluate_order(
    graph: &GraphState,
    strategies: &[Strategy],
    permutation: &[usize],
    distance: usize,
    config: &DecoderConfig,
) -> Result<DecoderReport> {
    let decoder = HybridDecoder::new(
        graph.clone(),
        strategies.to_vec(),
        permutation.to_vec(),
        distance,
        config.clone(),
    )?;
    Ok(decoder.run())
}

/// Evaluates `orders` in parallel, keeping their order in the output.
pub fn evaluate_orders(
    graph: &GraphState,
    strategies: &[Strategy],
    orders: &[MeasurementOrder],
    distance: usize,
    config: &DecoderConfig,
) -> Vec<OrderResult> {
    orders
        .par_iter()
        .map(|order| {
            let (matter, loss) =
                match evaluate_order(graph, strategies, &order.permutation, distance, config) {
                    Ok(report) => (report.matter_metric(), report.loss_size()),
                    Err(e) => {
                        warn!(index = order.index, error = %e, "measurement order failed");
                        (FAILED_MATTER_SENTINEL, 0)
                    }
                };
            OrderResult {
                index: order.index,
                matter,
                loss,
                expected: order.matter_qubits,
            }
        })
        .collect()
}

/// Loads the stored strategy table, or derives it in-process if the file
/// does not exist.
fn strategy_table(
    name: &str,
    entry: &GraphEntry,
    graph: &GraphState,
    config: &RunConfig,
    explicit: Option<&Path>,
    out_dir: &Path,
) -> Result<StrategyTable> {
    let path = explicit.map_or_else(|| table_path(out_dir, name), Path::to_path_buf);
    let table: StrategyTable = if path.exists() {
        load_json(&path)?
    } else if explicit.is_some() {
        bail!("strategy table {} does not exist", path.display());
    } else {
        info!(graph = name, "no stored strategy table, deriving one");
        ErasureDecoder::new(
            graph.clone(),
            entry.distance,
            INPUT_QUBIT,
            config.erasure.clone(),
        )?
        .run()?
    };

    table.validate()?;
    if table.n_qbts != graph.num_qubits() {
        bail!(
            "strategy table {} is for {} qubits, graph {name:?} has {}",
            path.display(),
            table.n_qbts,
            graph.num_qubits()
        );
    }
    Ok(table)
}

/// Decodes a range of measurement orders and writes the result record.
pub fn run_decode(
    name: &str,
    entry: &GraphEntry,
    catalogue_orders: Option<PathBuf>,
    config: &RunConfig,
    options: &DecodeOptions,
    out_dir: &Path,
) -> Result<(PathBuf, MatterStats)> {
    let graph = entry.build_graph()?;
    config
        .decoder
        .validate(graph.num_qubits().saturating_sub(1))
        .with_context(|| format!("Decoder settings do not fit graph {name:?}"))?;
    let table = strategy_table(
        name,
        entry,
        &graph,
        config,
        options.strategies.as_deref(),
        out_dir,
    )?;

    let Some(orders_path) = options.orders.clone().or(catalogue_orders) else {
        bail!("graph {name:?} has no measurement-order file; pass --orders");
    };
    let orders = load_orders(&orders_path)
        .with_context(|| format!("Failed to load orders for {name:?}"))?;
    let mut selected = select_range(&orders, options.idx_min, options.idx_max);
    if let Some(limit) = options.limit {
        selected = &selected[..limit.min(selected.len())];
    }
    info!(
        graph = name,
        orders = selected.len(),
        strategies = table.strategies_ordered.len(),
        "decoding measurement orders"
    );

    let start = Instant::now();
    let results = evaluate_orders(
        &graph,
        &table.strategies_ordered,
        selected,
        entry.distance,
        &config.decoder,
    );
    let elapsed = start.elapsed();

    let mut record = ResultRecord::default();
    let mut stats = MatterStats::new();
    for result in &results {
        record.push(result.matter, result.loss);
        stats.update(result.matter);
        if result.mismatch() {
            stats.mismatches += 1;
            warn!(
                index = result.index,
                computed = result.matter,
                stored = ?result.expected,
                "matter count differs from stored value"
            );
        }
    }

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| results_path(out_dir, name, options.idx_min, options.idx_max));
    save_json(&path, &record)?;
    info!(
        path = %path.display(),
        elapsed = ?elapsed,
        "results written"
    );
    Ok((path, stats))
}
