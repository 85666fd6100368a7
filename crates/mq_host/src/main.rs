//! `mq_host`: derives strategy tables and counts the matter qubits of
//! measurement orders.

mod batch;
mod config;
mod stabilizer;
mod stats;

use anyhow::Result;
use batch::DecodeOptions;
use clap::{Parser, Subcommand};
use config::RunConfig;
use mq_common::defaults::{SAMPLED_MERGE_SEED, SAMPLED_MERGE_TOP};
use mq_io::graphs::GraphDatabase;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(about = "Matter-qubit requirements of loss-tolerant graph codes")]
struct Cli {
    /// Log verbosity: error, warn, info, debug or trace.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Graph database (JSON keyed by graph description).
    #[arg(long, default_value = "graphs.json", global = true)]
    database: PathBuf,

    /// Run configuration (JSON); defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for generated files.
    #[arg(long, default_value = ".", global = true)]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the full strategy table of a graph.
    Stabilizers { graph: String },

    /// Compute strategies for loss patterns [idx_min, idx_max).
    Chunk {
        graph: String,
        idx_min: usize,
        idx_max: usize,
    },

    /// Merge chunk files into one strategy table.
    Merge {
        graph: String,
        /// Directory holding the chunk files (defaults to --out-dir).
        dir: Option<PathBuf>,
    },

    /// Merge chunk files keeping one of the lightest strategies per pattern.
    MergeSampled {
        graph: String,
        dir: Option<PathBuf>,
        #[arg(long, default_value_t = SAMPLED_MERGE_TOP)]
        top: usize,
        #[arg(long, default_value_t = SAMPLED_MERGE_SEED)]
        seed: u64,
    },

    /// Print how many chunk jobs a chunk size produces.
    Plan { graph: String, chunk_size: usize },

    /// Count matter qubits for measurement orders [idx_min, idx_max).
    Decode {
        graph: String,
        idx_min: usize,
        idx_max: usize,
        #[arg(long)]
        strategies: Option<PathBuf>,
        #[arg(long)]
        orders: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = RunConfig::load(cli.config.as_deref())?;
    let database = GraphDatabase::load(&cli.database)?;
    let out_dir = cli.out_dir.as_path();

    match cli.command {
        Commands::Stabilizers { graph } => {
            let entry = database.get(&graph)?;
            stabilizer::compute_table(&graph, entry, &config.erasure, out_dir)?;
        }
        Commands::Chunk {
            graph,
            idx_min,
            idx_max,
        } => {
            let entry = database.get(&graph)?;
            stabilizer::compute_chunk(&graph, entry, &config.erasure, idx_min, idx_max, out_dir)?;
        }
        Commands::Merge { graph, dir } => {
            let chunk_dir = dir.as_deref().unwrap_or(out_dir);
            stabilizer::merge(&graph, &config.erasure, chunk_dir, out_dir)?;
        }
        Commands::MergeSampled {
            graph,
            dir,
            top,
            seed,
        } => {
            let chunk_dir = dir.as_deref().unwrap_or(out_dir);
            stabilizer::merge_sampled(&graph, &config.erasure, chunk_dir, out_dir, top, seed)?;
        }
        Commands::Plan { graph, chunk_size } => {
            let entry = database.get(&graph)?;
            stabilizer::print_plan(&graph, entry, chunk_size)?;
        }
        Commands::Decode {
            graph,
            idx_min,
            idx_max,
            strategies,
            orders,
            output,
            limit,
        } => {
            let entry = database.get(&graph)?;
            let options = DecodeOptions {
                idx_min,
                idx_max,
                strategies,
                orders,
                output,
                limit,
            };
            let (_, stats) = batch::run_decode(
                &graph,
                entry,
                database.orders_path(&graph)?,
                &config,
                &options,
                out_dir,
            )?;
            stats.print_report();
        }
    }
    Ok(())
}
