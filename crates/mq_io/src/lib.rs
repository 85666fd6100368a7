//! File formats for graph catalogues, measurement orders, strategy tables
//! and result records.
//!
//! Everything that touches the filesystem lives here so the core crate
//! stays pure computation. Errors are `anyhow` values carrying the offending
//! path or row as context.

/// Graph database: catalogued graphs keyed by description.
///
/// Each entry gives the edge list, the label of the input node before
/// relabelling, the code distance and, optionally, the CSV of precomputed
/// measurement orders. Building a graph swaps the input node with node 0.
pub mod graphs;

/// Measurement-order CSV files.
///
/// Reads and writes the `Index,Permutation,MatterQubits` table and selects
/// the half-open row ranges that batch jobs work on.
pub mod loader;

/// Text parsers for bracketed index lists and edge lists.
pub mod parser;

/// JSON persistence of strategy tables, chunks and result records, plus
/// the file-naming scheme shared by the host subcommands.
pub mod store;
