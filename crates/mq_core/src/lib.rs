//! Core algorithms for counting the matter qubits a graph-state code needs.
//!
//! This crate provides binary linear algebra, the graph-state stabilizer
//! model, derivation of loss-tolerant recovery strategies (the erasure
//! decoder), and the adaptive tree search that decides, qubit by qubit,
//! whether a measurement can happen immediately or must be deferred into a
//! matter qubit (the hybrid decoder). Everything here is pure computation;
//! file formats and process orchestration live in `mq_io` and `mq_host`.

use thiserror::Error;

pub use mq_common::pauli::Pauli;

/// Configuration for strategy derivation and adaptive decoding.
///
/// Both configurations are plain serde values passed explicitly to the
/// decoders, so independent workers never share mutable toggles.
pub mod config;

/// Strategy derivation for every loss pattern up to the code distance.
///
/// Builds the restricted parity-check system per loss pattern, solves it
/// over GF(2) and enumerates the admissible logical operators. Supports
/// evaluating a sub-range of loss patterns so large graphs can be split
/// into independent chunks.
pub mod erasure;

/// Binary (GF(2)) matrices and Gaussian elimination.
///
/// Row reduction, rank, null-space bases and linear solves used by the
/// strategy derivation. Rows are packed bit vectors, so row additions are
/// word-wise XORs.
pub mod gf2;

/// Graph-state representation and its stabilizer generators.
///
/// Holds the qubit graph and derives the X and Z parity-check matrices of
/// the stabilizer group. The matrices are cached until the graph mutates.
pub mod graph;

/// Adaptive tree-search decoder that counts deferred measurements.
///
/// Walks a fixed measurement order, branching on whether each qubit
/// arrives or is lost, and decides per arrival whether its basis is already
/// safe to commit or must be stored in a matter qubit.
pub mod hybrid;

/// Loss patterns and their deterministic enumeration.
pub mod loss;

/// Merging of strategy chunks into a single strategy table.
///
/// Provides the exhaustive merge (every unique strategy) and the sampled
/// merge (one of the lightest strategies per loss pattern, seeded).
pub mod merge;

/// Multi-qubit Pauli operators in symplectic form.
pub mod pauli;

/// Strategies, their ranking policies and strategy tables.
pub mod strategy;

/// Error types returned by the core algorithms.
///
/// Structural problems with the inputs are reported here and abort the
/// single evaluation that hit them. Loss patterns that cannot be decoded are
/// not errors; they surface as data in decoder reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The graph description is malformed.
    ///
    /// Raised for edges that reference unknown nodes, self-loops, duplicate
    /// edges or nodes, and node labels that are not `0..n`. No partially
    /// built graph is ever returned.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A matrix or vector has non-binary entries or mismatched shapes.
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// A Pauli string could not be parsed or has the wrong length.
    #[error("invalid Pauli string: {0}")]
    InvalidPauli(String),

    /// A measurement order or decoder setting is out of range.
    ///
    /// Detected before any search step executes.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Strategy chunks describe different graphs or distances.
    #[error("inconsistent chunks: {0}")]
    InconsistentChunks(String),
}

/// Convenience alias for results produced by this crate.
pub type CoreResult<T> = Result<T, CoreError>;
