//! Strategy derivation for every loss pattern up to the code distance.
//!
//! A product of stabilizer generators is selected by a vector
//! `a ∈ GF(2)^n`; its X register is `H_Xᵀ a` and its Z register `H_Zᵀ a`.
//! For a loss pattern `L` and logical target `(t_x, t_z)` the admissible
//! selections satisfy
//!
//! ```text
//! (H_Xᵀ a)_ℓ = 0, (H_Zᵀ a)_ℓ = 0   for every lost qubit ℓ
//! (H_Xᵀ a)_in = t_x, (H_Zᵀ a)_in = t_z
//! ```
//!
//! which is one linear system over GF(2). Its solution set is a coset
//! `p + span(kernel)`; every element is a strategy.
//!
//! Small cosets are walked whole. Larger ones are searched by increasing
//! X support: for a graph state `H_X = I`, so a selection `a` puts X on
//! exactly the qubits it selects and a strategy of weight `w` selects at
//! most `w` code qubits. Once every selection of size `s` has been tried,
//! every strategy of weight `s` or less has been seen.

use crate::config::{ErasureConfig, LogicalTarget};
use crate::gf2::{Gf2Matrix, Gf2Row, xor_into, zero_row};
use crate::graph::GraphState;
use crate::loss::{LossPattern, enumerate_loss_patterns, try_for_each_combination};
use crate::merge::merge_chunks;
use crate::pauli::PauliString;
use crate::strategy::{PatternStrategies, Strategy, StrategyChunk, StrategyTable};
use crate::{CoreError, CoreResult};
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// Derives ranked strategies for the loss patterns of one graph.
///
/// The decoder owns its graph copy and the enumerated loss patterns, so a
/// chunk worker can be built from a shared description without touching
/// anyone else's state.
#[derive(Clone, Debug)]
pub struct ErasureDecoder {
    graph: GraphState,
    distance: usize,
    in_qubit: usize,
    config: ErasureConfig,

    /// X and Z parity checks transposed: row `q` lists the generators that
    /// act with X (resp. Z) on qubit `q`.
    hx_t: Gf2Matrix,
    hz_t: Gf2Matrix,

    patterns: Vec<LossPattern>,
}

impl ErasureDecoder {
    /// # Errors
    ///
    /// `Configuration` if the input qubit is not part of the graph or the
    /// settings are invalid.
    pub fn new(
        graph: GraphState,
        distance: usize,
        in_qubit: usize,
        config: ErasureConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        let n = graph.num_qubits();
        if in_qubit >= n {
            return Err(CoreError::Configuration(format!(
                "input qubit {in_qubit} is not one of the {n} graph qubits"
            )));
        }

        let (h_x, h_z) = graph.stabilizer_matrices();
        let hx_t = h_x.transpose();
        let hz_t = h_z.transpose();
        let patterns = enumerate_loss_patterns(n, distance, in_qubit);

        Ok(Self {
            graph,
            distance,
            in_qubit,
            config,
            hx_t,
            hz_t,
            patterns,
        })
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    pub fn distance(&self) -> usize {
        self.distance
    }

    pub fn in_qubit(&self) -> usize {
        self.in_qubit
    }

    pub fn config(&self) -> &ErasureConfig {
        &self.config
    }

    /// All loss patterns of size `0..=distance`, in index order.
    pub fn loss_patterns(&self) -> &[LossPattern] {
        &self.patterns
    }

    /// Strategies that survive `pattern`, ranked.
    ///
    /// Each logical target contributes its lightest
    /// `max_strategies_per_target` strategies. Returns `(false, [])` when no
    /// target can be reconstructed; that is an outcome, not an error.
    pub fn run_specific_loss_pattern(
        &self,
        pattern: &LossPattern,
    ) -> CoreResult<(bool, Vec<Strategy>)> {
        let n = self.graph.num_qubits();
        if let Some(&q) = pattern.qubits().iter().find(|&&q| q >= n || q == self.in_qubit) {
            return Err(CoreError::Configuration(format!(
                "loss pattern {pattern} names qubit {q}, which cannot be lost"
            )));
        }

        let mut found = Vec::new();
        for &target in &self.config.targets {
            found.extend(self.strategies_for_target(pattern, target)?);
        }

        let mut seen = HashSet::new();
        found.retain(|s| seen.insert(s.clone()));
        self.config.ranking.rank(&mut found);

        debug!(pattern = %pattern, strategies = found.len(), "derived strategies");
        Ok((!found.is_empty(), found))
    }

    /// Evaluates the loss patterns with index in `[idx_min, idx_max)`.
    ///
    /// The range is clamped to the number of patterns, so an oversized last
    /// chunk is fine.
    ///
    /// # Arguments
    ///
    /// * `idx_min` - First pattern index, inclusive.
    /// * `idx_max` - Last pattern index, exclusive.
    ///
    /// # Returns
    ///
    /// A chunk holding the decodable patterns with their strategies and the
    /// undecodable ones in `failed`.
    pub fn compute_chunk(&self, idx_min: usize, idx_max: usize) -> CoreResult<StrategyChunk> {
        let total = self.patterns.len();
        let hi = idx_max.min(total);
        let lo = idx_min.min(hi);

        let mut patterns = Vec::with_capacity(hi - lo);
        let mut failed = Vec::new();
        for index in lo..hi {
            let loss = &self.patterns[index];
            let (decodable, strategies) = self.run_specific_loss_pattern(loss)?;
            if decodable {
                patterns.push(PatternStrategies {
                    index,
                    loss: loss.clone(),
                    strategies,
                });
            } else {
                debug!(index, pattern = %loss, "undecodable loss pattern");
                failed.push(loss.clone());
            }
        }

        info!(
            idx_min = lo,
            idx_max = hi,
            decodable = patterns.len(),
            failed = failed.len(),
            "strategy chunk complete"
        );

        Ok(StrategyChunk {
            idx_min: lo,
            idx_max: hi,
            n_loss_patterns_total: total,
            n_qbts: self.graph.num_qubits(),
            distance: self.distance,
            in_qbt: self.in_qubit,
            patterns,
            failed,
        })
    }

    /// Full strategy table over every loss pattern.
    pub fn run(&self) -> CoreResult<StrategyTable> {
        let chunk = self.compute_chunk(0, self.patterns.len())?;
        Ok(merge_chunks(vec![chunk], self.config.ranking)?.table)
    }

    fn strategies_for_target(
        &self,
        pattern: &LossPattern,
        target: LogicalTarget,
    ) -> CoreResult<Vec<Strategy>> {
        let generators = self.hx_t.num_cols();
        let mut rows: Vec<Gf2Row> = Vec::with_capacity(2 * pattern.len() + 2);
        let mut rhs: Vec<bool> = Vec::with_capacity(rows.capacity());

        for &lost in pattern.qubits() {
            rows.push(self.hx_t.row(lost).clone());
            rhs.push(false);
            rows.push(self.hz_t.row(lost).clone());
            rhs.push(false);
        }
        let logical = target.pauli();
        rows.push(self.hx_t.row(self.in_qubit).clone());
        rhs.push(logical.x());
        rows.push(self.hz_t.row(self.in_qubit).clone());
        rhs.push(logical.z());

        let system = Gf2Matrix::from_bit_rows(rows, generators)?;
        let rhs: Gf2Row = rhs.into_iter().collect();
        let Some(particular) = system.solve(&rhs)? else {
            return Ok(Vec::new());
        };

        let kernel_dim = generators - system.rank();
        let coset_size = u32::try_from(kernel_dim)
            .ok()
            .and_then(|k| 1usize.checked_shl(k))
            .unwrap_or(usize::MAX);

        let mut found = if coset_size <= self.config.max_candidates_per_target {
            self.whole_coset(particular, &system.nullspace())?
        } else {
            self.lightest_in_coset(pattern, target, coset_size)?
        };
        self.config.ranking.rank(&mut found);
        found.truncate(self.config.max_strategies_per_target);
        Ok(found)
    }

    fn whole_coset(&self, particular: Gf2Row, kernel: &[Gf2Row]) -> CoreResult<Vec<Strategy>> {
        let size = 1usize << kernel.len();
        let mut found = Vec::with_capacity(size);

        // Gray-code walk: step `i` flips the kernel vector at the lowest set
        // bit of `i`, so each candidate costs one row XOR.
        let mut selection = particular;
        for i in 0..size {
            if i > 0 {
                let flip = i.trailing_zeros() as usize;
                xor_into(&mut selection, &kernel[flip]);
            }
            found.push(Strategy::new(
                self.in_qubit,
                self.operator_from_selection(&selection)?,
            )?);
        }
        Ok(found)
    }

    /// Searches selections by the number of code qubits they select.
    ///
    /// Stops once the lightest `max_strategies_per_target` are known for
    /// sure, once the whole coset has turned up, or after
    /// `max_candidates_per_target` selections.
    fn lightest_in_coset(
        &self,
        pattern: &LossPattern,
        target: LogicalTarget,
        coset_size: usize,
    ) -> CoreResult<Vec<Strategy>> {
        let n = self.graph.num_qubits();
        let logical = target.pauli();
        let keep = self.config.max_strategies_per_target;
        let limit = self.config.max_candidates_per_target;
        let free: Vec<usize> = (0..n)
            .filter(|&q| q != self.in_qubit && !pattern.contains(q))
            .collect();

        let mut found: Vec<Strategy> = Vec::new();
        let mut examined = 0usize;
        let mut selection = zero_row(n);
        let mut failure = None;

        for size in 0..=free.len() {
            if found.len() >= coset_size || lightest_are_settled(&found, keep, size) {
                return Ok(found);
            }
            let flow = try_for_each_combination(&free, size, |chosen| {
                if examined == limit {
                    return ControlFlow::Break(());
                }
                examined += 1;

                selection.fill(false);
                selection.set(self.in_qubit, logical.x());
                for &q in chosen {
                    selection.set(q, true);
                }
                let operator = match self.operator_from_selection(&selection) {
                    Ok(op) => op,
                    Err(e) => {
                        failure = Some(e);
                        return ControlFlow::Break(());
                    }
                };
                let admissible = operator.get(self.in_qubit) == logical
                    && pattern.qubits().iter().all(|&q| operator.get(q).is_identity());
                if admissible {
                    match Strategy::new(self.in_qubit, operator) {
                        Ok(s) => found.push(s),
                        Err(e) => {
                            failure = Some(e);
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            });
            if let Some(e) = failure.take() {
                return Err(e);
            }
            if flow.is_break() {
                warn!(
                    pattern = %pattern,
                    target = ?target,
                    examined,
                    found = found.len(),
                    selection_size = size,
                    "strategy search truncated"
                );
                return Ok(found);
            }
        }
        Ok(found)
    }

    fn operator_from_selection(&self, selection: &Gf2Row) -> CoreResult<PauliString> {
        let x = self.hx_t.mul_vec(selection)?;
        let z = self.hz_t.mul_vec(selection)?;
        PauliString::from_parts(x, z)
    }
}

/// Given that `found` holds every strategy lighter than `size`, true when
/// the `keep` lightest strategies overall are already in it.
fn lightest_are_settled(found: &[Strategy], keep: usize, size: usize) -> bool {
    if found.len() < keep {
        return false;
    }
    let mut weights: Vec<usize> = found.iter().map(Strategy::weight).collect();
    let (_, &mut kth, _) = weights.select_nth_unstable(keep - 1);
    kth < size
}
