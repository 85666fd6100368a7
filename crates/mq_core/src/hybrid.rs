//! Adaptive tree search that counts deferred measurements.
//!
//! Photons arrive in a fixed measurement order and each one is heralded as
//! either present or lost. The decoder walks that binary tree. On a present
//! qubit it must pick a basis immediately, unless it stores the qubit in a
//! matter qubit and postpones the choice. Picking a basis discards every
//! strategy that needed a different one, so a basis is only committed when
//! the surviving strategies still cover every loss the rest of the order can
//! throw at them. The number of stored qubits along a branch is the matter
//! cost of the loss pattern that branch realises.
//!
//! The tree for loss budget `k` evaluates every pattern of exactly `k`
//! losses; the decoder knows how many losses to guard against but not where
//! they fall. Per-pattern counts are therefore independent of the largest
//! budget explored, and the worst case over patterns grows monotonically
//! with it.

use crate::config::{DecoderConfig, FailurePolicy};
use crate::graph::GraphState;
use crate::loss::{LossPattern, for_each_combination};
use crate::strategy::Strategy;
use crate::{CoreError, CoreResult, Pauli};
use mq_common::defaults::{FAILED_MATTER_SENTINEL, INPUT_QUBIT};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Result of one root-to-leaf path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternOutcome {
    /// A strategy survived; `matter` qubits were used along the way, at most
    /// `peak_stored` of them at once.
    Decoded { matter: usize, peak_stored: usize },

    /// Every strategy needed a lost qubit or a discarded basis.
    Failed,
}

/// Receives each leaf of the search.
///
/// Implemented for a plain vector, which keeps every outcome, and for
/// [`Summary`], which keeps only what the report needs.
pub trait OutcomeSink {
    fn record(&mut self, pattern: LossPattern, outcome: PatternOutcome);
}

impl OutcomeSink for Vec<(LossPattern, PatternOutcome)> {
    fn record(&mut self, pattern: LossPattern, outcome: PatternOutcome) {
        self.push((pattern, outcome));
    }
}

/// Streaming aggregate of pattern outcomes.
#[derive(Clone, Debug, Default)]
pub struct Summary {
    max_matter: Option<usize>,
    worst: Vec<LossPattern>,
    failures: Vec<LossPattern>,
    decoded: usize,
    peak_stored: usize,
}

impl OutcomeSink for Summary {
    fn record(&mut self, pattern: LossPattern, outcome: PatternOutcome) {
        let PatternOutcome::Decoded {
            matter,
            peak_stored,
        } = outcome
        else {
            self.failures.push(pattern);
            return;
        };

        self.decoded += 1;
        self.peak_stored = self.peak_stored.max(peak_stored);
        match self.max_matter {
            Some(max) if matter < max => {}
            Some(max) if matter == max => {
                let size = self.worst.first().map_or(usize::MAX, LossPattern::len);
                if pattern.len() < size {
                    self.worst.clear();
                }
                if pattern.len() <= size {
                    self.worst.push(pattern);
                }
            }
            _ => {
                self.max_matter = Some(matter);
                self.worst.clear();
                self.worst.push(pattern);
            }
        }
    }
}

impl Summary {
    /// Applies the failure policy and produces the report.
    pub fn finish(mut self, policy: FailurePolicy) -> DecoderReport {
        self.worst.sort();
        self.failures.sort();
        DecoderReport {
            failed: policy == FailurePolicy::Fail && !self.failures.is_empty(),
            max_number_of_m_dec: self.max_matter,
            all_min_loss_patterns: self.worst,
            failures: self.failures,
            decoded: self.decoded,
            peak_stored: self.peak_stored,
        }
    }
}

/// Aggregated result of one decoder run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderReport {
    /// Worst-case matter qubits over decodable patterns; `None` if none was
    /// decodable.
    pub max_number_of_m_dec: Option<usize>,

    /// Patterns reaching the maximum, restricted to the smallest size among
    /// them.
    pub all_min_loss_patterns: Vec<LossPattern>,

    /// Undecodable patterns.
    pub failures: Vec<LossPattern>,

    pub decoded: usize,
    pub peak_stored: usize,

    /// Set when the failure policy turns any failure into a failed run.
    pub failed: bool,
}

impl DecoderReport {
    /// Matter count as stored in result records; the failure sentinel when
    /// the run failed or nothing decoded.
    pub fn matter_metric(&self) -> i64 {
        match self.max_number_of_m_dec {
            Some(m) if !self.failed => i64::try_from(m).unwrap_or(i64::MAX),
            _ => FAILED_MATTER_SENTINEL,
        }
    }

    /// Size of the patterns that drive the maximum (0 if there are none).
    pub fn loss_size(&self) -> usize {
        if self.failed {
            return 0;
        }
        self.all_min_loss_patterns.first().map_or(0, LossPattern::len)
    }
}

/// Checks that `order` lists every non-input qubit exactly once.
///
/// # Errors
///
/// `Configuration` naming the first offending entry.
pub fn validate_order(order: &[usize], num_qubits: usize, in_qubit: usize) -> CoreResult<()> {
    let expected = num_qubits.saturating_sub(1);
    if order.len() != expected {
        return Err(CoreError::Configuration(format!(
            "measurement order has {} entries, expected {expected}",
            order.len()
        )));
    }
    let mut seen = vec![false; num_qubits];
    for (pos, &q) in order.iter().enumerate() {
        if q >= num_qubits {
            return Err(CoreError::Configuration(format!(
                "order position {pos} names qubit {q}, graph has {num_qubits}"
            )));
        }
        if q == in_qubit {
            return Err(CoreError::Configuration(format!(
                "order position {pos} names the input qubit {q}"
            )));
        }
        if seen[q] {
            return Err(CoreError::Configuration(format!(
                "order position {pos} repeats qubit {q}"
            )));
        }
        seen[q] = true;
    }
    Ok(())
}

/// One node of the search tree, held on the explicit work stack.
#[derive(Clone, Debug)]
struct Frame {
    /// Next position in the measurement order.
    pos: usize,

    /// Indices of strategies still usable, in rank order.
    live: Vec<u32>,

    /// Order positions of qubits held in matter qubits.
    stored: Vec<usize>,

    /// Qubits heralded as lost so far.
    lost: Vec<usize>,

    matter: usize,
    peak_stored: usize,
}

impl Frame {
    fn root(num_strategies: u32) -> Self {
        Self {
            pos: 0,
            live: (0..num_strategies).collect(),
            stored: Vec::new(),
            lost: Vec::new(),
            matter: 0,
            peak_stored: 0,
        }
    }

    fn outcome(&self) -> PatternOutcome {
        if self.live.is_empty() {
            PatternOutcome::Failed
        } else {
            PatternOutcome::Decoded {
                matter: self.matter,
                peak_stored: self.peak_stored,
            }
        }
    }
}

/// Tree-search decoder for one measurement order.
///
/// Owns its graph and strategy list; a batch worker builds one per order
/// from its own clones.
#[derive(Clone, Debug)]
pub struct HybridDecoder {
    graph: GraphState,
    strategies: Vec<Strategy>,
    order: Vec<usize>,
    in_qubit: usize,
    max_loss: usize,
    config: DecoderConfig,

    /// Basis strategy `s` needs at order position `p`, stored at
    /// `s * order.len() + p`.
    needs: Vec<Pauli>,
}

impl HybridDecoder {
    /// Validates the inputs and prepares the basis table.
    ///
    /// `strategies` should be ranked best first; committed bases are tried
    /// in that order. With `config.max_loss` unset, budgets run up to the
    /// code distance.
    ///
    /// # Errors
    ///
    /// `Configuration` for a malformed order, strategies that do not fit
    /// the graph, or a loss budget beyond the number of code qubits. Nothing
    /// is searched before validation passes.
    pub fn new(
        graph: GraphState,
        strategies: Vec<Strategy>,
        order: Vec<usize>,
        distance: usize,
        config: DecoderConfig,
    ) -> CoreResult<Self> {
        let n = graph.num_qubits();
        if n == 0 {
            return Err(CoreError::Configuration("graph has no qubits".into()));
        }
        let in_qubit = strategies.first().map_or(INPUT_QUBIT, Strategy::input);
        if in_qubit >= n {
            return Err(CoreError::Configuration(format!(
                "input qubit {in_qubit} is not one of the {n} graph qubits"
            )));
        }
        if let Some(s) = strategies
            .iter()
            .find(|s| s.num_qubits() != n || s.input() != in_qubit)
        {
            return Err(CoreError::Configuration(format!(
                "strategy {s} does not fit {n} qubits with input {in_qubit}"
            )));
        }
        if u32::try_from(strategies.len()).is_err() {
            return Err(CoreError::Configuration(format!(
                "{} strategies exceed the supported count",
                strategies.len()
            )));
        }
        validate_order(&order, n, in_qubit)?;

        let code_qubits = n - 1;
        config.validate(code_qubits)?;
        let max_loss = config.max_loss.unwrap_or(distance.min(code_qubits));

        let needs = strategies
            .iter()
            .flat_map(|s| order.iter().map(move |&q| s.measurement(q)))
            .collect();

        Ok(Self {
            graph,
            strategies,
            order,
            in_qubit,
            max_loss,
            config,
            needs,
        })
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn in_qubit(&self) -> usize {
        self.in_qubit
    }

    pub fn max_loss(&self) -> usize {
        self.max_loss
    }

    /// Searches every budget and aggregates the outcomes.
    pub fn run(&self) -> DecoderReport {
        let mut summary = Summary::default();
        self.solve_into(&mut summary);
        let report = summary.finish(self.config.failure_policy);
        debug!(
            order = ?self.order,
            max_matter = ?report.max_number_of_m_dec,
            failures = report.failures.len(),
            "measurement order evaluated"
        );
        report
    }

    /// Every pattern with its outcome, in search order.
    pub fn outcomes(&self) -> Vec<(LossPattern, PatternOutcome)> {
        let mut out = Vec::new();
        self.solve_into(&mut out);
        out
    }

    /// Runs the search for budgets `0..=max_loss`, reporting each leaf.
    pub fn solve_into<S: OutcomeSink + ?Sized>(&self, sink: &mut S) {
        for budget in 0..=self.max_loss {
            let leaves = self.explore_budget(budget, sink);
            trace!(budget, leaves, "loss budget explored");
        }
    }

    fn explore_budget<S: OutcomeSink + ?Sized>(&self, budget: usize, sink: &mut S) -> usize {
        let len = self.order.len();
        // `new` bounds the strategy count by u32.
        let mut stack = vec![Frame::root(self.strategies.len() as u32)];
        let mut leaves = 0;

        while let Some(frame) = stack.pop() {
            let remaining = budget - frame.lost.len();
            if remaining > len - frame.pos {
                continue;
            }
            if remaining == 0 {
                // No further loss can occur, so the best live strategy is
                // measured as is and nothing more gets stored.
                let outcome = frame.outcome();
                sink.record(LossPattern::new(frame.lost), outcome);
                leaves += 1;
                continue;
            }
            if frame.live.len() <= 1 {
                leaves += self.enumerate_completions(&frame, remaining, sink);
                continue;
            }

            let pos = frame.pos;
            let mut lost = Frame {
                pos: pos + 1,
                live: self.survivors(&frame.live, pos),
                stored: frame.stored.clone(),
                lost: frame.lost.clone(),
                matter: frame.matter,
                peak_stored: frame.peak_stored,
            };
            lost.lost.push(self.order[pos]);
            self.release_agreed(&mut lost);

            stack.push(lost);
            stack.push(self.measure_present(frame, remaining));
        }

        leaves
    }

    /// Handles a qubit heralded as present.
    fn measure_present(&self, mut frame: Frame, remaining: usize) -> Frame {
        let pos = frame.pos;
        let mut bases: Vec<Pauli> = Vec::with_capacity(3);
        for &s in &frame.live {
            let p = self.need(s, pos);
            if !p.is_identity() && !bases.contains(&p) {
                bases.push(p);
            }
        }

        if bases.len() > 1 {
            let committed = bases.iter().find_map(|&basis| {
                let compatible: Vec<u32> = frame
                    .live
                    .iter()
                    .copied()
                    .filter(|&s| {
                        let p = self.need(s, pos);
                        p.is_identity() || p == basis
                    })
                    .collect();
                self.commit_is_safe(&compatible, &frame.live, pos + 1, remaining, 0)
                    .then_some(compatible)
            });

            match committed {
                Some(compatible) => {
                    if !self.config.no_anti_com_flag {
                        frame.live = compatible;
                    }
                }
                None => {
                    frame.stored.push(pos);
                    frame.matter += 1;
                    frame.peak_stored = frame.peak_stored.max(frame.stored.len());
                    trace!(qubit = self.order[pos], matter = frame.matter, "measurement deferred");
                }
            }
        }

        frame.pos += 1;
        self.release_agreed(&mut frame);
        frame
    }

    /// True when every way of losing exactly `budget` more qubits from
    /// positions `from..` that leaves a `live` strategy intact also leaves a
    /// `compatible` one intact.
    ///
    /// `placed` counts the losses the recursion has already put in `from..`.
    /// Picks the compatible strategy with the fewest remaining exposures;
    /// any loss set it does not avoid must hit one of them, so branching
    /// over that exposure enumerates every counterexample.
    fn commit_is_safe(
        &self,
        compatible: &[u32],
        live: &[u32],
        from: usize,
        budget: usize,
        placed: usize,
    ) -> bool {
        if live.is_empty() {
            return true;
        }
        if compatible.is_empty() {
            // A counterexample needs room for the rest of the losses on
            // qubits some live strategy ignores.
            return !live
                .iter()
                .any(|&s| self.unused(s, from) >= placed + budget);
        }
        if budget == 0 {
            return true;
        }

        let Some(best) = compatible
            .iter()
            .copied()
            .min_by_key(|&s| self.exposure(s, from).count())
        else {
            return false;
        };

        self.exposure(best, from).all(|p| {
            self.commit_is_safe(
                &self.survivors(compatible, p),
                &self.survivors(live, p),
                from,
                budget - 1,
                placed + 1,
            )
        })
    }

    /// Leaves of a subtree with at most one live strategy.
    ///
    /// No conflicts can arise any more, so each completion of the loss
    /// pattern keeps the current count and only the surviving strategy
    /// decides success.
    fn enumerate_completions<S: OutcomeSink + ?Sized>(
        &self,
        frame: &Frame,
        remaining: usize,
        sink: &mut S,
    ) -> usize {
        let rest: Vec<usize> = (frame.pos..self.order.len()).collect();
        let mut leaves = 0;
        for_each_combination(&rest, remaining, |chosen| {
            let survives = frame
                .live
                .first()
                .is_some_and(|&s| chosen.iter().all(|&p| self.need(s, p).is_identity()));
            let outcome = if survives {
                PatternOutcome::Decoded {
                    matter: frame.matter,
                    peak_stored: frame.peak_stored,
                }
            } else {
                PatternOutcome::Failed
            };

            let mut lost = frame.lost.clone();
            lost.extend(chosen.iter().map(|&p| self.order[p]));
            sink.record(LossPattern::new(lost), outcome);
            leaves += 1;
        });
        leaves
    }

    /// Measures and frees stored qubits on which all live strategies agree.
    fn release_agreed(&self, frame: &mut Frame) {
        let live = &frame.live;
        frame.stored.retain(|&pos| !self.single_basis(live, pos));
    }

    fn single_basis(&self, live: &[u32], pos: usize) -> bool {
        let mut basis = None;
        for &s in live {
            let p = self.need(s, pos);
            if p.is_identity() {
                continue;
            }
            match basis {
                None => basis = Some(p),
                Some(b) if b == p => {}
                Some(_) => return false,
            }
        }
        true
    }

    /// Strategies in `set` that do not use the qubit at `pos`.
    fn survivors(&self, set: &[u32], pos: usize) -> Vec<u32> {
        set.iter()
            .copied()
            .filter(|&s| self.need(s, pos).is_identity())
            .collect()
    }

    fn exposure(&self, s: u32, from: usize) -> impl Iterator<Item = usize> + '_ {
        (from..self.order.len()).filter(move |&p| !self.need(s, p).is_identity())
    }

    /// Positions in `from..` where `s` needs nothing.
    fn unused(&self, s: u32, from: usize) -> usize {
        (from..self.order.len())
            .filter(|&p| self.need(s, p).is_identity())
            .count()
    }

    #[inline(always)]
    fn need(&self, s: u32, pos: usize) -> Pauli {
        self.needs[s as usize * self.order.len() + pos]
    }
}
