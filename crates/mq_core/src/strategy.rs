//! Recovery strategies and the tables that collect them.
//!
//! A strategy is one logical Pauli operator expressed through the code:
//! an element of the stabilizer group whose component on the input qubit
//! is the logical Pauli it reads out and whose components on the code
//! qubits are the single-qubit measurements that reconstruct it.

use crate::config::{LogicalTarget, RankingPolicy};
use crate::loss::LossPattern;
use crate::pauli::PauliString;
use crate::{CoreError, CoreResult, Pauli};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// A logical operator together with the measurements that reveal it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StrategyRepr")]
pub struct Strategy {
    /// Label of the input (logical) qubit.
    input: usize,

    /// Full operator, input component included.
    operator: PauliString,
}

impl Strategy {
    /// Wraps an operator, checking that it acts non-trivially on the input.
    ///
    /// # Errors
    ///
    /// `InvalidPauli` if `input` is out of range or the operator is the
    /// identity there.
    pub fn new(input: usize, operator: PauliString) -> CoreResult<Self> {
        if input >= operator.len() {
            return Err(CoreError::InvalidPauli(format!(
                "input qubit {input} outside an operator on {} qubits",
                operator.len()
            )));
        }
        if operator.get(input).is_identity() {
            return Err(CoreError::InvalidPauli(format!(
                "operator {operator} is the identity on input qubit {input}"
            )));
        }
        Ok(Self { input, operator })
    }

    /// Parses the text form, e.g. `"XZIZ"` with the input at position 0.
    pub fn parse(input: usize, text: &str) -> CoreResult<Self> {
        Self::new(input, text.parse()?)
    }

    pub fn input(&self) -> usize {
        self.input
    }

    pub fn operator(&self) -> &PauliString {
        &self.operator
    }

    pub fn num_qubits(&self) -> usize {
        self.operator.len()
    }

    /// Logical Pauli this strategy reconstructs.
    pub fn logical(&self) -> LogicalTarget {
        match self.operator.get(self.input) {
            Pauli::X => LogicalTarget::X,
            Pauli::Y => LogicalTarget::Y,
            // `new` rejects the identity on the input.
            _ => LogicalTarget::Z,
        }
    }

    /// Basis this strategy needs on qubit `q`; `I` when it ignores `q`.
    #[inline(always)]
    pub fn measurement(&self, q: usize) -> Pauli {
        self.operator.get(q)
    }

    /// Code qubits the strategy measures, ascending.
    pub fn measured_qubits(&self) -> impl Iterator<Item = usize> + '_ {
        let input = self.input;
        self.operator.support().filter(move |&q| q != input)
    }

    pub fn weight(&self) -> usize {
        self.measured_qubits().count()
    }

    /// Basis on the highest-labelled measured qubit.
    pub fn tail(&self) -> Option<Pauli> {
        self.measured_qubits().last().map(|q| self.operator.get(q))
    }

    pub fn z_count(&self) -> usize {
        self.measured_qubits()
            .filter(|&q| self.operator.get(q) == Pauli::Z)
            .count()
    }

    /// True when the strategy needs none of the lost qubits.
    pub fn covers(&self, pattern: &LossPattern) -> bool {
        pattern
            .qubits()
            .iter()
            .all(|&q| q < self.operator.len() && self.operator.get(q).is_identity())
    }
}

/// Stored form of a [`Strategy`], checked by [`Strategy::new`] on load.
#[derive(Deserialize)]
struct StrategyRepr {
    input: usize,
    operator: PauliString,
}

impl TryFrom<StrategyRepr> for Strategy {
    type Error = CoreError;

    fn try_from(repr: StrategyRepr) -> CoreResult<Self> {
        Strategy::new(repr.input, repr.operator)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operator)
    }
}

impl RankingPolicy {
    /// Total order used to rank strategies: weight, then the policy's
    /// preference, then the text rendering.
    pub fn compare(self, a: &Strategy, b: &Strategy) -> Ordering {
        a.weight()
            .cmp(&b.weight())
            .then_with(|| match self {
                RankingPolicy::ZTail => {
                    let a_z = a.tail() == Some(Pauli::Z);
                    let b_z = b.tail() == Some(Pauli::Z);
                    b_z.cmp(&a_z)
                }
                RankingPolicy::ZCount => b.z_count().cmp(&a.z_count()),
                RankingPolicy::WeightOnly => Ordering::Equal,
            })
            .then_with(|| a.operator.to_string().cmp(&b.operator.to_string()))
    }

    pub fn rank(self, strategies: &mut [Strategy]) {
        strategies.sort_by(|a, b| self.compare(a, b));
    }
}

/// Deduplicated union of several strategy lists, ranked.
pub fn ordered_union<'a, I>(lists: I, ranking: RankingPolicy) -> Vec<Strategy>
where
    I: IntoIterator<Item = &'a [Strategy]>,
{
    let mut seen = HashSet::new();
    let mut union = Vec::new();
    for list in lists {
        for s in list {
            if seen.insert(s.clone()) {
                union.push(s.clone());
            }
        }
    }
    ranking.rank(&mut union);
    union
}

/// Strategies found for one loss pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStrategies {
    /// Position of the pattern in the global enumeration.
    pub index: usize,
    pub loss: LossPattern,
    pub strategies: Vec<Strategy>,
}

/// Full strategy table for a graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTable {
    pub n_qbts: usize,
    pub distance: usize,
    pub in_qbt: usize,

    /// Per-pattern strategies for every decodable pattern, by index.
    pub patterns: Vec<PatternStrategies>,

    /// Deduplicated union of all per-pattern strategies, ranked.
    ///
    /// This is the list handed to the tree-search decoder, which only learns
    /// the loss pattern one qubit at a time.
    pub strategies_ordered: Vec<Strategy>,

    pub undecodable: Vec<LossPattern>,
}

impl StrategyTable {
    /// Checks that every strategy fits the graph the table claims.
    pub fn validate(&self) -> CoreResult<()> {
        let all = self
            .patterns
            .iter()
            .flat_map(|p| p.strategies.iter())
            .chain(self.strategies_ordered.iter());
        for s in all {
            if s.num_qubits() != self.n_qbts || s.input() != self.in_qbt {
                return Err(CoreError::Configuration(format!(
                    "strategy {s} (input {}) does not fit {} qubits with input {}",
                    s.input(),
                    self.n_qbts,
                    self.in_qbt
                )));
            }
        }
        Ok(())
    }
}

/// Strategies for the loss patterns `[idx_min, idx_max)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyChunk {
    pub idx_min: usize,
    pub idx_max: usize,
    pub n_loss_patterns_total: usize,
    pub n_qbts: usize,
    pub distance: usize,
    pub in_qbt: usize,
    pub patterns: Vec<PatternStrategies>,

    /// Patterns in range for which no strategy exists.
    pub failed: Vec<LossPattern>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Strategy {
        Strategy::parse(0, text).unwrap()
    }

    #[test]
    fn rejects_identity_on_input() {
        assert!(Strategy::parse(0, "IZZ").is_err());
        assert!(Strategy::parse(3, "XZZ").is_err());
    }

    #[test]
    fn loading_checks_the_input_component() {
        let ok: Strategy = serde_json::from_str(r#"{"input":0,"operator":"XZI"}"#).unwrap();
        assert_eq!(ok, s("XZI"));
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"input":0,"operator":"XZI"}"#);

        let bad = serde_json::from_str::<Strategy>(r#"{"input":0,"operator":"IZX"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn weight_and_tail_ignore_input() {
        let a = s("ZXIZ");
        assert_eq!(a.logical(), LogicalTarget::Z);
        assert_eq!(a.weight(), 2);
        assert_eq!(a.tail(), Some(Pauli::Z));
        assert_eq!(s("XIII").tail(), None);
    }

    #[test]
    fn covers_checks_lost_positions() {
        let a = s("XZIZ");
        assert!(a.covers(&LossPattern::new(vec![2])));
        assert!(!a.covers(&LossPattern::new(vec![1, 2])));
        assert!(a.covers(&LossPattern::empty()));
    }

    #[test]
    fn ranking_policies() {
        let x_tail = s("XXX");
        let z_tail = s("XZZ");
        let heavy = s("ZZZ");

        let mut list = vec![x_tail.clone(), z_tail.clone()];
        RankingPolicy::ZTail.rank(&mut list);
        assert_eq!(list, vec![z_tail.clone(), x_tail.clone()]);

        RankingPolicy::WeightOnly.rank(&mut list);
        assert_eq!(list, vec![x_tail.clone(), z_tail.clone()]);

        let mut list = vec![s("XXX"), heavy.clone(), s("XZI")];
        RankingPolicy::ZCount.rank(&mut list);
        assert_eq!(list[0].to_string(), "XZI");
        assert_eq!(list[1], heavy);
    }

    #[test]
    fn union_dedups_and_ranks() {
        let a = vec![s("XZI"), s("XXZ")];
        let b = vec![s("XZI"), s("ZIZ")];
        let union = ordered_union([a.as_slice(), b.as_slice()], RankingPolicy::ZTail);
        let text: Vec<String> = union.iter().map(ToString::to_string).collect();
        assert_eq!(text, ["XZI", "ZIZ", "XXZ"]);
    }
}
