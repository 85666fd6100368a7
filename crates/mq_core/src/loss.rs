//! Loss patterns and their deterministic enumeration.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::ControlFlow;

/// Sorted set of lost qubit labels.
///
/// Ordered first by size, then lexicographically, which is the order in
/// which patterns are enumerated and indexed for chunking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LossPattern(Vec<usize>);

impl LossPattern {
    /// Builds a pattern, sorting and deduplicating the labels.
    pub fn new(mut lost: Vec<usize>) -> Self {
        lost.sort_unstable();
        lost.dedup();
        Self(lost)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, q: usize) -> bool {
        self.0.binary_search(&q).is_ok()
    }

    pub fn qubits(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for LossPattern {
    fn from(lost: Vec<usize>) -> Self {
        Self::new(lost)
    }
}

impl Ord for LossPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for LossPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LossPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{q}")?;
        }
        write!(f, ")")
    }
}

/// `n` choose `k`, saturating at `u64::MAX`.
pub fn binomial(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k) as u64;
    let n = n as u64;
    let mut acc: u64 = 1;
    for i in 0..k {
        // acc * (n - i) / (i + 1) stays integral at every step
        acc = match acc.checked_mul(n - i) {
            Some(v) => v / (i + 1),
            None => return u64::MAX,
        };
    }
    acc
}

/// Number of loss patterns of size `0..=distance` over `n_qubits - 1`
/// candidate qubits.
pub fn count_loss_patterns(n_qubits: usize, distance: usize) -> u64 {
    let candidates = n_qubits.saturating_sub(1);
    (0..=distance.min(candidates))
        .map(|k| binomial(candidates, k))
        .fold(0u64, u64::saturating_add)
}

/// Calls `f` with every `k`-subset of `items`, in lexicographic order of
/// positions.
pub fn for_each_combination<F>(items: &[usize], k: usize, mut f: F)
where
    F: FnMut(&[usize]),
{
    let _ = try_for_each_combination(items, k, |chosen| {
        f(chosen);
        ControlFlow::Continue(())
    });
}

/// Like [`for_each_combination`], stopping at the first `Break`.
///
/// Returns `Break` when `f` cut the walk short.
pub fn try_for_each_combination<F>(items: &[usize], k: usize, mut f: F) -> ControlFlow<()>
where
    F: FnMut(&[usize]) -> ControlFlow<()>,
{
    let n = items.len();
    if k > n {
        return ControlFlow::Continue(());
    }
    let mut idx: Vec<usize> = (0..k).collect();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    loop {
        chosen.clear();
        chosen.extend(idx.iter().map(|&i| items[i]));
        f(&chosen)?;

        // Advance the rightmost index that still has room.
        let Some(pos) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
            return ControlFlow::Continue(());
        };
        idx[pos] += 1;
        for j in pos + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// All subsets of the non-input qubits with size `0..=distance`.
///
/// The result is sorted by size, then lexicographically, so index `i` names
/// the same pattern on every run and chunk boundaries are stable.
pub fn enumerate_loss_patterns(n_qubits: usize, distance: usize, in_qubit: usize) -> Vec<LossPattern> {
    let candidates: Vec<usize> = (0..n_qubits).filter(|&q| q != in_qubit).collect();
    let mut patterns = Vec::new();
    for k in 0..=distance.min(candidates.len()) {
        for_each_combination(&candidates, k, |lost| {
            patterns.push(LossPattern(lost.to_vec()));
        });
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_are_ordered_by_size_then_lexicographically() {
        let patterns = enumerate_loss_patterns(4, 2, 0);
        let rendered: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            rendered,
            ["()", "(1)", "(2)", "(3)", "(1, 2)", "(1, 3)", "(2, 3)"]
        );
        assert!(patterns.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn input_qubit_is_never_lost() {
        let patterns = enumerate_loss_patterns(5, 4, 2);
        assert!(patterns.iter().all(|p| !p.contains(2)));
        assert_eq!(patterns.len() as u64, count_loss_patterns(5, 4));
        assert_eq!(patterns.len(), 16);
    }

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(5, 6), 0);
        assert_eq!(binomial(40, 20), 137_846_528_820);
    }

    #[test]
    fn distance_beyond_qubits_is_clamped() {
        assert_eq!(count_loss_patterns(3, 10), 4);
        assert_eq!(enumerate_loss_patterns(3, 10, 0).len(), 4);
    }

    #[test]
    fn combination_walk_stops_on_break() {
        let mut seen = Vec::new();
        let flow = try_for_each_combination(&[1, 2, 3, 4], 2, |c| {
            seen.push(c.to_vec());
            if seen.len() == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(flow.is_break());
        assert_eq!(seen, vec![vec![1, 2], vec![1, 3], vec![1, 4]]);
    }

    #[test]
    fn new_sorts_and_dedups() {
        let p = LossPattern::new(vec![4, 1, 4]);
        assert_eq!(p.qubits(), &[1, 4]);
    }
}
