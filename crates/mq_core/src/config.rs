//! Settings for strategy derivation and the adaptive decoder.
//!
//! Both are serde values with defaults for every field, so a partial JSON
//! file only overrides what it names.

use crate::{CoreError, CoreResult, Pauli};
use serde::{Deserialize, Serialize};

/// Logical operator a strategy reconstructs on the input qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalTarget {
    X,
    Y,
    Z,
}

impl LogicalTarget {
    pub fn pauli(self) -> Pauli {
        match self {
            LogicalTarget::X => Pauli::X,
            LogicalTarget::Y => Pauli::Y,
            LogicalTarget::Z => Pauli::Z,
        }
    }
}

/// Tie-break applied among strategies of equal weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingPolicy {
    /// Prefer strategies whose last non-identity measurement is `Z`.
    #[default]
    ZTail,
    /// Prefer strategies with more `Z` measurements.
    ZCount,
    /// Weight only; ties fall through to the text rendering.
    WeightOnly,
}

/// What a decoder report does with undecodable loss patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Leave failed patterns out of the maximum and list them separately.
    #[default]
    Exclude,
    /// Any failed pattern marks the whole report as failed.
    Fail,
}

/// Settings for strategy derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErasureConfig {
    /// Logical operators to reconstruct per loss pattern.
    pub targets: Vec<LogicalTarget>,

    pub ranking: RankingPolicy,

    /// Upper bound on selections examined per target and pattern.
    ///
    /// A coset of `2^k` elements within this bound is enumerated whole.
    /// Larger cosets are searched by increasing weight, and the search logs
    /// a warning if it reaches the bound before the lightest strategies are
    /// settled.
    pub max_candidates_per_target: usize,

    /// Strategies kept per logical target and loss pattern after ranking.
    pub max_strategies_per_target: usize,
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self {
            targets: vec![LogicalTarget::X, LogicalTarget::Z],
            ranking: RankingPolicy::ZTail,
            max_candidates_per_target: 1 << 16,
            max_strategies_per_target: 64,
        }
    }
}

impl ErasureConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.targets.is_empty() {
            return Err(CoreError::Configuration(
                "at least one logical target is required".into(),
            ));
        }
        let mut sorted = self.targets.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != self.targets.len() {
            return Err(CoreError::Configuration(format!(
                "logical targets repeat: {:?}",
                self.targets
            )));
        }
        if self.max_candidates_per_target == 0 || self.max_strategies_per_target == 0 {
            return Err(CoreError::Configuration(
                "candidate and strategy limits must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the adaptive tree-search decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest loss budget explored; `None` uses the code distance.
    pub max_loss: Option<usize>,

    /// Keep anticommuting strategies alive after a basis is committed.
    pub no_anti_com_flag: bool,

    pub failure_policy: FailurePolicy,
}

impl DecoderConfig {
    /// Checks the settings against a code with `code_qubits` non-input
    /// qubits.
    pub fn validate(&self, code_qubits: usize) -> CoreResult<()> {
        if let Some(max_loss) = self.max_loss
            && max_loss > code_qubits
        {
            return Err(CoreError::Configuration(format!(
                "max_loss {max_loss} exceeds the {code_qubits} code qubits"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ErasureConfig::default().validate().is_ok());
        assert!(DecoderConfig::default().validate(0).is_ok());
    }

    #[test]
    fn rejects_bad_erasure_settings() {
        let mut cfg = ErasureConfig::default();
        cfg.targets = vec![LogicalTarget::X, LogicalTarget::X];
        assert!(cfg.validate().is_err());
        cfg.targets.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_oversized_loss_budget() {
        let cfg = DecoderConfig {
            max_loss: Some(6),
            ..DecoderConfig::default()
        };
        assert!(matches!(cfg.validate(5), Err(CoreError::Configuration(_))));
        assert!(cfg.validate(6).is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ErasureConfig = serde_json::from_str(r#"{"ranking":"ZCount"}"#).unwrap();
        assert_eq!(cfg.ranking, RankingPolicy::ZCount);
        assert_eq!(cfg.targets, ErasureConfig::default().targets);
    }
}
