//! Run configuration shared by every subcommand.

use anyhow::{Context, Result};
use mq_core::config::{DecoderConfig, ErasureConfig};
use mq_io::store::load_json;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Strategy-derivation and decoder settings, loadable from JSON.
///
/// Missing sections and fields take their defaults, so an empty object is a
/// valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub erasure: ErasureConfig,
    pub decoder: DecoderConfig,
}

impl RunConfig {
    /// Reads `path` if given, otherwise returns the defaults.
    ///
    /// Decoder settings depend on the graph's size and are checked when a
    /// graph is decoded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: RunConfig = match path {
            Some(path) => load_json(path)
                .with_context(|| format!("Failed to load run configuration {}", path.display()))?,
            None => RunConfig::default(),
        };
        config.erasure.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_core::config::{FailurePolicy, RankingPolicy};
    use std::fs;

    #[test]
    fn missing_file_means_defaults() {
        assert_eq!(RunConfig::load(None).unwrap(), RunConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{"erasure": {"ranking": "WeightOnly"}, "decoder": {"failure_policy": "Fail"}}"#,
        )
        .unwrap();
        let config = RunConfig::load(Some(&path)).unwrap();
        assert_eq!(config.erasure.ranking, RankingPolicy::WeightOnly);
        assert_eq!(config.decoder.failure_policy, FailurePolicy::Fail);
        assert!(!config.decoder.no_anti_com_flag);
    }

    #[test]
    fn invalid_erasure_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"erasure": {"targets": []}}"#).unwrap();
        assert!(RunConfig::load(Some(&path)).is_err());
    }
}
