//! JSON persistence for strategy tables, chunks and result records, and
//! the file names that tie them together.

use anyhow::{Context, Result, bail};
use mq_core::strategy::StrategyChunk;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const TABLE_SUFFIX: &str = "_StabilizerInformation.json";
const SAMPLED_SUFFIX: &str = "_StabilizerInformation_Sampled.json";

/// Matter-qubit counts for a range of measurement orders.
///
/// Parallel arrays: entry `i` of both belongs to the `i`-th evaluated
/// order. A `-1` in `matt` marks an order that failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub matt: Vec<i64>,
    pub loss: Vec<usize>,
}

impl ResultRecord {
    pub fn push(&mut self, matter: i64, loss: usize) {
        self.matt.push(matter);
        self.loss.push(loss);
    }

    pub fn len(&self) -> usize {
        self.matt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matt.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.matt.len() != self.loss.len() {
            bail!(
                "result record has {} matter counts but {} loss sizes",
                self.matt.len(),
                self.loss.len()
            );
        }
        Ok(())
    }
}

pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Malformed JSON in {}", path.display()))
}

pub fn load_results<P: AsRef<Path>>(path: P) -> Result<ResultRecord> {
    let record: ResultRecord = load_json(path)?;
    record.validate()?;
    Ok(record)
}

/// File-name stem for a graph description: anything other than ASCII
/// alphanumerics, `-` and `_` becomes `_`.
pub fn file_stem(graph: &str) -> String {
    graph
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

pub fn table_path(dir: &Path, graph: &str) -> PathBuf {
    dir.join(format!("{}{TABLE_SUFFIX}", file_stem(graph)))
}

pub fn sampled_table_path(dir: &Path, graph: &str) -> PathBuf {
    dir.join(format!("{}{SAMPLED_SUFFIX}", file_stem(graph)))
}

pub fn chunk_path(dir: &Path, graph: &str, idx_min: usize, idx_max: usize) -> PathBuf {
    dir.join(format!("{}_chunk_{idx_min}_{idx_max}.json", file_stem(graph)))
}

pub fn results_path(dir: &Path, graph: &str, idx_min: usize, idx_max: usize) -> PathBuf {
    dir.join(format!("{}_results_{idx_min}_{idx_max}.json", file_stem(graph)))
}

/// Chunk files for `graph` in `dir`, sorted by their lower index.
pub fn find_chunk_files(dir: &Path, graph: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_chunk_", file_stem(graph));
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(range) = name.strip_prefix(&prefix).and_then(|r| r.strip_suffix(".json")) else {
            continue;
        };
        let Some((lo, hi)) = range.split_once('_') else {
            continue;
        };
        if let (Ok(lo), Ok(_)) = (lo.parse::<usize>(), hi.parse::<usize>()) {
            found.push((lo, path));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

pub fn load_chunks(paths: &[PathBuf]) -> Result<Vec<StrategyChunk>> {
    paths.iter().map(|p| load_json(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_core::config::ErasureConfig;
    use mq_core::erasure::ErasureDecoder;
    use mq_core::graph::GraphState;
    use mq_core::strategy::StrategyTable;

    #[test]
    fn chunk_files_are_found_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        for (lo, hi) in [(10, 20), (0, 10), (20, 25)] {
            fs::write(chunk_path(dir.path(), "path 6", lo, hi), "{}").unwrap();
        }
        fs::write(dir.path().join("path_6_chunk_notes.json"), "{}").unwrap();
        fs::write(chunk_path(dir.path(), "other", 0, 5), "{}").unwrap();

        let found = find_chunk_files(dir.path(), "path 6").unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "path_6_chunk_0_10.json",
                "path_6_chunk_10_20.json",
                "path_6_chunk_20_25.json"
            ]
        );
    }

    #[test]
    fn strategy_tables_survive_storage() {
        let dir = tempfile::tempdir().unwrap();
        let table = ErasureDecoder::new(GraphState::linear(4), 2, 0, ErasureConfig::default())
            .unwrap()
            .run()
            .unwrap();
        let path = table_path(dir.path(), "path 4");
        save_json(&path, &table).unwrap();
        let back: StrategyTable = load_json(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn result_records_must_be_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        fs::write(&path, r#"{"matt": [1, -1], "loss": [2]}"#).unwrap();
        assert!(load_results(&path).is_err());

        let mut record = ResultRecord::default();
        record.push(2, 1);
        record.push(-1, 0);
        save_json(&path, &record).unwrap();
        assert_eq!(load_results(&path).unwrap(), record);
    }
}
