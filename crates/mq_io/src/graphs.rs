//! Graph database: catalogued graphs keyed by description.

use crate::parser::parse_edge_list;
use anyhow::{Context, Result, bail};
use mq_core::graph::{GraphState, interchange_nodes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Edge list as stored in the catalogue.
///
/// Either a JSON array of pairs or the Python literal the catalogue was
/// first written with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeSpec {
    Pairs(Vec<(usize, usize)>),
    Text(String),
}

impl EdgeSpec {
    pub fn edges(&self) -> Result<Vec<(usize, usize)>> {
        match self {
            EdgeSpec::Pairs(pairs) => Ok(pairs.clone()),
            EdgeSpec::Text(text) => parse_edge_list(text),
        }
    }
}

/// One catalogued graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub graph_edges: EdgeSpec,

    /// Highest node label; this node is the input qubit before relabelling.
    pub last_node: usize,

    pub distance: usize,

    /// Measurement-order CSV, relative to the database file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl GraphEntry {
    pub fn num_qubits(&self) -> usize {
        self.last_node + 1
    }

    /// Builds the graph with the input node relabelled to 0.
    pub fn build_graph(&self) -> Result<GraphState> {
        let edges = interchange_nodes(self.last_node, 0, &self.graph_edges.edges()?);
        let nodes: Vec<usize> = (0..self.num_qubits()).collect();
        Ok(GraphState::from_nodes_and_edges(&nodes, &edges)?)
    }
}

/// Catalogue of graphs loaded from one JSON file.
#[derive(Clone, Debug, Default)]
pub struct GraphDatabase {
    root: PathBuf,
    entries: BTreeMap<String, GraphEntry>,
}

impl GraphDatabase {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph database {}", path.display()))?;
        let entries: BTreeMap<String, GraphEntry> = serde_json::from_str(&text)
            .with_context(|| format!("Malformed graph database {}", path.display()))?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { root, entries })
    }

    pub fn get(&self, name: &str) -> Result<&GraphEntry> {
        match self.entries.get(name) {
            Some(entry) => Ok(entry),
            None => bail!(
                "graph {name:?} is not in the database (known: {})",
                self.names().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Path of the measurement-order CSV for `name`, if the entry has one.
    pub fn orders_path(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self.get(name)?.filename.as_ref().map(|f| self.root.join(f)))
    }
}
