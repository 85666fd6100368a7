//! Graph-state representation for loss-tolerant encodings.
//!
//! Implements the graph whose vertices are qubits and whose edges are the
//! controlled-phase links that prepared the state. The stabilizer group of
//! a graph state is generated by one operator per vertex, `X` on the vertex
//! and `Z` on each of its neighbours, so both parity-check matrices follow
//! directly from the adjacency matrix.

use crate::gf2::{Gf2Matrix, Gf2Row, zero_row};
use crate::{CoreError, CoreResult};
use std::sync::OnceLock;

/// Graph state over qubits labelled `0..n`.
///
/// Stores both a flat edge list (for iteration and persistence) and packed
/// adjacency rows (for stabilizer derivation). The parity-check matrices are
/// derived lazily and cached; every mutation drops the cache so the next
/// request recomputes them.
///
/// Cloning performs a deep copy, including the cache. Workers that evaluate
/// measurement orders in parallel each hold their own clone.
#[derive(Clone, Debug)]
pub struct GraphState {
    /// Number of qubits; labels run from 0 to `num_nodes - 1`.
    num_nodes: usize,

    /// Flat list of edges as `(u, v)` pairs with `u < v`.
    ///
    /// Stored as `u32` pairs to halve the footprint against `usize` pairs on
    /// 64-bit hosts; graph codes of interest stay far below that limit.
    edges: Vec<(u32, u32)>,

    /// Symmetric adjacency matrix, one packed row per qubit.
    adjacency: Vec<Gf2Row>,

    /// Cached `(H_X, H_Z)` pair.
    ///
    /// `OnceLock` keeps the graph `Sync`, so a read-only graph can still be
    /// shared by reference before each worker takes its own copy.
    stabilizers: OnceLock<(Gf2Matrix, Gf2Matrix)>,
}

impl GraphState {
    /// Builds a graph state from explicit node and edge lists.
    ///
    /// The node list must contain each label of `0..n` exactly once, in any
    /// order. Edges are undirected; `(u, v)` and `(v, u)` are the same edge.
    ///
    /// # Arguments
    ///
    /// * `nodes` - Qubit labels
    /// * `edges` - Entangling links between labels
    ///
    /// # Errors
    ///
    /// `InvalidGraph` for duplicate or non-contiguous node labels, edges that
    /// reference unknown nodes, self-loops, and duplicate edges.
    pub fn from_nodes_and_edges(nodes: &[usize], edges: &[(usize, usize)]) -> CoreResult<Self> {
        let n = nodes.len();
        let mut seen = vec![false; n];
        for &node in nodes {
            if node >= n {
                return Err(CoreError::InvalidGraph(format!(
                    "node {node} is outside the label range 0..{n}"
                )));
            }
            if seen[node] {
                return Err(CoreError::InvalidGraph(format!("duplicate node {node}")));
            }
            seen[node] = true;
        }

        let mut graph = Self::empty(n);
        for &(u, v) in edges {
            graph.add_edge(u, v)?;
        }
        Ok(graph)
    }

    /// Graph on `n` qubits without edges.
    pub fn empty(n: usize) -> Self {
        Self {
            num_nodes: n,
            edges: Vec::new(),
            adjacency: (0..n).map(|_| zero_row(n)).collect(),
            stabilizers: OnceLock::new(),
        }
    }

    /// Path `0 - 1 - ... - (n-1)`.
    pub fn linear(n: usize) -> Self {
        let mut graph = Self::empty(n);
        for u in 1..n {
            graph.link(u - 1, u);
        }
        graph
    }

    /// Star with qubit 0 at the centre.
    pub fn star(n: usize) -> Self {
        let mut graph = Self::empty(n);
        for u in 1..n {
            graph.link(0, u);
        }
        graph
    }

    /// Number of qubits, input included. Labels are `0..num_qubits()`.
    pub fn num_qubits(&self) -> usize {
        self.num_nodes
    }

    /// Edge list as `(u, v)` with `u < v`, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().map(|&(u, v)| (u as usize, v as usize))
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        u < self.num_nodes && v < self.num_nodes && self.adjacency[u][v]
    }

    /// Neighbours of `q`, ascending.
    ///
    /// # Arguments
    ///
    /// * `q` - A qubit label below `num_qubits()`; larger labels panic.
    pub fn neighbors(&self, q: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[q].iter_ones()
    }

    /// Number of neighbours of `q`.
    pub fn degree(&self, q: usize) -> usize {
        self.adjacency[q].count_ones()
    }

    /// Adds an undirected edge and drops the cached matrices.
    ///
    /// # Errors
    ///
    /// `InvalidGraph` if either endpoint is unknown, the edge is a
    /// self-loop, or the edge already exists.
    pub fn add_edge(&mut self, u: usize, v: usize) -> CoreResult<()> {
        self.check_endpoints(u, v)?;
        if self.adjacency[u][v] {
            return Err(CoreError::InvalidGraph(format!("duplicate edge ({u}, {v})")));
        }
        self.link(u, v);
        Ok(())
    }

    /// Removes an existing edge and drops the cached matrices.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> CoreResult<()> {
        self.check_endpoints(u, v)?;
        if !self.adjacency[u][v] {
            return Err(CoreError::InvalidGraph(format!("no edge ({u}, {v}) to remove")));
        }
        self.adjacency[u].set(v, false);
        self.adjacency[v].set(u, false);
        let key = (u.min(v) as u32, u.max(v) as u32);
        self.edges.retain(|&e| e != key);
        self.stabilizers.take();
        Ok(())
    }

    /// Local complementation at `v`: toggles every edge between two
    /// neighbours of `v`.
    ///
    /// The result is locally equivalent to the original state, so loss
    /// tolerance is unchanged while the strategy weights may differ.
    pub fn local_complement(&mut self, v: usize) -> CoreResult<()> {
        if v >= self.num_nodes {
            return Err(CoreError::InvalidGraph(format!(
                "node {v} is outside the label range 0..{}",
                self.num_nodes
            )));
        }
        let hood: Vec<usize> = self.neighbors(v).collect();
        for (i, &a) in hood.iter().enumerate() {
            for &b in &hood[i + 1..] {
                let linked = self.adjacency[a][b];
                self.adjacency[a].set(b, !linked);
                self.adjacency[b].set(a, !linked);
            }
        }

        self.edges.clear();
        for u in 0..self.num_nodes {
            for w in self.adjacency[u].iter_ones().filter(|&w| w > u) {
                self.edges.push((u as u32, w as u32));
            }
        }
        self.stabilizers.take();
        Ok(())
    }

    /// Returns the X and Z parity-check matrices of the stabilizer group.
    ///
    /// Row `i` is the generator attached to qubit `i`; column `q` is qubit
    /// `q`. `H_X` is the identity and `H_Z` the adjacency matrix. Computed on
    /// first use and cached until the graph mutates.
    pub fn stabilizer_matrices(&self) -> (&Gf2Matrix, &Gf2Matrix) {
        let (h_x, h_z) = self.stabilizers.get_or_init(|| {
            let h_x = Gf2Matrix::identity(self.num_nodes);
            let mut h_z = Gf2Matrix::zeros(self.num_nodes, self.num_nodes);
            for &(u, v) in &self.edges {
                h_z.set(u as usize, v as usize, true);
                h_z.set(v as usize, u as usize, true);
            }
            (h_x, h_z)
        });
        (h_x, h_z)
    }

    fn check_endpoints(&self, u: usize, v: usize) -> CoreResult<()> {
        if u >= self.num_nodes || v >= self.num_nodes {
            return Err(CoreError::InvalidGraph(format!(
                "edge ({u}, {v}) references a node outside 0..{}",
                self.num_nodes
            )));
        }
        if u == v {
            return Err(CoreError::InvalidGraph(format!("self-loop on node {u}")));
        }
        Ok(())
    }

    fn link(&mut self, u: usize, v: usize) {
        self.adjacency[u].set(v, true);
        self.adjacency[v].set(u, true);
        self.edges.push((u.min(v) as u32, u.max(v) as u32));
        self.stabilizers.take();
    }
}

/// Swaps two labels throughout an edge list.
///
/// Catalogued graphs place the input qubit last; swapping it with node 0
/// puts the logical component first in every strategy string.
pub fn interchange_nodes(a: usize, b: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let swap = |q: usize| {
        if q == a {
            b
        } else if q == b {
            a
        } else {
            q
        }
    };
    edges.iter().map(|&(u, v)| (swap(u), swap(v))).collect()
}
