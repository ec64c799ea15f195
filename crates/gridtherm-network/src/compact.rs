//! Flattened, read-only network for traversal and coefficient extraction.
//!
//! Adjacency is stored CSR style: the neighbors of node `i` are
//! `adjacency[offsets[i]..offsets[i + 1]]`, sorted by node index, and every
//! edge appears once in each direction. Temperature-fixed nodes are
//! excluded from the unknown numbering, so "matrix index" below means the
//! position among unknown nodes.

use std::collections::VecDeque;

use nalgebra_sparse::{CooMatrix, CscMatrix};
use rayon::prelude::*;

use crate::network::ThermalNetwork;

/// One off-diagonal coefficient in matrix indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixEntry {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompactNetwork {
    t: Vec<Option<f64>>,
    c: Vec<f64>,
    hf: Vec<f64>,
    htc: Vec<f64>,
    offsets: Vec<usize>,
    adjacency: Vec<usize>,
    resistances: Vec<f64>,
    /// matrix index -> node index
    unknowns: Vec<usize>,
    /// node index -> matrix index
    matrix_index: Vec<Option<usize>>,
}

impl From<&ThermalNetwork> for CompactNetwork {
    fn from(network: &ThermalNetwork) -> Self {
        let n = network.len();
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for e in network.edges() {
            rows[e.a].push((e.b, e.r));
            rows[e.b].push((e.a, e.r));
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut adjacency = Vec::with_capacity(2 * network.edge_count());
        let mut resistances = Vec::with_capacity(2 * network.edge_count());
        offsets.push(0);
        for mut row in rows {
            row.sort_by_key(|&(j, _)| j);
            for (j, r) in row {
                adjacency.push(j);
                resistances.push(r);
            }
            offsets.push(adjacency.len());
        }

        let nodes = network.nodes();
        let mut unknowns = Vec::new();
        let mut matrix_index = vec![None; n];
        for (i, node) in nodes.iter().enumerate() {
            if node.t.is_none() {
                matrix_index[i] = Some(unknowns.len());
                unknowns.push(i);
            }
        }

        Self {
            t: nodes.iter().map(|n| n.t).collect(),
            c: nodes.iter().map(|n| n.c).collect(),
            hf: nodes.iter().map(|n| n.hf).collect(),
            htc: nodes.iter().map(|n| n.htc).collect(),
            offsets,
            adjacency,
            resistances,
            unknowns,
            matrix_index,
        }
    }
}

impl From<ThermalNetwork> for CompactNetwork {
    fn from(network: ThermalNetwork) -> Self {
        Self::from(&network)
    }
}

impl ThermalNetwork {
    /// Flatten into the traversal form.
    pub fn freeze(&self) -> CompactNetwork {
        CompactNetwork::from(self)
    }
}

impl CompactNetwork {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn t(&self, node: usize) -> Option<f64> {
        self.t[node]
    }

    pub fn c(&self, node: usize) -> f64 {
        self.c[node]
    }

    pub fn hf(&self, node: usize) -> f64 {
        self.hf[node]
    }

    pub fn htc(&self, node: usize) -> f64 {
        self.htc[node]
    }

    /// `(neighbor, resistance)` pairs of `node` in neighbor order.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.offsets[node]..self.offsets[node + 1];
        self.adjacency[span.clone()]
            .iter()
            .copied()
            .zip(self.resistances[span].iter().copied())
    }

    pub fn degree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    /// Node indices of the unknowns, in matrix order.
    pub fn unknown_nodes(&self) -> &[usize] {
        &self.unknowns
    }

    pub fn matrix_size(&self) -> usize {
        self.unknowns.len()
    }

    pub fn matrix_index(&self, node: usize) -> Option<usize> {
        self.matrix_index[node]
    }

    /// Sum of incident conductances plus convection of `node`.
    pub fn diag_coeff(&self, node: usize) -> f64 {
        self.neighbors(node).map(|(_, r)| 1.0 / r).sum::<f64>() + self.htc[node]
    }

    /// Off-diagonal coefficient `-1/r` between two nodes, zero if they are
    /// not adjacent.
    pub fn coeff(&self, row: usize, col: usize) -> f64 {
        let span = self.offsets[row]..self.offsets[row + 1];
        match self.adjacency[span.clone()].binary_search(&col) {
            Ok(pos) => -1.0 / self.resistances[span.start + pos],
            Err(_) => 0.0,
        }
    }

    /// Right-hand side of `node`: heat flow, convection from `ref_t` and
    /// the flow from fixed-temperature neighbors.
    pub fn rhs(&self, node: usize, ref_t: f64) -> f64 {
        let fixed: f64 = self
            .neighbors(node)
            .filter_map(|(j, r)| self.t[j].map(|t| t / r))
            .sum();
        self.hf[node] + self.htc[node] * ref_t + fixed
    }

    /// Diagonal coefficients of every unknown, computed serially.
    pub fn diag_coeffs(&self) -> Vec<f64> {
        self.unknowns.iter().map(|&n| self.diag_coeff(n)).collect()
    }

    /// Diagonal coefficients of every unknown, with `[0, N)` split into
    /// `blocks` contiguous ranges processed in parallel.
    pub fn diag_coeffs_parallel(&self, blocks: usize) -> Vec<f64> {
        let size = self.unknowns.len();
        let mut out = vec![0.0; size];
        if size == 0 {
            return out;
        }
        let chunk = size.div_ceil(blocks.max(1));
        out.par_chunks_mut(chunk)
            .zip(self.unknowns.par_chunks(chunk))
            .for_each(|(dst, nodes)| {
                for (d, &n) in dst.iter_mut().zip(nodes) {
                    *d = self.diag_coeff(n);
                }
            });
        out
    }

    /// Off-diagonal coefficients between unknowns in breadth-first order.
    ///
    /// Every connected component is visited, starting from its lowest
    /// matrix index. Each unknown-unknown edge is reported once per
    /// direction.
    pub fn coeffs_bfs(&self) -> Vec<MatrixEntry> {
        let size = self.unknowns.len();
        let mut entries = Vec::new();
        let mut mark = vec![false; size];
        let mut queue = VecDeque::new();

        for start in 0..size {
            if mark[start] {
                continue;
            }
            mark[start] = true;
            queue.push_back(start);
            while let Some(mv) = queue.pop_front() {
                let nv = self.unknowns[mv];
                for (nw, r) in self.neighbors(nv) {
                    let Some(mw) = self.matrix_index[nw] else {
                        continue;
                    };
                    entries.push(MatrixEntry {
                        row: mv,
                        col: mw,
                        value: -1.0 / r,
                    });
                    if !mark[mw] {
                        mark[mw] = true;
                        queue.push_back(mw);
                    }
                }
            }
        }
        entries
    }

    /// Steady-state system over the unknowns: conductance matrix with
    /// fixed-temperature nodes eliminated, and the matching right-hand side.
    pub fn unknown_system(&self, ref_t: f64) -> (CscMatrix<f64>, Vec<f64>) {
        let size = self.unknowns.len();
        let mut coo = CooMatrix::new(size, size);
        for (m, d) in self.diag_coeffs().into_iter().enumerate() {
            coo.push(m, m, d);
        }
        for e in self.coeffs_bfs() {
            coo.push(e.row, e.col, e.value);
        }
        let rhs = self.unknowns.iter().map(|&n| self.rhs(n, ref_t)).collect();
        (CscMatrix::from(&coo), rhs)
    }

    /// Expand a solution over the unknowns to every node, filling in the
    /// fixed temperatures.
    pub fn expand_solution(&self, unknowns: &[f64]) -> Vec<f64> {
        self.t
            .iter()
            .zip(&self.matrix_index)
            .map(|(t, m)| match (t, m) {
                (Some(t), _) => *t,
                (None, Some(m)) => unknowns.get(*m).copied().unwrap_or(f64::NAN),
                (None, None) => f64::NAN,
            })
            .collect()
    }
}
