//! Modified Nodal Analysis assembly of a thermal network.
//!
//! Produces the descriptor system
//!
//! ```text
//! C dT/dt = -G T + B u
//!       y = L^T T
//! ```
//!
//! with one row per network node. Temperature-fixed nodes are kept as
//! ordinary rows; eliminating them is up to the solver (see
//! [`CompactNetwork::unknown_system`](crate::compact::CompactNetwork::unknown_system)).

use std::collections::BTreeSet;

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{Error, Result};
use crate::network::ThermalNetwork;

/// Sparse descriptor matrices of a thermal network.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    /// Diagonal heat capacity matrix (n x n).
    pub c: CscMatrix<f64>,
    /// Symmetric conductance matrix (n x n).
    pub g: CscMatrix<f64>,
    /// Input selector (n x ports).
    pub b: CscMatrix<f64>,
    /// Output selector (n x outputs).
    pub l: CscMatrix<f64>,
    /// Node driving each column of `b`.
    pub sources: Vec<usize>,
    /// Node observed by each column of `l`.
    pub probes: Vec<usize>,
}

impl MnaSystem {
    /// Number of state variables.
    pub fn size(&self) -> usize {
        self.g.nrows()
    }

    pub fn port_count(&self) -> usize {
        self.sources.len()
    }

    pub fn output_count(&self) -> usize {
        self.probes.len()
    }
}

/// Stamp a conductance between two nodes into a triplet buffer.
///
/// `None` stands for the reference temperature, so a one-sided stamp only
/// touches the diagonal.
#[inline]
pub fn stamp_conductance_triplets(
    triplets: &mut Vec<(usize, usize, f64)>,
    node_a: Option<usize>,
    node_b: Option<usize>,
    conductance: f64,
) {
    match (node_a, node_b) {
        (Some(i), Some(j)) => {
            triplets.push((i, i, conductance));
            triplets.push((j, j, conductance));
            triplets.push((i, j, -conductance));
            triplets.push((j, i, -conductance));
        }
        (Some(i), None) | (None, Some(i)) => triplets.push((i, i, conductance)),
        (None, None) => {}
    }
}

fn to_csc(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(rows, cols);
    for &(i, j, v) in triplets {
        coo.push(i, j, v);
    }
    CscMatrix::from(&coo)
}

fn selector(rows: usize, nodes: &[usize]) -> CscMatrix<f64> {
    let triplets: Vec<_> = nodes.iter().enumerate().map(|(col, &n)| (n, col, 1.0)).collect();
    to_csc(rows, nodes.len(), &triplets)
}

/// Assemble `(C, G, B, L)` from `network`.
///
/// `B` gets one column per node with non-zero heat flow, or non-zero
/// convection as well when `include_bonds` is set, in node order. `L` is
/// the identity unless `probes` selects a subset of nodes; its columns
/// then follow ascending node index.
pub fn make_mna(
    network: &ThermalNetwork,
    include_bonds: bool,
    probes: Option<&BTreeSet<usize>>,
) -> Result<MnaSystem> {
    let n = network.len();

    let mut g_triplets = Vec::with_capacity(4 * network.edge_count() + n);
    for e in network.edges() {
        stamp_conductance_triplets(&mut g_triplets, Some(e.a), Some(e.b), 1.0 / e.r);
    }
    let mut c_triplets = Vec::with_capacity(n);
    for (i, node) in network.nodes().iter().enumerate() {
        if node.htc != 0.0 {
            stamp_conductance_triplets(&mut g_triplets, Some(i), None, node.htc);
        }
        if node.c != 0.0 {
            c_triplets.push((i, i, node.c));
        }
    }

    let sources: Vec<usize> = (0..n).filter(|&i| network.is_source(i, include_bonds)).collect();
    let probes: Vec<usize> = match probes {
        Some(set) => {
            if let Some(&bad) = set.iter().find(|&&p| p >= n) {
                return Err(Error::NodeOutOfRange { node: bad, size: n });
            }
            set.iter().copied().collect()
        }
        None => (0..n).collect(),
    };

    Ok(MnaSystem {
        c: to_csc(n, n, &c_triplets),
        g: to_csc(n, n, &g_triplets),
        b: selector(n, &sources),
        l: selector(n, &probes),
        sources,
        probes,
    })
}

/// Excitation vector, one entry per `B` column: `hf + htc * ref_t`.
pub fn make_rhs(network: &ThermalNetwork, include_bonds: bool, ref_t: f64) -> DVector<f64> {
    let values: Vec<f64> = network
        .nodes()
        .iter()
        .enumerate()
        .filter(|&(i, _)| network.is_source(i, include_bonds))
        .map(|(_, node)| node.hf + node.htc * ref_t)
        .collect();
    DVector::from_vec(values)
}

/// Per-node excitation `hf + htc * ref_t`.
pub fn make_full_rhs(network: &ThermalNetwork, ref_t: f64) -> DVector<f64> {
    DVector::from_iterator(
        network.len(),
        network.nodes().iter().map(|node| node.hf + node.htc * ref_t),
    )
}

/// Per-node convection excitation `htc * ref_t`, for systems assembled
/// without bond ports.
pub fn make_bonds_rhs(network: &ThermalNetwork, ref_t: f64) -> DVector<f64> {
    DVector::from_iterator(
        network.len(),
        network.nodes().iter().map(|node| node.htc * ref_t),
    )
}
