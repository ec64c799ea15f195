//! Thermal RC network in its assembly form.
//!
//! Every node carries an optional fixed temperature, a heat capacity, an
//! injected heat flow and a convection conductance to the reference
//! temperature. Resistances are kept once per unordered node pair, on the
//! lower-numbered node.

use std::collections::BTreeMap;

/// A node of a [`ThermalNetwork`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalNode {
    /// Fixed temperature, `None` when the temperature is an unknown.
    pub t: Option<f64>,
    /// Heat capacity (J/K).
    pub c: f64,
    /// Injected heat flow (W); negative values extract heat.
    pub hf: f64,
    /// Convection conductance to the reference temperature (W/K).
    pub htc: f64,
    /// Resistances (K/W) to higher-numbered neighbors.
    neighbors: BTreeMap<usize, f64>,
}

/// A single resistive edge with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    /// Resistance (K/W).
    pub r: f64,
}

/// A map-based thermal network that supports incremental stamping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalNetwork {
    nodes: Vec<ThermalNode>,
}

impl ThermalNetwork {
    /// Create a network of `size` unconnected nodes.
    pub fn new(size: usize) -> Self {
        Self {
            nodes: vec![ThermalNode::default(); size],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node and return its index.
    pub fn append_node(&mut self, t: Option<f64>) -> usize {
        self.nodes.push(ThermalNode {
            t,
            ..ThermalNode::default()
        });
        self.nodes.len() - 1
    }

    pub fn node(&self, index: usize) -> &ThermalNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[ThermalNode] {
        &self.nodes
    }

    pub fn set_t(&mut self, node: usize, t: f64) {
        self.nodes[node].t = Some(t);
    }

    pub fn clear_t(&mut self, node: usize) {
        self.nodes[node].t = None;
    }

    pub fn t(&self, node: usize) -> Option<f64> {
        self.nodes[node].t
    }

    pub fn set_c(&mut self, node: usize, c: f64) {
        self.nodes[node].c = c;
    }

    pub fn add_c(&mut self, node: usize, c: f64) {
        self.nodes[node].c += c;
    }

    pub fn c(&self, node: usize) -> f64 {
        self.nodes[node].c
    }

    pub fn set_hf(&mut self, node: usize, hf: f64) {
        self.nodes[node].hf = hf;
    }

    pub fn add_hf(&mut self, node: usize, hf: f64) {
        self.nodes[node].hf += hf;
    }

    pub fn hf(&self, node: usize) -> f64 {
        self.nodes[node].hf
    }

    pub fn set_htc(&mut self, node: usize, htc: f64) {
        self.nodes[node].htc = htc;
    }

    pub fn add_htc(&mut self, node: usize, htc: f64) {
        self.nodes[node].htc += htc;
    }

    pub fn htc(&self, node: usize) -> f64 {
        self.nodes[node].htc
    }

    /// Connect `a` and `b` through resistance `r`.
    ///
    /// A second resistance on the same pair is combined in parallel. Self
    /// links are ignored.
    pub fn set_r(&mut self, a: usize, b: usize, r: f64) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        assert!(
            hi < self.nodes.len(),
            "node {hi} out of range for network of {} nodes",
            self.nodes.len()
        );
        self.nodes[lo]
            .neighbors
            .entry(hi)
            .and_modify(|existing| *existing = *existing * r / (*existing + r))
            .or_insert(r);
    }

    /// Resistance between `a` and `b`, if connected.
    pub fn r(&self, a: usize, b: usize) -> Option<f64> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.nodes.get(lo)?.neighbors.get(&hi).copied()
    }

    /// All edges, ordered by `(a, b)`.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes.iter().enumerate().flat_map(|(a, node)| {
            node.neighbors.iter().map(move |(&b, &r)| Edge { a, b, r })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum()
    }

    /// Whether node `i` drives an input column of the descriptor system.
    pub fn is_source(&self, node: usize, include_bonds: bool) -> bool {
        let n = &self.nodes[node];
        n.hf != 0.0 || (include_bonds && n.htc != 0.0)
    }

    /// Number of input ports: nodes with heat flow, plus nodes with
    /// convection when `include_bonds` is set.
    pub fn source_count(&self, include_bonds: bool) -> usize {
        (0..self.nodes.len())
            .filter(|&i| self.is_source(i, include_bonds))
            .count()
    }

    pub fn fixed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.t.is_some()).count()
    }

    /// Sum of all injected heat flows.
    pub fn total_hf(&self) -> f64 {
        self.nodes.iter().map(|n| n.hf).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_combination_is_symmetric() {
        let (r1, r2) = (2.0, 3.0);
        let expected = 1.0 / (1.0 / r1 + 1.0 / r2);

        let mut net = ThermalNetwork::new(3);
        net.set_r(0, 2, r1);
        net.set_r(0, 2, r2);
        assert!((net.r(0, 2).unwrap() - expected).abs() < 1e-12);

        let mut net = ThermalNetwork::new(3);
        net.set_r(0, 2, r1);
        net.set_r(2, 0, r2);
        assert!((net.r(2, 0).unwrap() - expected).abs() < 1e-12);
        assert_eq!(net.edge_count(), 1);
    }

    #[test]
    fn test_set_versus_add() {
        let mut net = ThermalNetwork::new(1);
        net.set_hf(0, 1.0);
        net.add_hf(0, 2.0);
        assert_eq!(net.hf(0), 3.0);
        net.set_hf(0, -1.0);
        assert_eq!(net.hf(0), -1.0);

        net.add_htc(0, 0.5);
        net.add_htc(0, 0.5);
        assert_eq!(net.htc(0), 1.0);
        net.add_c(0, 2.0);
        net.set_c(0, 4.0);
        assert_eq!(net.c(0), 4.0);
    }

    #[test]
    fn test_self_link_ignored() {
        let mut net = ThermalNetwork::new(2);
        net.set_r(1, 1, 5.0);
        assert_eq!(net.edge_count(), 0);
        assert_eq!(net.r(1, 1), None);
    }

    #[test]
    fn test_sources_and_append() {
        let mut net = ThermalNetwork::new(3);
        net.set_hf(0, 1.0);
        net.set_htc(2, 4.0);
        assert_eq!(net.source_count(false), 1);
        assert_eq!(net.source_count(true), 2);

        let extra = net.append_node(Some(25.0));
        assert_eq!(extra, 3);
        assert_eq!(net.t(3), Some(25.0));
        assert_eq!(net.fixed_count(), 1);
    }

    #[test]
    fn test_edges_ordered() {
        let mut net = ThermalNetwork::new(4);
        net.set_r(3, 1, 1.0);
        net.set_r(0, 2, 2.0);
        net.set_r(1, 0, 3.0);
        let edges: Vec<(usize, usize)> = net.edges().map(|e| (e.a, e.b)).collect();
        assert_eq!(edges, vec![(0, 1), (0, 2), (1, 3)]);
    }
}
