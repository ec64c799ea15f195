//! Discretization of a grid thermal model into a thermal network.
//!
//! Every grid cell becomes one node, numbered as in
//! [`GridThermalModel::flatten_index`]. Neighboring cells are joined by the
//! series resistance of their two half cells, each half using its own
//! composite conductivity:
//!
//! ```text
//! R = (l1 / k1 + l2 / k2) / A
//! ```
//!
//! where `l` is half the cell length along the link and `A` the shared
//! face area. Composite properties mix the conducting and dielectric
//! materials of a layer by the cell's metal fraction.

use std::fmt;

use gridtherm_core::{
    BcType, BoundaryCondition, Face, GridThermalModel, Material, MaterialLibrary, PowerModel,
};
use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::network::ThermalNetwork;

/// Builder configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Compute per-node stencils with rayon once the model has at least
    /// this many nodes.
    pub min_nodes_for_parallel: usize,
    /// Apply block boundary conditions on top of full-face ones.
    pub include_block_bc: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            min_nodes_for_parallel: 4096,
            include_block_bc: true,
        }
    }
}

impl BuildConfig {
    /// Always compute stencils serially.
    pub fn serial() -> Self {
        Self {
            min_nodes_for_parallel: usize::MAX,
            ..Default::default()
        }
    }

    pub fn with_min_nodes_for_parallel(mut self, n: usize) -> Self {
        self.min_nodes_for_parallel = n;
        self
    }

    pub fn with_block_bc(mut self, include: bool) -> Self {
        self.include_block_bc = include;
        self
    }
}

/// Diagnostics of one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildSummary {
    pub total_nodes: usize,
    /// Nodes with a fixed temperature.
    pub fixed_temperature_nodes: usize,
    /// Nodes with a positive convection conductance.
    pub boundary_nodes: usize,
    /// Sum of all positive heat flows applied (W).
    pub inbound_heat_flow: f64,
    /// Magnitude of the sum of all negative heat flows applied (W).
    pub outbound_heat_flow: f64,
}

impl BuildSummary {
    fn record_heat_flow(&mut self, value: f64) {
        if value > 0.0 {
            self.inbound_heat_flow += value;
        } else {
            self.outbound_heat_flow -= value;
        }
    }

    /// Net heat injected into the network.
    pub fn net_heat_flow(&self) -> f64 {
        self.inbound_heat_flow - self.outbound_heat_flow
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes: {}, fixed: {}, boundary: {}, heat in: {:.6} W, heat out: {:.6} W",
            self.total_nodes,
            self.fixed_temperature_nodes,
            self.boundary_nodes,
            self.inbound_heat_flow,
            self.outbound_heat_flow
        )
    }
}

/// Resolved per-layer data.
struct LayerProps<'m> {
    thickness: f64,
    conducting: &'m Material,
    dielectric: &'m Material,
}

/// Forward links and capacitance of one node.
#[derive(Debug, Clone, Default)]
struct NodeStencil {
    c: f64,
    links: [Option<(usize, f64)>; 3],
}

/// Builds a [`ThermalNetwork`] from a [`GridThermalModel`].
///
/// The builder holds no state between calls; `build` may be invoked
/// repeatedly with updated temperature guesses.
pub struct GridThermalNetworkBuilder<'a> {
    model: &'a GridThermalModel,
    materials: &'a MaterialLibrary,
    config: BuildConfig,
}

impl<'a> GridThermalNetworkBuilder<'a> {
    pub fn new(model: &'a GridThermalModel, materials: &'a MaterialLibrary) -> Self {
        Self {
            model,
            materials,
            config: BuildConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(&self) -> &GridThermalModel {
        self.model
    }

    /// Whether the network depends on the temperature guess, either through
    /// the model's tables or through temperature dependent materials.
    pub fn needs_iteration(&self) -> bool {
        if self.model.need_iteration() {
            return true;
        }
        self.model.layers().iter().any(|l| {
            [l.conducting_material(), l.dielectric_material()]
                .into_iter()
                .filter_map(|id| self.materials.get(id))
                .any(Material::is_temperature_dependent)
        })
    }

    /// Build the network for the per-node temperature guess `t_guess`.
    pub fn build(&self, t_guess: &[f64]) -> Result<(ThermalNetwork, BuildSummary)> {
        let model = self.model;
        let (nx, ny, nz) = model.model_size();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(Error::EmptyModel);
        }
        let total = model.total_grids();
        if t_guess.len() != total {
            return Err(Error::TemperatureSize {
                expected: total,
                actual: t_guess.len(),
            });
        }
        let (rx, ry) = model.resolution(true);
        if !(rx > 0.0 && ry > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "grid resolution must be positive, got {rx} x {ry}"
            )));
        }
        let layers = self.layer_props()?;

        let mut network = ThermalNetwork::new(total);
        let mut summary = BuildSummary {
            total_nodes: total,
            ..Default::default()
        };

        let parallel = total >= self.config.min_nodes_for_parallel;
        debug!(
            "building {}x{}x{} network ({} nodes, parallel: {})",
            nx, ny, nz, total, parallel
        );

        // composite conductivity per node
        let kernel = |i: usize| self.composite_k(&layers, t_guess, i);
        let k: Vec<[f64; 3]> = if parallel {
            (0..total).into_par_iter().map(kernel).collect()
        } else {
            (0..total).map(kernel).collect()
        };

        let kernel = |i: usize| self.stencil(&layers, &k, i);
        let stencils: Vec<NodeStencil> = if parallel {
            (0..total).into_par_iter().map(kernel).collect()
        } else {
            (0..total).map(kernel).collect()
        };

        let mut skipped = 0usize;
        for (i, s) in stencils.iter().enumerate() {
            network.set_c(i, s.c);
            for &(j, r) in s.links.iter().flatten() {
                if r.is_finite() && r > 0.0 {
                    network.set_r(i, j, r);
                } else {
                    skipped += 1;
                }
            }
        }
        debug!(
            "stamped {} resistances ({} degenerate links skipped)",
            network.edge_count(),
            skipped
        );

        self.apply_power(t_guess, &mut network, &mut summary);
        self.apply_jumps(&layers, t_guess, &mut network);
        self.apply_boundaries(t_guess, &mut network, &mut summary);

        summary.fixed_temperature_nodes = network.fixed_count();
        summary.boundary_nodes = network.nodes().iter().filter(|n| n.htc > 0.0).count();
        info!("thermal network built: {}", summary);
        Ok((network, summary))
    }

    fn layer_props(&self) -> Result<Vec<LayerProps<'a>>> {
        self.model
            .layers()
            .iter()
            .map(|l| -> Result<LayerProps<'a>> {
                Ok(LayerProps {
                    thickness: l.thickness(),
                    conducting: self.materials.require(l.conducting_material())?,
                    dielectric: self.materials.require(l.dielectric_material())?,
                })
            })
            .collect()
    }

    fn fraction(&self, i: usize) -> (usize, usize, usize, f64) {
        let (x, y, z) = self.model.grid_index(i).unwrap_or_default();
        let f = self.model.layers()[z].fraction_at(x, y).unwrap_or(0.0);
        (x, y, z, f)
    }

    fn composite_k(&self, layers: &[LayerProps<'_>], t: &[f64], i: usize) -> [f64; 3] {
        let (_, _, z, f) = self.fraction(i);
        let l = &layers[z];
        std::array::from_fn(|axis| {
            f * l.conducting.conductivity_at(axis, t[i])
                + (1.0 - f) * l.dielectric.conductivity_at(axis, t[i])
        })
    }

    fn stencil(&self, layers: &[LayerProps<'_>], k: &[[f64; 3]], i: usize) -> NodeStencil {
        let model = self.model;
        let (nx, ny, nz) = model.model_size();
        let (rx, ry) = model.resolution(true);
        let (x, y, z, f) = self.fraction(i);
        let l = &layers[z];
        let t = l.thickness;

        let volumetric = f * l.conducting.volumetric_heat_capacity()
            + (1.0 - f) * l.dielectric.volumetric_heat_capacity();
        let mut s = NodeStencil {
            c: volumetric * t * rx * ry,
            ..Default::default()
        };

        if x + 1 < nx {
            let j = model.flatten_index((x + 1, y, z));
            let r = (0.5 * rx / k[i][0] + 0.5 * rx / k[j][0]) / (t * ry);
            s.links[0] = Some((j, r));
        }
        if y + 1 < ny {
            let j = model.flatten_index((x, y + 1, z));
            let r = (0.5 * ry / k[i][1] + 0.5 * ry / k[j][1]) / (t * rx);
            s.links[1] = Some((j, r));
        }
        if z + 1 < nz {
            let j = model.flatten_index((x, y, z + 1));
            let t2 = layers[z + 1].thickness;
            let r = (0.5 * t / k[i][2] + 0.5 * t2 / k[j][2]) / (rx * ry);
            s.links[2] = Some((j, r));
        }
        s
    }

    fn apply_power(&self, t: &[f64], network: &mut ThermalNetwork, summary: &mut BuildSummary) {
        let model = self.model;
        let (nx, ny) = model.grid_size();
        for (z, layer) in model.layers().iter().enumerate() {
            for power in layer.power_models() {
                match power {
                    PowerModel::Grid(table) => {
                        for x in 0..nx {
                            for y in 0..ny {
                                let i = model.flatten_index((x, y, z));
                                if let Some(v) = table.query(t[i], x, y) {
                                    network.add_hf(i, v);
                                    summary.record_heat_flow(v);
                                }
                            }
                        }
                    }
                    PowerModel::Block(block) => {
                        let p = block.per_cell();
                        for x in block.ll.0..=block.ur.0.min(nx - 1) {
                            for y in block.ll.1..=block.ur.1.min(ny - 1) {
                                let i = model.flatten_index((x, y, z));
                                network.add_hf(i, p);
                                summary.record_heat_flow(p);
                            }
                        }
                    }
                }
            }
        }
    }

    fn apply_jumps(&self, layers: &[LayerProps<'_>], t: &[f64], network: &mut ThermalNetwork) {
        let model = self.model;
        for jump in model.jump_connections() {
            if !model.contains(jump.from) || !model.contains(jump.to) {
                continue;
            }
            let a = model.flatten_index(jump.from);
            let b = model.flatten_index(jump.to);
            if a == b {
                continue;
            }
            let k = layers[jump.from.2].conducting.conductivity_at(0, t[a]);
            let r = k * jump.strength;
            if r.is_finite() && r > 0.0 {
                network.set_r(a, b, r);
            }
        }
    }

    fn apply_boundaries(
        &self,
        t: &[f64],
        network: &mut ThermalNetwork,
        summary: &mut BuildSummary,
    ) {
        let model = self.model;
        let (nx, ny, nz) = model.model_size();
        let (rx, ry) = model.resolution(true);
        let area = rx * ry;

        let mut apply = |i: usize, bc: BoundaryCondition, per_area: bool| {
            if !bc.is_valid() {
                return;
            }
            match bc.kind {
                BcType::Htc => network.add_htc(i, area * bc.value),
                BcType::HeatFlow => {
                    let hf = if per_area { bc.value * area } else { bc.value };
                    network.add_hf(i, hf);
                    summary.record_heat_flow(hf);
                }
                BcType::Temperature => network.set_t(i, bc.value),
            }
        };

        for (face, z) in [(Face::Top, 0), (Face::Bottom, nz - 1)] {
            if let Some(bc) = model.uniform_bc(face) {
                for x in 0..nx {
                    for y in 0..ny {
                        apply(model.flatten_index((x, y, z)), *bc, true);
                    }
                }
            }

            if let Some(grid) = model.bc_model(face) {
                for x in 0..nx {
                    for y in 0..ny {
                        let i = model.flatten_index((x, y, z));
                        if let Some(v) = grid.table.query(t[i], x, y) {
                            apply(i, BoundaryCondition::new(grid.kind, v), false);
                        }
                    }
                }
            }

            if self.config.include_block_bc {
                for block in model.block_bcs(face) {
                    for (x, y) in block.cells().filter(|&(x, y)| x < nx && y < ny) {
                        apply(model.flatten_index((x, y, z)), block.bc, true);
                    }
                }
            }
        }
    }
}
