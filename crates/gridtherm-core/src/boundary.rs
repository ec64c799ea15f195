//! Boundary condition descriptions for the top and bottom model faces.

use serde::{Deserialize, Serialize};

/// How a boundary value acts on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BcType {
    /// Injected heat (W per cell for grid tables, W/m^2 for uniform and
    /// block conditions).
    HeatFlow,
    /// Convection to the reference temperature (W/(m^2*K)).
    Htc,
    /// Fixed node temperature.
    Temperature,
}

/// Model face a boundary condition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// The first layer, `z = 0`.
    Top,
    /// The last layer.
    Bottom,
}

/// A single-valued boundary condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    pub kind: BcType,
    pub value: f64,
}

impl BoundaryCondition {
    pub fn new(kind: BcType, value: f64) -> Self {
        Self { kind, value }
    }

    pub fn heat_flow(value: f64) -> Self {
        Self::new(BcType::HeatFlow, value)
    }

    pub fn htc(value: f64) -> Self {
        Self::new(BcType::Htc, value)
    }

    pub fn temperature(value: f64) -> Self {
        Self::new(BcType::Temperature, value)
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// A boundary condition restricted to the inclusive cell rectangle
/// `ll..=ur` of a face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockBc {
    pub ll: (usize, usize),
    pub ur: (usize, usize),
    pub bc: BoundaryCondition,
}

impl BlockBc {
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.ll.0 <= x && x <= self.ur.0 && self.ll.1 <= y && y <= self.ur.1
    }

    /// Cells in `x`-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.ll.0..=self.ur.0).flat_map(move |x| (self.ll.1..=self.ur.1).map(move |y| (x, y)))
    }
}
