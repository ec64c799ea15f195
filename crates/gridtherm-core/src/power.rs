//! Heat sources attached to layers.

use serde::{Deserialize, Serialize};

use crate::table::GridDataTable;

/// A total power spread uniformly over the inclusive cell rectangle
/// `ll..=ur`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockPowerModel {
    pub ll: (usize, usize),
    pub ur: (usize, usize),
    /// Total power of the block (W).
    pub total_power: f64,
}

impl BlockPowerModel {
    pub fn new(ll: (usize, usize), ur: (usize, usize), total_power: f64) -> Self {
        Self {
            ll,
            ur,
            total_power,
        }
    }

    /// Number of cells covered; zero for an inverted rectangle.
    pub fn cell_count(&self) -> usize {
        let w = (self.ur.0 + 1).saturating_sub(self.ll.0);
        let h = (self.ur.1 + 1).saturating_sub(self.ll.1);
        w * h
    }

    pub fn per_cell(&self) -> f64 {
        match self.cell_count() {
            0 => 0.0,
            n => self.total_power / n as f64,
        }
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.ll.0 <= x && x <= self.ur.0 && self.ll.1 <= y && y <= self.ur.1
    }
}

/// A layer heat source: either a keyed grid of per-cell power (W) or a
/// uniform block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PowerModel {
    Grid(GridDataTable),
    Block(BlockPowerModel),
}

impl PowerModel {
    /// Power of cell `(x, y)` at `key`, `None` where the model is silent.
    pub fn query(&self, key: f64, x: usize, y: usize) -> Option<f64> {
        match self {
            PowerModel::Grid(table) => table.query(key, x, y),
            PowerModel::Block(block) => block.contains(x, y).then(|| block.per_cell()),
        }
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            PowerModel::Grid(table) => table.range(),
            PowerModel::Block(block) => {
                let p = block.per_cell();
                Some((p, p))
            }
        }
    }

    pub fn need_interpolation(&self) -> bool {
        match self {
            PowerModel::Grid(table) => table.need_interpolation(),
            PowerModel::Block(_) => false,
        }
    }

    /// Grid size the model requires, if any.
    pub fn grid_size(&self) -> Option<(usize, usize)> {
        match self {
            PowerModel::Grid(table) => Some(table.size()),
            PowerModel::Block(_) => None,
        }
    }
}

impl From<GridDataTable> for PowerModel {
    fn from(table: GridDataTable) -> Self {
        PowerModel::Grid(table)
    }
}

impl From<BlockPowerModel> for PowerModel {
    fn from(block: BlockPowerModel) -> Self {
        PowerModel::Block(block)
    }
}
