//! Grid coarsening.
//!
//! Each pass merges every 2x2 block of cells into one, halving the grid
//! (rounding up) and doubling the cell pitch. Quantities are merged with a
//! [`ReduceMethod`] that matches their meaning: fractions are averaged,
//! powers and per-cell heat flows are summed.

use log::info;

use crate::boundary::{BcType, Face};
use crate::error::{Error, Result};
use crate::grid::GridData;
use crate::model::{GridThermalModel, Index3D};
use crate::power::PowerModel;
use crate::table::GridDataTable;

/// How the up to four source cells of a coarse cell are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceMethod {
    Average,
    Accumulate,
    Maximum,
    Minimum,
}

/// Coarse grid size, `ceil(n / 2)` per dimension.
pub fn reduce_size((w, h): (usize, usize)) -> (usize, usize) {
    (w.div_ceil(2), h.div_ceil(2))
}

/// Coarse cell a fine cell falls into.
pub fn reduce_index((x, y): (usize, usize)) -> (usize, usize) {
    (x / 2, y / 2)
}

pub fn reduce_grid(data: &GridData, method: ReduceMethod) -> GridData {
    let (w, h) = reduce_size(data.size());
    let init = match method {
        ReduceMethod::Average | ReduceMethod::Accumulate => 0.0,
        ReduceMethod::Maximum => f64::NEG_INFINITY,
        ReduceMethod::Minimum => f64::INFINITY,
    };
    let mut result = GridData::new(w, h, init);
    let mut count = vec![0usize; w * h];

    for x in 0..data.width() {
        for y in 0..data.height() {
            let (cx, cy) = reduce_index((x, y));
            let v = data[(x, y)];
            let cell = &mut result[(cx, cy)];
            match method {
                ReduceMethod::Average | ReduceMethod::Accumulate => *cell += v,
                ReduceMethod::Maximum => *cell = cell.max(v),
                ReduceMethod::Minimum => *cell = cell.min(v),
            }
            count[cx * h + cy] += 1;
        }
    }

    if method == ReduceMethod::Average {
        for cx in 0..w {
            for cy in 0..h {
                let n = count[cx * h + cy];
                if n > 0 {
                    result[(cx, cy)] /= n as f64;
                }
            }
        }
    }
    result
}

/// Coarsen every sample of `table`, keeping its keys.
pub fn reduce_table(table: &GridDataTable, method: ReduceMethod) -> Result<GridDataTable> {
    let (w, h) = reduce_size(table.size());
    let mut result = GridDataTable::new(w, h);
    for (key, grid) in table.samples() {
        result.add_sample(key, reduce_grid(grid, method))?;
    }
    Ok(result)
}

fn reduce_index3((x, y, z): Index3D) -> Index3D {
    let (x, y) = reduce_index((x, y));
    (x, y, z)
}

fn bc_method(kind: BcType) -> ReduceMethod {
    match kind {
        BcType::HeatFlow => ReduceMethod::Accumulate,
        BcType::Htc | BcType::Temperature => ReduceMethod::Average,
    }
}

/// Coarsen `model` in place by one pass.
///
/// Refuses, leaving the model untouched, when either grid dimension is
/// already 1 or less.
pub fn reduce_model(model: &mut GridThermalModel) -> Result<()> {
    let (nx, ny) = model.grid_size();
    if nx <= 1 || ny <= 1 {
        return Err(Error::MinimumSize(nx, ny));
    }

    let (rx, ry) = model.resolution(false);
    model.set_grid_size(reduce_size((nx, ny)));
    model.set_resolution(rx * 2.0, ry * 2.0)?;

    for layer in model.layers_mut() {
        let mf = reduce_grid(layer.metal_fraction(), ReduceMethod::Average);
        *layer.metal_fraction_mut() = mf;
        for power in layer.power_models_mut() {
            match power {
                PowerModel::Grid(table) => *table = reduce_table(table, ReduceMethod::Accumulate)?,
                PowerModel::Block(block) => {
                    block.ll = reduce_index(block.ll);
                    block.ur = reduce_index(block.ur);
                }
            }
        }
    }

    for face in [Face::Top, Face::Bottom] {
        if let Some(bc) = model.bc_model_mut(face) {
            bc.table = reduce_table(&bc.table, bc_method(bc.kind))?;
        }
        for block in model.block_bcs_mut(face) {
            block.ll = reduce_index(block.ll);
            block.ur = reduce_index(block.ur);
        }
    }

    for jump in model.jump_connections_mut() {
        jump.from = reduce_index3(jump.from);
        jump.to = reduce_index3(jump.to);
    }

    info!(
        "reduced grid {}x{} -> {}x{}",
        nx,
        ny,
        model.grid_size().0,
        model.grid_size().1
    );
    Ok(())
}

/// Copy `model` and coarsen the copy `order` times.
pub fn make_reduction_model(model: &GridThermalModel, order: usize) -> Result<GridThermalModel> {
    let mut copy = model.clone();
    for _ in 0..order {
        reduce_model(&mut copy)?;
    }
    Ok(copy)
}
