//! Grid thermal model for Gridtherm.
//!
//! This crate describes an electronic package as a stack of equally
//! gridded layers. Each layer mixes a conducting and a dielectric material
//! per cell according to its metal fraction and may carry heat sources.
//! Boundary conditions live on the top and bottom faces. Spatial
//! quantities that vary with temperature or time are stored in
//! [`GridDataTable`]s and interpolated monotonically between samples.
//!
//! The [`reduction`] module coarsens a model by merging 2x2 cell blocks.

pub mod boundary;
pub mod error;
pub mod grid;
pub mod interp;
pub mod layer;
pub mod material;
pub mod model;
pub mod power;
pub mod reduction;
pub mod table;

pub use boundary::{BcType, BlockBc, BoundaryCondition, Face};
pub use error::{Error, Result};
pub use grid::GridData;
pub use interp::Pchip;
pub use layer::GridThermalLayer;
pub use material::{Material, MaterialId, MaterialLibrary};
pub use model::{GridBc, GridThermalModel, Index3D, JumpConnection};
pub use power::{BlockPowerModel, PowerModel};
pub use reduction::{ReduceMethod, make_reduction_model, reduce_grid, reduce_model, reduce_table};
pub use table::GridDataTable;
