//! Thermal RC networks for Gridtherm.
//!
//! This crate provides:
//! - [`ThermalNetwork`], a map-based network for incremental stamping
//! - [`CompactNetwork`], its flattened form for traversal and coefficient
//!   extraction
//! - [`GridThermalNetworkBuilder`], which discretizes a grid thermal model
//! - [`make_mna`], which assembles the sparse descriptor matrices

pub mod builder;
pub mod compact;
pub mod error;
pub mod mna;
pub mod network;

pub use builder::{BuildConfig, BuildSummary, GridThermalNetworkBuilder};
pub use compact::{CompactNetwork, MatrixEntry};
pub use error::{Error, Result};
pub use mna::{MnaSystem, make_bonds_rhs, make_full_rhs, make_mna, make_rhs};
pub use network::{Edge, ThermalNetwork, ThermalNode};
