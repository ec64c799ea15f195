//! Order reduction and solve helpers for Gridtherm.
//!
//! This crate provides:
//! - [`GFactorization`], sparse Cholesky of the conductance matrix with a
//!   dense LU fallback
//! - [`prima`], the block-Krylov projection basis of an MNA system
//! - [`ReducedModel`], the congruence projection onto that basis
//! - [`solve_fixed_point`], the rebuild/solve loop for temperature
//!   dependent models

pub mod error;
pub mod factor;
pub mod iteration;
pub mod prima;
pub mod rom;

pub use error::{Error, Result};
pub use factor::{GFactorization, solve_steady_state};
pub use iteration::{ConvergenceCriteria, IterationResult, solve_fixed_point};
pub use prima::{PrimaConfig, prima};
pub use rom::ReducedModel;
