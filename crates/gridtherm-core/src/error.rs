//! Error types for gridtherm-core.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("grid size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid table key: {0}")]
    InvalidKey(f64),

    #[error("negative layer thickness: {0}")]
    NegativeThickness(f64),

    #[error("negative value for {name}: {value}")]
    NegativeValue { name: &'static str, value: f64 },

    #[error("grid index ({x}, {y}, {z}) out of range")]
    IndexOutOfRange { x: usize, y: usize, z: usize },

    #[error("invalid block region ({0:?})-({1:?})")]
    InvalidRegion((usize, usize), (usize, usize)),

    #[error("layer index {0} out of range")]
    LayerNotFound(usize),

    #[error("material not found: {0}")]
    MaterialNotFound(String),

    #[error("duplicate material: {0}")]
    DuplicateMaterial(String),

    #[error("invalid interpolation curve: {0}")]
    InvalidCurve(&'static str),

    #[error("grid {0}x{1} is already at minimum size")]
    MinimumSize(usize, usize),
}

pub type Result<T> = std::result::Result<T, Error>;
