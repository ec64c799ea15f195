//! Error types for gridtherm-network.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("temperature guess has {actual} entries, model has {expected} nodes")]
    TemperatureSize { expected: usize, actual: usize },

    #[error("model has no layers or an empty grid")]
    EmptyModel,

    #[error("invalid model geometry: {0}")]
    InvalidGeometry(String),

    #[error("node {node} out of range for network of {size} nodes")]
    NodeOutOfRange { node: usize, size: usize },

    #[error(transparent)]
    Model(#[from] gridtherm_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
