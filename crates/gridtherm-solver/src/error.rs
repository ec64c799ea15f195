//! Error types for gridtherm-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix")]
    SingularMatrix,

    #[error("conductance matrix is not positive definite")]
    IllConditionedSystem,

    #[error("invalid matrix dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid reduction order {order} for {ports} ports on a system of size {size}")]
    InvalidOrder {
        order: usize,
        ports: usize,
        size: usize,
    },

    #[error("port excitations are all zero")]
    ZeroInput,

    #[error(transparent)]
    Network(#[from] gridtherm_network::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
