//! # Gridtherm
//!
//! Thermal behavior model extraction for electronic packages.
//!
//! Gridtherm turns a layered, gridded description of a package into a
//! compact thermal model:
//! - Grid thermal models with temperature dependent power and boundary
//!   tables
//! - Thermal RC network construction with composite per-cell materials
//! - MNA assembly of the descriptor matrices `(C, G, B, L)`
//! - Order reduction by 2x2 grid coarsening and PRIMA projection
//!
//! ## Quick Start
//!
//! ```rust
//! use gridtherm::prelude::*;
//!
//! let lib = MaterialLibrary::with_defaults();
//! let cu = lib.id("Cu").unwrap();
//! let diel = lib.id("Dielectric").unwrap();
//!
//! let mut model = GridThermalModel::new((4, 4), (0.0, 0.0), 0.0);
//! model.set_resolution(1e-3, 1e-3).unwrap();
//! let mf = GridData::new(4, 4, 0.5);
//! model
//!     .append_layer(GridThermalLayer::new("die", 1e-4, cu, diel, mf.clone()))
//!     .unwrap();
//! model
//!     .append_layer(GridThermalLayer::new("substrate", 1e-3, cu, diel, mf))
//!     .unwrap();
//! model
//!     .add_power_model(0, BlockPowerModel::new((1, 1), (2, 2), 1.0))
//!     .unwrap();
//! model.set_uniform_bc(Face::Bottom, BoundaryCondition::htc(1e4));
//!
//! let guess = vec![25.0; model.total_grids()];
//! let (network, summary) = GridThermalNetworkBuilder::new(&model, &lib)
//!     .build(&guess)
//!     .unwrap();
//! assert_eq!(summary.total_nodes, 32);
//!
//! let mna = make_mna(&network, false, None).unwrap();
//! let rom = ReducedModel::reduce(&mna, 2, &PrimaConfig::default()).unwrap();
//! assert_eq!(rom.order(), 8);
//! ```

// Re-export member crates
pub use gridtherm_core as core;
pub use gridtherm_network as network;
pub use gridtherm_solver as solver;

// ============================================================================
// Convenient re-exports from gridtherm_core
// ============================================================================

pub use gridtherm_core::{
    // Boundaries
    BcType,
    BlockBc,
    // Power
    BlockPowerModel,
    BoundaryCondition,
    // Errors
    Error as ModelError,
    Face,
    // Grid data
    GridData,
    GridDataTable,
    // Model
    GridThermalLayer,
    GridThermalModel,
    Index3D,
    JumpConnection,
    // Materials
    Material,
    MaterialId,
    MaterialLibrary,
    Pchip,
    PowerModel,
    // Coarsening
    ReduceMethod,
    make_reduction_model,
    reduce_model,
};

// ============================================================================
// Convenient re-exports from gridtherm_network
// ============================================================================

pub use gridtherm_network::{
    // Construction
    BuildConfig,
    BuildSummary,
    CompactNetwork,
    // Errors
    Error as NetworkError,
    GridThermalNetworkBuilder,
    // MNA
    MnaSystem,
    ThermalNetwork,
    make_bonds_rhs,
    make_full_rhs,
    make_mna,
    make_rhs,
};

// ============================================================================
// Convenient re-exports from gridtherm_solver
// ============================================================================

pub use gridtherm_solver::{
    ConvergenceCriteria,
    // Errors
    Error as SolverError,
    GFactorization,
    IterationResult,
    // PRIMA
    PrimaConfig,
    ReducedModel,
    prima,
    // Fixed point
    solve_fixed_point,
    solve_steady_state,
};

// ============================================================================
// Re-export commonly used external types
// ============================================================================

/// Re-export of nalgebra's dynamic vector type.
pub use nalgebra::DVector;

/// Re-export of nalgebra's dynamic matrix type.
pub use nalgebra::DMatrix;

/// Re-export of nalgebra-sparse's compressed column matrix.
pub use nalgebra_sparse::CscMatrix;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module containing commonly used types and functions.
///
/// ```rust
/// use gridtherm::prelude::*;
/// ```
pub mod prelude {
    // Model
    pub use crate::{
        BcType, BlockPowerModel, BoundaryCondition, Face, GridData, GridDataTable,
        GridThermalLayer, GridThermalModel, MaterialLibrary, make_reduction_model,
    };

    // Network
    pub use crate::{GridThermalNetworkBuilder, MnaSystem, ThermalNetwork, make_mna};

    // Reduction and solve
    pub use crate::{
        ConvergenceCriteria, PrimaConfig, ReducedModel, prima, solve_fixed_point,
        solve_steady_state,
    };

    // Common external types
    pub use crate::{CscMatrix, DMatrix, DVector};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_builds_network() {
        use crate::prelude::*;

        let lib = MaterialLibrary::with_defaults();
        let cu = lib.id("Cu").unwrap();
        let diel = lib.id("Dielectric").unwrap();
        let mut model = GridThermalModel::new((2, 2), (0.0, 0.0), 0.0);
        model.set_resolution(1e-3, 1e-3).unwrap();
        model
            .append_layer(GridThermalLayer::new("L0", 1e-4, cu, diel, GridData::new(2, 2, 1.0)))
            .unwrap();
        let (net, _) = GridThermalNetworkBuilder::new(&model, &lib)
            .build(&[25.0; 4])
            .unwrap();
        assert_eq!(net.len(), 4);
        assert_eq!(net.edge_count(), 4);
    }

    #[test]
    fn test_error_aliases() {
        let err: SolverError = NetworkError::EmptyModel.into();
        assert!(matches!(err, SolverError::Network(NetworkError::EmptyModel)));
        let err: NetworkError = ModelError::LayerNotFound(3).into();
        assert!(err.to_string().contains('3'));
    }
}
