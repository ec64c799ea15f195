//! Fixed-point iteration for temperature dependent models.
//!
//! When power, boundary tables or material conductivities depend on
//! temperature, the network is rebuilt from the latest solution until the
//! temperatures stop moving. The linear solve itself is supplied by the
//! caller.

use gridtherm_network::{BuildSummary, GridThermalNetworkBuilder, ThermalNetwork};
use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Convergence criteria for the fixed-point loop.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Absolute temperature tolerance (K).
    pub abstol: f64,
    /// Relative temperature tolerance.
    pub reltol: f64,
    /// Maximum number of rebuild/solve passes.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            abstol: 1e-3,
            reltol: 1e-4,
            max_iterations: 50,
        }
    }
}

impl ConvergenceCriteria {
    pub fn with_abstol(mut self, abstol: f64) -> Self {
        self.abstol = abstol;
        self
    }

    pub fn with_reltol(mut self, reltol: f64) -> Self {
        self.reltol = reltol;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn is_converged(&self, old: &[f64], new: &[f64]) -> bool {
        old.iter().zip(new).all(|(&a, &b)| {
            let tol = self.abstol + self.reltol * a.abs().max(b.abs());
            (b - a).abs() <= tol
        })
    }
}

/// Result of [`solve_fixed_point`].
#[derive(Debug, Clone)]
pub struct IterationResult {
    /// Per-node temperatures of the last pass.
    pub temperatures: Vec<f64>,
    /// Number of passes performed.
    pub iterations: usize,
    /// Whether the last pass met the criteria.
    pub converged: bool,
    /// Summary of the last network build.
    pub summary: BuildSummary,
}

fn max_change(old: &[f64], new: &[f64]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(a, b)| (b - a).abs())
        .fold(0.0, f64::max)
}

/// Rebuild and solve until the temperatures converge.
///
/// `solve` maps a network to per-node temperatures, for instance
/// [`solve_steady_state`](crate::solve_steady_state). A builder whose
/// model does not depend on temperature runs exactly one pass.
pub fn solve_fixed_point<F>(
    builder: &GridThermalNetworkBuilder<'_>,
    initial: &[f64],
    criteria: &ConvergenceCriteria,
    mut solve: F,
) -> Result<IterationResult>
where
    F: FnMut(&ThermalNetwork) -> Result<Vec<f64>>,
{
    let n = builder.model().total_grids();
    if initial.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: initial.len(),
        });
    }

    let iterate = builder.needs_iteration();
    let max_iterations = if iterate {
        criteria.max_iterations.max(1)
    } else {
        1
    };

    let mut temperatures = initial.to_vec();
    let mut iterations = 0;
    loop {
        iterations += 1;
        let (network, summary) = builder.build(&temperatures)?;
        let next = solve(&network)?;
        if next.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: next.len(),
            });
        }

        let converged = !iterate || criteria.is_converged(&temperatures, &next);
        debug!(
            "pass {}: max change {:.3e} K",
            iterations,
            max_change(&temperatures, &next)
        );
        temperatures = next;

        if converged || iterations >= max_iterations {
            if converged {
                info!("fixed point reached after {} passes", iterations);
            } else {
                warn!("no fixed point after {} passes", iterations);
            }
            return Ok(IterationResult {
                temperatures,
                iterations,
                converged,
                summary,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::solve_steady_state;
    use gridtherm_core::{
        BoundaryCondition, Face, GridData, GridDataTable, GridThermalLayer, GridThermalModel,
        Material, MaterialLibrary,
    };

    const REF_T: f64 = 25.0;

    /// One column of two cells: 1 W on top, 1 W/K to ambient below.
    fn column(curve: bool) -> (GridThermalModel, MaterialLibrary) {
        let mut lib = MaterialLibrary::new();
        let mut metal = Material::new("metal", 400.0, 8850.0, 380.0);
        if curve {
            metal = metal.with_conductivity_curve([(25.0, 1.0), (125.0, 0.5)]);
        }
        let metal = lib.add(metal).unwrap();
        let diel = lib.add(Material::new("diel", 0.3, 1200.0, 1000.0)).unwrap();

        let mut model = GridThermalModel::new((1, 1), (0.0, 0.0), 0.0);
        model.set_resolution(1e-3, 1e-3).unwrap();
        let mut top = GridThermalLayer::new("top", 1e-3, metal, diel, GridData::new(1, 1, 1.0));
        top.add_power_model(GridDataTable::from_uniform(1, 1, 1.0))
            .unwrap();
        model.append_layer(top).unwrap();
        model
            .append_layer(GridThermalLayer::new("bot", 1e-3, metal, diel, GridData::new(1, 1, 0.1)))
            .unwrap();
        model.set_uniform_bc(Face::Bottom, BoundaryCondition::htc(1e6));
        (model, lib)
    }

    #[test]
    fn test_constant_model_runs_one_pass() {
        let (model, lib) = column(false);
        let builder = GridThermalNetworkBuilder::new(&model, &lib);
        assert!(!builder.needs_iteration());
        let result = solve_fixed_point(
            &builder,
            &[REF_T; 2],
            &ConvergenceCriteria::default(),
            |net| solve_steady_state(net, REF_T),
        )
        .unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.converged);
        assert!((result.temperatures[1] - (REF_T + 1.0)).abs() < 1e-9);
        assert!(result.temperatures[0] > result.temperatures[1]);
        assert!((result.summary.inbound_heat_flow - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_dependent_conductivity_converges() {
        let (model, lib) = column(true);
        let builder = GridThermalNetworkBuilder::new(&model, &lib);
        assert!(builder.needs_iteration());
        let criteria = ConvergenceCriteria::default()
            .with_abstol(1e-10)
            .with_reltol(0.0)
            .with_max_iterations(100);
        let result = solve_fixed_point(&builder, &[REF_T; 2], &criteria, |net| {
            solve_steady_state(net, REF_T)
        })
        .unwrap();
        assert!(result.converged);
        assert!(result.iterations > 1);

        // the converged temperatures reproduce themselves
        let (net, _) = builder.build(&result.temperatures).unwrap();
        let again = solve_steady_state(&net, REF_T).unwrap();
        assert!(max_change(&result.temperatures, &again) < 1e-8);

        // lower conductivity when hot means a larger drop than at 25 C
        let (cold, _) = builder.build(&[REF_T; 2]).unwrap();
        let cold_t = solve_steady_state(&cold, REF_T).unwrap();
        assert!(result.temperatures[0] > cold_t[0]);
    }

    #[test]
    fn test_iteration_limit() {
        let (model, lib) = column(true);
        let builder = GridThermalNetworkBuilder::new(&model, &lib);
        let criteria = ConvergenceCriteria::default()
            .with_abstol(0.0)
            .with_reltol(0.0)
            .with_max_iterations(2);
        let result = solve_fixed_point(&builder, &[REF_T; 2], &criteria, |net| {
            solve_steady_state(net, REF_T)
        })
        .unwrap();
        assert_eq!(result.iterations, 2);
        assert!(!result.converged);
    }

    #[test]
    fn test_size_checks() {
        let (model, lib) = column(false);
        let builder = GridThermalNetworkBuilder::new(&model, &lib);
        let criteria = ConvergenceCriteria::default();
        assert!(matches!(
            solve_fixed_point(&builder, &[REF_T; 3], &criteria, |_| Ok(vec![])),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(solve_fixed_point(&builder, &[REF_T; 2], &criteria, |_| Ok(vec![0.0])).is_err());
    }
}
