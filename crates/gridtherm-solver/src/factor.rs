//! Factorization of the conductance matrix.
//!
//! Conductance matrices of thermal networks with at least one convection
//! or fixed-temperature path are symmetric positive definite, so sparse
//! Cholesky is tried first. Anything else falls back to dense LU when the
//! caller allows it.

use gridtherm_network::{CompactNetwork, ThermalNetwork};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Dyn, LU};
use nalgebra_sparse::CscMatrix;
use nalgebra_sparse::factorization::CscCholesky;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// A reusable factorization of `G`.
pub enum GFactorization {
    Cholesky(CscCholesky<f64>),
    Lu(LU<f64, Dyn, Dyn>),
}

impl std::fmt::Debug for GFactorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GFactorization::Cholesky(_) => f.write_str("GFactorization::Cholesky"),
            GFactorization::Lu(_) => f.write_str("GFactorization::Lu"),
        }
    }
}

impl GFactorization {
    /// Factor `g`, falling back to dense LU if it is not positive definite
    /// and `allow_fallback` is set.
    pub fn new(g: &CscMatrix<f64>, allow_fallback: bool) -> Result<Self> {
        if g.nrows() != g.ncols() {
            return Err(Error::DimensionMismatch {
                expected: g.nrows(),
                actual: g.ncols(),
            });
        }

        match CscCholesky::factor(g) {
            Ok(chol) => {
                debug!("sparse Cholesky of {}x{} conductance matrix", g.nrows(), g.ncols());
                Ok(GFactorization::Cholesky(chol))
            }
            Err(err) if allow_fallback => {
                warn!("Cholesky failed ({err:?}), falling back to dense LU");
                let lu = DMatrix::from(g).lu();
                if !lu.is_invertible() {
                    return Err(Error::SingularMatrix);
                }
                Ok(GFactorization::Lu(lu))
            }
            Err(_) => Err(Error::IllConditionedSystem),
        }
    }

    pub fn is_cholesky(&self) -> bool {
        matches!(self, GFactorization::Cholesky(_))
    }

    pub fn size(&self) -> usize {
        match self {
            GFactorization::Cholesky(chol) => chol.l().nrows(),
            GFactorization::Lu(lu) => lu.l().nrows(),
        }
    }

    /// Solve `G x = b` for one right-hand side.
    pub fn solve_vector(&self, b: &DVector<f64>) -> Result<DVector<f64>> {
        let n = self.size();
        if b.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: b.len(),
            });
        }
        let x = match self {
            GFactorization::Cholesky(chol) => {
                let rhs = DMatrix::from_column_slice(n, 1, b.as_slice());
                chol.solve(&rhs).column(0).into_owned()
            }
            GFactorization::Lu(lu) => lu.solve(b).ok_or(Error::SingularMatrix)?,
        };
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularMatrix);
        }
        Ok(x)
    }

    /// Solve `G X = B` column by column, in parallel when `parallel` is set.
    pub fn solve_columns(&self, b: &DMatrix<f64>, parallel: bool) -> Result<DMatrix<f64>> {
        if b.ncols() == 0 {
            return Ok(DMatrix::zeros(b.nrows(), 0));
        }
        let solve = |j: usize| self.solve_vector(&b.column(j).into_owned());
        let columns: Vec<DVector<f64>> = if parallel {
            (0..b.ncols())
                .into_par_iter()
                .map(solve)
                .collect::<Result<_>>()?
        } else {
            (0..b.ncols()).map(solve).collect::<Result<_>>()?
        };
        Ok(DMatrix::from_columns(&columns))
    }
}

/// Steady-state node temperatures of `network` with convection to `ref_t`.
///
/// Fixed-temperature nodes are eliminated before factoring, so the reduced
/// conductance matrix is positive definite whenever every unknown has a
/// path to a convection boundary or a fixed node.
pub fn solve_steady_state(network: &ThermalNetwork, ref_t: f64) -> Result<Vec<f64>> {
    let compact = CompactNetwork::from(network);
    if compact.matrix_size() == 0 {
        return Ok(compact.expand_solution(&[]));
    }
    let (g, rhs) = compact.unknown_system(ref_t);
    let fact = GFactorization::new(&g, true)?;
    let x = fact.solve_vector(&DVector::from_vec(rhs))?;
    Ok(compact.expand_solution(x.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    fn csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(dense.nrows(), dense.ncols());
        for i in 0..dense.nrows() {
            for j in 0..dense.ncols() {
                if dense[(i, j)] != 0.0 {
                    coo.push(i, j, dense[(i, j)]);
                }
            }
        }
        CscMatrix::from(&coo)
    }

    #[test]
    fn test_cholesky_path() {
        let g = DMatrix::from_row_slice(2, 2, &[3.0, -1.0, -1.0, 2.0]);
        let fact = GFactorization::new(&csc(&g), false).unwrap();
        assert!(fact.is_cholesky());
        let x = fact.solve_vector(&DVector::from_vec(vec![1.0, 2.0])).unwrap();
        let residual = &g * &x - DVector::from_vec(vec![1.0, 2.0]);
        assert!(residual.norm() < 1e-12);
    }

    #[test]
    fn test_indefinite_needs_fallback() {
        let g = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            GFactorization::new(&csc(&g), false),
            Err(Error::IllConditionedSystem)
        ));
        let fact = GFactorization::new(&csc(&g), true).unwrap();
        assert!(!fact.is_cholesky());
        let b = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 3.0, 2.0]);
        let x = fact.solve_columns(&b, true).unwrap();
        assert!((&g * &x - &b).abs().max() < 1e-12);
    }

    #[test]
    fn test_dimension_checks() {
        let g = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0]);
        let fact = GFactorization::new(&csc(&g), true).unwrap();
        assert!(matches!(
            fact.solve_vector(&DVector::zeros(3)),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        let rect = CscMatrix::from(&CooMatrix::<f64>::new(2, 3));
        assert!(GFactorization::new(&rect, true).is_err());
    }

    #[test]
    fn test_steady_state_with_fixed_node() {
        // 10 W into node 0, 1 K/W to node 1 held at 50
        let mut net = ThermalNetwork::new(2);
        net.set_r(0, 1, 1.0);
        net.set_hf(0, 10.0);
        net.set_t(1, 50.0);
        let t = solve_steady_state(&net, 25.0).unwrap();
        assert!((t[0] - 60.0).abs() < 1e-9);
        assert_eq!(t[1], 50.0);
    }
}
