//! Reduced-order thermal model.

use gridtherm_network::MnaSystem;
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::prima::{PrimaConfig, prima};

/// Congruence projection of an [`MnaSystem`] onto a PRIMA basis.
///
/// `c`, `g` stay symmetric and `g` stays positive definite, so the reduced
/// model is passive whenever the full one is.
#[derive(Debug, Clone)]
pub struct ReducedModel {
    /// `X^T C X`
    pub c: DMatrix<f64>,
    /// `X^T G X`
    pub g: DMatrix<f64>,
    /// `X^T B`
    pub b: DMatrix<f64>,
    /// `X^T L`
    pub l: DMatrix<f64>,
    /// Projection basis (n x order).
    pub x: DMatrix<f64>,
}

impl ReducedModel {
    /// Reduce `mna` matching `q` block moments.
    pub fn reduce(mna: &MnaSystem, q: usize, config: &PrimaConfig) -> Result<Self> {
        let x = prima(&mna.c, &mna.g, &mna.b, q, config)?;
        Ok(Self::project(mna, x))
    }

    /// Project `mna` onto an existing basis.
    pub fn project(mna: &MnaSystem, x: DMatrix<f64>) -> Self {
        let xt = x.transpose();
        let c = &xt * (&mna.c * &x);
        let g = &xt * (&mna.g * &x);
        let b = (&mna.b.transpose() * &x).transpose();
        let l = (&mna.l.transpose() * &x).transpose();
        debug!(
            "projected {} states onto {} ({} ports, {} outputs)",
            x.nrows(),
            x.ncols(),
            b.ncols(),
            l.ncols()
        );
        Self { c, g, b, l, x }
    }

    /// Number of reduced states.
    pub fn order(&self) -> usize {
        self.x.ncols()
    }

    pub fn full_size(&self) -> usize {
        self.x.nrows()
    }

    /// Reduced coordinates `X^T t` of a full state vector.
    pub fn reduce_state(&self, t: &DVector<f64>) -> Result<DVector<f64>> {
        if t.len() != self.full_size() {
            return Err(Error::DimensionMismatch {
                expected: self.full_size(),
                actual: t.len(),
            });
        }
        Ok(self.x.tr_mul(t))
    }

    /// Full state `X z` of reduced coordinates.
    pub fn lift(&self, z: &DVector<f64>) -> Result<DVector<f64>> {
        if z.len() != self.order() {
            return Err(Error::DimensionMismatch {
                expected: self.order(),
                actual: z.len(),
            });
        }
        Ok(&self.x * z)
    }

    /// Reduced steady state for port excitation `u`: `G_r z = B_r u`.
    pub fn steady_state(&self, u: &DVector<f64>) -> Result<DVector<f64>> {
        if u.len() != self.b.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.b.ncols(),
                actual: u.len(),
            });
        }
        let rhs = &self.b * u;
        self.g.clone().lu().solve(&rhs).ok_or(Error::SingularMatrix)
    }

    /// Observed outputs `L_r^T z`.
    pub fn output(&self, z: &DVector<f64>) -> DVector<f64> {
        self.l.tr_mul(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtherm_network::{ThermalNetwork, make_mna, make_rhs};
    use std::collections::BTreeSet;

    fn chain(n: usize) -> ThermalNetwork {
        let mut net = ThermalNetwork::new(n);
        for i in 0..n - 1 {
            net.set_r(i, i + 1, 0.5 + 0.1 * (i % 4) as f64);
        }
        for i in 0..n {
            net.set_c(i, 1.0 + 0.05 * i as f64);
        }
        net.set_hf(0, 3.0);
        net.set_hf(n / 2, 1.0);
        net.set_htc(n - 1, 2.0);
        net
    }

    #[test]
    fn test_reduced_matrices_keep_structure() {
        let mna = make_mna(&chain(15), true, None).unwrap();
        let rom = ReducedModel::reduce(&mna, 2, &PrimaConfig::default()).unwrap();
        assert_eq!(rom.order(), 6);
        assert_eq!(rom.full_size(), 15);
        assert_eq!(rom.b.shape(), (6, 3));
        assert_eq!(rom.l.shape(), (6, 15));
        assert!((&rom.g - rom.g.transpose()).abs().max() < 1e-10);
        assert!((&rom.c - rom.c.transpose()).abs().max() < 1e-10);
        assert!(rom.g.clone().cholesky().is_some());
    }

    #[test]
    fn test_dc_response_is_exact() {
        let net = chain(20);
        let probes: BTreeSet<usize> = [0, 10, 19].into_iter().collect();
        let mna = make_mna(&net, true, Some(&probes)).unwrap();
        let u = make_rhs(&net, true, 25.0);

        let full = DMatrix::from(&mna.g)
            .lu()
            .solve(&(DMatrix::from(&mna.b) * &u))
            .unwrap();
        let expected = DMatrix::from(&mna.l).tr_mul(&full);

        let rom = ReducedModel::reduce(&mna, 1, &PrimaConfig::default()).unwrap();
        let z = rom.steady_state(&u).unwrap();
        let y = rom.output(&z);
        assert_eq!(y.len(), 3);
        for i in 0..3 {
            assert!(
                (y[i] - expected[i]).abs() < 1e-8 * expected[i].abs(),
                "output {}: {} vs {}",
                i,
                y[i],
                expected[i]
            );
        }
        let lifted = rom.lift(&z).unwrap();
        assert!((lifted - full).norm() < 1e-8 * expected.norm());
    }

    #[test]
    fn test_dimension_checks() {
        let mna = make_mna(&chain(6), false, None).unwrap();
        let rom = ReducedModel::reduce(&mna, 2, &PrimaConfig::default()).unwrap();
        assert!(rom.lift(&DVector::zeros(5)).is_err());
        assert!(rom.reduce_state(&DVector::zeros(5)).is_err());
        assert!(rom.steady_state(&DVector::zeros(3)).is_err());
        let z = rom.reduce_state(&DVector::from_element(6, 1.0)).unwrap();
        assert_eq!(z.len(), rom.order());
    }
}
