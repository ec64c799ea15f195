//! PRIMA block-Krylov projection.
//!
//! Builds an orthonormal basis `X` of the block Krylov subspace
//!
//! ```text
//! span{ R, A R, A^2 R, ..., A^(q-1) R },  A = G^-1 C,  R = G^-1 B
//! ```
//!
//! whose congruence projection `X^T (C, G, B, L) X` matches `q` block
//! moments of the transfer function at DC while preserving passivity.
//! Every new block is orthogonalized against all earlier blocks before a
//! column pivoted QR step that keeps only its numerically independent
//! columns, so the basis may come out narrower than `q * ports` and the
//! iteration stops early once a block deflates completely.

use log::{debug, info};
use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::error::{Error, Result};
use crate::factor::GFactorization;

/// PRIMA configuration.
#[derive(Debug, Clone)]
pub struct PrimaConfig {
    /// Fall back to dense LU when `G` is not positive definite instead of
    /// failing with [`Error::IllConditionedSystem`].
    pub allow_fallback: bool,
    /// Solve the columns of each block in parallel.
    pub parallel: bool,
}

impl Default for PrimaConfig {
    fn default() -> Self {
        Self {
            allow_fallback: true,
            parallel: true,
        }
    }
}

impl PrimaConfig {
    pub fn with_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Relative size below which a pivot of a block's QR factor counts as zero.
const DEFLATION_TOL: f64 = 1e-10;

/// Orthonormal basis of the numerically independent columns of `v`.
///
/// `scale` is the size of the block before orthogonalization against
/// earlier blocks.
fn independent_columns(v: DMatrix<f64>, scale: f64) -> DMatrix<f64> {
    let qr = v.col_piv_qr();
    let r = qr.r();
    let rank = (0..r.nrows().min(r.ncols()))
        .take_while(|&i| r[(i, i)].abs() > DEFLATION_TOL * scale)
        .count();
    qr.q().columns(0, rank).into_owned()
}

fn check_dims(c: &CscMatrix<f64>, g: &CscMatrix<f64>, b: &CscMatrix<f64>) -> Result<usize> {
    let n = g.nrows();
    for actual in [g.ncols(), c.nrows(), c.ncols(), b.nrows()] {
        if actual != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual,
            });
        }
    }
    Ok(n)
}

/// Compute the `n x (q * ports)` PRIMA projection basis.
pub fn prima(
    c: &CscMatrix<f64>,
    g: &CscMatrix<f64>,
    b: &CscMatrix<f64>,
    q: usize,
    config: &PrimaConfig,
) -> Result<DMatrix<f64>> {
    let n = check_dims(c, g, b)?;
    let ports = b.ncols();
    if q == 0 || ports == 0 || q.checked_mul(ports).is_none_or(|m| m > n) {
        return Err(Error::InvalidOrder {
            order: q,
            ports,
            size: n,
        });
    }

    let fact = GFactorization::new(g, config.allow_fallback)?;
    let r = fact.solve_columns(&DMatrix::from(b), config.parallel)?;
    let scale = r.norm();
    let first = independent_columns(r, scale);
    if first.ncols() == 0 {
        return Err(Error::ZeroInput);
    }
    let mut blocks: Vec<DMatrix<f64>> = vec![first];

    for k in 1..q {
        let prev = &blocks[k - 1];
        let v: DMatrix<f64> = c * prev;
        let mut x = fact.solve_columns(&v, config.parallel)?;
        let scale = x.norm();
        // second sweep restores orthogonality lost to cancellation
        for _ in 0..2 {
            for xj in &blocks {
                let h = xj.transpose() * &x;
                x -= xj * h;
            }
        }
        debug!("moment {}: residual block norm {:.3e}", k, x.norm());
        let block = independent_columns(x, scale);
        if block.ncols() == 0 {
            debug!("krylov space exhausted after {} blocks", k);
            break;
        }
        blocks.push(block);
    }

    let width = blocks.iter().map(|block| block.ncols()).sum();
    let mut basis = DMatrix::zeros(n, width);
    let mut offset = 0;
    for block in &blocks {
        basis.columns_mut(offset, block.ncols()).copy_from(block);
        offset += block.ncols();
    }
    info!(
        "prima: {} states, {} ports, order {} -> {} basis vectors",
        n,
        ports,
        q,
        basis.ncols()
    );
    Ok(basis)
}
