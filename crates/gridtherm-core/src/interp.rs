//! Monotone piecewise cubic Hermite (PCHIP) interpolation.
//!
//! Interior slopes use the Fritsch-Butland weighted harmonic mean, which
//! keeps the interpolant monotone between monotone samples and flat at
//! local extrema. End slopes use the one-sided three point formula with
//! the usual shape-preserving limits. Two samples degrade to linear
//! interpolation.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Compute PCHIP node slopes for strictly increasing `x`.
pub fn pchip_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (y[k + 1] - y[k]) / h[k]).collect();

    if n == 2 {
        return vec![delta[0]; 2];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        if delta[k - 1] * delta[k] > 0.0 {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
        }
    }
    d[0] = end_slope(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

fn end_slope(h0: f64, h1: f64, del0: f64, del1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * del0 - h0 * del1) / (h0 + h1);
    if sign(d) != sign(del0) {
        0.0
    } else if sign(del0) != sign(del1) && d.abs() > 3.0 * del0.abs() {
        3.0 * del0
    } else {
        d
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Evaluate the Hermite interpolant at `t`.
///
/// Keys outside `[x[0], x[n-1]]` clamp to the end samples.
pub fn pchip_eval(x: &[f64], y: &[f64], d: &[f64], t: f64) -> f64 {
    let n = x.len();
    match n {
        0 => return 0.0,
        1 => return y[0],
        _ => {}
    }
    if t <= x[0] {
        return y[0];
    }
    if t >= x[n - 1] {
        return y[n - 1];
    }

    let k = x.partition_point(|&xi| xi <= t).saturating_sub(1).min(n - 2);
    let hk = x[k + 1] - x[k];
    let s = (t - x[k]) / hk;
    let one_minus = 1.0 - s;

    let h00 = (1.0 + 2.0 * s) * one_minus * one_minus;
    let h10 = s * one_minus * one_minus;
    let h01 = s * s * (3.0 - 2.0 * s);
    let h11 = s * s * (s - 1.0);

    h00 * y[k] + h10 * hk * d[k] + h01 * y[k + 1] + h11 * hk * d[k + 1]
}

/// A single-curve PCHIP interpolant.
///
/// Only the samples are read back on deserialization; slopes are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPchip")]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    d: Vec<f64>,
}

#[derive(Deserialize)]
struct RawPchip {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<RawPchip> for Pchip {
    type Error = Error;

    fn try_from(raw: RawPchip) -> Result<Self, Error> {
        if raw.x.len() != raw.y.len() {
            return Err(Error::InvalidCurve("sample count mismatch"));
        }
        Pchip::new(raw.x.into_iter().zip(raw.y)).ok_or(Error::InvalidCurve("empty or non-finite"))
    }
}

impl Pchip {
    /// Build from `(x, y)` points; they are sorted by `x` and duplicate
    /// abscissas keep the last value. Returns `None` when empty or when
    /// any coordinate is not finite.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut pts: Vec<(f64, f64)> = points.into_iter().collect();
        if pts.is_empty() || pts.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return None;
        }
        pts.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut x: Vec<f64> = Vec::with_capacity(pts.len());
        let mut y: Vec<f64> = Vec::with_capacity(pts.len());
        for (px, py) in pts {
            if x.last() == Some(&px) {
                if let Some(last) = y.last_mut() {
                    *last = py;
                }
            } else {
                x.push(px);
                y.push(py);
            }
        }
        let d = pchip_slopes(&x, &y);
        Some(Self { x, y, d })
    }

    pub fn eval(&self, t: f64) -> f64 {
        pchip_eval(&self.x, &self.y, &self.d, t)
    }

    /// Domain covered by the samples.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }
}
