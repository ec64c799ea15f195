//! Key-indexed tables of 2D grids.
//!
//! A [`GridDataTable`] holds samples of a spatial quantity (power density,
//! heat transfer coefficient, temperature, ...) at a set of scalar keys,
//! typically temperature or time. Lookups between keys go through a
//! per-cell monotone cubic interpolator that is built on first use and
//! dropped whenever a sample is added.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GridData;
use crate::interp::{pchip_eval, pchip_slopes};

/// Per-cell interpolation data, laid out cell-major so the samples of one
/// cell are contiguous.
#[derive(Debug, Clone)]
struct CellInterpolator {
    keys: Vec<f64>,
    values: Vec<f64>,
    slopes: Vec<f64>,
    constant: bool,
}

impl CellInterpolator {
    fn build(samples: &[(f64, GridData)], constant: bool) -> Self {
        let keys: Vec<f64> = samples.iter().map(|(k, _)| *k).collect();
        if constant {
            return Self {
                keys,
                values: Vec::new(),
                slopes: Vec::new(),
                constant,
            };
        }

        let m = keys.len();
        let cells = samples.first().map_or(0, |(_, g)| g.len());
        let mut values = Vec::with_capacity(cells * m);
        let mut slopes = Vec::with_capacity(cells * m);
        for cell in 0..cells {
            let ys: Vec<f64> = samples.iter().map(|(_, g)| g.as_slice()[cell]).collect();
            slopes.extend(pchip_slopes(&keys, &ys));
            values.extend(ys);
        }
        Self {
            keys,
            values,
            slopes,
            constant,
        }
    }

    fn eval(&self, cell: usize, key: f64) -> f64 {
        let m = self.keys.len();
        let span = cell * m..(cell + 1) * m;
        pchip_eval(
            &self.keys,
            &self.values[span.clone()],
            &self.slopes[span],
            key,
        )
    }
}

/// An ordered table of equally sized 2D grids keyed by a scalar.
///
/// Deserialized tables are rebuilt sample by sample through
/// [`add_sample`](Self::add_sample), so every sample size and key is
/// checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawGridDataTable")]
pub struct GridDataTable {
    width: usize,
    height: usize,
    /// Samples sorted by strictly increasing key.
    samples: Vec<(f64, GridData)>,
    #[serde(skip)]
    interpolator: OnceLock<CellInterpolator>,
}

#[derive(Deserialize)]
struct RawGridDataTable {
    width: usize,
    height: usize,
    samples: Vec<(f64, GridData)>,
}

impl TryFrom<RawGridDataTable> for GridDataTable {
    type Error = Error;

    fn try_from(raw: RawGridDataTable) -> Result<Self> {
        let mut table = Self::new(raw.width, raw.height);
        for (key, grid) in raw.samples {
            table.add_sample(key, grid)?;
        }
        Ok(table)
    }
}

impl GridDataTable {
    /// Create an empty table for grids of `width x height`.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            samples: Vec::new(),
            interpolator: OnceLock::new(),
        }
    }

    /// A single-sample table with `value` in every cell.
    pub fn from_uniform(width: usize, height: usize, value: f64) -> Self {
        let mut table = Self::new(width, height);
        table
            .samples
            .push((0.0, GridData::new(width, height, value)));
        table
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Insert or replace the sample at `key`.
    ///
    /// Fails without touching the table if the grid size differs from the
    /// table's or the key is not finite.
    pub fn add_sample(&mut self, key: f64, grid: GridData) -> Result<()> {
        if grid.size() != self.size() {
            return Err(Error::SizeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: grid.width(),
                height: grid.height(),
            });
        }
        if !key.is_finite() {
            return Err(Error::InvalidKey(key));
        }

        self.interpolator = OnceLock::new();
        match self.samples.binary_search_by(|(k, _)| k.total_cmp(&key)) {
            Ok(pos) => self.samples[pos].1 = grid,
            Err(pos) => self.samples.insert(pos, (key, grid)),
        }
        Ok(())
    }

    /// Value at cell `(x, y)` for `key`.
    ///
    /// Returns `None` for an out-of-range cell, an empty table or a
    /// non-finite key. Keys outside the sampled range clamp to the first or
    /// last sample.
    pub fn query(&self, key: f64, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height || !key.is_finite() {
            return None;
        }
        let (first_key, first) = self.samples.first()?;
        if self.samples.len() == 1 || key <= *first_key {
            return first.get(x, y);
        }
        let (last_key, last) = self.samples.last()?;
        if key >= *last_key {
            return last.get(x, y);
        }

        let interp = self.interpolator();
        if interp.constant {
            return first.get(x, y);
        }
        Some(interp.eval(x * self.height + y, key))
    }

    fn interpolator(&self) -> &CellInterpolator {
        self.interpolator
            .get_or_init(|| CellInterpolator::build(&self.samples, !self.need_interpolation()))
    }

    /// Whether the interpolator has been built since the last mutation.
    pub fn is_interpolator_cached(&self) -> bool {
        self.interpolator.get().is_some()
    }

    /// Global `(min, max)` over every stored sample.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.samples
            .iter()
            .filter_map(|(_, g)| Some((g.min()?, g.max()?)))
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
    }

    /// True when at least two samples differ in content.
    pub fn need_interpolation(&self) -> bool {
        match self.samples.split_first() {
            Some(((_, first), rest)) => rest.iter().any(|(_, g)| g != first),
            None => false,
        }
    }

    /// Sample keys in increasing order.
    pub fn keys(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|(k, _)| *k)
    }

    /// The stored sample at exactly `key`.
    pub fn sample(&self, key: f64) -> Option<&GridData> {
        self.samples
            .binary_search_by(|(k, _)| k.total_cmp(&key))
            .ok()
            .map(|pos| &self.samples[pos].1)
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, &GridData)> + '_ {
        self.samples.iter().map(|(k, g)| (*k, g))
    }
}

impl PartialEq for GridDataTable {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.samples == other.samples
    }
}
