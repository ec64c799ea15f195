//! Dense 2D scalar grids.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A dense `width x height` grid of scalars.
///
/// Cells are stored column by column: the value at `(x, y)` lives at
/// `x * height + y`, which matches the in-layer part of the model's
/// flattened node numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGridData")]
pub struct GridData {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawGridData {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl TryFrom<RawGridData> for GridData {
    type Error = Error;

    fn try_from(raw: RawGridData) -> Result<Self> {
        Self::from_vec(raw.width, raw.height, raw.data)
    }
}

impl GridData {
    /// Create a grid filled with `value`.
    pub fn new(width: usize, height: usize, value: f64) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Create a zero-filled grid.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::new(width, height, 0.0)
    }

    /// Build a grid from storage in `x * height + y` order.
    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::SizeMismatch {
                expected_width: width,
                expected_height: height,
                width: data.len(),
                height: 1,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Value at `(x, y)`, or `None` when out of range.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        self.contains(x, y).then(|| self.data[x * self.height + y])
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut f64> {
        if self.contains(x, y) {
            Some(&mut self.data[x * self.height + y])
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Apply `f` to every cell, producing a new grid of the same size.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Smallest cell value, `None` for an empty grid.
    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    /// Largest cell value, `None` for an empty grid.
    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }
}

impl Index<(usize, usize)> for GridData {
    type Output = f64;

    fn index(&self, (x, y): (usize, usize)) -> &f64 {
        assert!(self.contains(x, y), "grid index ({x}, {y}) out of range");
        &self.data[x * self.height + y]
    }
}

impl IndexMut<(usize, usize)> for GridData {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut f64 {
        assert!(self.contains(x, y), "grid index ({x}, {y}) out of range");
        &mut self.data[x * self.height + y]
    }
}
