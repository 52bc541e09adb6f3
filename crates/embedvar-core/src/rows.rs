//! Dense row-major float32 matrix used for batches of embedding rows.

use serde::{Deserialize, Serialize};

use crate::error::{VarError, VarResult};

/// Batch of `len` rows, each `dim` floats wide, stored contiguously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rows {
    data: Vec<f32>,
    dim: usize,
}

impl Rows {
    /// Wrap a flat buffer.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `dim == 0` or `data.len()` is not a multiple of `dim`.
    pub fn from_flat(data: Vec<f32>, dim: usize) -> VarResult<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(VarError::DimensionMismatch {
                expected: dim,
                actual: data.len(),
            });
        }
        Ok(Self { data, dim })
    }

    /// Build from nested rows; every row must have the same width.
    pub fn from_rows(rows: &[Vec<f32>]) -> VarResult<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(VarError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, dim })
    }

    /// `len × dim` matrix of zeros.
    pub fn zeros(len: usize, dim: usize) -> Self {
        Self {
            data: vec![0.0; len * dim],
            dim,
        }
    }

    /// `len × dim` matrix holding `0, 1, 2, ...` in row-major order.
    pub fn arange(len: usize, dim: usize) -> Self {
        Self {
            data: (0..len * dim).map(|i| i as f32).collect(),
            dim,
        }
    }

    /// Row width.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row `i`. Panics if out of bounds, like slice indexing.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim.max(1))
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }

    /// Mean squared error against `other`, averaged over every element.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the shapes differ.
    pub fn mean_squared_error(&self, other: &Rows) -> VarResult<f64> {
        if self.dim != other.dim || self.data.len() != other.data.len() {
            return Err(VarError::DimensionMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        if self.data.is_empty() {
            return Ok(0.0);
        }
        let sum: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| {
                let d = f64::from(*a) - f64::from(*b);
                d * d
            })
            .sum();
        Ok(sum / self.data.len() as f64)
    }
}
