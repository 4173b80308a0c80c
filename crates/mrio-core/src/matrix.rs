//! Row-major dense matrix used for the Leontief inverse and impact results.
//!
//! Storage is a single contiguous `Vec<f64>`; rows are slices into it. The
//! type is deliberately small: heavy lifting (factorisation, parallel
//! products) lives in the solver backends and in `mrio-algo`.

use serde::{Deserialize, Serialize};

use crate::error::{MrioError, MrioResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Build from row-major storage.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> MrioResult<Self> {
        if data.len() != rows * cols {
            return Err(MrioError::dimension(
                "dense matrix storage",
                rows * cols,
                data.len(),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> MrioResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(MrioError::dimension(format!("row {i}"), n_cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Element (i, j). Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let cols = self.cols;
        &mut self.data[i * cols..(i + 1) * cols]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// y = M · v
    pub fn mul_vec(&self, v: &[f64]) -> MrioResult<Vec<f64>> {
        if v.len() != self.cols {
            return Err(MrioError::dimension("matrix-vector product", self.cols, v.len()));
        }
        Ok(self.iter_rows().map(|row| dot(row, v)).collect())
    }

    /// Largest absolute entry (0 for an empty matrix, NaN propagates).
    pub fn max_abs(&self) -> f64 {
        let mut max = 0.0_f64;
        for v in &self.data {
            if v.is_nan() {
                return f64::NAN;
            }
            max = max.max(v.abs());
        }
        max
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Dot product of two equally long slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_access() {
        let eye = DenseMatrix::identity(3);
        assert_eq!(eye.shape(), (3, 3));
        assert_eq!(eye.get(1, 1), 1.0);
        assert_eq!(eye.get(0, 2), 0.0);
        assert_eq!(eye.column(2), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mul_vec() {
        let m = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![0.5, 0.0]]).unwrap();
        assert_eq!(m.mul_vec(&[1.0, 1.0]).unwrap(), vec![3.0, 7.0, 0.5]);
        assert!(m.mul_vec(&[1.0]).is_err());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(MrioError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_max_abs_propagates_nan() {
        let mut m = DenseMatrix::zeros(2, 2);
        m.set(0, 1, -3.0);
        assert_eq!(m.max_abs(), 3.0);
        m.set(1, 1, f64::NAN);
        assert!(m.max_abs().is_nan());
        assert!(!m.all_finite());
    }
}
