//! Dense row-major plaintext matrices for controller definitions.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// Dense row-major matrix.
///
/// Used for the plaintext controller matrices `F, G, H, J` and for their
/// quantized integer counterparts (`Matrix<i64>`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixData<T>")]
pub struct Matrix<T = f64> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Serialized form, checked before it becomes a [`Matrix`].
#[derive(Deserialize)]
struct MatrixData<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> TryFrom<MatrixData<T>> for Matrix<T> {
    type Error = ControlError;

    fn try_from(raw: MatrixData<T>) -> Result<Self> {
        let MatrixData { rows, cols, data } = raw;
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ControlError::Dimension(format!(
                "matrix declared {}x{} carries {} entries",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }
}

impl<T: Copy + Default> Matrix<T> {
    /// All-zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let row_count = rows.len();
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(row_count * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(ControlError::Dimension(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: row_count,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Entry at (row, col)
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Column `col` as a vector
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    /// Apply `f` to every entry
    pub fn map<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Iterate `(row, col, value)`
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i / self.cols, i % self.cols, v))
    }

    /// Checks the shape against `(rows, cols)`.
    pub fn expect_shape(&self, name: &str, rows: usize, cols: usize) -> Result<()> {
        if self.rows != rows || self.cols != cols {
            return Err(ControlError::Dimension(format!(
                "{} is {}x{}, expected {}x{}",
                name, self.rows, self.cols, rows, cols
            )));
        }
        Ok(())
    }
}

impl Matrix<f64> {
    /// Matrix-vector product
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.cols, "vector length must match column count");
        (0..self.rows)
            .map(|r| (0..self.cols).map(|c| self.get(r, c) * v[c]).sum())
            .collect()
    }
}

/// Element-wise vector sum
pub fn vec_add(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "vector lengths must match");
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Euclidean distance between two vectors
pub fn vec_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vector lengths must match");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
