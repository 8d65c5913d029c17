//! # Dense Row-Major Matrices
//!
//! [`Matrix`] is the value type every other part of the solver exchanges: the
//! iterate, gradients, constraint Jacobians, the KKT matrix and its right-hand
//! side. Shapes are fixed at construction and every arithmetic operation
//! returns a fresh matrix, so operands are never mutated behind the caller's
//! back.
//!
//! A matrix with a single column is a *column vector*, one with a single row
//! is a *row vector*. Operations that need vectors check the shape and fail
//! with [`SolverError::DimensionMismatch`] otherwise.
//!
//! ## Example Usage
//! ```
//! use nlip::linalg::matrix::Matrix;
//!
//! let a = Matrix::new(2, 2, vec![1., 2., 3., 4.]).unwrap();
//! let x = Matrix::from_column(vec![1., 1.]);
//! let b = a.multiply(&x).unwrap();
//! assert_eq!(b.data(), &[3., 7.]);
//! ```

use std::fmt;
use std::ops::Index;

use faer::{Col, Mat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::{E, I};

/// Dense `rows x cols` matrix backed by a flat row-major buffer.
///
/// Invariant: `data.len() == rows * cols`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: I,
    cols: I,
    data: Vec<E>,
}

/// Unchecked wire form of [`Matrix`]; deserialization goes through [`Matrix::new`].
#[derive(Deserialize)]
struct RawMatrix {
    rows: I,
    cols: I,
    data: Vec<E>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = SolverError;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Matrix::new(raw.rows, raw.cols, raw.data)
    }
}

impl Matrix {
    /// Creates a matrix from a row-major buffer, checking that its length
    /// matches the requested shape.
    pub fn new(rows: I, cols: I, data: Vec<E>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(SolverError::mismatch(
                "new",
                (rows, cols),
                (data.len(), 1),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Column vector holding `data`.
    pub fn from_column(data: Vec<E>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Row vector holding `data`.
    pub fn from_row(data: Vec<E>) -> Self {
        Self {
            rows: 1,
            cols: data.len(),
            data,
        }
    }

    pub fn from_fn(rows: I, cols: I, f: impl Fn(I, I) -> E) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    pub fn zeros(rows: I, cols: I) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.; rows * cols],
        }
    }

    pub fn identity(n: I) -> Self {
        Self::from_fn(n, n, |r, c| if r == c { 1. } else { 0. })
    }

    /// Column vector of `n` ones.
    pub fn ones(n: I) -> Self {
        Self::from_column(vec![1.; n])
    }

    /// Square diagonal matrix whose diagonal is the column vector `vector`.
    pub fn diag(vector: &Matrix) -> Result<Self> {
        vector.require_column("diag")?;
        let n = vector.rows;
        let mut out = Self::zeros(n, n);
        for i in 0..n {
            out.data[i * n + i] = vector.data[i];
        }
        Ok(out)
    }

    /// Stacks column vectors on top of each other into one taller column.
    pub fn vstack_columns(vectors: &[&Matrix]) -> Result<Self> {
        if vectors.is_empty() {
            return Err(SolverError::mismatch("vstack_columns", (0, 0), (0, 1)));
        }
        let mut data = Vec::with_capacity(vectors.iter().map(|v| v.rows).sum());
        for vector in vectors {
            vector.require_column("vstack_columns")?;
            data.extend_from_slice(&vector.data);
        }
        Ok(Self::from_column(data))
    }

    /// Stacks matrices with equal column counts on top of each other.
    pub fn vstack(matrices: &[&Matrix]) -> Result<Self> {
        let Some(first) = matrices.first() else {
            return Err(SolverError::mismatch("vstack", (0, 0), (0, 0)));
        };
        let cols = first.cols;
        let mut rows = 0;
        let mut data = Vec::new();
        for m in matrices {
            if m.cols != cols {
                return Err(SolverError::mismatch("vstack", first.shape(), m.shape()));
            }
            rows += m.rows;
            data.extend_from_slice(&m.data);
        }
        Ok(Self { rows, cols, data })
    }

    pub fn nrows(&self) -> I {
        self.rows
    }

    pub fn ncols(&self) -> I {
        self.cols
    }

    pub fn shape(&self) -> (I, I) {
        (self.rows, self.cols)
    }

    /// Row-major view of the underlying buffer.
    pub fn data(&self) -> &[E] {
        &self.data
    }

    pub fn into_data(self) -> Vec<E> {
        self.data
    }

    pub fn is_column_vector(&self) -> bool {
        self.cols == 1
    }

    pub fn is_row_vector(&self) -> bool {
        self.rows == 1
    }

    pub(crate) fn require_column(&self, op: &'static str) -> Result<()> {
        if !self.is_column_vector() {
            return Err(SolverError::mismatch(op, self.shape(), (self.rows, 1)));
        }
        Ok(())
    }

    pub fn get(&self, row: I, col: I) -> E {
        self[(row, col)]
    }

    pub fn add(&self, other: &Matrix) -> Result<Self> {
        self.zip_with("add", other, |a, b| a + b)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Self> {
        self.zip_with("subtract", other, |a, b| a - b)
    }

    pub fn scale(&self, factor: E) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Matrix product `self * other`; requires `self.ncols() == other.nrows()`.
    pub fn multiply(&self, other: &Matrix) -> Result<Self> {
        if self.cols != other.rows {
            return Err(SolverError::mismatch("multiply", self.shape(), other.shape()));
        }
        let (m, n, p) = (self.rows, self.cols, other.cols);
        let mut out = vec![0.; m * p];
        for r in 0..m {
            let row = &self.data[r * n..(r + 1) * n];
            let out_row = &mut out[r * p..(r + 1) * p];
            for (k, a) in row.iter().enumerate() {
                let other_row = &other.data[k * p..(k + 1) * p];
                for (o, b) in out_row.iter_mut().zip(other_row) {
                    *o += a * b;
                }
            }
        }
        Ok(Self {
            rows: m,
            cols: p,
            data: out,
        })
    }

    pub fn transpose(&self) -> Self {
        let mut data = vec![0.; self.data.len()];
        for r in 0..self.rows {
            for c in 0..self.cols {
                data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Inner product of two column vectors of equal length.
    pub fn dot(&self, other: &Matrix) -> Result<E> {
        self.require_column("dot")?;
        if other.shape() != self.shape() {
            return Err(SolverError::mismatch("dot", self.shape(), other.shape()));
        }
        Ok(self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum())
    }

    /// Copies the `rows x cols` sub-matrix whose top-left corner is `(row, col)`.
    pub fn slice(&self, row: I, col: I, rows: I, cols: I) -> Result<Self> {
        if row + rows > self.rows || col + cols > self.cols {
            return Err(SolverError::mismatch(
                "slice",
                self.shape(),
                (row + rows, col + cols),
            ));
        }
        let mut data = Vec::with_capacity(rows * cols);
        for r in row..row + rows {
            let start = r * self.cols + col;
            data.extend_from_slice(&self.data[start..start + cols]);
        }
        Ok(Self { rows, cols, data })
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Copies the matrix into a faer [`Mat`].
    pub fn to_faer(&self) -> Mat<E> {
        Mat::from_fn(self.rows, self.cols, |r, c| self.get(r, c))
    }

    fn zip_with(&self, op: &'static str, other: &Matrix, f: impl Fn(E, E) -> E) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(SolverError::mismatch(op, self.shape(), other.shape()));
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }
}

impl Index<(I, I)> for Matrix {
    type Output = E;

    fn index(&self, (row, col): (I, I)) -> &E {
        assert!(row < self.rows && col < self.cols);
        &self.data[row * self.cols + col]
    }
}

impl From<&Mat<E>> for Matrix {
    fn from(mat: &Mat<E>) -> Self {
        Self::from_fn(mat.nrows(), mat.ncols(), |r, c| mat[(r, c)])
    }
}

impl From<&Col<E>> for Matrix {
    fn from(col: &Col<E>) -> Self {
        Self::from_column((0..col.nrows()).map(|i| col[i]).collect())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.6e}")).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::new(2, 3, vec![1., 2., 3., 4., 5., 6.]).unwrap()
    }

    #[test]
    #[should_panic]
    fn test_get_column_out_of_range() {
        sample().get(0, 4);
    }

    #[test]
    #[should_panic]
    fn test_index_column_out_of_range() {
        let _ = sample()[(0, 3)];
    }

    #[test]
    fn test_deserialize_checks_buffer() {
        let m: Matrix = serde_json::from_str(r#"{"rows":2,"cols":1,"data":[1.0,2.0]}"#).unwrap();
        assert_eq!(m, Matrix::from_column(vec![1., 2.]));

        let bad = serde_json::from_str::<Matrix>(r#"{"rows":2,"cols":2,"data":[1.0]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_new_rejects_bad_buffer() {
        let err = Matrix::new(2, 2, vec![1., 2., 3.]).unwrap_err();
        assert!(matches!(err, SolverError::DimensionMismatch { op: "new", .. }));
    }

    #[test]
    fn test_constructors() {
        let eye = Matrix::identity(3);
        assert_eq!(eye.get(1, 1), 1.);
        assert_eq!(eye.get(0, 2), 0.);

        let ones = Matrix::ones(4);
        assert!(ones.is_column_vector());
        assert_eq!(ones.data(), &[1.; 4]);

        let d = Matrix::diag(&Matrix::from_column(vec![2., 3.])).unwrap();
        assert_eq!(d.data(), &[2., 0., 0., 3.]);

        assert!(Matrix::diag(&Matrix::from_row(vec![2., 3.])).is_err());
        assert_eq!(Matrix::diag(&Matrix::zeros(0, 1)).unwrap().shape(), (0, 0));
    }

    #[test]
    fn test_arithmetic() {
        let a = sample();
        let b = a.scale(2.);
        assert_eq!(b.subtract(&a).unwrap(), a);
        assert_eq!(a.add(&a).unwrap(), b);
        assert!(a.add(&a.transpose()).is_err());
    }

    #[test]
    fn test_multiply() {
        let a = sample();
        let at = a.transpose();
        assert_eq!(at.shape(), (3, 2));
        assert_eq!(at[(2, 1)], 6.);

        let aat = a.multiply(&at).unwrap();
        assert_eq!(aat.data(), &[14., 32., 32., 77.]);

        let err = a.multiply(&a).unwrap_err();
        assert_eq!(err, SolverError::mismatch("multiply", (2, 3), (2, 3)));
    }

    #[test]
    fn test_vstack_columns() {
        let a = Matrix::from_column(vec![1., 2.]);
        let b = Matrix::from_column(vec![3.]);
        let empty = Matrix::zeros(0, 1);
        let c = Matrix::vstack_columns(&[&a, &empty, &b]).unwrap();
        assert_eq!(c.data(), &[1., 2., 3.]);

        assert!(Matrix::vstack_columns(&[&a, &sample()]).is_err());
        assert!(Matrix::vstack_columns(&[]).is_err());
    }

    #[test]
    fn test_vstack_and_slice() {
        let a = sample();
        let stacked = Matrix::vstack(&[&a, &Matrix::ones(3).transpose()]).unwrap();
        assert_eq!(stacked.shape(), (3, 3));
        assert_eq!(stacked.slice(2, 0, 1, 3).unwrap(), Matrix::from_row(vec![1.; 3]));
        assert_eq!(
            stacked.slice(0, 1, 2, 2).unwrap().data(),
            &[2., 3., 5., 6.]
        );
        assert!(stacked.slice(2, 2, 2, 2).is_err());
    }

    #[test]
    fn test_dot() {
        let a = Matrix::from_column(vec![1., 2., 3.]);
        assert_eq!(a.dot(&a).unwrap(), 14.);
        assert!(a.dot(&Matrix::ones(2)).is_err());
    }

    #[test]
    fn test_faer_roundtrip() {
        let a = sample();
        let mat = a.to_faer();
        assert_eq!(mat[(1, 2)], 6.);
        assert_eq!(Matrix::from(&mat), a);

        let col = Col::<E>::from_fn(3, |i| i as E);
        assert_eq!(Matrix::from(&col).data(), &[0., 1., 2.]);
    }
}
