use crate::E;
use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;

/// Euclidean norm of all entries; `0` for an empty matrix.
pub fn norm_l2(x: &Matrix) -> E {
    x.data().iter().fold(0., |acc: E, v| acc + v * v).sqrt()
}

/// Largest absolute entry; `0` for an empty matrix and NaN if any entry is NaN.
pub fn norm_inf(x: &Matrix) -> E {
    x.data().iter().fold(0., |acc: E, v| {
        if acc.is_nan() || v.is_nan() { E::NAN } else { acc.max(v.abs()) }
    })
}

pub fn cwise_multiply(x1: &Matrix, x2: &Matrix) -> Result<Matrix> {
    if x1.shape() != x2.shape() {
        return Err(SolverError::mismatch("cwise_multiply", x1.shape(), x2.shape()));
    }
    Matrix::new(
        x1.nrows(),
        x1.ncols(),
        x1.data().iter().zip(x2.data()).map(|(a, b)| a * b).collect(),
    )
}

pub fn is_col_positive(x: &Matrix) -> bool {
    x.data().iter().all(|v| *v > 0.)
}

/// `Σ ln(xᵢ)`.
pub fn sum_ln(x: &Matrix) -> E {
    x.data().iter().map(|v| v.ln()).sum()
}
