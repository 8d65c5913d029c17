//! # Dense LU Factorization with Partial Pivoting
//!
//! The KKT matrix assembled every outer iteration is square but generally
//! indefinite, so it is solved with Gaussian elimination and row pivoting
//! rather than a symmetric factorization. This module provides:
//! - [`DenseLu`], a [`LinearSolver`] that keeps the packed factors and the row
//!   permutation.
//! - [`solve_linear_system`], a one-shot factorize-and-solve helper.
//!
//! ## Example Usage
//! ```
//! use nlip::linalg::lu::DenseLu;
//! use nlip::linalg::matrix::Matrix;
//! use nlip::linalg::solver::LinearSolver;
//!
//! let a = Matrix::new(2, 2, vec![0., 1., 2., 0.]).unwrap();
//! let mut solver = DenseLu::new();
//! solver.factorize(&a).unwrap();
//! let x = solver.solve(&Matrix::from_column(vec![3., 4.])).unwrap();
//! assert_eq!(x.data(), &[2., 3.]);
//! ```

use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;
use crate::linalg::solver::LinearSolver;
use crate::{E, I};

/// Dense LU solver.
///
/// After `factorize`, `lu` holds the unit lower triangle (multipliers, below
/// the diagonal) and the upper triangle packed into one row-major buffer, and
/// `perm[i]` is the original row that ended up in row `i`.
pub struct DenseLu {
    lu: Vec<E>,
    perm: Vec<I>,
    n: I,
    factorized: bool,
}

impl DenseLu {
    pub fn new() -> Self {
        Self {
            lu: Vec::new(),
            perm: Vec::new(),
            n: 0,
            factorized: false,
        }
    }

    /// Row permutation recorded by the last factorization.
    pub fn permutation(&self) -> &[I] {
        &self.perm
    }
}

impl Default for DenseLu {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolver for DenseLu {
    fn new() -> Self {
        DenseLu::new()
    }

    fn factorize(&mut self, mat: &Matrix) -> Result<()> {
        let n = mat.nrows();
        if n != mat.ncols() {
            return Err(SolverError::mismatch("lu", mat.shape(), (n, n)));
        }

        self.factorized = false;
        self.n = n;
        self.perm = (0..n).collect();
        self.lu = mat.data().to_vec();
        let data = &mut self.lu;

        for k in 0..n {
            // Pivot selection
            let mut max_row = k;
            let mut max_val = data[k * n + k].abs();
            for i in k + 1..n {
                let val = data[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val == 0. {
                return Err(SolverError::SingularMatrix { column: k });
            }

            if max_row != k {
                for j in 0..n {
                    data.swap(k * n + j, max_row * n + j);
                }
                self.perm.swap(k, max_row);
            }

            // Eliminate below the pivot, keeping the multipliers in the lower triangle
            let pivot = data[k * n + k];
            for i in k + 1..n {
                let mult = data[i * n + k] / pivot;
                data[i * n + k] = mult;
                for j in k + 1..n {
                    data[i * n + j] -= mult * data[k * n + j];
                }
            }
        }

        self.factorized = true;
        Ok(())
    }

    fn solve(&self, b: &Matrix) -> Result<Matrix> {
        let n = self.n;
        if !self.factorized {
            return Err(SolverError::mismatch("lu_solve", (0, 0), b.shape()));
        }
        if !b.is_column_vector() || b.nrows() != n {
            return Err(SolverError::mismatch("lu_solve", (n, n), b.shape()));
        }

        let data = &self.lu;
        let mut x: Vec<E> = self.perm.iter().map(|&p| b.data()[p]).collect();

        // Forward substitution: L y = P b
        for i in 0..n {
            let mut sum = x[i];
            for j in 0..i {
                sum -= data[i * n + j] * x[j];
            }
            x[i] = sum;
        }

        // Backward substitution: U x = y
        for i in (0..n).rev() {
            let mut sum = x[i];
            for j in i + 1..n {
                sum -= data[i * n + j] * x[j];
            }
            x[i] = sum / data[i * n + i];
        }

        Ok(Matrix::from_column(x))
    }
}

/// Factorizes `a` and solves `a x = b` in one go.
pub fn solve_linear_system(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let mut solver = DenseLu::new();
    solver.factorize(a)?;
    solver.solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::vector_ops::norm_l2;

    #[test]
    fn test_dense_lu_tridiagonal() {
        let n = 3;
        let a = Matrix::from_fn(n, n, |r, c| match r.abs_diff(c) {
            0 => 4.,
            1 => -1.,
            _ => 0.,
        });
        let b = Matrix::from_column(vec![1., 2., 3.]);

        let x = solve_linear_system(&a, &b).unwrap();
        let residual = a.multiply(&x).unwrap().subtract(&b).unwrap();
        assert!(norm_l2(&residual) < 1e-12);
    }

    #[test]
    fn test_pivoting_records_permutation() {
        let a = Matrix::new(3, 3, vec![0., 0., 1., 0., 2., 0., 3., 0., 0.]).unwrap();
        let mut solver = DenseLu::new();
        solver.factorize(&a).unwrap();
        assert_eq!(solver.permutation(), &[2, 1, 0]);

        let x = solver.solve(&Matrix::from_column(vec![1., 2., 3.])).unwrap();
        assert_eq!(x.data(), &[1., 1., 1.]);
    }

    #[test]
    fn test_input_is_not_modified() {
        let a = Matrix::new(2, 2, vec![1., 2., 3., 4.]).unwrap();
        let copy = a.clone();
        solve_linear_system(&a, &Matrix::ones(2)).unwrap();
        assert_eq!(a, copy);
    }

    #[test]
    fn test_singular_matrix() {
        let a = Matrix::new(2, 2, vec![1., 2., 2., 4.]).unwrap();
        let err = solve_linear_system(&a, &Matrix::ones(2)).unwrap_err();
        assert_eq!(err, SolverError::SingularMatrix { column: 1 });

        let err = solve_linear_system(&Matrix::zeros(2, 2), &Matrix::ones(2)).unwrap_err();
        assert_eq!(err, SolverError::SingularMatrix { column: 0 });
    }

    #[test]
    fn test_shape_errors() {
        let a = Matrix::zeros(2, 3);
        assert!(matches!(
            solve_linear_system(&a, &Matrix::ones(2)),
            Err(SolverError::DimensionMismatch { op: "lu", .. })
        ));

        let mut solver = DenseLu::new();
        assert!(solver.solve(&Matrix::ones(2)).is_err());
        solver.factorize(&Matrix::identity(2)).unwrap();
        assert!(solver.solve(&Matrix::ones(3)).is_err());
        assert!(solver.solve(&Matrix::identity(2)).is_err());
    }
}
