use crate::error::Result;
use crate::linalg::matrix::Matrix;

/// Trait for dense linear solvers supporting factorization and solving linear systems.
///
/// Implementors must call `factorize` before `solve`. Factorizations work on a private copy of
/// the input, so the caller's matrix is never modified.
pub trait LinearSolver {
    fn new() -> Self
    where
        Self: Sized;

    /// Performs numeric factorization of the square matrix `mat`.
    /// Returns `Ok(())` on success, or an error on a non-square or singular input.
    fn factorize(&mut self, mat: &Matrix) -> Result<()>;

    /// Solves the factorized system for the column vector `b` and returns the solution.
    fn solve(&self, b: &Matrix) -> Result<Matrix>;
}
