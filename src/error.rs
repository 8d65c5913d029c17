use derive_more::{Display, Error};

use crate::{E, I};

/// Errors raised synchronously by the matrix kernel, the AD engine and the
/// interior-point iteration.
///
/// None of these are retried internally. A driver should treat them as a
/// failed solve, distinct from a record with
/// [`IterationStatus::Failed`](crate::nlp::ipm::IterationStatus::Failed).
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum SolverError {
    /// Matrix shape contract violated (`lhs`/`rhs` are `(rows, cols)`).
    #[display("Dimension mismatch in `{op}`: {lhs:?} vs {rhs:?}")]
    DimensionMismatch {
        op: &'static str,
        lhs: (I, I),
        rhs: (I, I),
    },

    /// No non-zero pivot is left in `column` during LU elimination.
    #[display("Matrix is singular (zero pivot in column {column})")]
    SingularMatrix { column: I },

    /// The initial guess is not a column vector.
    #[display("Initial guess must be a column vector, got {rows}x{cols}")]
    InvalidShape { rows: I, cols: I },

    /// The fraction-to-boundary step size came out negative.
    #[display("Can't find a feasible step size (alpha = {alpha})")]
    InfeasibleStep { alpha: E },

    /// A quantity that must be finite and strictly positive was not.
    #[display("Numerical breakdown: {quantity} = {value}")]
    NumericalBreakdown { quantity: &'static str, value: E },

    #[display("Invalid value for option `{name}`: {value}")]
    InvalidOption { name: &'static str, value: E },
}

impl SolverError {
    pub(crate) fn mismatch(op: &'static str, lhs: (I, I), rhs: (I, I)) -> Self {
        SolverError::DimensionMismatch { op, lhs, rhs }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SolverError::mismatch("multiply", (2, 3), (2, 3));
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in `multiply`: (2, 3) vs (2, 3)"
        );

        let err = SolverError::SingularMatrix { column: 1 };
        assert_eq!(err.to_string(), "Matrix is singular (zero pivot in column 1)");
    }
}
