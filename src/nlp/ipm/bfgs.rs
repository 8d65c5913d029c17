use crate::E;
use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;

/// Powell-damped BFGS update of a Hessian approximation.
///
/// Given the primal step `s` and the change `y` in the gradient of the
/// Lagrangian, `y` is replaced by `r = θ y + (1 - θ) Q s` with
///
/// ```text
///   θ = 1                                     if sᵀy >= 0.2 sᵀQs
///   θ = 0.8 sᵀQs / (sᵀQs - sᵀy)               otherwise
/// ```
///
/// so that `sᵀr >= 0.2 sᵀQs`, and the standard update
///
/// ```text
///   Q' = Q - (Qs)(Qs)ᵀ / sᵀQs + r rᵀ / sᵀr
/// ```
///
/// keeps `Q'` symmetric positive definite whenever `Q` is.
///
/// # Errors
///
/// [`SolverError::NumericalBreakdown`] if `sᵀQs` or `sᵀr` is not a positive
/// finite number, which happens for `s = 0` or a `Q` that lost definiteness.
pub fn damped_bfgs_update(s: &Matrix, y: &Matrix, q: &Matrix) -> Result<Matrix> {
    s.require_column("bfgs")?;
    if y.shape() != s.shape() {
        return Err(SolverError::mismatch("bfgs", y.shape(), s.shape()));
    }

    let qs = q.multiply(s)?;
    let sqs = s.dot(&qs)?;
    if !(sqs.is_finite() && sqs > 0.) {
        return Err(SolverError::NumericalBreakdown {
            quantity: "curvature sᵀQs",
            value: sqs,
        });
    }

    let sy = s.dot(y)?;
    let theta = if sy >= 0.2 * sqs {
        1.
    } else {
        0.8 * sqs / (sqs - sy)
    };

    let r = y.scale(theta).add(&qs.scale(1. - theta))?;
    let sr = s.dot(&r)?;
    if !(sr.is_finite() && sr > 0.) {
        return Err(SolverError::NumericalBreakdown {
            quantity: "curvature sᵀr",
            value: sr,
        });
    }

    let n = q.nrows();
    Ok(Matrix::from_fn(n, n, |i, j| {
        q[(i, j)] - qs[(i, 0)] * qs[(j, 0)] / sqs + r[(i, 0)] * r[(j, 0)] / sr
    }))
}

/// Whether a step carries any curvature information.
pub(crate) fn is_null_step(s: &Matrix) -> bool {
    s.data().iter().all(|&v| v == 0.)
}
