use crate::ad::dual::Dual;
use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;
use crate::{E, I};

/// Evaluates `f` with every input seeded as a constant and returns the value
/// column `f(x)`.
pub fn eval_fn(f: impl Fn(&[Dual]) -> Vec<Dual>, x: &Matrix) -> Result<Matrix> {
    x.require_column("eval_fn")?;
    let inputs: Vec<Dual> = x.data().iter().map(|&xi| Dual::constant(xi)).collect();
    Ok(Matrix::from_column(f(inputs.as_slice()).iter().map(|d| d.re).collect()))
}

/// Compute the full Jacobian of `f : R^n → R^m` at the column vector `x` using forward mode.
///
/// Runs one forward pass per input coordinate `j`, seeding `x_j` with a unit
/// tangent, and reads `J[i][j] = ∂f_i/∂x_j` off the tangents of the outputs.
/// Every pass must return the same number of outputs.
///
/// ```
/// use nlip::ad::jacobian::jacobian;
/// use nlip::linalg::matrix::Matrix;
///
/// let j = jacobian(|x| vec![x[0] * x[1]], &Matrix::from_column(vec![2., 3.])).unwrap();
/// assert_eq!(j.data(), &[3., 2.]);
/// ```
pub fn jacobian(f: impl Fn(&[Dual]) -> Vec<Dual>, x: &Matrix) -> Result<Matrix> {
    x.require_column("jacobian")?;
    let n = x.nrows();

    if n == 0 {
        let m = f(&[] as &[Dual]).len();
        return Ok(Matrix::zeros(m, 0));
    }

    let mut columns: Vec<Vec<E>> = Vec::with_capacity(n);
    let mut inputs: Vec<Dual> = x.data().iter().map(|&xi| Dual::constant(xi)).collect();
    for j in 0..n {
        inputs[j].eps = 1.;
        let outputs = f(inputs.as_slice());
        inputs[j].eps = 0.;

        if let Some(first) = columns.first() {
            if first.len() != outputs.len() {
                return Err(SolverError::mismatch(
                    "jacobian",
                    (first.len(), n),
                    (outputs.len(), n),
                ));
            }
        }
        columns.push(outputs.iter().map(|d| d.eps).collect());
    }

    let m: I = columns[0].len();
    Ok(Matrix::from_fn(m, n, |i, j| columns[j][i]))
}

/// Gradient of a scalar function as a column vector (the transposed 1×n Jacobian).
pub fn gradient(f: impl Fn(&[Dual]) -> Dual, x: &Matrix) -> Result<Matrix> {
    let jac = jacobian(|v| vec![f(v)], x)?;
    Ok(jac.transpose())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0., 0.)]
    #[case(1., 2.)]
    #[case(-3.5, 0.25)]
    fn test_product_jacobian(#[case] x0: E, #[case] x1: E) {
        let x = Matrix::from_column(vec![x0, x1]);
        let j = jacobian(|v| vec![v[0] * v[1]], &x).unwrap();
        assert_eq!(j.shape(), (1, 2));
        assert_relative_eq!(j[(0, 0)], x1);
        assert_relative_eq!(j[(0, 1)], x0);
    }

    #[test]
    fn test_multi_output_jacobian() {
        // f(x) = [x0 - x1², -x0⁴ + x1 + 1]
        let f = |v: &[Dual]| vec![v[0] - v[1].powi(2), -v[0].powi(4) + v[1] + 1.];
        let x = Matrix::from_column(vec![1.5, -2.]);

        let j = jacobian(f, &x).unwrap();
        let expected = Matrix::new(2, 2, vec![1., 4., -4. * 1.5_f64.powi(3), 1.]).unwrap();
        for (a, b) in j.data().iter().zip(expected.data()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }

        let value = eval_fn(f, &x).unwrap();
        assert_eq!(value.data(), &[1.5 - 4., -(1.5_f64.powi(4)) - 2. + 1.]);
    }

    #[test]
    fn test_unseeded_singular_input() {
        // d/dx1 of sqrt(x1) is unbounded at 0, which must not leak into column 0.
        let x = Matrix::from_column(vec![2., 0.]);
        let j = jacobian(|v| vec![v[0] * v[1].sqrt() + v[0]], &x).unwrap();
        assert_eq!(j[(0, 0)], 1.);
        assert!(j[(0, 1)].is_infinite());
    }

    #[test]
    fn test_one_pass_per_input() {
        let calls = Cell::new(0);
        let f = |v: &[Dual]| {
            calls.set(calls.get() + 1);
            vec![v[0] + v[1] + v[2]]
        };
        jacobian(f, &Matrix::ones(3)).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_gradient() {
        let x = Matrix::from_column(vec![2., 1.5]);
        let g = gradient(|v| (-(v[0] * v[1] - 1.5).powi(2)).exp() * -1000., &x).unwrap();
        let e = (-(3.0_f64 - 1.5).powi(2)).exp();
        assert_eq!(g.shape(), (2, 1));
        assert_relative_eq!(g[(0, 0)], -1000. * e * -2. * 1.5 * 1.5, max_relative = 1e-12);
        assert_relative_eq!(g[(1, 0)], -1000. * e * -2. * 1.5 * 2., max_relative = 1e-12);
    }

    #[test]
    fn test_requires_column_vector() {
        let x = Matrix::ones(2).transpose();
        assert!(jacobian(|v| v.to_vec(), &x).is_err());
        assert!(eval_fn(|v| v.to_vec(), &x).is_err());
    }

    #[test]
    fn test_inconsistent_output_length() {
        let f = |v: &[Dual]| if v[0].eps == 1. { vec![v[0]] } else { vec![v[0], v[1]] };
        assert!(matches!(
            jacobian(f, &Matrix::ones(2)),
            Err(SolverError::DimensionMismatch { op: "jacobian", .. })
        ));
    }
}
