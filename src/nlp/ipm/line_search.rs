use log::trace;

use crate::{
    E, I, SolverOptions,
    error::{Result, SolverError},
    linalg::{
        matrix::Matrix,
        vector_ops::{norm_l2, sum_ln},
    },
    nlp::{
        ConstraintKind, OptimizationProgram,
        ipm::{Step, residual::ProblemSize},
    },
};

/// Largest `α ∈ (0, 1]` that keeps `v + α dv` a fraction `τ` away from the
/// boundary of the positive orthant:
///
/// ```text
///   α = min(1, min_{dv_i < 0} -τ v_i / dv_i)
/// ```
///
/// # Errors
///
/// [`SolverError::InfeasibleStep`] if the resulting step is negative, which
/// only happens when `v` itself left the positive orthant.
pub fn maximum_step_size(v: &Matrix, dv: &Matrix, tau: E) -> Result<E> {
    if v.shape() != dv.shape() {
        return Err(SolverError::mismatch("maximum_step_size", v.shape(), dv.shape()));
    }

    let alpha = v
        .data()
        .iter()
        .zip(dv.data())
        .filter(|(_, dvi)| **dvi < 0.)
        .fold(1., |alpha: E, (vi, dvi)| alpha.min(-tau * vi / dvi));

    if alpha < 0. {
        return Err(SolverError::InfeasibleStep { alpha });
    }
    Ok(alpha)
}

/// Backtracking line search on the pair (constraint violation `θ`, barrier
/// merit `φ`).
///
/// Starting from the largest feasible primal step, the step is halved until
/// the trial point reduces either measure sufficiently:
///
/// ```text
///   θ(x + αΔx, s + αΔs) <= (1 - γ_θ) θ(x, s)
///   φ(x + αΔx, s + αΔs) <= φ(x, s) - γ_φ θ(x, s)
/// ```
///
/// If no trial is accepted within `max_backtracks` halvings, the smallest
/// trial step is returned.
pub struct FilterLineSearch<'a, P: OptimizationProgram + ?Sized> {
    program: &'a P,
    size: &'a ProblemSize,
    gamma_theta: E,
    gamma_phi: E,
    max_backtracks: I,
}

impl<'a, P: OptimizationProgram + ?Sized> FilterLineSearch<'a, P> {
    pub fn new(program: &'a P, size: &'a ProblemSize, options: &SolverOptions) -> Self {
        Self {
            program,
            size,
            gamma_theta: options.gamma_theta,
            gamma_phi: options.gamma_phi,
            max_backtracks: options.max_backtracks,
        }
    }

    /// `θ(x, s) = max(‖g(x)‖₂, ‖h(x) - s‖₂)`.
    pub fn constraint_violation(&self, x: &Matrix, s: &Matrix) -> Result<E> {
        let g = self
            .size
            .constraint_values(self.program, ConstraintKind::Equality, x)?;
        let h = self
            .size
            .constraint_values(self.program, ConstraintKind::Inequality, x)?;
        Ok(E::max(norm_l2(&g), norm_l2(&h.subtract(s)?)))
    }

    /// `φ(x, s) = f(x) - μ Σ ln s_i`.
    pub fn barrier_merit(&self, x: &Matrix, s: &Matrix, mu: E) -> Result<E> {
        let f = self.program.objective(x)?;
        if f.shape() != (1, 1) {
            return Err(SolverError::mismatch("objective", f.shape(), (1, 1)));
        }
        Ok(f[(0, 0)] - mu * sum_ln(s))
    }

    pub fn search(
        &self,
        x: &Matrix,
        s: &Matrix,
        step: &Step,
        alpha_max: E,
        mu: E,
    ) -> Result<E> {
        let theta0 = self.constraint_violation(x, s)?;
        let phi0 = self.barrier_merit(x, s, mu)?;

        let mut alpha = alpha_max;
        for l in 0..self.max_backtracks {
            alpha = alpha_max * (0.5 as E).powi(l as i32);
            let x_trial = x.add(&step.dx.scale(alpha))?;
            let s_trial = s.add(&step.ds.scale(alpha))?;

            let theta = self.constraint_violation(&x_trial, &s_trial)?;
            let phi = self.barrier_merit(&x_trial, &s_trial, mu)?;
            trace!(
                "line search trial {l}: alpha = {alpha:e}, theta = {theta:e} (ref {theta0:e}), phi = {phi:e} (ref {phi0:e})"
            );

            if theta <= (1. - self.gamma_theta) * theta0 || phi <= phi0 - self.gamma_phi * theta0 {
                return Ok(alpha);
            }
        }

        trace!("line search exhausted, using alpha = {alpha:e}");
        Ok(alpha)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;
    use crate::nlp::{NLPBuilder, NonlinearProgram};

    #[rstest]
    #[case(vec![1., 1.], vec![1., 1.], 1.)]
    #[case(vec![1., 2.], vec![-2., 1.], 0.995 * 0.5)]
    #[case(vec![1., 2.], vec![-2., -8.], 0.995 * 0.25)]
    #[case(vec![], vec![], 1.)]
    fn test_maximum_step_size(#[case] v: Vec<E>, #[case] dv: Vec<E>, #[case] expected: E) {
        let alpha = maximum_step_size(&Matrix::from_column(v), &Matrix::from_column(dv), 0.995)
            .unwrap();
        assert_relative_eq!(alpha, expected);
    }

    #[test]
    fn test_maximum_step_size_errors() {
        let err = maximum_step_size(
            &Matrix::from_column(vec![-1.]),
            &Matrix::from_column(vec![-1.]),
            0.995,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::InfeasibleStep { alpha } if alpha < 0.));

        assert!(maximum_step_size(&Matrix::ones(2), &Matrix::ones(3), 0.995).is_err());
    }

    /// `min x²  s.t.  x - 1 = 0`
    fn nlp() -> NonlinearProgram {
        NLPBuilder::new()
            .objective_ad(|x| x[0] * x[0])
            .equality_ad(|x| vec![x[0] - 1.])
            .initial_guess(Matrix::from_column(vec![3.]))
            .build()
            .unwrap()
    }

    fn step(dx: E) -> Step {
        Step {
            dx: Matrix::from_column(vec![dx]),
            ds: Matrix::zeros(0, 1),
            dy: Matrix::zeros(1, 1),
            dz: Matrix::zeros(0, 1),
        }
    }

    #[rstest]
    #[case::full_step(-2., 100, 1.)]
    #[case::halved(-10., 100, 0.5)]
    #[case::exhausted(10., 2, 0.5)]
    fn test_search(#[case] dx: E, #[case] max_backtracks: I, #[case] expected: E) {
        let nlp = nlp();
        let size = ProblemSize::compute(&nlp, nlp.initial_guess()).unwrap();
        let options = SolverOptions::default().with_max_backtracks(max_backtracks);
        let search = FilterLineSearch::new(&nlp, &size, &options);

        let x = nlp.initial_guess();
        let s = Matrix::zeros(0, 1);
        assert_relative_eq!(search.constraint_violation(x, &s).unwrap(), 2.);
        assert_relative_eq!(search.barrier_merit(x, &s, 0.1).unwrap(), 9.);

        let alpha = search.search(x, &s, &step(dx), 1., 0.1).unwrap();
        assert_relative_eq!(alpha, expected);
    }

    #[test]
    fn test_barrier_merit_uses_slacks() {
        let nlp = nlp();
        let size = ProblemSize::compute(&nlp, nlp.initial_guess()).unwrap();
        let options = SolverOptions::default();
        let search = FilterLineSearch::new(&nlp, &size, &options);

        let x = Matrix::from_column(vec![1.]);
        let s = Matrix::from_column(vec![1., 2_f64.exp()]);
        assert_relative_eq!(search.barrier_merit(&x, &s, 0.5).unwrap(), 0., epsilon = 1e-12);
    }
}
