use crate::{
    E, I,
    error::{Result, SolverError},
    linalg::{block::block, matrix::Matrix, solver::LinearSolver},
    nlp::ipm::{
        IterateState, Step,
        residual::{Evaluation, ProblemSize, Residual},
    },
};

pub trait AugmentedSystem<LinSolve: LinearSolver> {
    fn new(size: &ProblemSize) -> Self
    where
        Self: Sized;

    /// Solves the Newton system of the perturbed KKT conditions and returns the search direction.
    ///
    /// # Arguments
    ///
    /// * `state` - The current iterate together with its Hessian approximation.
    /// * `eval` - The problem functions evaluated at `state.x`.
    /// * `residual` - The KKT residual at the current iterate.
    /// * `mu` - The barrier parameter of this iteration.
    fn solve(
        &mut self,
        state: &IterateState,
        eval: &Evaluation,
        residual: &Residual,
        mu: E,
    ) -> Result<Step>;
}

/// Full (unreduced) primal-dual system in the unknowns `(Δx, Δs, Δy, Δz)`:
///
/// ```text
///   ┌ B    0        -Jgᵀ  -Jhᵀ    ┐ ┌ Δx ┐     ┌ ∇f - Jgᵀy - Jhᵀz ┐
///   │ 0    diag(z)   0    diag(s) │ │ Δs │ = - │ s∘z - μ𝟙         │
///   │ Jg   0         0    0       │ │ Δy │     │ g                │
///   └ Jh  -I         0    0       ┘ └ Δz ┘     └ h - s            ┘
/// ```
///
/// The matrix changes with every iterate, so it is reassembled and
/// refactorized on each call.
pub struct StandardSystem<LinSolve: LinearSolver> {
    n_var: I,
    n_eq: I,
    n_ineq: I,
    solver: LinSolve,
}

impl<LinSolve: LinearSolver> StandardSystem<LinSolve> {
    pub(crate) fn assemble_matrix(&self, state: &IterateState, eval: &Evaluation) -> Result<Matrix> {
        let (n, p, k) = (self.n_var, self.n_eq, self.n_ineq);

        let jg_t = eval.jg.transpose().scale(-1.);
        let jh_t = eval.jh.transpose().scale(-1.);
        let diag_z = Matrix::diag(&state.z)?;
        let diag_s = Matrix::diag(&state.s)?;
        let neg_eye = Matrix::identity(k).scale(-1.);

        let zeros_nk = Matrix::zeros(n, k);
        let zeros_kn = Matrix::zeros(k, n);
        let zeros_kp = Matrix::zeros(k, p);
        let zeros_pk = Matrix::zeros(p, k);
        let zeros_pp = Matrix::zeros(p, p);
        let zeros_kk = Matrix::zeros(k, k);

        block(&[
            vec![&state.bk, &zeros_nk, &jg_t, &jh_t],
            vec![&zeros_kn, &diag_z, &zeros_kp, &diag_s],
            vec![&eval.jg, &zeros_pk, &zeros_pp, &zeros_pk],
            vec![&eval.jh, &neg_eye, &zeros_kp, &zeros_kk],
        ])
    }
}

impl<LinSolve: LinearSolver> AugmentedSystem<LinSolve> for StandardSystem<LinSolve> {
    fn new(size: &ProblemSize) -> Self {
        Self {
            n_var: size.n_var,
            n_eq: size.n_eq,
            n_ineq: size.n_ineq,
            solver: LinSolve::new(),
        }
    }

    fn solve(
        &mut self,
        state: &IterateState,
        eval: &Evaluation,
        residual: &Residual,
        mu: E,
    ) -> Result<Step> {
        let (n, p, k) = (self.n_var, self.n_eq, self.n_ineq);

        let mat = self.assemble_matrix(state, eval)?;
        let rhs = residual.rhs(mu)?;

        self.solver.factorize(&mat)?;
        let sol = self.solver.solve(&rhs)?;
        if !sol.is_finite() {
            let value = sol
                .data()
                .iter()
                .copied()
                .find(|v| !v.is_finite())
                .unwrap_or(E::NAN);
            return Err(SolverError::NumericalBreakdown {
                quantity: "KKT step",
                value,
            });
        }

        Ok(Step {
            dx: sol.slice(0, 0, n, 1)?,
            ds: sol.slice(n, 0, k, 1)?,
            dy: sol.slice(n + k, 0, p, 1)?,
            dz: sol.slice(n + k + p, 0, k, 1)?,
        })
    }
}
