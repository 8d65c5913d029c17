use crate::{E, SolverOptions, nlp::ipm::residual::Residual};

pub trait MuUpdate {
    fn new(options: &SolverOptions) -> Self
    where
        Self: Sized;

    /// Returns the barrier parameter to use for the next Newton step.
    ///
    /// # Arguments
    ///
    /// * `mu` - The barrier parameter of the previous iteration.
    /// * `residual` - The KKT residual at the current iterate.
    fn get(&mut self, mu: E, residual: &Residual) -> E;
}

/// Fiacco-McCormick strategy: keep `μ` fixed until the barrier subproblem is
/// solved to within `barrier_tolerance_factor * μ`, then decrease it with
///
/// ```text
///   μ ← max(ε / 10, min(κ_μ μ, μ^θ_μ))
/// ```
///
/// repeatedly, while the current iterate still solves the new subproblem.
pub struct MonotoneMuUpdate {
    barrier_tolerance_factor: E,
    linear_decrease_factor: E,
    super_linear_decrease_factor: E,
    mu_min: E,
}

impl MonotoneMuUpdate {
    fn decrease(&self, mu: E) -> E {
        let next = E::min(
            self.linear_decrease_factor * mu,
            mu.powf(self.super_linear_decrease_factor),
        );
        E::max(self.mu_min, next)
    }
}

impl MuUpdate for MonotoneMuUpdate {
    fn new(options: &SolverOptions) -> Self {
        Self {
            barrier_tolerance_factor: options.barrier_tolerance_factor,
            linear_decrease_factor: options.linear_decrease_factor,
            super_linear_decrease_factor: options.super_linear_decrease_factor,
            mu_min: options.global_tolerance / 10.,
        }
    }

    fn get(&mut self, mut mu: E, residual: &Residual) -> E {
        while residual.is_optimal(mu, self.barrier_tolerance_factor * mu) {
            let next = self.decrease(mu);
            // Stalls at the floor.
            if next >= mu {
                break;
            }
            mu = next;
        }
        mu
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::linalg::matrix::Matrix;

    fn residual(complementarity: Vec<E>, infeasibility: E) -> Residual {
        let n = complementarity.len();
        Residual {
            dual_feasibility: Matrix::from_column(vec![infeasibility]),
            complementarity: Matrix::from_column(complementarity),
            primal_eq: Matrix::zeros(0, 1),
            primal_ineq: Matrix::zeros(n, 1),
        }
    }

    #[test]
    fn test_keeps_mu_while_subproblem_unsolved() {
        let mut update = MonotoneMuUpdate::new(&SolverOptions::default());
        assert_eq!(update.get(0.1, &residual(vec![5.], 0.)), 0.1);
        assert_eq!(update.get(0.1, &residual(vec![0.1], 2.)), 0.1);
    }

    #[test]
    fn test_decreases_once() {
        let mut update = MonotoneMuUpdate::new(&SolverOptions::default());
        // error(0.1) = 0.4 <= 1.0 passes; at μ = 0.02 the error 0.48 > 0.2 fails.
        let mu = update.get(0.1, &residual(vec![0.5], 0.));
        assert_relative_eq!(mu, 0.02);
    }

    #[test]
    fn test_decreases_repeatedly_to_floor() {
        let options = SolverOptions::default();
        let mut update = MonotoneMuUpdate::new(&options);
        // An exactly optimal iterate solves every subproblem; μ drops to the floor.
        let mu = update.get(0.1, &residual(vec![0.], 0.));
        assert_relative_eq!(mu, options.global_tolerance / 10.);
    }

    #[test]
    fn test_superlinear_branch() {
        let mut update = MonotoneMuUpdate::new(&SolverOptions::default());
        assert_relative_eq!(update.decrease(0.01), 0.001);
        assert_relative_eq!(update.decrease(0.5), 0.1);
    }
}
