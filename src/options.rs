use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::{E, I};

/// Configuration of the interior-point method.
///
/// One value is constructed per solve and owned by the solver; there is no
/// process-wide default. Missing fields fall back to [`SolverOptions::default`]
/// when deserializing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Initial barrier parameter `μ₀`.
    pub mu_initial: E,
    /// Barrier subproblem tolerance is `barrier_tolerance_factor * μ`.
    pub barrier_tolerance_factor: E,
    /// Linear factor `κ_μ` of the barrier update.
    pub linear_decrease_factor: E,
    /// Superlinear exponent `θ_μ` of the barrier update.
    pub super_linear_decrease_factor: E,
    /// Overall optimality tolerance.
    pub global_tolerance: E,
    pub max_iterations: I,
    /// Sufficient decrease factor of the barrier merit function.
    pub gamma_phi: E,
    /// Sufficient decrease factor of the constraint violation.
    pub gamma_theta: E,
    /// Fraction-to-boundary parameter `τ`.
    pub fraction_to_boundary: E,
    /// Maximum number of step halvings in the line search.
    pub max_backtracks: I,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            mu_initial: 0.1,
            barrier_tolerance_factor: 10.,
            linear_decrease_factor: 0.2,
            super_linear_decrease_factor: 1.5,
            global_tolerance: 1e-8,
            max_iterations: 300,
            gamma_phi: 1e-8,
            gamma_theta: 1e-5,
            fraction_to_boundary: 0.995,
            max_backtracks: 100,
        }
    }
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mu_initial(mut self, mu_initial: E) -> Self {
        self.mu_initial = mu_initial;
        self
    }

    pub fn with_barrier_tolerance_factor(mut self, factor: E) -> Self {
        self.barrier_tolerance_factor = factor;
        self
    }

    pub fn with_linear_decrease_factor(mut self, factor: E) -> Self {
        self.linear_decrease_factor = factor;
        self
    }

    pub fn with_super_linear_decrease_factor(mut self, factor: E) -> Self {
        self.super_linear_decrease_factor = factor;
        self
    }

    pub fn with_global_tolerance(mut self, tolerance: E) -> Self {
        self.global_tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: I) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_gamma_phi(mut self, gamma_phi: E) -> Self {
        self.gamma_phi = gamma_phi;
        self
    }

    pub fn with_gamma_theta(mut self, gamma_theta: E) -> Self {
        self.gamma_theta = gamma_theta;
        self
    }

    pub fn with_fraction_to_boundary(mut self, tau: E) -> Self {
        self.fraction_to_boundary = tau;
        self
    }

    pub fn with_max_backtracks(mut self, max_backtracks: I) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    /// Checks that every parameter lies in the range the method needs.
    pub fn validate(&self) -> Result<()> {
        let open_unit = |v: E| v > 0. && v < 1.;
        let checks: [(&'static str, E, bool); 8] = [
            ("mu_initial", self.mu_initial, self.mu_initial > 0.),
            (
                "barrier_tolerance_factor",
                self.barrier_tolerance_factor,
                self.barrier_tolerance_factor > 0.,
            ),
            (
                "linear_decrease_factor",
                self.linear_decrease_factor,
                open_unit(self.linear_decrease_factor),
            ),
            (
                "super_linear_decrease_factor",
                self.super_linear_decrease_factor,
                self.super_linear_decrease_factor > 1. && self.super_linear_decrease_factor < 2.,
            ),
            (
                "global_tolerance",
                self.global_tolerance,
                self.global_tolerance > 0.,
            ),
            ("gamma_phi", self.gamma_phi, open_unit(self.gamma_phi)),
            ("gamma_theta", self.gamma_theta, open_unit(self.gamma_theta)),
            (
                "fraction_to_boundary",
                self.fraction_to_boundary,
                open_unit(self.fraction_to_boundary),
            ),
        ];

        match checks.into_iter().find(|(_, _, ok)| !ok) {
            Some((name, value, _)) => Err(SolverError::InvalidOption { name, value }),
            None => Ok(()),
        }
    }
}
