//! # Interior Point Method (IPM) for Nonlinear Programming
//!
//! Primal-dual interior point method for problems of the form
//!
//! ```text
//!   min  f(x)
//!   s.t. g(x) = 0
//!        h(x) >= 0
//! ```
//!
//! Inequalities are turned into equalities `h(x) - s = 0` with slacks `s > 0`,
//! and the log-barrier subproblem `f(x) - μ Σ ln s_i` is solved approximately
//! for a decreasing sequence of `μ`. Each outer iteration
//!
//! 1. updates the barrier parameter ([`mu_update`]),
//! 2. solves the full Newton system of the perturbed KKT conditions with a
//!    quasi-Newton Hessian ([`augmented_system`]),
//! 3. applies the fraction-to-boundary rule to slacks and inequality
//!    multipliers and backtracks on the primal step ([`line_search`]),
//! 4. refreshes the Hessian approximation with a damped BFGS update ([`bfgs`]).
//!
//! The solver is a resumable state machine: [`InteriorPointMethod::step`]
//! performs at most one iteration per call and returns an [`Iteration`] record.
//! Records are produced lazily; a consumer that stops pulling stops the work.
//!
//! ```
//! use nlip::{InteriorPointMethod, IterationStatus, Matrix, NLPBuilder, SolverOptions};
//!
//! // min (x - 2)²  s.t.  x >= 3
//! let nlp = NLPBuilder::new()
//!     .objective_ad(|x| (x[0] - 2.).powi(2))
//!     .inequality_ad(|x| vec![x[0] - 3.])
//!     .initial_guess(Matrix::from_column(vec![5.]))
//!     .build()
//!     .unwrap();
//!
//! let solver = InteriorPointMethod::new(&nlp, SolverOptions::default()).unwrap();
//! let last = solver.last().unwrap().unwrap();
//! assert_eq!(last.status, IterationStatus::Success);
//! assert!((last.x[(0, 0)] - 3.).abs() < 1e-6);
//! ```

pub mod augmented_system;
pub mod bfgs;
pub mod line_search;
pub mod mu_update;
pub mod residual;

use derive_more::Display;
use log::{debug, info};
use problemo::Problem;
use serde::Serialize;

use crate::{
    E, I, SolverHooks, SolverOptions, Status,
    callback::Callback,
    error::{Result, SolverError},
    linalg::{lu::DenseLu, matrix::Matrix, solver::LinearSolver, vector_ops::is_col_positive},
    nlp::{
        OptimizationProgram,
        ipm::{
            augmented_system::{AugmentedSystem, StandardSystem},
            bfgs::{damped_bfgs_update, is_null_step},
            line_search::{FilterLineSearch, maximum_step_size},
            mu_update::{MonotoneMuUpdate, MuUpdate},
            residual::{Evaluation, ProblemSize, Residual},
        },
    },
    terminators::Terminator,
};

/// Search direction `(Δx, Δs, Δy, Δz)`.
#[derive(Clone, Debug)]
pub struct Step {
    pub dx: Matrix,
    pub ds: Matrix,
    pub dy: Matrix,
    pub dz: Matrix,
}

/// Primal-dual iterate with its Hessian approximation and barrier parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct IterateState {
    /// Primal variables.
    pub x: Matrix,
    /// Slacks of the inequality constraints, kept strictly positive.
    pub s: Matrix,
    /// Multipliers of the equality constraints.
    pub y: Matrix,
    /// Multipliers of the inequality constraints, kept strictly positive.
    pub z: Matrix,
    /// Quasi-Newton approximation of the Hessian of the Lagrangian.
    pub bk: Matrix,
    pub mu: E,
}

impl IterateState {
    /// `s = y = z = 𝟙`, `B = I`.
    fn initial(x0: Matrix, size: &ProblemSize, mu: E) -> Self {
        Self {
            x: x0,
            s: Matrix::ones(size.n_ineq),
            y: Matrix::ones(size.n_eq),
            z: Matrix::ones(size.n_ineq),
            bk: Matrix::identity(size.n_var),
            mu,
        }
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize)]
pub enum IterationStatus {
    /// The iterate is not optimal yet; more steps follow.
    #[display("pending")]
    Pending,
    #[display("success")]
    Success,
    /// The iteration budget ran out.
    #[display("failed")]
    Failed,
}

impl IterationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IterationStatus::Pending)
    }
}

/// Progress record emitted once per outer iteration.
///
/// Failed records report infinite infeasibilities.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Iteration {
    pub x: Matrix,
    pub primal_infeasibility: E,
    pub dual_infeasibility: E,
    pub status: IterationStatus,
    /// Number of Newton steps taken before `x`.
    pub iteration: I,
    /// Barrier parameter in effect when `x` was reached.
    pub mu: E,
}

enum Phase {
    /// The current iterate has not been examined yet.
    Ready,
    /// A pending record was emitted; the next call takes a step from here.
    Stepping {
        eval: Evaluation,
        residual: Residual,
    },
    Converged(Iteration),
    Diverged(Iteration),
}

pub struct InteriorPointMethod<
    'a,
    P: OptimizationProgram + ?Sized,
    LinSolve: LinearSolver = DenseLu,
    MU: MuUpdate = MonotoneMuUpdate,
> {
    program: &'a P,
    options: SolverOptions,
    size: ProblemSize,
    state: IterateState,
    phase: Phase,
    nit: I,
    /// Problem functions at `state.x`, computed while accepting the last step.
    cached: Option<Evaluation>,
    last: Option<Iteration>,
    exhausted: bool,

    augmented_system: StandardSystem<LinSolve>,
    mu_update: MU,
}

impl<'a, P: OptimizationProgram + ?Sized> InteriorPointMethod<'a, P> {
    /// Starts from the program's own initial guess.
    pub fn new(program: &'a P, options: SolverOptions) -> Result<Self> {
        let x0 = program.initial_guess().clone();
        Self::with_strategies(program, x0, options)
    }

    pub fn with_initial_guess(program: &'a P, x0: Matrix, options: SolverOptions) -> Result<Self> {
        Self::with_strategies(program, x0, options)
    }
}

impl<'a, P: OptimizationProgram + ?Sized, LinSolve: LinearSolver, MU: MuUpdate>
    InteriorPointMethod<'a, P, LinSolve, MU>
{
    /// Builds a solver with explicitly chosen linear solver and barrier update.
    ///
    /// Every constraint is evaluated once at `x0` to learn its dimension.
    pub fn with_strategies(program: &'a P, x0: Matrix, options: SolverOptions) -> Result<Self> {
        options.validate()?;
        let size = ProblemSize::compute(program, &x0)?;

        Ok(Self {
            program,
            state: IterateState::initial(x0, &size, options.mu_initial),
            phase: Phase::Ready,
            nit: 0,
            cached: None,
            last: None,
            exhausted: false,
            augmented_system: StandardSystem::new(&size),
            mu_update: MU::new(&options),
            size,
            options,
        })
    }

    /// Discards all progress and starts over from `x0`.
    pub fn restart(&mut self, x0: Matrix) -> Result<()> {
        let size = ProblemSize::compute(self.program, &x0)?;
        self.state = IterateState::initial(x0, &size, self.options.mu_initial);
        self.augmented_system = StandardSystem::new(&size);
        self.mu_update = MU::new(&self.options);
        self.size = size;
        self.phase = Phase::Ready;
        self.nit = 0;
        self.cached = None;
        self.last = None;
        self.exhausted = false;
        Ok(())
    }

    pub fn state(&self) -> &IterateState {
        &self.state
    }

    pub fn size(&self) -> &ProblemSize {
        &self.size
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Number of Newton steps taken so far.
    pub fn iterations(&self) -> I {
        self.nit
    }

    pub fn barrier_parameter(&self) -> E {
        self.state.mu
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Converged(_) | Phase::Diverged(_))
    }

    pub fn last_record(&self) -> Option<&Iteration> {
        self.last.as_ref()
    }

    /// Advances the state machine by at most one iteration.
    ///
    /// If the previous call returned a pending record, one Newton step is
    /// taken first. The current iterate is then checked for optimality and a
    /// pending or successful record is returned; once the iteration budget
    /// is used up a failed record is returned instead. After a terminal record
    /// every further call returns that same record without doing any work.
    ///
    /// A failed step leaves the solver where it was, so calling `step` again
    /// retries it.
    pub fn step(&mut self) -> Result<Iteration> {
        match std::mem::replace(&mut self.phase, Phase::Ready) {
            Phase::Converged(record) => {
                self.phase = Phase::Converged(record.clone());
                return Ok(record);
            }
            Phase::Diverged(record) => {
                self.phase = Phase::Diverged(record.clone());
                return Ok(record);
            }
            Phase::Stepping { eval, residual } => {
                if let Err(err) = self.advance(&eval, &residual) {
                    self.phase = Phase::Stepping { eval, residual };
                    return Err(err);
                }
                self.nit += 1;
            }
            Phase::Ready => {}
        }

        if self.nit >= self.options.max_iterations {
            let record = self.record(E::INFINITY, E::INFINITY, IterationStatus::Failed);
            info!(
                "No convergence after {} iterations (mu = {:e})",
                self.nit, self.state.mu
            );
            self.phase = Phase::Diverged(record.clone());
            return Ok(record);
        }

        let eval = match self.cached.take() {
            Some(eval) => eval,
            None => Evaluation::compute(self.program, &self.size, &self.state.x)?,
        };
        let residual = Residual::compute(&eval, &self.state.s, &self.state.y, &self.state.z)?;
        let primal = residual.primal_infeasibility();
        let dual = residual.dual_infeasibility();

        if residual.is_optimal(0., self.options.global_tolerance) {
            let record = self.record(primal, dual, IterationStatus::Success);
            info!(
                "Converged in {} iterations: primal infeasibility {primal:e}, dual infeasibility {dual:e}",
                self.nit
            );
            self.phase = Phase::Converged(record.clone());
            return Ok(record);
        }

        debug!(
            "iter {:>4}: primal infeasibility {primal:e}, dual infeasibility {dual:e}, mu {:e}",
            self.nit, self.state.mu
        );
        let record = self.record(primal, dual, IterationStatus::Pending);
        self.phase = Phase::Stepping { eval, residual };
        Ok(record)
    }

    fn record(&mut self, primal: E, dual: E, status: IterationStatus) -> Iteration {
        let record = Iteration {
            x: self.state.x.clone(),
            primal_infeasibility: primal,
            dual_infeasibility: dual,
            status,
            iteration: self.nit,
            mu: self.state.mu,
        };
        self.last = Some(record.clone());
        record
    }

    /// Takes one Newton step from the current iterate. Nothing is committed
    /// unless the whole step succeeds.
    fn advance(&mut self, eval: &Evaluation, residual: &Residual) -> Result<()> {
        let state = &self.state;

        let mu = self.mu_update.get(state.mu, residual);
        let step = self.augmented_system.solve(state, eval, residual, mu)?;

        let tau = self.options.fraction_to_boundary;
        let alpha_max = maximum_step_size(&state.s, &step.ds, tau)?;
        let alpha_dual = maximum_step_size(&state.z, &step.dz, tau)?;
        let alpha = FilterLineSearch::new(self.program, &self.size, &self.options).search(
            &state.x,
            &state.s,
            &step,
            alpha_max,
            mu,
        )?;

        let x = state.x.add(&step.dx.scale(alpha))?;
        let s = state.s.add(&step.ds.scale(alpha))?;
        let y = state.y.add(&step.dy.scale(alpha_dual))?;
        let z = state.z.add(&step.dz.scale(alpha_dual))?;
        require_interior(&s, &z)?;

        let next = Evaluation::compute(self.program, &self.size, &x)?;
        let sk = x.subtract(&state.x)?;
        let bk = if is_null_step(&sk) {
            state.bk.clone()
        } else {
            // Change of ∇L at the new multipliers.
            let yk = next
                .lagrangian_gradient(&y, &z)?
                .subtract(&eval.lagrangian_gradient(&y, &z)?)?;
            damped_bfgs_update(&sk, &yk, &state.bk)?
        };

        debug!("step: alpha primal {alpha:e} (max {alpha_max:e}), alpha dual {alpha_dual:e}, mu {mu:e}");

        self.state = IterateState { x, s, y, z, bk, mu };
        self.cached = Some(next);
        Ok(())
    }

    /// Runs the method to completion, reporting every record to the hooks.
    pub fn solve(&mut self, hooks: &mut SolverHooks) -> std::result::Result<Status, Problem> {
        hooks.callback.init();
        hooks.terminator.initialize();

        loop {
            let record = self.step()?;
            hooks.callback.call(&record);

            match record.status {
                IterationStatus::Success => return Ok(Status::Optimal),
                IterationStatus::Failed => return Ok(Status::IterationLimit),
                IterationStatus::Pending => {
                    if let Some(status) = hooks.terminator.terminate(&record) {
                        info!("Terminated after {} iterations with status: {status}", self.nit);
                        return Ok(status);
                    }
                }
            }
        }
    }
}

/// Slacks and inequality multipliers must stay strictly positive.
fn require_interior(s: &Matrix, z: &Matrix) -> Result<()> {
    if is_col_positive(s) && is_col_positive(z) {
        return Ok(());
    }
    let value = s
        .data()
        .iter()
        .chain(z.data())
        .copied()
        .find(|v| v.is_nan() || *v <= 0.)
        .unwrap_or(E::NAN);
    Err(SolverError::NumericalBreakdown {
        quantity: "slack or multiplier",
        value,
    })
}

/// Yields one record per iteration and ends after the terminal record or the
/// first error.
impl<'a, P: OptimizationProgram + ?Sized, LinSolve: LinearSolver, MU: MuUpdate> Iterator
    for InteriorPointMethod<'a, P, LinSolve, MU>
{
    type Item = Result<Iteration>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let result = self.step();
        self.exhausted = match &result {
            Ok(record) => record.status.is_terminal(),
            Err(_) => true,
        };
        Some(result)
    }
}
