use derive_more::Display;

pub type E = f64;
pub type I = usize;

pub mod ad;
pub mod callback;
pub mod error;
pub mod linalg;
pub mod nlp;
pub mod options;
pub mod terminators;


pub use error::SolverError;
pub use linalg::matrix::Matrix;
pub use nlp::ipm::{InteriorPointMethod, Iteration, IterationStatus};
pub use nlp::{Constraint, ConstraintKind, NLPBuilder, NonlinearProgram, OptimizationProgram};
pub use options::SolverOptions;

use crate::{callback::Callbacks, terminators::Terminators};

/// Outcome of a driven solve.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Status {
    Optimal,
    IterationLimit,
    Interrupted,
    TimeLimit,
}

/// Observers attached to [`InteriorPointMethod::solve`].
#[derive(Default)]
pub struct SolverHooks {
    pub callback: Callbacks,
    pub terminator: Terminators,
}
