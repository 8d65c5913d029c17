pub mod ipm;

use std::rc::Rc;

use derive_more::Display;
use problemo::Problem;
use problemo::common::IntoCommonProblem;

use crate::ad::Dual;
use crate::ad::jacobian::{eval_fn, gradient, jacobian};
use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;

/// `x -> column vector` (constraint values, gradients).
pub type VectorFn = Box<dyn Fn(&Matrix) -> Result<Matrix>>;
/// `x -> matrix` (objective as a 1x1 value, constraint Jacobians).
pub type MatrixFn = Box<dyn Fn(&Matrix) -> Result<Matrix>>;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `g(x) = 0`
    #[display("equality")]
    Equality,
    /// `h(x) >= 0`
    #[display("inequality")]
    Inequality,
}

/// A block of constraints `c: Rⁿ -> Rᵏ` with its `k x n` Jacobian.
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: VectorFn,
    pub jacobian: MatrixFn,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, value: VectorFn, jacobian: MatrixFn) -> Self {
        Self {
            kind,
            value,
            jacobian,
        }
    }

    /// Builds the constraint from a dual-number function; values and exact
    /// Jacobians are obtained through forward-mode AD.
    pub fn from_dual<F>(kind: ConstraintKind, f: F) -> Self
    where
        F: Fn(&[Dual]) -> Vec<Dual> + 'static,
    {
        let f = Rc::new(f);
        let f_jac = f.clone();
        Self {
            kind,
            value: Box::new(move |x: &Matrix| eval_fn(&*f, x)),
            jacobian: Box::new(move |x: &Matrix| jacobian(&*f_jac, x)),
        }
    }
}

/// Contract between the solver and a problem:
///
/// ```text
///   min  f(x)
///   s.t. g(x) = 0
///        h(x) >= 0
/// ```
pub trait OptimizationProgram {
    /// Objective value `f(x)` as a 1x1 matrix.
    fn objective(&self, x: &Matrix) -> Result<Matrix>;

    /// Gradient `∇f(x)` as a column vector.
    fn gradient(&self, x: &Matrix) -> Result<Matrix>;

    fn constraints(&self) -> &[Constraint];

    fn initial_guess(&self) -> &Matrix;
}

/// A nonlinear program assembled from closures.
pub struct NonlinearProgram {
    /// Objective function `f(x) -> 1x1`.
    f: MatrixFn,
    /// Gradient of the objective `∇f(x)`.
    df: VectorFn,
    constraints: Vec<Constraint>,
    x0: Matrix,
}

impl NonlinearProgram {
    pub fn new(f: MatrixFn, df: VectorFn, constraints: Vec<Constraint>, x0: Matrix) -> Self {
        Self {
            f,
            df,
            constraints,
            x0,
        }
    }

    pub fn builder() -> NLPBuilder {
        NLPBuilder::new()
    }

    /// Replaces the initial guess; used to restart from a different point.
    pub fn set_initial_guess(&mut self, x0: Matrix) {
        self.x0 = x0;
    }
}

impl OptimizationProgram for NonlinearProgram {
    fn objective(&self, x: &Matrix) -> Result<Matrix> {
        (self.f)(x)
    }

    fn gradient(&self, x: &Matrix) -> Result<Matrix> {
        (self.df)(x)
    }

    fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    fn initial_guess(&self) -> &Matrix {
        &self.x0
    }
}

pub struct NLPBuilder {
    f: Option<MatrixFn>,
    df: Option<VectorFn>,
    constraints: Vec<Constraint>,
    x0: Option<Matrix>,
}

impl NLPBuilder {
    pub fn new() -> Self {
        Self {
            f: None,
            df: None,
            constraints: Vec::new(),
            x0: None,
        }
    }

    pub fn objective<F, G>(mut self, f: F, df: G) -> Self
    where
        F: Fn(&Matrix) -> Result<Matrix> + 'static,
        G: Fn(&Matrix) -> Result<Matrix> + 'static,
    {
        self.f = Some(Box::new(f));
        self.df = Some(Box::new(df));
        self
    }

    /// Objective given as a scalar dual-number function; the gradient comes from AD.
    pub fn objective_ad<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Dual]) -> Dual + 'static,
    {
        let f = Rc::new(f);
        let f_grad = f.clone();
        self.f = Some(Box::new(move |x: &Matrix| {
            eval_fn(|v: &[Dual]| vec![(*f)(v)], x)
        }));
        self.df = Some(Box::new(move |x: &Matrix| gradient(&*f_grad, x)));
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn equality<F, J>(self, value: F, jac: J) -> Self
    where
        F: Fn(&Matrix) -> Result<Matrix> + 'static,
        J: Fn(&Matrix) -> Result<Matrix> + 'static,
    {
        self.constraint(Constraint::new(
            ConstraintKind::Equality,
            Box::new(value),
            Box::new(jac),
        ))
    }

    pub fn equality_ad<F>(self, f: F) -> Self
    where
        F: Fn(&[Dual]) -> Vec<Dual> + 'static,
    {
        self.constraint(Constraint::from_dual(ConstraintKind::Equality, f))
    }

    pub fn inequality<F, J>(self, value: F, jac: J) -> Self
    where
        F: Fn(&Matrix) -> Result<Matrix> + 'static,
        J: Fn(&Matrix) -> Result<Matrix> + 'static,
    {
        self.constraint(Constraint::new(
            ConstraintKind::Inequality,
            Box::new(value),
            Box::new(jac),
        ))
    }

    pub fn inequality_ad<F>(self, f: F) -> Self
    where
        F: Fn(&[Dual]) -> Vec<Dual> + 'static,
    {
        self.constraint(Constraint::from_dual(ConstraintKind::Inequality, f))
    }

    pub fn initial_guess(mut self, x0: Matrix) -> Self {
        self.x0 = Some(x0);
        self
    }

    pub fn build(self) -> std::result::Result<NonlinearProgram, Problem> {
        let f = self.f.ok_or_else(|| "Objective must be provided".gloss())?;
        let df = self.df.ok_or_else(|| "Gradient must be provided".gloss())?;
        let x0 = self
            .x0
            .ok_or_else(|| "Initial guess must be provided".gloss())?;
        if !x0.is_column_vector() {
            return Err(SolverError::InvalidShape {
                rows: x0.nrows(),
                cols: x0.ncols(),
            }
            .into());
        }

        Ok(NonlinearProgram::new(f, df, self.constraints, x0))
    }
}

impl Default for NLPBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn simple_nlp() -> NonlinearProgram {
        NonlinearProgram::builder()
            .objective_ad(|x| (x[0] - 1.).powi(2) + (x[1] - 2.).powi(2))
            .equality_ad(|x| vec![x[0] + x[1] - 3.])
            .inequality(
                |x| Ok(Matrix::from_column(vec![x.get(0, 0)])),
                |_x| Ok(Matrix::from_row(vec![1., 0.])),
            )
            .initial_guess(Matrix::from_column(vec![0., 0.]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder() {
        let nlp = simple_nlp();
        let x = Matrix::from_column(vec![2., 0.5]);

        assert_relative_eq!(nlp.objective(&x).unwrap().get(0, 0), 1. + 2.25);
        assert_eq!(nlp.gradient(&x).unwrap().data(), &[2., -3.]);

        let kinds: Vec<ConstraintKind> = nlp.constraints().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, [ConstraintKind::Equality, ConstraintKind::Inequality]);

        let eq = &nlp.constraints()[0];
        assert_eq!((eq.value)(&x).unwrap().data(), &[-0.5]);
        assert_eq!((eq.jacobian)(&x).unwrap().data(), &[1., 1.]);
    }

    #[test]
    fn test_set_initial_guess() {
        let mut nlp = simple_nlp();
        nlp.set_initial_guess(Matrix::from_column(vec![5., 5.]));
        assert_eq!(nlp.initial_guess().data(), &[5., 5.]);
    }

    #[test]
    fn test_builder_requires_parts() {
        assert!(NLPBuilder::new().build().is_err());
        assert!(
            NLPBuilder::new()
                .objective_ad(|x| x[0])
                .build()
                .is_err()
        );
        assert!(
            NLPBuilder::new()
                .objective_ad(|x| x[0])
                .initial_guess(Matrix::ones(2).transpose())
                .build()
                .is_err()
        );
    }
}
