use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;
use crate::linalg::vector_ops::{cwise_multiply, norm_inf, norm_l2};
use crate::nlp::{ConstraintKind, OptimizationProgram};
use crate::{E, I};

/// Dimensions of a program, fixed when a solve starts.
///
/// Constraints are split by kind once here; each block's output dimension is
/// learned by evaluating it at the initial guess.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSize {
    pub n_var: I,
    pub n_eq: I,
    pub n_ineq: I,
    /// `(constraint index, rows)` of every equality block, in declaration order.
    equality: Vec<(I, I)>,
    /// `(constraint index, rows)` of every inequality block, in declaration order.
    inequality: Vec<(I, I)>,
}

impl ProblemSize {
    pub fn compute<P: OptimizationProgram + ?Sized>(program: &P, x0: &Matrix) -> Result<Self> {
        if !x0.is_column_vector() {
            return Err(SolverError::InvalidShape {
                rows: x0.nrows(),
                cols: x0.ncols(),
            });
        }

        let mut equality = Vec::new();
        let mut inequality = Vec::new();
        for (index, constraint) in program.constraints().iter().enumerate() {
            let value = (constraint.value)(x0)?;
            value.require_column("constraint value")?;
            match constraint.kind {
                ConstraintKind::Equality => equality.push((index, value.nrows())),
                ConstraintKind::Inequality => inequality.push((index, value.nrows())),
            }
        }

        Ok(Self {
            n_var: x0.nrows(),
            n_eq: equality.iter().map(|(_, rows)| rows).sum(),
            n_ineq: inequality.iter().map(|(_, rows)| rows).sum(),
            equality,
            inequality,
        })
    }

    fn blocks(&self, kind: ConstraintKind) -> (&[(I, I)], I) {
        match kind {
            ConstraintKind::Equality => (&self.equality, self.n_eq),
            ConstraintKind::Inequality => (&self.inequality, self.n_ineq),
        }
    }

    /// Stacked values of all constraints of `kind` at `x`.
    pub fn constraint_values<P: OptimizationProgram + ?Sized>(
        &self,
        program: &P,
        kind: ConstraintKind,
        x: &Matrix,
    ) -> Result<Matrix> {
        let (blocks, total) = self.blocks(kind);
        let constraints = program.constraints();
        let mut data = Vec::with_capacity(total);
        for &(index, rows) in blocks {
            let value = (constraints[index].value)(x)?;
            if value.shape() != (rows, 1) {
                return Err(SolverError::mismatch("constraint value", value.shape(), (rows, 1)));
            }
            data.extend_from_slice(value.data());
        }
        Ok(Matrix::from_column(data))
    }

    /// Stacked Jacobians of all constraints of `kind` at `x`.
    pub fn constraint_jacobians<P: OptimizationProgram + ?Sized>(
        &self,
        program: &P,
        kind: ConstraintKind,
        x: &Matrix,
    ) -> Result<Matrix> {
        let (blocks, total) = self.blocks(kind);
        let constraints = program.constraints();
        let mut data = Vec::with_capacity(total * self.n_var);
        for &(index, rows) in blocks {
            let jac = (constraints[index].jacobian)(x)?;
            if jac.shape() != (rows, self.n_var) {
                return Err(SolverError::mismatch(
                    "constraint jacobian",
                    jac.shape(),
                    (rows, self.n_var),
                ));
            }
            data.extend_from_slice(jac.data());
        }
        Matrix::new(total, self.n_var, data)
    }
}

/// Problem functions evaluated at one primal point.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub grad_f: Matrix,
    pub g: Matrix,
    pub h: Matrix,
    pub jg: Matrix,
    pub jh: Matrix,
}

impl Evaluation {
    pub fn compute<P: OptimizationProgram + ?Sized>(
        program: &P,
        size: &ProblemSize,
        x: &Matrix,
    ) -> Result<Self> {
        let grad_f = program.gradient(x)?;
        if grad_f.shape() != (size.n_var, 1) {
            return Err(SolverError::mismatch("gradient", grad_f.shape(), (size.n_var, 1)));
        }

        let eval = Self {
            grad_f,
            g: size.constraint_values(program, ConstraintKind::Equality, x)?,
            h: size.constraint_values(program, ConstraintKind::Inequality, x)?,
            jg: size.constraint_jacobians(program, ConstraintKind::Equality, x)?,
            jh: size.constraint_jacobians(program, ConstraintKind::Inequality, x)?,
        };
        eval.require_finite()?;
        Ok(eval)
    }

    /// Rejects NaN or infinite problem values, which the norms would otherwise hide.
    fn require_finite(&self) -> Result<()> {
        let parts = [
            ("gradient", &self.grad_f),
            ("equality constraint", &self.g),
            ("inequality constraint", &self.h),
            ("equality jacobian", &self.jg),
            ("inequality jacobian", &self.jh),
        ];
        for (quantity, m) in parts {
            if let Some(&value) = m.data().iter().find(|v| !v.is_finite()) {
                return Err(SolverError::NumericalBreakdown { quantity, value });
            }
        }
        Ok(())
    }

    /// `∇f(x) - Jg(x)ᵀ y - Jh(x)ᵀ z`.
    pub fn lagrangian_gradient(&self, y: &Matrix, z: &Matrix) -> Result<Matrix> {
        self.grad_f
            .subtract(&self.jg.transpose().multiply(y)?)?
            .subtract(&self.jh.transpose().multiply(z)?)
    }
}

/// Residuals of the perturbed KKT conditions at an iterate `(x, s, y, z)`.
#[derive(Clone, Debug)]
pub struct Residual {
    /// Dual feasibility: `∇f - Jgᵀ y - Jhᵀ z`.
    pub dual_feasibility: Matrix,
    /// Unshifted complementarity `s ∘ z`.
    pub complementarity: Matrix,
    /// `g(x)`.
    pub primal_eq: Matrix,
    /// `h(x) - s`.
    pub primal_ineq: Matrix,
}

impl Residual {
    pub fn compute(eval: &Evaluation, s: &Matrix, y: &Matrix, z: &Matrix) -> Result<Self> {
        Ok(Self {
            dual_feasibility: eval.lagrangian_gradient(y, z)?,
            complementarity: cwise_multiply(s, z)?,
            primal_eq: eval.g.clone(),
            primal_ineq: eval.h.subtract(s)?,
        })
    }

    /// `max(‖g‖₂, ‖h - s‖₂)`.
    pub fn primal_infeasibility(&self) -> E {
        E::max(norm_l2(&self.primal_eq), norm_l2(&self.primal_ineq))
    }

    /// `‖∇f - Jgᵀ y - Jhᵀ z‖∞`.
    pub fn dual_infeasibility(&self) -> E {
        norm_inf(&self.dual_feasibility)
    }

    /// `‖s ∘ z - μ𝟙‖₂`.
    pub fn complementarity_error(&self, mu: E) -> E {
        self.complementarity
            .data()
            .iter()
            .fold(0., |acc: E, sz| acc + (sz - mu) * (sz - mu))
            .sqrt()
    }

    pub fn optimality_error(&self, mu: E) -> E {
        self.primal_infeasibility()
            .max(self.dual_infeasibility())
            .max(self.complementarity_error(mu))
    }

    /// Whether the barrier subproblem for `mu` is solved to within `epsilon`.
    pub fn is_optimal(&self, mu: E, epsilon: E) -> bool {
        self.optimality_error(mu) <= epsilon
    }

    /// Right-hand side of the Newton system for barrier parameter `mu`:
    /// `-[∇L; s∘z - μ𝟙; g; h - s]`.
    pub fn rhs(&self, mu: E) -> Result<Matrix> {
        let shifted = self
            .complementarity
            .subtract(&Matrix::ones(self.complementarity.nrows()).scale(mu))?;
        Ok(Matrix::vstack_columns(&[
            &self.dual_feasibility,
            &shifted,
            &self.primal_eq,
            &self.primal_ineq,
        ])?
        .scale(-1.))
    }
}
