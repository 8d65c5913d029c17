//! # Forward-Mode Automatic Differentiation
//!
//! Exact first derivatives for functions written against [`Dual`]. A function
//! `F: &[Dual] -> Vec<Dual>` built only from the arithmetic on [`Dual`] (sums,
//! products, quotients, powers, `exp`, `ln`, `sqrt`, negation) can be handed to
//! [`jacobian`](jacobian::jacobian), which sweeps one forward pass per input
//! dimension, or to [`eval_fn`](jacobian::eval_fn) for a value-only pass.
//! Functions that branch on values or call non-differentiable primitives are
//! not detected and give meaningless tangents.

pub mod dual;
pub mod jacobian;

pub use dual::Dual;
