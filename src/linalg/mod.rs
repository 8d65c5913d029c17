pub mod block;
pub mod lu;
pub mod matrix;
pub mod solver;
pub mod vector_ops;
