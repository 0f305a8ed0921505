//! Numerical primitives for the Jacobi halo solver.

pub mod matrix;
pub mod serial;
pub mod stencil;
