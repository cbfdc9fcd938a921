//! Thin driver executing a schedule against user operators.
//!
//! - [`ForwardOperator`] / [`AdjointOperator`]: the physics, supplied by the caller
//! - [`Revolver`]: forward sweep to the turn, then the adjoint sweep
//! - [`run_independent`]: one traversal per item on the rayon pool

mod operator;
mod parallel;
mod revolver;

pub use operator::{AdjointOperator, ForwardOperator};
pub use parallel::{run_independent, sum_independent};
pub use revolver::{RunStats, Revolver};
