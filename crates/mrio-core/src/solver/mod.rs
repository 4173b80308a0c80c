//! Linear-system backends, dense and sparse.
//!
//! These solve square systems; they know nothing about input-output
//! economics. The Leontief solver in `mrio-algo` chooses a backend by
//! [`SolverKind`] and validates the result itself.

pub mod backend;
pub mod registry;

pub use backend::{
    FaerSolver, Factorization, GaussSolver, LinearSystemBackend, SparseLuSolver,
};
pub use registry::SolverKind;
