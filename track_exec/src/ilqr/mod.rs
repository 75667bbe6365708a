//! # iLQR
//!
//! The iterative LQR solver and the receding horizon tracker built on it. The tracker samples
//! the reference over the solver's horizon from the current time, solves from the actual
//! state and keeps only the first input. Each call starts from a fresh warm start rollout.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod solver;
mod tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::{IlqrSolverParams, IlqrTrackerParams};
pub use solver::{IlqrSolution, IlqrSolver, SolverError, Termination};
pub use tracker::IlqrTracker;
