//! # LQR tracker
//!
//! A single step feedback controller. At every call the kinematic bicycle model is linearised
//! about the reference state at the current time, a finite horizon Riccati recursion is run
//! backwards from the terminal cost over the remaining lookahead, and the resulting gain is
//! applied to the state error on top of the reference's own inputs.
//!
//! The lookahead shrinks as the reference runs out. Once both the reference and the vehicle
//! are nearly stopped a proportional stopping controller takes over.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
mod riccati;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use riccati::finite_horizon_gain;
pub use state::LqrTracker;
