//! # Vehicle module
//!
//! The kinematic state of the vehicle, its physical limits and the motion model used to
//! propagate it through one simulation step.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod motion_model;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use motion_model::*;
pub use params::*;
pub use state::*;
