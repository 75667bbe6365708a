//! # Tracking library.
//!
//! Classical-control trajectory tracking for a kinematic bicycle vehicle. Two trackers are
//! provided behind the common [`tracker::Tracker`] interface:
//!
//! - [`lqr::LqrTracker`], a single-step finite-horizon LQR feedback controller,
//! - [`ilqr::IlqrTracker`], a receding-horizon wrapper around the [`ilqr::IlqrSolver`].
//!
//! Both borrow the reference trajectory for the duration of one call and return a clipped
//! [`cmd::ControlCmd`] together with a diagnostic [`tracker::TrackerReport`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control commands and their limits
pub mod cmd;

/// Tracker plus motion model, produces the predicted next state
pub mod controller;

/// iLQR solver and tracker
pub mod ilqr;

/// LQR tracker
pub mod lqr;

/// Shared parameter validation
pub mod params;

/// Closed-loop scenarios used by the simulation executable
pub mod scenario;

/// Simulation time points and iterations
pub mod sim_time;

/// Reference trajectories
pub mod traj;

/// The common tracker interface
pub mod tracker;

/// Maths shared by the trackers - linearisation, errors and conditioning
pub mod tracker_utils;

/// Vehicle state, parameters and motion model
pub mod vehicle;
