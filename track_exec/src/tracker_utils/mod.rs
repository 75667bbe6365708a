//! # Tracker utilities
//!
//! Maths shared by the LQR and iLQR trackers: the bicycle dynamics and their linearisation,
//! angle-wrap-safe state errors, the conditioning guard used around every inversion, and the
//! extraction of reference inputs from a window of reference states.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod conditioning;
mod dynamics;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use conditioning::{Damping, NumericalError, RegularisationParams};
pub use dynamics::KinematicBicycle;

use crate::{
    sim_time::TimePoint,
    traj::{ReferenceTrajectory, TrajError},
    vehicle::{InputVector, KinematicState, StateVector, HEADING_IDX},
};
use util::maths::ang_diff;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Componentwise difference `actual - reference`, with the heading component wrapped to the
/// shortest signed angle so errors either side of +-pi stay small.
pub fn state_error(actual: &StateVector, reference: &StateVector) -> StateVector {
    let mut error = actual - reference;
    error[HEADING_IDX] = ang_diff(actual[HEADING_IDX], reference[HEADING_IDX]);
    error
}

/// Signed lateral distance of `actual` from the reference pose, positive to the left of the
/// reference heading.
pub fn lateral_error(actual: &KinematicState, reference: &KinematicState) -> f64 {
    let dx = actual.x_m - reference.x_m;
    let dy = actual.y_m - reference.y_m;

    -reference.heading_rad.sin() * dx + reference.heading_rad.cos() * dy
}

/// Inputs which carry each reference state onto the next under the bicycle dynamics.
///
/// The acceleration and steering rate are the finite differences of the reference velocity
/// and steering angle over `dt`. One input is produced per step, so the result has one fewer
/// element than `window`.
pub fn reference_inputs(window: &[KinematicState], dt: f64) -> Vec<InputVector> {
    window
        .windows(2)
        .map(|pair| {
            InputVector::new(
                (pair[1].velocity_ms - pair[0].velocity_ms) / dt,
                (pair[1].steer_angle_rad - pair[0].steer_angle_rad) / dt,
            )
        })
        .collect()
}

/// Sample up to `horizon` steps of the reference starting at `start`.
///
/// The horizon is truncated to what remains of the trajectory. When nothing remains the last
/// state is held for a single step, so the result always contains at least two states.
pub fn reference_window(
    trajectory: &dyn ReferenceTrajectory,
    start: TimePoint,
    horizon: usize,
    dt: f64,
) -> Result<Vec<KinematicState>, TrajError> {
    let mut window = trajectory.sample_window(start, horizon, dt)?;

    if window.len() < 2 {
        let mut held = window[0];
        held.accel_mss = 0.0;
        window.push(held);
    }

    Ok(window)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::InterpolatedTrajectory;
    use std::f64::consts::PI;

    #[test]
    fn test_state_error_heading_wrap() {
        let eps = 1e-3;
        let actual = StateVector::new(1.0, 2.0, PI - eps, 5.0, 0.1);
        let reference = StateVector::new(0.5, 2.5, -PI + eps, 4.0, 0.0);

        let error = state_error(&actual, &reference);

        assert!((error[HEADING_IDX] + 2.0 * eps).abs() < 1e-9);
        assert!(error[HEADING_IDX].abs() < 3.0 * eps);
        assert!((error[0] - 0.5).abs() < 1e-12);
        assert!((error[1] + 0.5).abs() < 1e-12);
        assert!((error[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lateral_error() {
        let reference = KinematicState::new(0.0, 0.0, PI / 2.0, 1.0, 0.0);

        // Heading along +Y, so -X is to the left
        let actual = KinematicState::new(-1.0, 3.0, PI / 2.0, 1.0, 0.0);
        assert!((lateral_error(&actual, &reference) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reference_inputs() {
        let mut a = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let mut b = a;
        b.velocity_ms = 5.5;
        b.steer_angle_rad = 0.02;
        a.x_m = -0.5;

        let inputs = reference_inputs(&[a, b], 0.1);
        assert_eq!(inputs.len(), 1);
        assert!((inputs[0][0] - 5.0).abs() < 1e-9);
        assert!((inputs[0][1] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_reference_window_holds_last_state() {
        let state = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let traj = InterpolatedTrajectory::new(vec![
            (TimePoint::from_s(0.0), state),
            (TimePoint::from_s(1.0), state),
        ])
        .unwrap();

        let window = reference_window(&traj, TimePoint::from_s(1.0), 10, 0.1).unwrap();
        assert_eq!(window.len(), 2);

        let window = reference_window(&traj, TimePoint::from_s(0.5), 10, 0.1).unwrap();
        assert_eq!(window.len(), 6);
    }
}
