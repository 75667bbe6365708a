//! Reference trajectory generators
//!
//! Analytic references used by the closed-loop simulation and the tracker tests. Both sample
//! the exact solution of the continuous bicycle model, so a perfect tracker following them sees
//! no error beyond the discretisation of its own model.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{InterpolatedTrajectory, TrajError};
use crate::{sim_time::TimePoint, vehicle::KinematicState};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Curvatures below this are treated as straight.
const MIN_CURVATURE_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// A straight line along the start heading with constant acceleration.
///
/// If the acceleration brings the vehicle to a stop it stays stopped for the rest of the
/// duration. Timestamps start at zero.
pub fn straight_line(
    start: &KinematicState,
    accel_mss: f64,
    duration_s: f64,
    step_s: f64,
) -> Result<InterpolatedTrajectory, TrajError> {
    let v0 = start.velocity_ms;

    // Time at which the speed reaches zero, if it ever does
    let stop_time_s = if accel_mss < 0.0 && v0 > 0.0 {
        -v0 / accel_mss
    } else {
        f64::INFINITY
    };

    sample(duration_s, step_s, |t| {
        let t_moving = t.min(stop_time_s);
        let velocity_ms = if t >= stop_time_s {
            0.0
        } else {
            v0 + accel_mss * t
        };
        let dist_m = v0 * t_moving + 0.5 * accel_mss * t_moving * t_moving;

        KinematicState {
            x_m: start.x_m + dist_m * start.heading_rad.cos(),
            y_m: start.y_m + dist_m * start.heading_rad.sin(),
            heading_rad: start.heading_rad,
            velocity_ms,
            accel_mss: if t >= stop_time_s { 0.0 } else { accel_mss },
            steer_angle_rad: 0.0,
        }
    })
}

/// A circular arc of the given curvature at the start velocity, positive curvature turning
/// left. Timestamps start at zero.
pub fn constant_curvature(
    start: &KinematicState,
    curvature_m: f64,
    duration_s: f64,
    step_s: f64,
    wheelbase_m: f64,
) -> Result<InterpolatedTrajectory, TrajError> {
    if curvature_m.abs() < MIN_CURVATURE_M {
        return straight_line(start, 0.0, duration_s, step_s);
    }

    let v = start.velocity_ms;
    let h0 = start.heading_rad;
    let steer_angle_rad = (wheelbase_m * curvature_m).atan();

    sample(duration_s, step_s, |t| {
        let heading = h0 + v * curvature_m * t;

        KinematicState::new(
            start.x_m + (heading.sin() - h0.sin()) / curvature_m,
            start.y_m - (heading.cos() - h0.cos()) / curvature_m,
            heading,
            v,
            steer_angle_rad,
        )
    })
}

/// Sample `state_at` every `step_s` seconds over `duration_s`, including both ends.
fn sample<F>(duration_s: f64, step_s: f64, state_at: F) -> Result<InterpolatedTrajectory, TrajError>
where
    F: Fn(f64) -> KinematicState,
{
    if !(step_s.is_finite() && step_s > 0.0) {
        return Err(TrajError::InvalidStep(step_s));
    }

    let num_steps = if duration_s.is_finite() {
        (duration_s / step_s).round() as usize
    } else {
        0
    };
    if num_steps == 0 {
        return Err(TrajError::TooFewStates(2));
    }

    let step_us = TimePoint::from_s(step_s).time_us;

    InterpolatedTrajectory::new(
        (0..=num_steps)
            .map(|k| {
                let time = TimePoint::from_us(k as i64 * step_us);
                (time, state_at(time.time_s()))
            })
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::ReferenceTrajectory;

    #[test]
    fn test_straight_line_stops() {
        let start = KinematicState::new(1.0, 1.0, std::f64::consts::FRAC_PI_2, 4.0, 0.0);
        let traj = straight_line(&start, -2.0, 4.0, 0.5).unwrap();

        assert_eq!(traj.len(), 9);
        assert_eq!(traj.end_time(), TimePoint::from_s(4.0));

        // Stopped after 2 s having covered 4 m, then holds
        let last = traj.states()[8];
        assert_eq!(last.velocity_ms, 0.0);
        assert!((last.y_m - 5.0).abs() < 1e-9);
        assert!((last.x_m - 1.0).abs() < 1e-9);
        assert!(traj.states().iter().all(|s| s.velocity_ms >= 0.0));
    }

    #[test]
    fn test_constant_curvature() {
        let wheelbase_m = 3.0;
        let curvature_m = 0.05;
        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let traj = constant_curvature(&start, curvature_m, 4.0, 0.1, wheelbase_m).unwrap();

        // Every point lies on the circle centred at (0, 1/curvature)
        let radius = 1.0 / curvature_m;
        for s in traj.states() {
            let dist = (s.x_m.powi(2) + (s.y_m - radius).powi(2)).sqrt();
            assert!((dist - radius).abs() < 1e-9);
            assert!((s.curvature_m(wheelbase_m) - curvature_m).abs() < 1e-12);
        }

        assert!(constant_curvature(&start, curvature_m, 0.01, 0.1, wheelbase_m).is_err());
        assert!(constant_curvature(&start, curvature_m, 1.0, 0.0, wheelbase_m).is_err());
    }

    #[test]
    fn test_long_arc_heading_wrapped() {
        let start = KinematicState::new(0.0, 0.0, 3.0, 5.0, 0.0);

        // More than two full turns
        let traj = constant_curvature(&start, 0.05, 60.0, 0.1, 3.0).unwrap();

        let pi = std::f64::consts::PI;
        assert!(traj
            .states()
            .iter()
            .all(|s| s.heading_rad > -pi && s.heading_rad <= pi));
    }
}
