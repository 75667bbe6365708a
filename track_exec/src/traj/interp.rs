//! Linearly interpolated reference trajectory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{ReferenceTrajectory, TrajError};
use crate::{sim_time::TimePoint, vehicle::KinematicState};
use util::maths::{ang_diff, lerp, lerp_angle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory interpolating linearly between timestamped states.
///
/// Headings are interpolated along the shortest arc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolatedTrajectory {
    times: Vec<TimePoint>,
    states: Vec<KinematicState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InterpolatedTrajectory {
    /// Create a new trajectory from timestamped states.
    ///
    /// At least one state is required and timestamps must be strictly increasing.
    pub fn new(samples: Vec<(TimePoint, KinematicState)>) -> Result<Self, TrajError> {
        if samples.is_empty() {
            return Err(TrajError::TooFewStates(1));
        }

        if let Some(i) = samples.windows(2).position(|w| w[1].0 <= w[0].0) {
            return Err(TrajError::NonMonotonicTime(i + 1));
        }

        let (times, states) = samples.into_iter().unzip();

        Ok(Self { times, states })
    }

    /// Create a trajectory from timestamped poses `(x_m, y_m, heading_rad)`, deriving the
    /// velocity, acceleration and steering angle by finite differences.
    ///
    /// Velocity is the displacement projected onto the heading, so it is negative when moving
    /// backwards. The final state repeats the last derived velocity and steering angle.
    pub fn from_poses(
        times: &[TimePoint],
        poses: &[(f64, f64, f64)],
        wheelbase_m: f64,
    ) -> Result<Self, TrajError> {
        if poses.len() != times.len() {
            return Err(TrajError::LengthMismatch {
                expected: times.len(),
                found: poses.len(),
            });
        }
        if poses.len() < 2 {
            return Err(TrajError::TooFewStates(2));
        }
        if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(TrajError::NonMonotonicTime(i + 1));
        }

        let num_steps = poses.len() - 1;

        // Velocity and steering over each step
        let mut velocities = Vec::with_capacity(poses.len());
        let mut steers = Vec::with_capacity(poses.len());
        for k in 0..num_steps {
            let dt = times[k + 1].seconds_since(&times[k]);
            let (x0, y0, h0) = poses[k];
            let (x1, y1, h1) = poses[k + 1];

            let v = ((x1 - x0) * h0.cos() + (y1 - y0) * h0.sin()) / dt;
            let yaw_rate = ang_diff(h1, h0) / dt;

            velocities.push(v);
            steers.push(if v.abs() > f64::EPSILON {
                (wheelbase_m * yaw_rate / v).atan()
            } else {
                0.0
            });
        }
        velocities.push(velocities[num_steps - 1]);
        steers.push(steers[num_steps - 1]);

        let samples = (0..poses.len())
            .map(|k| {
                let accel_mss = if k < num_steps {
                    (velocities[k + 1] - velocities[k]) / times[k + 1].seconds_since(&times[k])
                } else {
                    0.0
                };
                let (x_m, y_m, heading_rad) = poses[k];
                let mut state =
                    KinematicState::new(x_m, y_m, heading_rad, velocities[k], steers[k]);
                state.accel_mss = accel_mss;

                (times[k], state)
            })
            .collect();

        Self::new(samples)
    }

    pub fn states(&self) -> &[KinematicState] {
        &self.states
    }

    pub fn times(&self) -> &[TimePoint] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl ReferenceTrajectory for InterpolatedTrajectory {
    fn start_time(&self) -> TimePoint {
        self.times[0]
    }

    fn end_time(&self) -> TimePoint {
        self.times[self.times.len() - 1]
    }

    fn state_at(&self, time: TimePoint) -> Result<KinematicState, TrajError> {
        if time < self.start_time() || time > self.end_time() {
            return Err(TrajError::TimeOutOfRange {
                time_s: time.time_s(),
                start_s: self.start_time().time_s(),
                end_s: self.end_time().time_s(),
            });
        }

        // Index of the first state strictly after the requested time
        let upper = self.times.partition_point(|t| *t <= time);
        if upper == self.times.len() {
            return Ok(self.states[upper - 1]);
        }

        let (t0, t1) = (self.times[upper - 1], self.times[upper]);
        let (s0, s1) = (&self.states[upper - 1], &self.states[upper]);
        let frac = time.seconds_since(&t0) / t1.seconds_since(&t0);

        Ok(KinematicState {
            x_m: lerp(s0.x_m, s1.x_m, frac),
            y_m: lerp(s0.y_m, s1.y_m, frac),
            heading_rad: lerp_angle(s0.heading_rad, s1.heading_rad, frac),
            velocity_ms: lerp(s0.velocity_ms, s1.velocity_ms, frac),
            accel_mss: lerp(s0.accel_mss, s1.accel_mss, frac),
            steer_angle_rad: lerp(s0.steer_angle_rad, s1.steer_angle_rad, frac),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_new_validation() {
        let state = KinematicState::default();

        assert_eq!(
            InterpolatedTrajectory::new(vec![]).unwrap_err(),
            TrajError::TooFewStates(1)
        );
        assert_eq!(
            InterpolatedTrajectory::new(vec![
                (TimePoint::from_s(0.0), state),
                (TimePoint::from_s(1.0), state),
                (TimePoint::from_s(1.0), state),
            ])
            .unwrap_err(),
            TrajError::NonMonotonicTime(2)
        );
    }

    #[test]
    fn test_state_at() {
        let a = KinematicState::new(0.0, 0.0, PI - 0.1, 2.0, 0.0);
        let b = KinematicState::new(2.0, 4.0, -PI + 0.1, 4.0, 0.2);
        let traj = InterpolatedTrajectory::new(vec![
            (TimePoint::from_s(0.0), a),
            (TimePoint::from_s(2.0), b),
        ])
        .unwrap();

        let mid = traj.state_at(TimePoint::from_s(0.5)).unwrap();
        assert!((mid.x_m - 0.5).abs() < 1e-12);
        assert!((mid.y_m - 1.0).abs() < 1e-12);
        assert!((mid.velocity_ms - 2.5).abs() < 1e-12);
        assert!((mid.steer_angle_rad - 0.05).abs() < 1e-12);

        // Heading goes the short way round through pi
        assert!((mid.heading_rad - (PI - 0.05)).abs() < 1e-9);

        assert_eq!(traj.state_at(TimePoint::from_s(2.0)).unwrap(), b);
        assert!(traj.state_at(TimePoint::from_s(-0.1)).is_err());
    }

    #[test]
    fn test_from_poses() {
        let wheelbase_m = 2.5;
        let curvature_m = 0.1;
        let speed_ms = 5.0;
        let dt = 0.1;

        // Poses sampled from an arc
        let times: Vec<TimePoint> = (0..20).map(|k| TimePoint::from_s(k as f64 * dt)).collect();
        let poses: Vec<(f64, f64, f64)> = times
            .iter()
            .map(|t| {
                let heading = speed_ms * curvature_m * t.time_s();
                (
                    heading.sin() / curvature_m,
                    (1.0 - heading.cos()) / curvature_m,
                    heading,
                )
            })
            .collect();

        let traj = InterpolatedTrajectory::from_poses(&times, &poses, wheelbase_m).unwrap();

        // The chord is slightly shorter than the arc
        let expected_steer = (wheelbase_m * curvature_m).atan();
        for state in traj.states() {
            assert!((state.velocity_ms - speed_ms).abs() < 0.05);
            assert!((state.steer_angle_rad - expected_steer).abs() < 0.01);
        }

        assert!(matches!(
            InterpolatedTrajectory::from_poses(&times[..3], &poses[..2], wheelbase_m),
            Err(TrajError::LengthMismatch { .. })
        ));
    }
}
