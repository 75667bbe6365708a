//! Discrete kinematic bicycle dynamics and their analytic linearisation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::vehicle::{
    InputMatrix, InputVector, StateMatrix, StateVector, ACCEL_IDX, HEADING_IDX, STEER_ANGLE_IDX,
    STEER_RATE_IDX, VELOCITY_IDX, X_IDX, Y_IDX,
};
use util::maths::norm_angle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Forward-Euler kinematic bicycle model referenced to the rear axle.
///
/// ```text
/// x+     = x + v cos(heading) dt
/// y+     = y + v sin(heading) dt
/// head+  = head + v tan(steer) / L dt
/// v+     = v + accel dt
/// steer+ = steer + steer_rate dt
/// ```
#[derive(Debug, Clone, Copy)]
pub struct KinematicBicycle {
    wheelbase_m: f64,

    /// Lower bound on the magnitude of the velocity used in the heading partials, keeps the
    /// steering controllable when linearising at standstill.
    min_velocity_linearization_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicBicycle {
    pub fn new(wheelbase_m: f64, min_velocity_linearization_ms: f64) -> Self {
        Self {
            wheelbase_m,
            min_velocity_linearization_ms,
        }
    }

    pub fn wheelbase_m(&self) -> f64 {
        self.wheelbase_m
    }

    /// Propagate the state vector through one step. The heading of the result is normalised.
    pub fn step(&self, z: &StateVector, u: &InputVector, dt: f64) -> StateVector {
        let heading = z[HEADING_IDX];
        let velocity = z[VELOCITY_IDX];
        let steer = z[STEER_ANGLE_IDX];

        StateVector::new(
            z[X_IDX] + velocity * heading.cos() * dt,
            z[Y_IDX] + velocity * heading.sin() * dt,
            norm_angle(heading + velocity * steer.tan() / self.wheelbase_m * dt),
            velocity + u[ACCEL_IDX] * dt,
            steer + u[STEER_RATE_IDX] * dt,
        )
    }

    /// Jacobians `(A, B)` of [`step`](Self::step) with respect to the state and the input,
    /// evaluated at `(z, u)`.
    ///
    /// The dynamics are affine in the input so `B` only depends on `dt`, `u` is accepted to
    /// keep the operating point explicit.
    pub fn linearize(
        &self,
        z: &StateVector,
        _u: &InputVector,
        dt: f64,
    ) -> (StateMatrix, InputMatrix) {
        let heading = z[HEADING_IDX];
        let steer = z[STEER_ANGLE_IDX];
        let velocity = self.linearization_velocity(z[VELOCITY_IDX]);

        let mut a = StateMatrix::identity();
        a[(X_IDX, HEADING_IDX)] = -velocity * heading.sin() * dt;
        a[(X_IDX, VELOCITY_IDX)] = heading.cos() * dt;
        a[(Y_IDX, HEADING_IDX)] = velocity * heading.cos() * dt;
        a[(Y_IDX, VELOCITY_IDX)] = heading.sin() * dt;
        a[(HEADING_IDX, VELOCITY_IDX)] = steer.tan() / self.wheelbase_m * dt;
        a[(HEADING_IDX, STEER_ANGLE_IDX)] =
            velocity / (self.wheelbase_m * steer.cos().powi(2)) * dt;

        let mut b = InputMatrix::zeros();
        b[(VELOCITY_IDX, ACCEL_IDX)] = dt;
        b[(STEER_ANGLE_IDX, STEER_RATE_IDX)] = dt;

        (a, b)
    }

    /// Velocity bounded away from zero, keeping its sign.
    fn linearization_velocity(&self, velocity: f64) -> f64 {
        if velocity.abs() >= self.min_velocity_linearization_ms {
            velocity
        } else if velocity < 0.0 {
            -self.min_velocity_linearization_ms
        } else {
            self.min_velocity_linearization_ms
        }
    }
}
