//! Kinematic state of the vehicle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

// Internal
use util::maths::norm_angle;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Dimension of the state vector `[x, y, heading, velocity, steer_angle]`
pub const STATE_DIM: usize = 5;

/// Dimension of the input vector `[accel, steer_rate]`
pub const INPUT_DIM: usize = 2;

pub const X_IDX: usize = 0;
pub const Y_IDX: usize = 1;
pub const HEADING_IDX: usize = 2;
pub const VELOCITY_IDX: usize = 3;
pub const STEER_ANGLE_IDX: usize = 4;

pub const ACCEL_IDX: usize = 0;
pub const STEER_RATE_IDX: usize = 1;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

pub type StateVector = SVector<f64, STATE_DIM>;
pub type InputVector = SVector<f64, INPUT_DIM>;

/// State transition sensitivity, `A`
pub type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;

/// Control sensitivity, `B`
pub type InputMatrix = SMatrix<f64, STATE_DIM, INPUT_DIM>;

/// Feedback gain mapping a state error onto an input, `K`
pub type GainMatrix = SMatrix<f64, INPUT_DIM, STATE_DIM>;

/// Hessian of a cost with respect to the inputs
pub type InputHessian = SMatrix<f64, INPUT_DIM, INPUT_DIM>;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic state of the rear axle of the vehicle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    /// Position along the global X axis.
    ///
    /// Units: meters
    pub x_m: f64,

    /// Position along the global Y axis.
    ///
    /// Units: meters
    pub y_m: f64,

    /// Heading, the angle to the positive X axis, normalised to (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Longitudinal velocity.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Longitudinal acceleration.
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,

    /// Front wheel steering angle.
    ///
    /// Units: radians
    pub steer_angle_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicState {
    /// Create a new state with zero acceleration. The heading is normalised.
    pub fn new(
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
        velocity_ms: f64,
        steer_angle_rad: f64,
    ) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad: norm_angle(heading_rad),
            velocity_ms,
            accel_mss: 0.0,
            steer_angle_rad,
        }
    }

    /// Build a state from a state vector and the acceleration, which the vector doesn't hold.
    pub fn from_vector(z: &StateVector, accel_mss: f64) -> Self {
        Self {
            x_m: z[X_IDX],
            y_m: z[Y_IDX],
            heading_rad: norm_angle(z[HEADING_IDX]),
            velocity_ms: z[VELOCITY_IDX],
            accel_mss,
            steer_angle_rad: z[STEER_ANGLE_IDX],
        }
    }

    pub fn to_vector(&self) -> StateVector {
        StateVector::new(
            self.x_m,
            self.y_m,
            self.heading_rad,
            self.velocity_ms,
            self.steer_angle_rad,
        )
    }

    /// Path curvature implied by the steering angle.
    ///
    /// Units: 1/meters
    pub fn curvature_m(&self, wheelbase_m: f64) -> f64 {
        self.steer_angle_rad.tan() / wheelbase_m
    }

    pub fn is_finite(&self) -> bool {
        [
            self.x_m,
            self.y_m,
            self.heading_rad,
            self.velocity_ms,
            self.accel_mss,
            self.steer_angle_rad,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
