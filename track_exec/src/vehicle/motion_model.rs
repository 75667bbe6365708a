//! Kinematic bicycle motion model
//!
//! Propagates the actual vehicle state through one simulation step given a tracker command.
//! The actuators respond through optional first-order lags, after which the same forward-Euler
//! bicycle dynamics the trackers linearise are integrated, and the resulting velocity and
//! steering angle are saturated at the vehicle's limits.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{InputVector, KinematicState, VehicleParams, STEER_ANGLE_IDX, VELOCITY_IDX};
use crate::cmd::ControlCmd;
use crate::params::{check_non_negative, check_positive, InvalidParamError};
use crate::tracker_utils::KinematicBicycle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the motion model's actuator response.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MotionModelParams {
    /// Time constant of the first-order lag on acceleration, zero for an ideal actuator.
    ///
    /// Units: seconds
    pub accel_time_constant_s: f64,

    /// Time constant of the first-order lag on steering angle, zero for an ideal actuator.
    ///
    /// Units: seconds
    pub steer_angle_time_constant_s: f64,
}

/// Motion model propagating the vehicle state under a control command.
#[derive(Debug, Clone)]
pub struct KinematicBicycleModel {
    vehicle: VehicleParams,
    params: MotionModelParams,
    dynamics: KinematicBicycle,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicBicycleModel {
    pub fn new(
        vehicle: VehicleParams,
        params: MotionModelParams,
    ) -> Result<Self, InvalidParamError> {
        vehicle.validate()?;
        check_non_negative("accel_time_constant_s", params.accel_time_constant_s)?;
        check_non_negative(
            "steer_angle_time_constant_s",
            params.steer_angle_time_constant_s,
        )?;

        Ok(Self {
            dynamics: KinematicBicycle::new(vehicle.wheelbase_m, 0.0),
            vehicle,
            params,
        })
    }

    pub fn vehicle(&self) -> &VehicleParams {
        &self.vehicle
    }

    /// Propagate the state by `dt_s` seconds under the given command.
    ///
    /// The command is clipped to the vehicle limits before it is applied.
    pub fn propagate_state(
        &self,
        state: &KinematicState,
        cmd: &ControlCmd,
        dt_s: f64,
    ) -> Result<KinematicState, InvalidParamError> {
        check_positive("dt_s", dt_s)?;

        let (cmd, _) = cmd.clip(&self.vehicle);

        // Actuator response
        let accel_mss = first_order_lag(
            state.accel_mss,
            cmd.accel_mss,
            dt_s,
            self.params.accel_time_constant_s,
        );
        let ideal_steer_rad = state.steer_angle_rad + cmd.steer_rate_rads * dt_s;
        let steer_rad = first_order_lag(
            state.steer_angle_rad,
            ideal_steer_rad,
            dt_s,
            self.params.steer_angle_time_constant_s,
        );

        // Effective input seen by the vehicle over this step
        let u = InputVector::new(accel_mss, (steer_rad - state.steer_angle_rad) / dt_s);

        let mut z = self.dynamics.step(&state.to_vector(), &u, dt_s);
        z[VELOCITY_IDX] = z[VELOCITY_IDX].clamp(
            self.vehicle.min_velocity_ms,
            self.vehicle.max_velocity_ms,
        );
        z[STEER_ANGLE_IDX] = z[STEER_ANGLE_IDX].clamp(
            -self.vehicle.max_steer_angle_rad,
            self.vehicle.max_steer_angle_rad,
        );

        Ok(KinematicState::from_vector(&z, accel_mss))
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Discrete first-order lag from `current` towards `target`.
fn first_order_lag(current: f64, target: f64, dt_s: f64, time_constant_s: f64) -> f64 {
    current + dt_s / (dt_s + time_constant_s) * (target - current)
}
