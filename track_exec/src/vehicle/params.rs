//! Parameters describing the vehicle's geometry and physical limits

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::params::{check_positive, check_range, InvalidParamError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleParams {
    // ---- GEOMETRY ----
    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    // ---- STATE LIMITS ----
    /// Maximum absolute front wheel steering angle.
    ///
    /// Units: radians
    pub max_steer_angle_rad: f64,

    /// Minimum longitudinal velocity, zero prevents reversing.
    ///
    /// Units: meters/second
    pub min_velocity_ms: f64,

    /// Maximum longitudinal velocity.
    ///
    /// Units: meters/second
    pub max_velocity_ms: f64,

    // ---- COMMAND LIMITS ----
    /// Acceleration command minimum limit (maximum braking).
    ///
    /// Units: meters/second^2
    pub min_accel_mss: f64,

    /// Acceleration command maximum limit.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Steering rate command minimum limit.
    ///
    /// Units: radians/second
    pub min_steer_rate_rads: f64,

    /// Steering rate command maximum limit.
    ///
    /// Units: radians/second
    pub max_steer_rate_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleParams {
    pub fn validate(&self) -> Result<(), InvalidParamError> {
        check_positive("wheelbase_m", self.wheelbase_m)?;
        check_positive("max_steer_angle_rad", self.max_steer_angle_rad)?;
        if self.max_steer_angle_rad >= std::f64::consts::FRAC_PI_2 {
            return Err(InvalidParamError::new(
                "max_steer_angle_rad",
                "must be below pi/2 for the bicycle model to be defined",
            ));
        }
        check_range("velocity_ms", self.min_velocity_ms, self.max_velocity_ms)?;
        check_range("accel_mss", self.min_accel_mss, self.max_accel_mss)?;
        check_range(
            "steer_rate_rads",
            self.min_steer_rate_rads,
            self.max_steer_rate_rads,
        )?;

        Ok(())
    }
}

impl Default for VehicleParams {
    /// A mid-size passenger car.
    fn default() -> Self {
        Self {
            wheelbase_m: 3.089,
            max_steer_angle_rad: 0.6,
            min_velocity_ms: 0.0,
            max_velocity_ms: 30.0,
            min_accel_mss: -4.0,
            max_accel_mss: 3.0,
            min_steer_rate_rads: -0.5,
            max_steer_rate_rads: 0.5,
        }
    }
}
