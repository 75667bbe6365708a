//! Control commands produced by the trackers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::vehicle::{InputVector, VehicleParams, ACCEL_IDX, STEER_RATE_IDX};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command for the next simulation step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCmd {
    /// Longitudinal acceleration demand.
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,

    /// Front wheel steering rate demand.
    ///
    /// Units: radians/second
    pub steer_rate_rads: f64,
}

/// Which components of a command were limited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipReport {
    pub accel_clipped: bool,
    pub steer_rate_clipped: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlCmd {
    pub fn new(accel_mss: f64, steer_rate_rads: f64) -> Self {
        Self {
            accel_mss,
            steer_rate_rads,
        }
    }

    /// A command holding the current speed and steering angle.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_input(u: &InputVector) -> Self {
        Self {
            accel_mss: u[ACCEL_IDX],
            steer_rate_rads: u[STEER_RATE_IDX],
        }
    }

    pub fn to_input(&self) -> InputVector {
        InputVector::new(self.accel_mss, self.steer_rate_rads)
    }

    pub fn is_finite(&self) -> bool {
        self.accel_mss.is_finite() && self.steer_rate_rads.is_finite()
    }

    /// Clip each component into the vehicle's command limits.
    ///
    /// The command must be finite, NaN components are not clipped.
    pub fn clip(&self, vehicle: &VehicleParams) -> (ControlCmd, ClipReport) {
        let accel_mss = self
            .accel_mss
            .clamp(vehicle.min_accel_mss, vehicle.max_accel_mss);
        let steer_rate_rads = self
            .steer_rate_rads
            .clamp(vehicle.min_steer_rate_rads, vehicle.max_steer_rate_rads);

        let report = ClipReport {
            accel_clipped: accel_mss != self.accel_mss,
            steer_rate_clipped: steer_rate_rads != self.steer_rate_rads,
        };

        (
            ControlCmd {
                accel_mss,
                steer_rate_rads,
            },
            report,
        )
    }
}

impl ClipReport {
    pub fn any(&self) -> bool {
        self.accel_clipped || self.steer_rate_clipped
    }

    /// Components clipped in either report.
    pub fn union(&self, other: &ClipReport) -> ClipReport {
        ClipReport {
            accel_clipped: self.accel_clipped || other.accel_clipped,
            steer_rate_clipped: self.steer_rate_clipped || other.steer_rate_clipped,
        }
    }
}
