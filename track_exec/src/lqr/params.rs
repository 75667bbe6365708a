//! LQR tracker parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    params::{check_diagonal, check_non_negative, check_positive, InvalidParamError},
    tracker::FallbackPolicy,
    tracker_utils::RegularisationParams,
    vehicle::{INPUT_DIM, STATE_DIM},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the LQR tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- HORIZON ----
    /// Number of simulation steps the Riccati recursion looks ahead.
    pub horizon_steps: usize,

    // ---- COSTS ----
    /// Diagonal of the state error cost `Q`, ordered `[x, y, heading, velocity, steer_angle]`.
    pub state_cost_diag: [f64; STATE_DIM],

    /// Diagonal of the input cost `R`, ordered `[accel, steer_rate]`.
    pub input_cost_diag: [f64; INPUT_DIM],

    /// Diagonal of the terminal state error cost `Qf`.
    pub terminal_cost_diag: [f64; STATE_DIM],

    // ---- NUMERICS ----
    pub regularisation: RegularisationParams,

    /// Lower bound on the speed used to linearise the heading dynamics, which keeps the
    /// linearisation controllable at standstill.
    ///
    /// Units: meters/second
    pub min_velocity_linearization_ms: f64,

    // ---- STOPPING ----
    /// Below this speed, for both the reference and the vehicle, the stopping controller is
    /// used instead of LQR.
    ///
    /// Units: meters/second
    pub stopping_velocity_ms: f64,

    /// Proportional gain of the stopping controller on the vehicle speed.
    ///
    /// Units: 1/seconds
    pub stopping_proportional_gain: f64,

    pub fallback: FallbackPolicy,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), InvalidParamError> {
        if self.horizon_steps == 0 {
            return Err(InvalidParamError::new("horizon_steps", "must be at least 1"));
        }
        check_diagonal("state_cost_diag", &self.state_cost_diag)?;
        check_diagonal("input_cost_diag", &self.input_cost_diag)?;
        check_diagonal("terminal_cost_diag", &self.terminal_cost_diag)?;
        self.regularisation.validate()?;
        check_positive(
            "min_velocity_linearization_ms",
            self.min_velocity_linearization_ms,
        )?;
        check_non_negative("stopping_velocity_ms", self.stopping_velocity_ms)?;
        check_non_negative("stopping_proportional_gain", self.stopping_proportional_gain)?;

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            horizon_steps: 50,
            state_cost_diag: [1.0, 1.0, 1.0, 1.0, 1.0],
            input_cost_diag: [1.0, 1.0],
            terminal_cost_diag: [1.0, 1.0, 1.0, 1.0, 1.0],
            regularisation: RegularisationParams::default(),
            min_velocity_linearization_ms: 0.01,
            stopping_velocity_ms: 0.2,
            stopping_proportional_gain: 0.5,
            fallback: FallbackPolicy::HoldPrevious,
        }
    }
}
