//! iLQR solver and tracker parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    params::{check_diagonal, check_non_negative, check_positive, InvalidParamError},
    tracker::FallbackPolicy,
    traj::TrajectorySampling,
    tracker_utils::RegularisationParams,
    vehicle::{INPUT_DIM, STATE_DIM},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance when comparing the horizon interval with the solver's discretisation.
const STEP_TOLERANCE_S: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the iLQR solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlqrSolverParams {
    /// Time step of the discretised dynamics.
    ///
    /// Units: seconds
    pub discretization_time_s: f64,

    // ---- COSTS ----
    /// Diagonal of the state error cost `Q`, ordered `[x, y, heading, velocity, steer_angle]`.
    pub state_cost_diag: [f64; STATE_DIM],

    /// Diagonal of the cost `R` on the deviation from the reference inputs, ordered
    /// `[accel, steer_rate]`.
    pub input_cost_diag: [f64; INPUT_DIM],

    /// Diagonal of the terminal state error cost `Qf`.
    pub terminal_cost_diag: [f64; STATE_DIM],

    // ---- ITERATION ----
    /// Maximum number of backward/forward pass iterations.
    pub max_iterations: usize,

    /// The solve has converged once an iteration improves the cost by less than this fraction.
    pub convergence_threshold: f64,

    /// Number of step sizes tried by the line search before giving up.
    pub max_line_search_steps: usize,

    /// Factor the line search step is multiplied by after each rejected step, in (0, 1).
    pub line_search_shrink: f64,

    /// Optional wall clock budget after which the best solution so far is returned.
    ///
    /// Units: seconds
    #[serde(default)]
    pub max_solve_time_s: Option<f64>,

    // ---- NUMERICS ----
    pub regularisation: RegularisationParams,

    /// Lower bound on the speed used to linearise the heading dynamics.
    ///
    /// Units: meters/second
    pub min_velocity_linearization_ms: f64,

    // ---- WARM START ----
    /// Proportional gain on the velocity error in the initial rollout.
    ///
    /// Units: 1/seconds
    pub k_velocity_error_feedback: f64,

    /// Proportional gain on the steering angle error in the initial rollout.
    ///
    /// Units: 1/seconds
    pub k_steering_angle_error_feedback: f64,
}

/// Parameters for the receding horizon iLQR tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlqrTrackerParams {
    /// Sampling of the reference handed to the solver. The interval must equal the solver's
    /// discretisation time.
    pub horizon: TrajectorySampling,

    pub solver: IlqrSolverParams,

    pub fallback: FallbackPolicy,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl IlqrSolverParams {
    pub fn validate(&self) -> Result<(), InvalidParamError> {
        check_positive("discretization_time_s", self.discretization_time_s)?;
        check_diagonal("state_cost_diag", &self.state_cost_diag)?;
        check_diagonal("input_cost_diag", &self.input_cost_diag)?;
        check_diagonal("terminal_cost_diag", &self.terminal_cost_diag)?;
        if self.max_iterations == 0 {
            return Err(InvalidParamError::new("max_iterations", "must be at least 1"));
        }
        check_non_negative("convergence_threshold", self.convergence_threshold)?;
        if self.max_line_search_steps == 0 {
            return Err(InvalidParamError::new(
                "max_line_search_steps",
                "must be at least 1",
            ));
        }
        if !(self.line_search_shrink > 0.0 && self.line_search_shrink < 1.0) {
            return Err(InvalidParamError::new(
                "line_search_shrink",
                format!("expected a value in (0, 1), found {}", self.line_search_shrink),
            ));
        }
        if let Some(t) = self.max_solve_time_s {
            check_positive("max_solve_time_s", t)?;
        }
        self.regularisation.validate()?;
        check_positive(
            "min_velocity_linearization_ms",
            self.min_velocity_linearization_ms,
        )?;
        check_non_negative("k_velocity_error_feedback", self.k_velocity_error_feedback)?;
        check_non_negative(
            "k_steering_angle_error_feedback",
            self.k_steering_angle_error_feedback,
        )?;

        Ok(())
    }
}

impl Default for IlqrSolverParams {
    fn default() -> Self {
        Self {
            discretization_time_s: 0.1,
            state_cost_diag: [1.0, 1.0, 10.0, 0.0, 0.0],
            input_cost_diag: [1.0, 10.0],
            terminal_cost_diag: [1.0, 1.0, 10.0, 0.0, 0.0],
            max_iterations: 20,
            convergence_threshold: 1e-6,
            max_line_search_steps: 10,
            line_search_shrink: 0.5,
            max_solve_time_s: None,
            regularisation: RegularisationParams::default(),
            min_velocity_linearization_ms: 0.01,
            k_velocity_error_feedback: 0.5,
            k_steering_angle_error_feedback: 0.05,
        }
    }
}

impl IlqrTrackerParams {
    pub fn validate(&self) -> Result<(), InvalidParamError> {
        self.solver.validate()?;

        if (self.horizon.step_time() - self.solver.discretization_time_s).abs() > STEP_TOLERANCE_S
        {
            return Err(InvalidParamError::new(
                "horizon",
                format!(
                    "interval length {} s must equal the solver discretization time {} s",
                    self.horizon.step_time(),
                    self.solver.discretization_time_s
                ),
            ));
        }

        Ok(())
    }
}

impl Default for IlqrTrackerParams {
    fn default() -> Self {
        Self {
            horizon: TrajectorySampling {
                num_poses: 40,
                time_horizon_s: 4.0,
                interval_length_s: 0.1,
            },
            solver: IlqrSolverParams::default(),
            fallback: FallbackPolicy::HoldPrevious,
        }
    }
}
