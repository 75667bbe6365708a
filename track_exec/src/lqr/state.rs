//! LQR tracker state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::{finite_horizon_gain, Params};
use crate::{
    cmd::ControlCmd,
    params::InvalidParamError,
    sim_time::SimulationIteration,
    traj::ReferenceTrajectory,
    tracker::{time_step, Fallback, Tracker, TrackerError, TrackerOutput, TrackerReport},
    tracker_utils::{
        conditioning::is_well_conditioned, lateral_error, reference_inputs, reference_window,
        state_error, KinematicBicycle, NumericalError,
    },
    vehicle::{
        InputHessian, InputVector, KinematicState, StateMatrix, StateVector, VehicleParams,
    },
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Single step LQR trajectory tracker.
///
/// Each call linearises the bicycle dynamics once about the reference at the current time,
/// runs a finite horizon Riccati recursion over the remaining lookahead and applies
/// `u_ref - K e` to the state error `e`.
pub struct LqrTracker {
    params: Params,
    vehicle: VehicleParams,
    dynamics: KinematicBicycle,

    q: StateMatrix,
    r: InputHessian,
    qf: StateMatrix,

    fallback: Fallback,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LqrTracker {
    /// Create a new tracker.
    ///
    /// Fails if the parameters are invalid, or if `R` is not positive definite while
    /// regularisation is disabled, since every gain computation would then fail.
    pub fn new(params: Params, vehicle: VehicleParams) -> Result<Self, TrackerError> {
        params.validate()?;
        vehicle.validate()?;

        let q = StateMatrix::from_diagonal(&StateVector::from(params.state_cost_diag));
        let r = InputHessian::from_diagonal(&InputVector::from(params.input_cost_diag));
        let qf = StateMatrix::from_diagonal(&StateVector::from(params.terminal_cost_diag));

        if !params.regularisation.enabled
            && !is_well_conditioned(&r, params.regularisation.min_eigenvalue)
        {
            return Err(InvalidParamError::new(
                "input_cost_diag",
                "R must be positive definite when regularisation is disabled",
            )
            .into());
        }

        Ok(Self {
            dynamics: KinematicBicycle::new(
                vehicle.wheelbase_m,
                params.min_velocity_linearization_ms,
            ),
            fallback: Fallback::new(params.fallback),
            params,
            vehicle,
            q,
            r,
            qf,
        })
    }

    /// Compute the unclipped LQR command over the given reference window.
    fn lqr_cmd(
        &self,
        state: &KinematicState,
        window: &[KinematicState],
        dt: f64,
    ) -> Result<ControlCmd, NumericalError> {
        let horizon = window.len() - 1;

        let z_ref = window[0].to_vector();
        let u_ref = reference_inputs(&window[..2], dt)[0];

        let (a, b) = self.dynamics.linearize(&z_ref, &u_ref, dt);
        let gain = finite_horizon_gain(
            &a,
            &b,
            &self.q,
            &self.r,
            &self.qf,
            horizon,
            &self.params.regularisation,
        )?;

        let error = state_error(&state.to_vector(), &z_ref);
        let u = u_ref - gain * error;

        debug!(
            "LQR: horizon {}, lateral error {:.3} m, heading error {:.3} rad, \
             velocity error {:.3} m/s",
            horizon,
            lateral_error(state, &window[0]),
            error[crate::vehicle::HEADING_IDX],
            error[crate::vehicle::VELOCITY_IDX]
        );

        Ok(ControlCmd::from_input(&u))
    }

    /// Proportional braking used once both the reference and the vehicle are nearly stopped,
    /// where the linearisation no longer says anything useful about steering.
    fn stopping_cmd(&self, state: &KinematicState) -> ControlCmd {
        ControlCmd::new(
            -self.params.stopping_proportional_gain * state.velocity_ms,
            0.0,
        )
    }
}

impl Tracker for LqrTracker {
    fn track_trajectory(
        &mut self,
        current: &SimulationIteration,
        next: &SimulationIteration,
        state: &KinematicState,
        trajectory: &dyn ReferenceTrajectory,
    ) -> Result<TrackerOutput, TrackerError> {
        let dt = time_step(current, next)?;

        let window = reference_window(
            trajectory,
            current.time_point,
            self.params.horizon_steps,
            dt,
        )?;

        let mut report = TrackerReport {
            horizon_len: window.len() - 1,
            ..Default::default()
        };

        let stop_v = self.params.stopping_velocity_ms;
        let raw = if window[0].velocity_ms.abs() <= stop_v && state.velocity_ms.abs() <= stop_v {
            report.stopping = true;
            Ok(self.stopping_cmd(state))
        } else {
            self.lqr_cmd(state, &window, dt)
        };

        // Single shot, a finite command counts as converged
        report.converged = true;
        let cmd = self.fallback.resolve(raw, &self.vehicle, &mut report);

        Ok(TrackerOutput { cmd, report })
    }

    fn name(&self) -> &'static str {
        "lqr"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        sim_time::TimePoint,
        tracker::{FallbackPolicy, FallbackReason},
        traj::generate,
        tracker_utils::RegularisationParams,
        vehicle::{KinematicBicycleModel, MotionModelParams},
    };

    const DT: f64 = 0.1;

    fn iteration(index: usize) -> SimulationIteration {
        SimulationIteration::from_step(TimePoint::default(), index, DT)
    }

    fn tracker() -> LqrTracker {
        LqrTracker::new(Params::default(), VehicleParams::default()).unwrap()
    }

    #[test]
    fn test_straight_line_convergence() {
        let vehicle = VehicleParams::default();
        let model = KinematicBicycleModel::new(vehicle.clone(), MotionModelParams::default())
            .unwrap();
        let mut tracker = tracker();

        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let reference = generate::straight_line(&start, 0.0, 20.0, DT).unwrap();

        // Start half a metre to the left of the reference
        let mut state = KinematicState::new(0.0, 0.5, 0.0, 5.0, 0.0);
        let initial_error = state.y_m.abs();
        let mut late_errors = Vec::new();

        for i in 0..150 {
            let output = tracker
                .track_trajectory(&iteration(i), &iteration(i + 1), &state, &reference)
                .unwrap();
            assert!(output.cmd.is_finite());
            assert_eq!(output.report.fallback, None);

            state = model.propagate_state(&state, &output.cmd, DT).unwrap();

            if i >= 130 {
                let reference_state = reference.state_at(iteration(i + 1).time_point).unwrap();
                late_errors.push(lateral_error(&state, &reference_state).abs());
            }
        }

        assert!(late_errors.iter().all(|e| *e < 0.1 * initial_error));
        assert!(state.heading_rad.abs() < 0.01);
        assert!((state.velocity_ms - 5.0).abs() < 0.05);
    }

    #[test]
    fn test_command_clipped_to_bounds() {
        let vehicle = VehicleParams::default();
        let mut tracker = tracker();

        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let reference = generate::straight_line(&start, 0.0, 10.0, DT).unwrap();

        // Far off the reference and much too fast
        let state = KinematicState::new(0.0, 50.0, 0.0, 25.0, 0.0);
        let output = tracker
            .track_trajectory(&iteration(0), &iteration(1), &state, &reference)
            .unwrap();

        assert_eq!(output.cmd.accel_mss, vehicle.min_accel_mss);
        assert!(
            output.cmd.steer_rate_rads == vehicle.min_steer_rate_rads
                || output.cmd.steer_rate_rads == vehicle.max_steer_rate_rads
        );
        assert!(output.report.clip.accel_clipped);
        assert!(output.report.clip.steer_rate_clipped);
    }

    #[test]
    fn test_horizon_truncation() {
        let mut tracker = tracker();

        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let reference = generate::straight_line(&start, 0.0, 1.0, DT).unwrap();

        let output = tracker
            .track_trajectory(&iteration(0), &iteration(1), &start, &reference)
            .unwrap();
        assert_eq!(output.report.horizon_len, 10);

        // At the very end the last state is held for a single step
        let end = reference.state_at(iteration(10).time_point).unwrap();
        let output = tracker
            .track_trajectory(&iteration(10), &iteration(11), &end, &reference)
            .unwrap();
        assert_eq!(output.report.horizon_len, 1);
        assert!(output.cmd.is_finite());
        assert_eq!(output.report.fallback, None);
    }

    #[test]
    fn test_stopping_controller() {
        let mut tracker = tracker();

        let stopped = KinematicState::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let reference = generate::straight_line(&stopped, 0.0, 2.0, DT).unwrap();

        let state = KinematicState::new(0.0, 0.1, 0.1, 0.1, 0.05);
        let output = tracker
            .track_trajectory(&iteration(0), &iteration(1), &state, &reference)
            .unwrap();

        assert!(output.report.stopping);
        assert!((output.cmd.accel_mss + 0.05).abs() < 1e-12);
        assert_eq!(output.cmd.steer_rate_rads, 0.0);
    }

    #[test]
    fn test_fallback_on_non_finite_state() {
        let params = Params {
            fallback: FallbackPolicy::HoldPrevious,
            ..Default::default()
        };
        let mut tracker = LqrTracker::new(params, VehicleParams::default()).unwrap();

        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let reference = generate::straight_line(&start, 0.0, 5.0, DT).unwrap();

        let offset = KinematicState::new(0.0, 0.2, 0.0, 5.0, 0.0);
        let first = tracker
            .track_trajectory(&iteration(0), &iteration(1), &offset, &reference)
            .unwrap();

        let mut broken = offset;
        broken.y_m = f64::NAN;
        let output = tracker
            .track_trajectory(&iteration(1), &iteration(2), &broken, &reference)
            .unwrap();

        assert_eq!(output.cmd, first.cmd);
        assert_eq!(output.report.fallback, Some(FallbackReason::NonFinite));
        assert!(!output.report.converged);
    }

    #[test]
    fn test_config_errors() {
        let singular_r = Params {
            input_cost_diag: [0.0, 1.0],
            regularisation: RegularisationParams {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            LqrTracker::new(singular_r, VehicleParams::default()),
            Err(TrackerError::InvalidConfig(_))
        ));

        // The same cost is usable once regularisation is enabled
        let regularised = Params {
            input_cost_diag: [0.0, 1.0],
            ..Default::default()
        };
        assert!(LqrTracker::new(regularised, VehicleParams::default()).is_ok());

        let mut tracker = tracker();
        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let reference = generate::straight_line(&start, 0.0, 5.0, DT).unwrap();
        assert!(matches!(
            tracker.track_trajectory(&iteration(1), &iteration(1), &start, &reference),
            Err(TrackerError::InvalidTimeStep(_))
        ));
    }
}
