//! # Tracker interface
//!
//! A tracker turns the actual vehicle state and a borrowed reference trajectory into a single
//! control command for the next simulation step. Numerical problems never surface as errors,
//! the tracker falls back to a safe command and flags the failure in its report. Only
//! configuration and trajectory query errors are returned to the caller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::{Deserialize, Serialize};

// Internal
use crate::{
    cmd::{ClipReport, ControlCmd},
    ilqr::SolverError,
    params::InvalidParamError,
    sim_time::SimulationIteration,
    traj::{ReferenceTrajectory, TrajError},
    tracker_utils::NumericalError,
    vehicle::{KinematicState, VehicleParams},
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trajectory tracking controller.
pub trait Tracker: Send {
    /// Compute the command to apply between `current` and `next`.
    ///
    /// The trajectory is only borrowed for this call, nothing derived from it is kept apart
    /// from the last command issued, which the fallback policy may reuse.
    fn track_trajectory(
        &mut self,
        current: &SimulationIteration,
        next: &SimulationIteration,
        state: &KinematicState,
        trajectory: &dyn ReferenceTrajectory,
    ) -> Result<TrackerOutput, TrackerError>;

    /// Short name used in logs and archives.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The output of one tracking call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerOutput {
    pub cmd: ControlCmd,
    pub report: TrackerReport,
}

/// Diagnostics describing how a command was produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerReport {
    /// Number of steps the controller looked ahead, after truncation at the trajectory end
    pub horizon_len: usize,

    /// Solver iterations, zero for single shot controllers
    pub iterations: usize,

    /// Final cost of the solve, if one was performed
    pub cost: Option<f64>,

    /// Whether the solve met its convergence criterion
    pub converged: bool,

    /// Command components which were clipped to the vehicle limits
    pub clip: ClipReport,

    /// Set if the command is a fallback rather than the controller's output
    pub fallback: Option<FallbackReason>,

    /// True if the low speed stopping controller produced the command
    pub stopping: bool,
}

/// Remembers the last command so that it can be reused if the controller fails.
#[derive(Debug, Clone)]
pub struct Fallback {
    policy: FallbackPolicy,
    last_cmd: ControlCmd,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The command issued when the controller cannot produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackPolicy {
    /// Repeat the previous command, zero on the first call
    HoldPrevious,

    /// Command zero acceleration and steering rate
    Zero,
}

/// Why a fallback command was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    NotPositiveDefinite,
    RegularisationExhausted,
    NonFinite,
}

/// Errors which are returned to the caller of a tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid tracker configuration: {0}")]
    InvalidConfig(#[from] InvalidParamError),

    #[error("Could not query the reference trajectory: {0}")]
    Traj(#[from] TrajError),

    #[error("Could not set up the solver: {0}")]
    Solver(#[from] SolverError),

    #[error("The simulation step must be positive, found {0} s")]
    InvalidTimeStep(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Fallback {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            policy,
            last_cmd: ControlCmd::zero(),
        }
    }

    /// The command the policy would issue now.
    pub fn fallback_cmd(&self) -> ControlCmd {
        match self.policy {
            FallbackPolicy::HoldPrevious => self.last_cmd,
            FallbackPolicy::Zero => ControlCmd::zero(),
        }
    }

    /// Turn the controller's raw command into the command to issue.
    ///
    /// Finite commands are clipped to the vehicle limits. Failures and non-finite commands are
    /// replaced by the fallback command. The clipping and any fallback are recorded in
    /// `report`, and the issued command becomes the new previous command.
    pub fn resolve(
        &mut self,
        raw: Result<ControlCmd, NumericalError>,
        vehicle: &VehicleParams,
        report: &mut TrackerReport,
    ) -> ControlCmd {
        let reason = match raw {
            Ok(cmd) if cmd.is_finite() => {
                let (clipped, clip) = cmd.clip(vehicle);
                if clip.any() {
                    warn!(
                        "Command clipped to the vehicle limits: ({:.3}, {:.3}) -> ({:.3}, {:.3})",
                        cmd.accel_mss,
                        cmd.steer_rate_rads,
                        clipped.accel_mss,
                        clipped.steer_rate_rads
                    );
                }
                report.clip = clip;
                self.last_cmd = clipped;

                return clipped;
            }
            Ok(_) => FallbackReason::NonFinite,
            Err(ref e) => {
                warn!("Tracker numerical failure: {}", e);
                FallbackReason::from(e)
            }
        };

        // The previous command was already within limits, but the zero command may not be
        let (cmd, clip) = self.fallback_cmd().clip(vehicle);
        warn!(
            "Issuing {:?} fallback command ({:.3}, {:.3}) due to {:?}",
            self.policy, cmd.accel_mss, cmd.steer_rate_rads, reason
        );

        report.clip = clip;
        report.fallback = Some(reason);
        report.converged = false;
        self.last_cmd = cmd;

        cmd
    }
}

impl From<&NumericalError> for FallbackReason {
    fn from(e: &NumericalError) -> Self {
        match e {
            NumericalError::NotPositiveDefinite => FallbackReason::NotPositiveDefinite,
            NumericalError::RegularisationExhausted { .. } => {
                FallbackReason::RegularisationExhausted
            }
            NumericalError::NonFinite(_) => FallbackReason::NonFinite,
        }
    }
}

/// Step size between two iterations, which must be positive.
pub(crate) fn time_step(
    current: &SimulationIteration,
    next: &SimulationIteration,
) -> Result<f64, TrackerError> {
    let dt = current.step_to(next);
    if dt > 0.0 {
        Ok(dt)
    } else {
        Err(TrackerError::InvalidTimeStep(dt))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_clips() {
        let vehicle = VehicleParams::default();
        let mut fallback = Fallback::new(FallbackPolicy::HoldPrevious);
        let mut report = TrackerReport::default();

        let cmd = fallback.resolve(Ok(ControlCmd::new(10.0, 0.1)), &vehicle, &mut report);
        assert_eq!(cmd, ControlCmd::new(vehicle.max_accel_mss, 0.1));
        assert!(report.clip.accel_clipped);
        assert_eq!(report.fallback, None);
    }

    #[test]
    fn test_hold_previous() {
        let vehicle = VehicleParams::default();
        let mut fallback = Fallback::new(FallbackPolicy::HoldPrevious);

        let mut report = TrackerReport::default();
        let first = fallback.resolve(Ok(ControlCmd::new(1.0, -0.2)), &vehicle, &mut report);

        let mut report = TrackerReport::default();
        let cmd = fallback.resolve(Ok(ControlCmd::new(f64::NAN, 0.0)), &vehicle, &mut report);
        assert_eq!(cmd, first);
        assert_eq!(report.fallback, Some(FallbackReason::NonFinite));

        let mut report = TrackerReport::default();
        let cmd = fallback.resolve(
            Err(NumericalError::RegularisationExhausted { mu: 1e7 }),
            &vehicle,
            &mut report,
        );
        assert_eq!(cmd, first);
        assert_eq!(
            report.fallback,
            Some(FallbackReason::RegularisationExhausted)
        );
    }

    #[test]
    fn test_zero_policy() {
        let vehicle = VehicleParams::default();
        let mut fallback = Fallback::new(FallbackPolicy::Zero);
        let mut report = TrackerReport::default();

        fallback.resolve(Ok(ControlCmd::new(1.0, -0.2)), &vehicle, &mut report);
        let cmd = fallback.resolve(
            Err(NumericalError::NotPositiveDefinite),
            &vehicle,
            &mut report,
        );

        assert_eq!(cmd, ControlCmd::zero());
        assert!(cmd.is_finite());
        assert_eq!(report.fallback, Some(FallbackReason::NotPositiveDefinite));
    }

    #[test]
    fn test_time_step() {
        let current = SimulationIteration::from_step(Default::default(), 3, 0.1);
        let next = SimulationIteration::from_step(Default::default(), 4, 0.1);

        assert!((time_step(&current, &next).unwrap() - 0.1).abs() < 1e-12);
        assert!(matches!(
            time_step(&next, &current),
            Err(TrackerError::InvalidTimeStep(_))
        ));
    }
}
