//! Receding horizon iLQR tracker

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use super::{IlqrSolver, IlqrTrackerParams, SolverError};
use crate::{
    cmd::{ClipReport, ControlCmd},
    sim_time::SimulationIteration,
    traj::ReferenceTrajectory,
    tracker::{time_step, Fallback, Tracker, TrackerError, TrackerOutput, TrackerReport},
    tracker_utils::{reference_inputs, reference_window, NumericalError},
    vehicle::{KinematicState, StateVector, VehicleParams},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tracker solving an iLQR problem over the upcoming reference at every step and applying only
/// the first input. Nothing is carried between calls apart from the fallback command.
pub struct IlqrTracker {
    horizon_steps: usize,
    solver: IlqrSolver,
    vehicle: VehicleParams,
    fallback: Fallback,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl IlqrTracker {
    pub fn new(params: IlqrTrackerParams, vehicle: VehicleParams) -> Result<Self, TrackerError> {
        params.validate()?;

        Ok(Self {
            horizon_steps: params.horizon.num_poses,
            solver: IlqrSolver::new(params.solver, vehicle.clone())?,
            vehicle,
            fallback: Fallback::new(params.fallback),
        })
    }
}

impl Tracker for IlqrTracker {
    fn track_trajectory(
        &mut self,
        current: &SimulationIteration,
        next: &SimulationIteration,
        state: &KinematicState,
        trajectory: &dyn ReferenceTrajectory,
    ) -> Result<TrackerOutput, TrackerError> {
        time_step(current, next)?;
        let dt = self.solver.params().discretization_time_s;

        let window = reference_window(trajectory, current.time_point, self.horizon_steps, dt)?;
        let inputs = reference_inputs(&window, dt);
        let reference: Vec<StateVector> = window.iter().map(|s| s.to_vector()).collect();

        let mut report = TrackerReport {
            horizon_len: inputs.len(),
            ..Default::default()
        };

        let mut solver_clip = ClipReport::default();

        let raw = match self.solver.solve(&state.to_vector(), &reference, &inputs) {
            Ok(solution) => {
                solver_clip = solution.first_input_clip;
                report.iterations = solution.iterations;
                report.cost = Some(solution.cost);
                report.converged = solution.converged;

                if !solution.converged {
                    debug!(
                        "iLQR did not converge ({:?}), applying best input found",
                        solution.termination
                    );
                }

                Ok(ControlCmd::from_input(&solution.inputs[0]))
            }
            Err(SolverError::NonFinite(what)) => Err(NumericalError::NonFinite(what)),
            Err(e) => return Err(e.into()),
        };

        let cmd = self.fallback.resolve(raw, &self.vehicle, &mut report);

        // The solver applies the limits inside its rollouts, so the first input usually arrives
        // already within them
        if report.fallback.is_none() {
            if solver_clip.any() {
                warn!(
                    "iLQR first input limited by the vehicle constraints: {:?}",
                    solver_clip
                );
            }
            report.clip = report.clip.union(&solver_clip);
        }

        Ok(TrackerOutput { cmd, report })
    }

    fn name(&self) -> &'static str {
        "ilqr"
    }
}
