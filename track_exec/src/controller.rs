//! Two-stage controller
//!
//! Couples a tracker with the motion model: the tracker picks a command from the actual state
//! and the reference, and the motion model propagates the state under that command to give
//! the state at the next iteration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{
    sim_time::SimulationIteration,
    traj::ReferenceTrajectory,
    tracker::{time_step, Tracker, TrackerError, TrackerOutput},
    vehicle::{KinematicBicycleModel, KinematicState},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TwoStageController {
    tracker: Box<dyn Tracker>,
    motion_model: KinematicBicycleModel,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TwoStageController {
    pub fn new(tracker: Box<dyn Tracker>, motion_model: KinematicBicycleModel) -> Self {
        Self {
            tracker,
            motion_model,
        }
    }

    pub fn tracker_name(&self) -> &'static str {
        self.tracker.name()
    }

    pub fn motion_model(&self) -> &KinematicBicycleModel {
        &self.motion_model
    }

    /// Compute the command for this iteration and propagate the state to `next`.
    pub fn update_state(
        &mut self,
        current: &SimulationIteration,
        next: &SimulationIteration,
        state: &KinematicState,
        trajectory: &dyn ReferenceTrajectory,
    ) -> Result<(KinematicState, TrackerOutput), TrackerError> {
        let dt = time_step(current, next)?;

        let output = self
            .tracker
            .track_trajectory(current, next, state, trajectory)?;
        let next_state = self.motion_model.propagate_state(state, &output.cmd, dt)?;

        Ok((next_state, output))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        lqr::{self, LqrTracker},
        sim_time::TimePoint,
        traj::generate,
        vehicle::{MotionModelParams, VehicleParams},
    };

    #[test]
    fn test_update_state() {
        let vehicle = VehicleParams::default();
        let tracker = LqrTracker::new(lqr::Params::default(), vehicle.clone()).unwrap();
        let model = KinematicBicycleModel::new(vehicle, MotionModelParams::default()).unwrap();
        let mut controller = TwoStageController::new(Box::new(tracker), model);

        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let reference = generate::straight_line(&start, 0.0, 5.0, 0.1).unwrap();

        let current = SimulationIteration::from_step(TimePoint::default(), 0, 0.1);
        let next = SimulationIteration::from_step(TimePoint::default(), 1, 0.1);

        // On the reference, the vehicle stays on it
        let (next_state, output) = controller
            .update_state(&current, &next, &start, &reference)
            .unwrap();

        assert_eq!(controller.tracker_name(), "lqr");
        assert_eq!(output.report.fallback, None);
        assert!((next_state.x_m - 0.5).abs() < 1e-9);
        assert!(next_state.y_m.abs() < 1e-9);
        assert!((next_state.velocity_ms - 5.0).abs() < 1e-9);
    }
}
