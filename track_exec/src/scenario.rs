//! # Closed loop scenarios
//!
//! A scenario is a reference trajectory, an initial offset from it and a choice of tracker. The
//! closed loop runner steps a [`TwoStageController`] along the reference and hands a flat
//! record of every step to the caller, who decides where it goes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::{Deserialize, Serialize};

// Internal
use crate::{
    controller::TwoStageController,
    ilqr::{IlqrTracker, IlqrTrackerParams},
    lqr::{self, LqrTracker},
    params::{check_positive, InvalidParamError},
    sim_time::SimulationIteration,
    traj::{generate, InterpolatedTrajectory, ReferenceTrajectory, TrajError},
    tracker::{Tracker, TrackerError, TrackerOutput},
    tracker_utils::lateral_error,
    vehicle::{KinematicBicycleModel, KinematicState, MotionModelParams, VehicleParams},
};
use util::maths::{ang_diff, norm_angle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the closed loop simulation executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Parameter files, relative to the parameter directory
    pub vehicle_params_file: String,
    pub motion_model_params_file: String,
    pub lqr_params_file: String,
    pub ilqr_params_file: String,

    pub scenarios: Vec<ScenarioParams>,
}

/// One closed loop scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Name, also used as the archive directory
    pub name: String,

    pub tracker: TrackerKind,

    pub shape: ReferenceShape,

    /// Initial speed of the reference.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Duration of the reference, and of the simulation.
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Simulation step.
    ///
    /// Units: seconds
    pub step_s: f64,

    // ---- INITIAL OFFSETS ----
    /// Units: meters, positive to the left
    #[serde(default)]
    pub initial_lateral_offset_m: f64,

    /// Units: radians
    #[serde(default)]
    pub initial_heading_offset_rad: f64,

    /// Units: meters/second
    #[serde(default)]
    pub initial_speed_offset_ms: f64,
}

/// Everything recorded about one simulation step. Flat so that it can be archived as CSV.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub time_s: f64,

    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub velocity_ms: f64,
    pub steer_angle_rad: f64,

    pub ref_x_m: f64,
    pub ref_y_m: f64,
    pub ref_heading_rad: f64,
    pub ref_velocity_ms: f64,

    pub lateral_error_m: f64,
    pub heading_error_rad: f64,

    pub accel_cmd_mss: f64,
    pub steer_rate_cmd_rads: f64,

    pub horizon_len: usize,
    pub iterations: usize,
    pub cost: Option<f64>,
    pub converged: bool,
    pub clipped: bool,
    pub fallback: bool,
    pub stopping: bool,
}

/// Summary statistics of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub tracker: TrackerKind,
    pub num_steps: usize,

    pub max_abs_lateral_error_m: f64,
    pub rms_lateral_error_m: f64,
    pub final_lateral_error_m: f64,
    pub max_abs_heading_error_rad: f64,

    pub num_clipped: usize,
    pub num_fallbacks: usize,
    pub num_not_converged: usize,
    pub mean_iterations: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerKind {
    Lqr,
    Ilqr,
}

/// Shape of the reference trajectory, starting at the origin heading along +X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReferenceShape {
    Straight { accel_mss: f64 },
    Arc { curvature_m: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScenarioParams {
    pub fn validate(&self) -> Result<(), InvalidParamError> {
        check_positive("step_s", self.step_s)?;
        check_positive("duration_s", self.duration_s)?;
        if self.duration_s < self.step_s {
            return Err(InvalidParamError::new(
                "duration_s",
                "must cover at least one step",
            ));
        }

        Ok(())
    }

    /// Number of simulation steps, the last of which ends at the end of the reference.
    pub fn num_steps(&self) -> usize {
        (self.duration_s / self.step_s).round() as usize
    }

    /// Build the reference trajectory, sampled at the simulation step.
    pub fn build_reference(
        &self,
        vehicle: &VehicleParams,
    ) -> Result<InterpolatedTrajectory, TrajError> {
        let start = KinematicState::new(0.0, 0.0, 0.0, self.speed_ms, 0.0);

        match self.shape {
            ReferenceShape::Straight { accel_mss } => {
                generate::straight_line(&start, accel_mss, self.duration_s, self.step_s)
            }
            ReferenceShape::Arc { curvature_m } => generate::constant_curvature(
                &start,
                curvature_m,
                self.duration_s,
                self.step_s,
                vehicle.wheelbase_m,
            ),
        }
    }

    /// The first reference state moved by the configured offsets.
    pub fn initial_state(
        &self,
        reference: &dyn ReferenceTrajectory,
    ) -> Result<KinematicState, TrajError> {
        let mut state = reference.state_at(reference.start_time())?;
        let heading = state.heading_rad;

        state.x_m -= heading.sin() * self.initial_lateral_offset_m;
        state.y_m += heading.cos() * self.initial_lateral_offset_m;
        state.heading_rad = norm_angle(heading + self.initial_heading_offset_rad);
        state.velocity_ms += self.initial_speed_offset_ms;

        Ok(state)
    }
}

impl StepRecord {
    pub fn new(
        iteration: &SimulationIteration,
        state: &KinematicState,
        reference: &KinematicState,
        output: &TrackerOutput,
    ) -> Self {
        Self {
            index: iteration.index,
            time_s: iteration.time_s(),
            x_m: state.x_m,
            y_m: state.y_m,
            heading_rad: state.heading_rad,
            velocity_ms: state.velocity_ms,
            steer_angle_rad: state.steer_angle_rad,
            ref_x_m: reference.x_m,
            ref_y_m: reference.y_m,
            ref_heading_rad: reference.heading_rad,
            ref_velocity_ms: reference.velocity_ms,
            lateral_error_m: lateral_error(state, reference),
            heading_error_rad: ang_diff(state.heading_rad, reference.heading_rad),
            accel_cmd_mss: output.cmd.accel_mss,
            steer_rate_cmd_rads: output.cmd.steer_rate_rads,
            horizon_len: output.report.horizon_len,
            iterations: output.report.iterations,
            cost: output.report.cost,
            converged: output.report.converged,
            clipped: output.report.clip.any(),
            fallback: output.report.fallback.is_some(),
            stopping: output.report.stopping,
        }
    }
}

impl ScenarioSummary {
    pub fn from_records(name: &str, tracker: TrackerKind, records: &[StepRecord]) -> Self {
        let num_steps = records.len();
        let n = num_steps.max(1) as f64;

        Self {
            name: name.to_string(),
            tracker,
            num_steps,
            max_abs_lateral_error_m: records
                .iter()
                .map(|r| r.lateral_error_m.abs())
                .fold(0.0, f64::max),
            rms_lateral_error_m: (records
                .iter()
                .map(|r| r.lateral_error_m.powi(2))
                .sum::<f64>()
                / n)
                .sqrt(),
            final_lateral_error_m: records.last().map(|r| r.lateral_error_m).unwrap_or(0.0),
            max_abs_heading_error_rad: records
                .iter()
                .map(|r| r.heading_error_rad.abs())
                .fold(0.0, f64::max),
            num_clipped: records.iter().filter(|r| r.clipped).count(),
            num_fallbacks: records.iter().filter(|r| r.fallback).count(),
            num_not_converged: records.iter().filter(|r| !r.converged).count(),
            mean_iterations: records.iter().map(|r| r.iterations as f64).sum::<f64>() / n,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the controller for a scenario.
pub fn build_controller(
    kind: TrackerKind,
    vehicle: &VehicleParams,
    motion_model: &MotionModelParams,
    lqr_params: &lqr::Params,
    ilqr_params: &IlqrTrackerParams,
) -> Result<TwoStageController, TrackerError> {
    let tracker: Box<dyn Tracker> = match kind {
        TrackerKind::Lqr => Box::new(LqrTracker::new(lqr_params.clone(), vehicle.clone())?),
        TrackerKind::Ilqr => Box::new(IlqrTracker::new(ilqr_params.clone(), vehicle.clone())?),
    };
    let model = KinematicBicycleModel::new(vehicle.clone(), motion_model.clone())?;

    Ok(TwoStageController::new(tracker, model))
}

/// Run the controller along the reference for `num_steps` steps of `step_s`, calling `on_step`
/// with the record of each step.
///
/// Returns the final state.
pub fn run_closed_loop<F>(
    controller: &mut TwoStageController,
    reference: &dyn ReferenceTrajectory,
    initial: KinematicState,
    step_s: f64,
    num_steps: usize,
    mut on_step: F,
) -> Result<KinematicState, TrackerError>
where
    F: FnMut(&StepRecord),
{
    let start = reference.start_time();
    let mut state = initial;

    for index in 0..num_steps {
        let current = SimulationIteration::from_step(start, index, step_s);
        let next = SimulationIteration::from_step(start, index + 1, step_s);

        let reference_state = reference.state_at(current.time_point)?;
        let (next_state, output) = controller.update_state(&current, &next, &state, reference)?;

        on_step(&StepRecord::new(&current, &state, &reference_state, &output));

        state = next_state;
    }

    info!(
        "{} closed loop finished after {} steps at ({:.2}, {:.2})",
        controller.tracker_name(),
        num_steps,
        state.x_m,
        state.y_m
    );

    Ok(state)
}

#[cfg(test)]
mod test {
    use super::*;

    const SIM_TOML: &str = r#"
        vehicle_params_file = "vehicle.toml"
        motion_model_params_file = "motion_model.toml"
        lqr_params_file = "lqr_tracker.toml"
        ilqr_params_file = "ilqr_tracker.toml"

        [[scenarios]]
        name = "straight_offset"
        tracker = "Lqr"
        shape = { type = "Straight", accel_mss = 0.0 }
        speed_ms = 5.0
        duration_s = 10.0
        step_s = 0.1
        initial_lateral_offset_m = 0.5

        [[scenarios]]
        name = "arc"
        tracker = "Ilqr"
        shape = { type = "Arc", curvature_m = 0.05 }
        speed_ms = 5.0
        duration_s = 10.0
        step_s = 0.1
    "#;

    #[test]
    fn test_parse_sim_params() {
        let params: SimParams = util::params::parse(SIM_TOML).unwrap();

        assert_eq!(params.scenarios.len(), 2);
        assert_eq!(params.scenarios[0].tracker, TrackerKind::Lqr);
        assert_eq!(
            params.scenarios[1].shape,
            ReferenceShape::Arc { curvature_m: 0.05 }
        );
        assert_eq!(params.scenarios[1].initial_lateral_offset_m, 0.0);
        assert_eq!(params.scenarios[0].num_steps(), 100);
        assert!(params.scenarios.iter().all(|s| s.validate().is_ok()));
    }

    #[test]
    fn test_shipped_params() {
        let sim: SimParams =
            util::params::parse(include_str!("../../params/track_sim.toml")).unwrap();
        assert!(sim.scenarios.iter().all(|s| s.validate().is_ok()));

        let vehicle: VehicleParams =
            util::params::parse(include_str!("../../params/vehicle.toml")).unwrap();
        let motion_model: MotionModelParams =
            util::params::parse(include_str!("../../params/motion_model.toml")).unwrap();
        let lqr_params: lqr::Params =
            util::params::parse(include_str!("../../params/lqr_tracker.toml")).unwrap();
        let ilqr_params: IlqrTrackerParams =
            util::params::parse(include_str!("../../params/ilqr_tracker.toml")).unwrap();
        assert_eq!(ilqr_params.horizon.num_poses, 40);

        // No wall clock budget, so runs are repeatable
        assert_eq!(ilqr_params.solver.max_solve_time_s, None);

        for kind in [TrackerKind::Lqr, TrackerKind::Ilqr].iter() {
            assert!(
                build_controller(*kind, &vehicle, &motion_model, &lqr_params, &ilqr_params)
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_initial_state() {
        let params: SimParams = util::params::parse(SIM_TOML).unwrap();
        let scenario = &params.scenarios[0];
        let reference = scenario.build_reference(&VehicleParams::default()).unwrap();

        let initial = scenario.initial_state(&reference).unwrap();
        let first = reference.states()[0];
        assert!((lateral_error(&initial, &first) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_run_closed_loop() {
        let params: SimParams = util::params::parse(SIM_TOML).unwrap();
        let vehicle = VehicleParams::default();

        for scenario in &params.scenarios {
            let reference = scenario.build_reference(&vehicle).unwrap();
            let mut controller = build_controller(
                scenario.tracker,
                &vehicle,
                &MotionModelParams::default(),
                &lqr::Params::default(),
                &IlqrTrackerParams::default(),
            )
            .unwrap();

            let mut records = Vec::new();
            run_closed_loop(
                &mut controller,
                &reference,
                scenario.initial_state(&reference).unwrap(),
                scenario.step_s,
                scenario.num_steps(),
                |r| records.push(*r),
            )
            .unwrap();

            let summary = ScenarioSummary::from_records(&scenario.name, scenario.tracker, &records);
            assert_eq!(summary.num_steps, scenario.num_steps());
            assert_eq!(summary.num_fallbacks, 0);
            assert!(summary.final_lateral_error_m.abs() <= summary.max_abs_lateral_error_m);
            assert!(records.iter().all(|r| r.accel_cmd_mss.is_finite()));
        }
    }
}
