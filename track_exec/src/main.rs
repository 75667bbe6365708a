//! # Tracking Simulation
//!
//! Runs the trackers in closed loop against analytic reference trajectories. Every scenario in
//! `track_sim.toml` runs on its own thread, writing a per-step CSV archive and a JSON summary
//! into the session directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::thread;

use chrono::Utc;
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{error, info, warn};

use track_lib::{
    ilqr::IlqrTrackerParams,
    lqr,
    scenario::{self, ScenarioParams, ScenarioSummary, SimParams, StepRecord},
    vehicle::{MotionModelParams, VehicleParams},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters shared by every scenario.
struct SharedParams {
    vehicle: VehicleParams,
    motion_model: MotionModelParams,
    lqr: lqr::Params,
    ilqr: IlqrTrackerParams,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("track_sim", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("Tracking Simulation\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let sim_params: SimParams =
        util::params::load("track_sim.toml").wrap_err("Could not load sim params")?;

    let shared = SharedParams {
        vehicle: util::params::load(&sim_params.vehicle_params_file)
            .wrap_err("Could not load vehicle params")?,
        motion_model: util::params::load(&sim_params.motion_model_params_file)
            .wrap_err("Could not load motion model params")?,
        lqr: util::params::load(&sim_params.lqr_params_file)
            .wrap_err("Could not load LQR tracker params")?,
        ilqr: util::params::load(&sim_params.ilqr_params_file)
            .wrap_err("Could not load iLQR tracker params")?,
    };

    for s in sim_params.scenarios.iter() {
        s.validate()
            .wrap_err_with(|| format!("Invalid scenario \"{}\"", s.name))?;
    }

    info!("Loaded {} scenarios", sim_params.scenarios.len());

    // ---- RUN SCENARIOS ----

    let run_start = Utc::now();

    let results: Vec<Result<ScenarioSummary>> = thread::scope(|scope| {
        let handles: Vec<_> = sim_params
            .scenarios
            .iter()
            .map(|s| {
                let session = session.clone();
                let shared = &shared;

                // Named after the scenario so that its log lines can be told apart
                thread::Builder::new()
                    .name(s.name.clone())
                    .spawn_scoped(scope, move || run_scenario(s, shared, &session))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h {
                Ok(h) => h
                    .join()
                    .unwrap_or_else(|_| Err(eyre!("Scenario thread panicked"))),
                Err(e) => Err(eyre!("Could not spawn the scenario thread: {}", e)),
            })
            .collect()
    });

    info!(
        "All scenarios finished in {:.3} s",
        util::time::duration_to_seconds(Utc::now() - run_start).unwrap_or(std::f64::NAN)
    );

    // ---- REPORT ----

    let mut summaries = Vec::new();
    let mut num_failed = 0;

    for (scenario, result) in sim_params.scenarios.iter().zip(results) {
        match result {
            Ok(summary) => {
                info!(
                    "{:>20} ({:?}): max |lat| {:.3} m, rms lat {:.3} m, {} clipped, {} fallbacks, \
                     {} not converged",
                    summary.name,
                    summary.tracker,
                    summary.max_abs_lateral_error_m,
                    summary.rms_lateral_error_m,
                    summary.num_clipped,
                    summary.num_fallbacks,
                    summary.num_not_converged
                );
                summaries.push(summary);
            }
            Err(e) => {
                error!("Scenario \"{}\" failed: {:?}", scenario.name, e);
                num_failed += 1;
            }
        }
    }

    session.save("summaries.json", summaries);

    info!("End of simulation");
    session.exit();

    if num_failed > 0 {
        Err(eyre!("{} scenarios failed", num_failed))
    } else {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run a single scenario, archiving every step.
fn run_scenario(
    scenario: &ScenarioParams,
    shared: &SharedParams,
    session: &Session,
) -> Result<ScenarioSummary> {
    info!("Starting scenario \"{}\"", scenario.name);

    let reference = scenario
        .build_reference(&shared.vehicle)
        .wrap_err("Failed to build the reference trajectory")?;
    let initial = scenario
        .initial_state(&reference)
        .wrap_err("Failed to get the initial state")?;

    let mut controller = scenario::build_controller(
        scenario.tracker,
        &shared.vehicle,
        &shared.motion_model,
        &shared.lqr,
        &shared.ilqr,
    )
    .wrap_err("Failed to initialise the controller")?;

    let mut archiver = Archiver::from_path(session, format!("{}/steps.csv", scenario.name))
        .wrap_err("Failed to create the step archive")?;

    let mut records: Vec<StepRecord> = Vec::with_capacity(scenario.num_steps());

    scenario::run_closed_loop(
        &mut controller,
        &reference,
        initial,
        scenario.step_s,
        scenario.num_steps(),
        |record| {
            if let Err(e) = archiver.serialise(record) {
                warn!("Could not archive step {}: {}", record.index, e);
            }
            records.push(*record);
        },
    )
    .wrap_err("Closed loop simulation failed")?;

    let summary = ScenarioSummary::from_records(&scenario.name, scenario.tracker, &records);
    session.save(format!("{}/summary.json", scenario.name), summary.clone());

    Ok(summary)
}
