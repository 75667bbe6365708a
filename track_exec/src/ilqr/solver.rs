//! # iLQR solver
//!
//! Iterative LQR over a fixed horizon of the kinematic bicycle model. The cost is quadratic in
//! the state error and in the deviation from the reference inputs:
//!
//! ```text
//! J = sum_k 1/2 e_k' Q e_k + 1/2 du_k' R du_k  +  1/2 e_N' Qf e_N
//! ```
//!
//! Each iteration linearises about the current nominal trajectory, runs a backward Riccati pass
//! on the local quadratic model with Levenberg-Marquardt damping on `Q_uu`, and then rolls the
//! nonlinear dynamics forward under the new affine policy with a backtracking line search.
//! Every loop is bounded: damping restarts, line search steps, iterations and, optionally,
//! wall clock time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;
use std::time::Instant;

// Internal
use super::IlqrSolverParams;
use crate::{
    cmd::ClipReport,
    params::InvalidParamError,
    tracker_utils::{
        conditioning::{checked_inverse, symmetrise, MAX_DAMPING_ATTEMPTS},
        state_error, Damping, KinematicBicycle, NumericalError,
    },
    vehicle::{
        GainMatrix, InputHessian, InputVector, StateMatrix, StateVector, VehicleParams,
        ACCEL_IDX, STEER_ANGLE_IDX, STEER_RATE_IDX, VELOCITY_IDX,
    },
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Floor on the cost used to normalise improvements, avoids dividing by a zero cost.
const MIN_COST: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// iLQR solver for the kinematic bicycle.
#[derive(Debug, Clone)]
pub struct IlqrSolver {
    params: IlqrSolverParams,
    vehicle: VehicleParams,
    dynamics: KinematicBicycle,

    q: StateMatrix,
    r: InputHessian,
    qf: StateMatrix,
}

/// Result of a solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IlqrSolution {
    /// Rollout of the nonlinear dynamics under `inputs`, starting at the initial state.
    /// One longer than `inputs`.
    pub states: Vec<StateVector>,

    pub inputs: Vec<InputVector>,

    /// Cost of the returned trajectory
    pub cost: f64,

    /// Cost of the initial rollout followed by the cost after each accepted iteration
    pub cost_history: Vec<f64>,

    /// Number of completed backward passes
    pub iterations: usize,

    pub converged: bool,

    pub termination: Termination,

    /// Damping applied to `Q_uu` at the end of the solve
    pub regularisation: f64,

    /// Components of the first input which were limited by the vehicle constraints
    pub first_input_clip: ClipReport,
}

/// Gains from one backward pass.
struct Policy {
    /// Feedback gains `K_k`
    feedback: Vec<GainMatrix>,

    /// Feedforward terms `k_k`
    feedforward: Vec<InputVector>,

    /// Cost reduction predicted by the quadratic model for a full step
    expected_decrease: f64,
}

/// A candidate trajectory from a forward pass.
struct Rollout {
    states: Vec<StateVector>,
    inputs: Vec<InputVector>,
    cost: f64,
    first_input_clip: ClipReport,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Why a solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The relative cost improvement fell below the convergence threshold
    Converged,

    /// The iteration limit was reached
    MaxIterations,

    /// No line search step reduced the cost while the model still predicted a reduction
    LineSearchExhausted,

    /// `Q_uu` could not be made positive definite within the damping limit
    RegularisationExhausted,

    /// The wall clock budget ran out
    TimeBudget,
}

/// Problems with the inputs to a solve.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("The solver horizon must contain at least one step")]
    EmptyHorizon,

    #[error("Expected {expected} reference states for {inputs} reference inputs, found {found}")]
    LengthMismatch {
        inputs: usize,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value in the solver inputs: {0}")]
    NonFinite(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl IlqrSolver {
    pub fn new(
        params: IlqrSolverParams,
        vehicle: VehicleParams,
    ) -> Result<Self, InvalidParamError> {
        params.validate()?;
        vehicle.validate()?;

        let q = StateMatrix::from_diagonal(&StateVector::from(params.state_cost_diag));
        let r = InputHessian::from_diagonal(&InputVector::from(params.input_cost_diag));
        let qf = StateMatrix::from_diagonal(&StateVector::from(params.terminal_cost_diag));

        if !params.regularisation.enabled
            && checked_inverse(&r, params.regularisation.min_eigenvalue).is_none()
        {
            return Err(InvalidParamError::new(
                "input_cost_diag",
                "R must be positive definite when regularisation is disabled",
            ));
        }

        Ok(Self {
            dynamics: KinematicBicycle::new(
                vehicle.wheelbase_m,
                params.min_velocity_linearization_ms,
            ),
            params,
            vehicle,
            q,
            r,
            qf,
        })
    }

    pub fn params(&self) -> &IlqrSolverParams {
        &self.params
    }

    /// Solve for the inputs tracking `reference` from the initial state `z0`.
    ///
    /// `reference` holds one more state than `reference_inputs`, the first of which is the
    /// reference at the initial time. Numerical trouble during the iterations is not an error,
    /// it ends the solve with the best trajectory found and `converged` false.
    pub fn solve(
        &self,
        z0: &StateVector,
        reference: &[StateVector],
        reference_inputs: &[InputVector],
    ) -> Result<IlqrSolution, SolverError> {
        let num_steps = reference_inputs.len();
        if num_steps == 0 {
            return Err(SolverError::EmptyHorizon);
        }
        if reference.len() != num_steps + 1 {
            return Err(SolverError::LengthMismatch {
                inputs: num_steps,
                expected: num_steps + 1,
                found: reference.len(),
            });
        }
        if !z0.iter().all(|v| v.is_finite()) {
            return Err(SolverError::NonFinite("initial state"));
        }
        if !reference.iter().all(|z| z.iter().all(|v| v.is_finite()))
            || !reference_inputs.iter().all(|u| u.iter().all(|v| v.is_finite()))
        {
            return Err(SolverError::NonFinite("reference"));
        }

        let start_time = Instant::now();

        let mut nominal = self.warm_start(z0, reference, reference_inputs);
        let mut cost_history = vec![nominal.cost];
        let mut damping = Damping::new(&self.params.regularisation);

        let mut iterations = 0;
        let mut termination = Termination::MaxIterations;

        for iteration in 0..self.params.max_iterations {
            if let Some(budget_s) = self.params.max_solve_time_s {
                if start_time.elapsed().as_secs_f64() > budget_s {
                    termination = Termination::TimeBudget;
                    break;
                }
            }

            let policy =
                match self.backward_pass(&nominal, reference, reference_inputs, &mut damping) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("iLQR backward pass failed at iteration {}: {}", iteration, e);
                        termination = Termination::RegularisationExhausted;
                        break;
                    }
                };
            iterations += 1;

            match self.line_search(z0, &nominal, &policy, reference, reference_inputs) {
                Some((candidate, alpha)) => {
                    let improvement = (nominal.cost - candidate.cost) / nominal.cost.max(MIN_COST);

                    trace!(
                        "iLQR iteration {}: cost {:.6e} -> {:.6e}, alpha {}, mu {:.1e}",
                        iteration,
                        nominal.cost,
                        candidate.cost,
                        alpha,
                        damping.mu()
                    );

                    nominal = candidate;
                    cost_history.push(nominal.cost);
                    damping.decrease();

                    if improvement < self.params.convergence_threshold {
                        termination = Termination::Converged;
                        break;
                    }
                }
                None => {
                    // Nothing left to gain according to the local model
                    termination = if policy.expected_decrease
                        <= self.params.convergence_threshold * nominal.cost.max(MIN_COST)
                    {
                        Termination::Converged
                    } else {
                        Termination::LineSearchExhausted
                    };

                    trace!(
                        "iLQR iteration {}: line search failed, expected decrease {:.3e}",
                        iteration,
                        policy.expected_decrease
                    );
                    break;
                }
            }
        }

        debug!(
            "iLQR solve: {:?} after {} iterations, cost {:.6e} (initial {:.6e})",
            termination, iterations, nominal.cost, cost_history[0]
        );

        Ok(IlqrSolution {
            states: nominal.states,
            inputs: nominal.inputs,
            cost: nominal.cost,
            cost_history,
            iterations,
            converged: termination == Termination::Converged,
            termination,
            regularisation: damping.mu(),
            first_input_clip: nominal.first_input_clip,
        })
    }

    /// Initial rollout applying the reference inputs with proportional feedback on the
    /// velocity and steering angle errors.
    fn warm_start(
        &self,
        z0: &StateVector,
        reference: &[StateVector],
        reference_inputs: &[InputVector],
    ) -> Rollout {
        let dt = self.params.discretization_time_s;

        let mut states = Vec::with_capacity(reference.len());
        let mut inputs = Vec::with_capacity(reference_inputs.len());
        let mut first_input_clip = ClipReport::default();
        states.push(*z0);

        for (k, u_ref) in reference_inputs.iter().enumerate() {
            let z = states[k];
            let feedback = InputVector::new(
                self.params.k_velocity_error_feedback
                    * (reference[k][VELOCITY_IDX] - z[VELOCITY_IDX]),
                self.params.k_steering_angle_error_feedback
                    * (reference[k][STEER_ANGLE_IDX] - z[STEER_ANGLE_IDX]),
            );

            let (u, clip) = self.clip_input(&z, &(u_ref + feedback));
            if k == 0 {
                first_input_clip = clip;
            }

            states.push(self.dynamics.step(&z, &u, dt));
            inputs.push(u);
        }

        let cost = self.cost(&states, &inputs, reference, reference_inputs);

        Rollout {
            states,
            inputs,
            cost,
            first_input_clip,
        }
    }

    /// Backward Riccati pass about the nominal trajectory.
    ///
    /// Whenever the damped `Q_uu` is not well conditioned, or the value function stops being
    /// finite, the damping is increased and the pass restarts from the terminal step.
    fn backward_pass(
        &self,
        nominal: &Rollout,
        reference: &[StateVector],
        reference_inputs: &[InputVector],
        damping: &mut Damping,
    ) -> Result<Policy, NumericalError> {
        let dt = self.params.discretization_time_s;
        let num_steps = reference_inputs.len();
        let identity = InputHessian::identity();

        'restart: for _ in 0..MAX_DAMPING_ATTEMPTS {
            let mu = damping.mu();

            let mut feedback = vec![GainMatrix::zeros(); num_steps];
            let mut feedforward = vec![InputVector::zeros(); num_steps];
            let mut expected_decrease = 0.0;

            let e_n = state_error(&nominal.states[num_steps], &reference[num_steps]);
            let mut v_x = self.qf * e_n;
            let mut v_xx = self.qf;

            for k in (0..num_steps).rev() {
                let z = &nominal.states[k];
                let u = &nominal.inputs[k];
                let (a, b) = self.dynamics.linearize(z, u, dt);

                let l_x = self.q * state_error(z, &reference[k]);
                let l_u = self.r * (u - reference_inputs[k]);

                let q_x = l_x + a.transpose() * v_x;
                let q_u = l_u + b.transpose() * v_x;
                let q_xx = self.q + a.transpose() * v_xx * a;
                let q_ux = b.transpose() * v_xx * a;
                let q_uu = self.r + b.transpose() * v_xx * b;

                let q_uu_inv =
                    match checked_inverse(&(q_uu + identity * mu), damping.min_eigenvalue()) {
                        Some(inv) => inv,
                        None => {
                            damping.increase()?;
                            continue 'restart;
                        }
                    };

                let gain = -q_uu_inv * q_ux;
                let ff = -q_uu_inv * q_u;

                expected_decrease -= ff.dot(&q_u) + 0.5 * ff.dot(&(q_uu * ff));

                v_x = q_x
                    + gain.transpose() * q_uu * ff
                    + gain.transpose() * q_u
                    + q_ux.transpose() * ff;
                v_xx = symmetrise(
                    &(q_xx
                        + gain.transpose() * q_uu * gain
                        + gain.transpose() * q_ux
                        + q_ux.transpose() * gain),
                );

                if !(v_x.iter().all(|v| v.is_finite()) && v_xx.iter().all(|v| v.is_finite())) {
                    damping.increase()?;
                    continue 'restart;
                }

                feedback[k] = gain;
                feedforward[k] = ff;
            }

            return Ok(Policy {
                feedback,
                feedforward,
                expected_decrease,
            });
        }

        Err(NumericalError::RegularisationExhausted { mu: damping.mu() })
    }

    /// Backtracking line search on the feedforward step.
    ///
    /// Returns the first rollout strictly cheaper than the nominal one, with its step size.
    fn line_search(
        &self,
        z0: &StateVector,
        nominal: &Rollout,
        policy: &Policy,
        reference: &[StateVector],
        reference_inputs: &[InputVector],
    ) -> Option<(Rollout, f64)> {
        let mut alpha = 1.0;

        for _ in 0..self.params.max_line_search_steps {
            let candidate =
                self.forward_pass(z0, nominal, policy, alpha, reference, reference_inputs);

            if candidate.cost.is_finite() && candidate.cost < nominal.cost {
                return Some((candidate, alpha));
            }

            alpha *= self.params.line_search_shrink;
        }

        None
    }

    /// Roll the nonlinear dynamics forward under `u_k + alpha k_k + K_k (z - z_k)`.
    fn forward_pass(
        &self,
        z0: &StateVector,
        nominal: &Rollout,
        policy: &Policy,
        alpha: f64,
        reference: &[StateVector],
        reference_inputs: &[InputVector],
    ) -> Rollout {
        let dt = self.params.discretization_time_s;

        let mut states = Vec::with_capacity(nominal.states.len());
        let mut inputs = Vec::with_capacity(nominal.inputs.len());
        let mut first_input_clip = ClipReport::default();
        states.push(*z0);

        for k in 0..nominal.inputs.len() {
            let z = states[k];
            let dz = state_error(&z, &nominal.states[k]);

            let u = nominal.inputs[k] + policy.feedforward[k] * alpha + policy.feedback[k] * dz;
            let (u, clip) = self.clip_input(&z, &u);
            if k == 0 {
                first_input_clip = clip;
            }

            states.push(self.dynamics.step(&z, &u, dt));
            inputs.push(u);
        }

        let cost = self.cost(&states, &inputs, reference, reference_inputs);

        Rollout {
            states,
            inputs,
            cost,
            first_input_clip,
        }
    }

    /// Total cost of a trajectory.
    fn cost(
        &self,
        states: &[StateVector],
        inputs: &[InputVector],
        reference: &[StateVector],
        reference_inputs: &[InputVector],
    ) -> f64 {
        let num_steps = inputs.len();

        let running: f64 = (0..num_steps)
            .map(|k| {
                let e = state_error(&states[k], &reference[k]);
                let du = inputs[k] - reference_inputs[k];
                0.5 * (e.dot(&(self.q * e)) + du.dot(&(self.r * du)))
            })
            .sum();

        let e_n = state_error(&states[num_steps], &reference[num_steps]);

        running + 0.5 * e_n.dot(&(self.qf * e_n))
    }

    /// Clip an input to the acceleration and steering rate limits, also limiting the rate so
    /// the steering angle stays within its limit after one step.
    fn clip_input(&self, z: &StateVector, u: &InputVector) -> (InputVector, ClipReport) {
        let dt = self.params.discretization_time_s;
        let v = &self.vehicle;

        let accel = u[ACCEL_IDX].clamp(v.min_accel_mss, v.max_accel_mss);

        let steer = z[STEER_ANGLE_IDX];
        let lo = v
            .min_steer_rate_rads
            .max((-v.max_steer_angle_rad - steer) / dt);
        let hi = v
            .max_steer_rate_rads
            .min((v.max_steer_angle_rad - steer) / dt);

        // Already beyond the angle limit, move back towards it as fast as allowed
        let steer_rate = if lo <= hi {
            u[STEER_RATE_IDX].clamp(lo, hi)
        } else if steer > 0.0 {
            v.min_steer_rate_rads
        } else {
            v.max_steer_rate_rads
        };

        let clip = ClipReport {
            accel_clipped: accel != u[ACCEL_IDX],
            steer_rate_clipped: steer_rate != u[STEER_RATE_IDX],
        };

        (InputVector::new(accel, steer_rate), clip)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        sim_time::TimePoint,
        traj::{generate, ReferenceTrajectory},
        tracker_utils::{reference_inputs, RegularisationParams},
        vehicle::{KinematicState, HEADING_IDX, X_IDX, Y_IDX},
    };

    const DT: f64 = 0.1;
    const STEPS: usize = 40;

    fn solver(params: IlqrSolverParams) -> IlqrSolver {
        IlqrSolver::new(params, VehicleParams::default()).unwrap()
    }

    /// A 20 m radius arc at 5 m/s sampled over the solver horizon.
    fn arc_problem() -> (Vec<StateVector>, Vec<InputVector>) {
        let vehicle = VehicleParams::default();
        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let traj = generate::constant_curvature(
            &start,
            1.0 / 20.0,
            STEPS as f64 * DT,
            DT,
            vehicle.wheelbase_m,
        )
        .unwrap();

        let window = traj
            .sample_window(TimePoint::default(), STEPS, DT)
            .unwrap();
        let inputs = reference_inputs(&window, DT);
        let states = window.iter().map(|s| s.to_vector()).collect();

        (states, inputs)
    }

    /// Initial state half a metre to the right of the arc with a small heading error.
    fn offset_start(reference: &[StateVector]) -> StateVector {
        let mut z0 = reference[0];
        z0[Y_IDX] -= 0.5;
        z0[HEADING_IDX] += 0.05;
        z0
    }

    fn test_params() -> IlqrSolverParams {
        IlqrSolverParams {
            state_cost_diag: [1.0, 1.0, 10.0, 1.0, 0.0],
            terminal_cost_diag: [10.0, 10.0, 10.0, 1.0, 0.0],
            input_cost_diag: [1.0, 1.0],
            max_iterations: 100,
            convergence_threshold: 1e-4,
            ..Default::default()
        }
    }

    #[test]
    fn test_converges_on_arc() {
        let (reference, inputs) = arc_problem();
        let solver = solver(test_params());
        let z0 = offset_start(&reference);

        let solution = solver.solve(&z0, &reference, &inputs).unwrap();

        assert!(solution.converged);
        assert_eq!(solution.termination, Termination::Converged);
        assert!(solution.iterations <= 100);
        assert_eq!(solution.states.len(), STEPS + 1);
        assert_eq!(solution.inputs.len(), STEPS);
        assert_eq!(solution.states[0], z0);

        // The offset is mostly removed by the end of the horizon
        let e_n = state_error(&solution.states[STEPS], &reference[STEPS]);
        assert!(e_n[X_IDX].hypot(e_n[Y_IDX]) < 0.25);
        assert!(solution.cost < solution.cost_history[0]);
    }

    #[test]
    fn test_cost_non_increasing() {
        let (reference, inputs) = arc_problem();
        let solver = solver(test_params());

        let solution = solver
            .solve(&offset_start(&reference), &reference, &inputs)
            .unwrap();

        assert!(solution.cost_history.len() >= 2);
        assert!(solution.cost_history.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(solution.cost, *solution.cost_history.last().unwrap());
    }

    #[test]
    fn test_deterministic() {
        let (reference, inputs) = arc_problem();
        let solver = solver(test_params());
        let z0 = offset_start(&reference);

        let first = solver.solve(&z0, &reference, &inputs).unwrap();
        let second = solver.solve(&z0, &reference, &inputs).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_inputs_within_limits() {
        let vehicle = VehicleParams::default();
        let (reference, inputs) = arc_problem();
        let solver = solver(test_params());

        // Far enough off that the unconstrained solution would exceed the limits
        let mut z0 = reference[0];
        z0[Y_IDX] -= 10.0;
        z0[VELOCITY_IDX] = 1.0;

        let solution = solver.solve(&z0, &reference, &inputs).unwrap();

        for (u, z) in solution.inputs.iter().zip(&solution.states) {
            assert!(u[ACCEL_IDX] >= vehicle.min_accel_mss && u[ACCEL_IDX] <= vehicle.max_accel_mss);
            assert!(
                u[STEER_RATE_IDX] >= vehicle.min_steer_rate_rads
                    && u[STEER_RATE_IDX] <= vehicle.max_steer_rate_rads
            );
            assert!(z[STEER_ANGLE_IDX].abs() <= vehicle.max_steer_angle_rad + 1e-12);
        }
    }

    #[test]
    fn test_regularisation_exhausted() {
        let (reference, inputs) = arc_problem();

        // Q_uu = R is far below the accepted eigenvalue and the damping cap is hit at once
        let params = IlqrSolverParams {
            state_cost_diag: [0.0; 5],
            terminal_cost_diag: [0.0; 5],
            input_cost_diag: [1e-3, 1e-3],
            regularisation: RegularisationParams {
                enabled: true,
                min_eigenvalue: 1.0,
                initial: 1e-6,
                max: 1e-6,
                growth_factor: 10.0,
            },
            ..test_params()
        };
        let solver = solver(params);
        let z0 = offset_start(&reference);

        let solution = solver.solve(&z0, &reference, &inputs).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.termination, Termination::RegularisationExhausted);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.cost_history.len(), 1);
        assert_eq!(solution.states.len(), STEPS + 1);
        assert!(solution.inputs.iter().all(|u| u.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_invalid_inputs() {
        let (reference, inputs) = arc_problem();
        let solver = solver(test_params());

        assert_eq!(
            solver.solve(&reference[0], &reference[..1], &[]),
            Err(SolverError::EmptyHorizon)
        );
        assert!(matches!(
            solver.solve(&reference[0], &reference[..5], &inputs),
            Err(SolverError::LengthMismatch { .. })
        ));

        let mut z0 = reference[0];
        z0[X_IDX] = f64::NAN;
        assert_eq!(
            solver.solve(&z0, &reference, &inputs),
            Err(SolverError::NonFinite("initial state"))
        );
    }

    #[test]
    fn test_max_iterations() {
        let (reference, inputs) = arc_problem();
        let solver = solver(IlqrSolverParams {
            max_iterations: 1,
            convergence_threshold: 0.0,
            ..test_params()
        });

        let solution = solver
            .solve(&offset_start(&reference), &reference, &inputs)
            .unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
    }

    #[test]
    fn test_time_budget() {
        let (reference, inputs) = arc_problem();
        let solver = solver(IlqrSolverParams {
            max_solve_time_s: Some(1e-9),
            ..test_params()
        });

        // The warm start alone takes longer than the budget
        let solution = solver
            .solve(&offset_start(&reference), &reference, &inputs)
            .unwrap();

        assert_eq!(solution.termination, Termination::TimeBudget);
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.states.len(), STEPS + 1);
        assert!(solution.cost.is_finite());
        assert!(solution
            .states
            .iter()
            .all(|z| z.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_line_search_exhausted() {
        let vehicle = VehicleParams::default();
        let start = KinematicState::new(0.0, 0.0, 0.0, 5.0, 0.0);
        let traj = generate::straight_line(&start, 0.0, STEPS as f64 * DT, DT).unwrap();
        let window = traj
            .sample_window(TimePoint::default(), STEPS, DT)
            .unwrap();
        let inputs = reference_inputs(&window, DT);
        let reference: Vec<StateVector> = window.iter().map(|s| s.to_vector()).collect();

        // Cheap inputs and strong warm start feedback hold the acceleration at its lower limit
        // over the whole horizon. Every step the model proposes brakes harder still, which the
        // limit removes, so no candidate is cheaper than the warm start.
        let solver = solver(IlqrSolverParams {
            state_cost_diag: [1.0, 1.0, 10.0, 1.0, 0.0],
            terminal_cost_diag: [10.0, 10.0, 10.0, 1.0, 0.0],
            input_cost_diag: [1e-3, 1.0],
            convergence_threshold: 1e-6,
            max_line_search_steps: 1,
            k_velocity_error_feedback: 10.0,
            ..test_params()
        });

        let mut z0 = reference[0];
        z0[VELOCITY_IDX] = 25.0;

        let solution = solver.solve(&z0, &reference, &inputs).unwrap();

        assert_eq!(solution.termination, Termination::LineSearchExhausted);
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
        assert_eq!(solution.cost_history.len(), 1);
        assert!(solution
            .inputs
            .iter()
            .all(|u| u[ACCEL_IDX] == vehicle.min_accel_mss));
        assert!(solution.first_input_clip.accel_clipped);
        assert!(!solution.first_input_clip.steer_rate_clipped);
    }
}
