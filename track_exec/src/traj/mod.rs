//! # Reference trajectories
//!
//! A reference trajectory is an immutable, time-indexed sequence of kinematic states owned by
//! whoever drives the simulation. Trackers only see it through the [`ReferenceTrajectory`]
//! trait, borrowing it for the duration of one tracking call.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod generate;
mod interp;
mod sampling;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use interp::InterpolatedTrajectory;
pub use sampling::{SamplingError, TrajectorySampling};

use crate::{
    sim_time::{TimePoint, MICROS_PER_SECOND},
    vehicle::KinematicState,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur building or querying a trajectory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajError {
    #[error("Attempted to create a trajectory with fewer than {0} states")]
    TooFewStates(usize),

    #[error("Trajectory timestamps must be strictly increasing, found a violation at index {0}")]
    NonMonotonicTime(usize),

    #[error("Expected {expected} poses to match the timestamps, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Time {time_s} s is outside of the trajectory [{start_s}, {end_s}] s")]
    TimeOutOfRange {
        time_s: f64,
        start_s: f64,
        end_s: f64,
    },

    #[error("Sampling step must be at least one microsecond, found {0} s")]
    InvalidStep(f64),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trajectory the trackers can follow.
pub trait ReferenceTrajectory {
    /// Time of the first state.
    fn start_time(&self) -> TimePoint;

    /// Time of the last state.
    fn end_time(&self) -> TimePoint;

    /// Sample the state at the given time, which must lie within the trajectory.
    fn state_at(&self, time: TimePoint) -> Result<KinematicState, TrajError>;

    /// Sample the states at `start + i * step_s` for `i = 0..=n`, where `n` is `max_steps`
    /// truncated to the number of whole steps remaining before the end of the trajectory.
    fn sample_window(
        &self,
        start: TimePoint,
        max_steps: usize,
        step_s: f64,
    ) -> Result<Vec<KinematicState>, TrajError> {
        let step_us = if step_s.is_finite() {
            (step_s * MICROS_PER_SECOND).round() as i64
        } else {
            0
        };
        if step_us <= 0 {
            return Err(TrajError::InvalidStep(step_s));
        }

        if start < self.start_time() || start > self.end_time() {
            return Err(TrajError::TimeOutOfRange {
                time_s: start.time_s(),
                start_s: self.start_time().time_s(),
                end_s: self.end_time().time_s(),
            });
        }

        let remaining_us = self.end_time().time_us - start.time_us;
        let num_steps = ((remaining_us / step_us) as usize).min(max_steps);

        (0..=num_steps)
            .map(|i| self.state_at(TimePoint::from_us(start.time_us + i as i64 * step_us)))
            .collect()
    }
}
