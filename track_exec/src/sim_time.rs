//! Simulation time
//!
//! Time is kept as integer microseconds so that iterations generated from a fixed step never
//! drift, conversions to seconds happen only at the edges.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of microseconds in a second
pub const MICROS_PER_SECOND: f64 = 1e6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point in simulation time.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimePoint {
    pub time_us: i64,
}

/// One discrete step of the simulation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationIteration {
    /// Time at which this iteration starts
    pub time_point: TimePoint,

    /// Index of the iteration from the start of the simulation
    pub index: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TimePoint {
    pub fn from_us(time_us: i64) -> Self {
        Self { time_us }
    }

    /// Build a time point from seconds, rounded to the nearest microsecond.
    pub fn from_s(time_s: f64) -> Self {
        Self {
            time_us: (time_s * MICROS_PER_SECOND).round() as i64,
        }
    }

    pub fn time_s(&self) -> f64 {
        self.time_us as f64 / MICROS_PER_SECOND
    }

    /// Return the time point offset by the given number of seconds.
    pub fn offset_s(&self, offset_s: f64) -> Self {
        Self {
            time_us: self.time_us + (offset_s * MICROS_PER_SECOND).round() as i64,
        }
    }

    /// Seconds elapsed from `earlier` to `self`, negative if `earlier` is later.
    pub fn seconds_since(&self, earlier: &TimePoint) -> f64 {
        (self.time_us - earlier.time_us) as f64 / MICROS_PER_SECOND
    }
}

impl SimulationIteration {
    pub fn new(time_point: TimePoint, index: usize) -> Self {
        Self { time_point, index }
    }

    /// Iteration `index` of a simulation starting at `start` with a fixed step.
    pub fn from_step(start: TimePoint, index: usize, step_s: f64) -> Self {
        Self {
            time_point: start.offset_s(step_s * index as f64),
            index,
        }
    }

    pub fn time_s(&self) -> f64 {
        self.time_point.time_s()
    }

    /// Step size in seconds between this iteration and `next`.
    pub fn step_to(&self, next: &SimulationIteration) -> f64 {
        next.time_point.seconds_since(&self.time_point)
    }
}
