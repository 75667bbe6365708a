//! Trajectory sampling configuration
//!
//! A sampled trajectory is described by the number of poses after the initial state, the time
//! it spans and the interval between poses. Any two of these determine the third.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Relative tolerance when checking that the horizon is a whole number of intervals.
const MULTIPLE_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fully determined sampling of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSampling")]
pub struct TrajectorySampling {
    /// Number of poses in addition to the initial state
    pub num_poses: usize,

    /// Time spanned by the poses.
    ///
    /// Units: seconds
    pub time_horizon_s: f64,

    /// Time between two consecutive poses.
    ///
    /// Units: seconds
    pub interval_length_s: f64,
}

/// Sampling as written in a parameter file, where any one value may be omitted.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawSampling {
    pub num_poses: Option<usize>,
    pub time_horizon_s: Option<f64>,
    pub interval_length_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplingError {
    #[error(
        "At least two of num_poses, time_horizon_s and interval_length_s must be given \
         (num_poses = {num_poses:?}, time_horizon_s = {time_horizon_s:?}, \
         interval_length_s = {interval_length_s:?})"
    )]
    Underdetermined {
        num_poses: Option<usize>,
        time_horizon_s: Option<f64>,
        interval_length_s: Option<f64>,
    },

    #[error("Sampling value `{0}` must be positive, found {1}")]
    NotPositive(&'static str, f64),

    #[error(
        "The time horizon must be a multiple of the interval length \
         (time_horizon_s = {time_horizon_s}, interval_length_s = {interval_length_s})"
    )]
    NotMultiple {
        time_horizon_s: f64,
        interval_length_s: f64,
    },

    #[error(
        "Inconsistent sampling: num_poses = {num_poses}, time_horizon_s = {time_horizon_s}, \
         interval_length_s = {interval_length_s}"
    )]
    Inconsistent {
        num_poses: usize,
        time_horizon_s: f64,
        interval_length_s: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectorySampling {
    /// Build a sampling from any two (or all three, if consistent) of its values.
    pub fn new(
        num_poses: Option<usize>,
        time_horizon_s: Option<f64>,
        interval_length_s: Option<f64>,
    ) -> Result<Self, SamplingError> {
        if num_poses == Some(0) {
            return Err(SamplingError::NotPositive("num_poses", 0.0));
        }
        if let Some(t) = time_horizon_s {
            positive("time_horizon_s", t)?;
        }
        if let Some(i) = interval_length_s {
            positive("interval_length_s", i)?;
        }

        match (num_poses, time_horizon_s, interval_length_s) {
            (Some(n), Some(t), None) => Ok(Self {
                num_poses: n,
                time_horizon_s: t,
                interval_length_s: t / n as f64,
            }),
            (Some(n), None, Some(i)) => Ok(Self {
                num_poses: n,
                time_horizon_s: n as f64 * i,
                interval_length_s: i,
            }),
            (None, Some(t), Some(i)) => {
                let ratio = t / i;
                let n = ratio.round();
                if n < 1.0 || (ratio - n).abs() > MULTIPLE_TOLERANCE * n {
                    return Err(SamplingError::NotMultiple {
                        time_horizon_s: t,
                        interval_length_s: i,
                    });
                }

                Ok(Self {
                    num_poses: n as usize,
                    time_horizon_s: t,
                    interval_length_s: i,
                })
            }
            (Some(n), Some(t), Some(i)) => {
                let n_f = n as f64;
                if (t / i - n_f).abs() > MULTIPLE_TOLERANCE * n_f {
                    return Err(SamplingError::Inconsistent {
                        num_poses: n,
                        time_horizon_s: t,
                        interval_length_s: i,
                    });
                }

                Ok(Self {
                    num_poses: n,
                    time_horizon_s: t,
                    interval_length_s: i,
                })
            }
            _ => Err(SamplingError::Underdetermined {
                num_poses,
                time_horizon_s,
                interval_length_s,
            }),
        }
    }

    /// Time between two poses.
    ///
    /// Units: seconds
    pub fn step_time(&self) -> f64 {
        self.interval_length_s
    }
}

impl TryFrom<RawSampling> for TrajectorySampling {
    type Error = SamplingError;

    fn try_from(raw: RawSampling) -> Result<Self, Self::Error> {
        Self::new(raw.num_poses, raw.time_horizon_s, raw.interval_length_s)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn positive(name: &'static str, value: f64) -> Result<(), SamplingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SamplingError::NotPositive(name, value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deduction() {
        let s = TrajectorySampling::new(Some(10), Some(5.0), None).unwrap();
        assert!((s.interval_length_s - 0.5).abs() < 1e-12);

        let s = TrajectorySampling::new(Some(8), None, Some(0.25)).unwrap();
        assert!((s.time_horizon_s - 2.0).abs() < 1e-12);

        // 0.3 / 0.1 is not exactly 3 in floating point
        let s = TrajectorySampling::new(None, Some(0.3), Some(0.1)).unwrap();
        assert_eq!(s.num_poses, 3);
        assert_eq!(s.step_time(), 0.1);

        assert!(TrajectorySampling::new(Some(40), Some(4.0), Some(0.1)).is_ok());
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            TrajectorySampling::new(Some(10), None, None),
            Err(SamplingError::Underdetermined { .. })
        ));
        assert!(matches!(
            TrajectorySampling::new(None, Some(1.0), Some(0.3)),
            Err(SamplingError::NotMultiple { .. })
        ));
        assert!(matches!(
            TrajectorySampling::new(Some(5), Some(1.0), Some(0.1)),
            Err(SamplingError::Inconsistent { .. })
        ));
        assert_eq!(
            TrajectorySampling::new(Some(5), Some(-1.0), None),
            Err(SamplingError::NotPositive("time_horizon_s", -1.0))
        );
        assert!(TrajectorySampling::new(Some(0), Some(1.0), None).is_err());
    }

    #[test]
    fn test_deserialise() {
        let s: TrajectorySampling = util::params::parse(
            "time_horizon_s = 4.0\n\
             interval_length_s = 0.1\n",
        )
        .unwrap();
        assert_eq!(s.num_poses, 40);

        let bad: Result<TrajectorySampling, _> = util::params::parse("num_poses = 4\n");
        assert!(bad.is_err());
    }
}
