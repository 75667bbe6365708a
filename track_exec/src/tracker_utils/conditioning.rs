//! Conditioning guard for the matrix inversions in the Riccati recursions
//!
//! A symmetric matrix is considered well conditioned when its smallest eigenvalue is at least
//! `min_eigenvalue`. This is tested with a Cholesky factorisation of `M - min_eigenvalue * I`,
//! which exists exactly when every eigenvalue of `M` exceeds the bound. Matrices failing the
//! test are damped with `mu * I`, `mu` growing geometrically up to a hard cap.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Cholesky, SMatrix};
use serde::{Deserialize, Serialize};

// Internal
use crate::params::{check_non_negative, check_positive, InvalidParamError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Hard cap on damping attempts, independent of the configured growth.
pub const MAX_DAMPING_ATTEMPTS: usize = 64;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the regularisation applied to near-singular matrices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularisationParams {
    /// If false a badly conditioned matrix is a failure straight away.
    pub enabled: bool,

    /// Smallest eigenvalue accepted without damping.
    pub min_eigenvalue: f64,

    /// Damping applied on the first attempt, and the floor damping decays back to.
    pub initial: f64,

    /// Damping above which the attempt is abandoned.
    pub max: f64,

    /// Factor the damping is multiplied by after each failed attempt.
    pub growth_factor: f64,
}

/// Levenberg-Marquardt style damping term carried through a solve.
#[derive(Debug, Clone)]
pub struct Damping {
    mu: f64,
    params: RegularisationParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Numerical failures, all of which are recoverable by the trackers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericalError {
    #[error("Matrix is not positive definite and regularisation is disabled")]
    NotPositiveDefinite,

    #[error("Regularisation exceeded its limit ({mu:e}) without conditioning the matrix")]
    RegularisationExhausted { mu: f64 },

    #[error("Non-finite value encountered in {0}")]
    NonFinite(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RegularisationParams {
    pub fn validate(&self) -> Result<(), InvalidParamError> {
        check_non_negative("min_eigenvalue", self.min_eigenvalue)?;
        if self.enabled {
            check_positive("initial", self.initial)?;
            check_positive("max", self.max)?;
            if self.max < self.initial {
                return Err(InvalidParamError::new("max", "must not be below `initial`"));
            }
            if !(self.growth_factor.is_finite() && self.growth_factor > 1.0) {
                return Err(InvalidParamError::new(
                    "growth_factor",
                    format!("expected a finite value > 1, found {}", self.growth_factor),
                ));
            }
        }

        Ok(())
    }
}

impl Default for RegularisationParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_eigenvalue: 1e-8,
            initial: 1e-6,
            max: 1e6,
            growth_factor: 10.0,
        }
    }
}

impl Damping {
    /// Start damping at the initial value, or at zero if regularisation is disabled.
    pub fn new(params: &RegularisationParams) -> Self {
        Self {
            mu: if params.enabled { params.initial } else { 0.0 },
            params: params.clone(),
        }
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn min_eigenvalue(&self) -> f64 {
        self.params.min_eigenvalue
    }

    /// Grow the damping after a failed attempt.
    ///
    /// Returns an error once the damping passes its cap, after which no further attempts
    /// should be made.
    pub fn increase(&mut self) -> Result<(), NumericalError> {
        if !self.params.enabled {
            return Err(NumericalError::NotPositiveDefinite);
        }

        self.mu = (self.mu * self.params.growth_factor).max(self.params.initial);

        if self.mu > self.params.max {
            Err(NumericalError::RegularisationExhausted { mu: self.mu })
        } else {
            Ok(())
        }
    }

    /// Relax the damping after a successful step, never below the initial value.
    pub fn decrease(&mut self) {
        if self.params.enabled {
            self.mu = (self.mu / self.params.growth_factor).max(self.params.initial);
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// True if every eigenvalue of the symmetric matrix `m` is at least `min_eigenvalue`.
pub fn is_well_conditioned<const N: usize>(m: &SMatrix<f64, N, N>, min_eigenvalue: f64) -> bool {
    m.iter().all(|v| v.is_finite())
        && Cholesky::new(m - SMatrix::<f64, N, N>::identity() * min_eigenvalue).is_some()
}

/// Invert the symmetric matrix `m` if it is well conditioned.
pub fn checked_inverse<const N: usize>(
    m: &SMatrix<f64, N, N>,
    min_eigenvalue: f64,
) -> Option<SMatrix<f64, N, N>> {
    let sym = symmetrise(m);

    if !is_well_conditioned(&sym, min_eigenvalue) {
        return None;
    }

    Cholesky::new(sym).map(|c| c.inverse())
}

/// Invert the symmetric matrix `m`, damping it until it is well conditioned.
///
/// Returns the inverse of the damped matrix and the damping that was applied.
pub fn regularised_inverse<const N: usize>(
    m: &SMatrix<f64, N, N>,
    params: &RegularisationParams,
) -> Result<(SMatrix<f64, N, N>, f64), NumericalError> {
    let identity = SMatrix::<f64, N, N>::identity();

    // The first attempt is undamped, only badly conditioned matrices are modified
    let mut mu = 0.0;
    let mut damping = Damping::new(params);

    for _ in 0..MAX_DAMPING_ATTEMPTS {
        if let Some(inv) = checked_inverse(&(m + identity * mu), params.min_eigenvalue) {
            return Ok((inv, mu));
        }

        if mu == 0.0 && params.enabled {
            mu = damping.mu();
        } else {
            damping.increase()?;
            mu = damping.mu();
        }
    }

    Err(NumericalError::RegularisationExhausted { mu })
}

/// The symmetric part of `m`.
pub fn symmetrise<const N: usize>(m: &SMatrix<f64, N, N>) -> SMatrix<f64, N, N> {
    (m + m.transpose()) * 0.5
}
