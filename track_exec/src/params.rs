//! Shared parameter validation
//!
//! Parameter structs are deserialised from TOML without any checks, each consumer validates
//! them on construction using the helpers here.

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A parameter value which cannot be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid parameter `{name}`: {reason}")]
pub struct InvalidParamError {
    pub name: &'static str,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

impl InvalidParamError {
    pub fn new<S: Into<String>>(name: &'static str, reason: S) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }
}

/// Check that the value is finite and strictly positive.
pub fn check_positive(name: &'static str, value: f64) -> Result<(), InvalidParamError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InvalidParamError::new(
            name,
            format!("expected a finite value > 0, found {}", value),
        ))
    }
}

/// Check that the value is finite and not negative.
pub fn check_non_negative(name: &'static str, value: f64) -> Result<(), InvalidParamError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InvalidParamError::new(
            name,
            format!("expected a finite value >= 0, found {}", value),
        ))
    }
}

/// Check that `min <= max` and both are finite.
pub fn check_range(name: &'static str, min: f64, max: f64) -> Result<(), InvalidParamError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(InvalidParamError::new(
            name,
            format!("expected finite min <= max, found [{}, {}]", min, max),
        ))
    }
}

/// Check every entry of a cost diagonal is finite and not negative.
pub fn check_diagonal(name: &'static str, diag: &[f64]) -> Result<(), InvalidParamError> {
    match diag.iter().find(|d| !(d.is_finite() && **d >= 0.0)) {
        Some(d) => Err(InvalidParamError::new(
            name,
            format!("diagonal entries must be finite and >= 0, found {}", d),
        )),
        None => Ok(()),
    }
}
