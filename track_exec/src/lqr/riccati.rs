//! Finite horizon discrete Riccati recursion

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{
    tracker_utils::{
        conditioning::{regularised_inverse, symmetrise},
        NumericalError, RegularisationParams,
    },
    vehicle::{GainMatrix, InputHessian, InputMatrix, StateMatrix},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Feedback gain for the first step of a finite horizon LQR problem with time invariant
/// dynamics `(a, b)`.
///
/// Starting from `P = qf` the recursion
///
/// ```text
/// K = (R + B'PB)^-1 B'PA
/// P = Q + A'PA - A'PB K
/// ```
///
/// is run `horizon` times, the last `K` being returned. `R + B'PB` is inverted through the
/// conditioning guard, so a near-singular step is damped rather than producing NaNs.
pub fn finite_horizon_gain(
    a: &StateMatrix,
    b: &InputMatrix,
    q: &StateMatrix,
    r: &InputHessian,
    qf: &StateMatrix,
    horizon: usize,
    regularisation: &RegularisationParams,
) -> Result<GainMatrix, NumericalError> {
    let mut p = *qf;
    let mut gain = GainMatrix::zeros();

    for _ in 0..horizon {
        let bt_p = b.transpose() * p;
        let (inv, _) = regularised_inverse(&(r + bt_p * b), regularisation)?;

        gain = inv * bt_p * a;

        let at_p = a.transpose() * p;
        p = symmetrise(&(q + at_p * a - at_p * b * gain));

        if !p.iter().all(|v| v.is_finite()) {
            return Err(NumericalError::NonFinite("Riccati recursion"));
        }
    }

    Ok(gain)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        tracker_utils::KinematicBicycle,
        vehicle::{InputVector, StateVector, ACCEL_IDX, STEER_RATE_IDX, VELOCITY_IDX, Y_IDX},
    };

    fn linearisation() -> (StateMatrix, InputMatrix) {
        let dynamics = KinematicBicycle::new(3.0, 0.01);
        dynamics.linearize(
            &StateVector::new(0.0, 0.0, 0.0, 5.0, 0.0),
            &InputVector::zeros(),
            0.1,
        )
    }

    #[test]
    fn test_single_step() {
        let (a, b) = linearisation();
        let q = StateMatrix::identity();
        let r = InputHessian::identity();
        let qf = StateMatrix::identity() * 2.0;

        let gain = finite_horizon_gain(&a, &b, &q, &r, &qf, 1, &Default::default()).unwrap();

        let expected = (r + b.transpose() * qf * b).try_inverse().unwrap() * b.transpose() * qf * a;
        assert!((gain - expected).abs().max() < 1e-12);
    }

    #[test]
    fn test_gain_signs() {
        let (a, b) = linearisation();
        let q = StateMatrix::identity();
        let r = InputHessian::identity();

        let gain = finite_horizon_gain(&a, &b, &q, &r, &q, 50, &Default::default()).unwrap();

        // Too fast means brake, too far left means steer right
        assert!(gain[(ACCEL_IDX, VELOCITY_IDX)] > 0.0);
        assert!(gain[(STEER_RATE_IDX, Y_IDX)] > 0.0);
        assert!(gain.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_singular_step() {
        let (a, b) = linearisation();
        let zero_r = InputHessian::zeros();
        let zero_qf = StateMatrix::zeros();
        let q = StateMatrix::identity();

        // Nothing penalises the inputs on the first step, so R + B'PB is singular
        let disabled = RegularisationParams {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(
            finite_horizon_gain(&a, &b, &q, &zero_r, &zero_qf, 5, &disabled),
            Err(NumericalError::NotPositiveDefinite)
        );

        // With regularisation the gain is finite
        let gain =
            finite_horizon_gain(&a, &b, &q, &zero_r, &zero_qf, 5, &Default::default()).unwrap();
        assert!(gain.iter().all(|v| v.is_finite()));
    }
}
