//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Linearly interpolate between `a` and `b` by the fraction `t`.
///
/// `t` is not clamped, values outside [0, 1] extrapolate.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float,
{
    a + (b - a) * t
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Normalise an angle into the range (-pi, pi].
pub fn norm_angle<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid gives [-pi, pi), fold the lower bound onto pi. The round-off case where the
    // remainder equals tau lands above pi and is folded back too.
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else if wrapped > pi_t {
        wrapped - tau_t
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `b` to `a`, i.e. the wrapped value of `a - b`
/// in (-pi, pi].
pub fn ang_diff<T>(a: T, b: T) -> T
where
    T: Float,
{
    norm_angle(a - b)
}

/// Interpolate between two angles along the shortest arc.
pub fn lerp_angle<T>(a: T, b: T, t: T) -> T
where
    T: Float,
{
    norm_angle(a + ang_diff(b, a) * t)
}
