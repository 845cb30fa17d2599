//! Comparison of floating point values up to a tolerance.

use approx::relative_eq;

/// The default tolerance to use when testing for equality of real numbers.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// Test equality of two real numbers up to a tolerance.
///
/// `x` and `y` are equal when `|x - y| <= max(rel_tol * max(|x|, |y|), abs_tol)`.
/// Infinite values are only equal to themselves and NaN is never equal to anything.
///
/// ```
/// use exauq::numerics::{equal_within_tolerance, FLOAT_TOLERANCE};
///
/// assert!(equal_within_tolerance(1.0, 1.0 + 1e-12, FLOAT_TOLERANCE, FLOAT_TOLERANCE));
/// assert!(!equal_within_tolerance(1.0, 1.001, FLOAT_TOLERANCE, FLOAT_TOLERANCE));
/// ```
pub fn equal_within_tolerance(x: f64, y: f64, rel_tol: f64, abs_tol: f64) -> bool {
    relative_eq!(x, y, epsilon = abs_tol, max_relative = rel_tol)
}

/// [equal_within_tolerance] with [FLOAT_TOLERANCE] as relative and absolute tolerances
pub fn equal_to_tolerance(x: f64, y: f64) -> bool {
    equal_within_tolerance(x, y, FLOAT_TOLERANCE, FLOAT_TOLERANCE)
}

/// Componentwise [equal_to_tolerance], sequences of different lengths are never equal
pub fn all_equal_within_tolerance(xs: &[f64], ys: &[f64]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal_to_tolerance(*x, *y))
}
