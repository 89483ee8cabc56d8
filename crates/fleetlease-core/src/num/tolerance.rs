// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # Solver Tolerance
//!
//! Every floating point decision in the branch-and-price engine (is a column
//! profitable, is a master value integral, does a bound improve) goes through
//! the helpers in this module so that the whole solver agrees on one
//! tolerance.

/// Absolute tolerance for all comparisons of costs, duals and LP values.
pub const PRECISION: f64 = 1e-3;

/// Returns `true` if `value` is greater than [`PRECISION`].
///
/// ```rust
/// # use fleetlease_core::num::tolerance::is_positive;
///
/// assert!(is_positive(0.5));
/// assert!(!is_positive(1e-4));
/// assert!(!is_positive(-3.0));
/// ```
#[inline]
pub fn is_positive(value: f64) -> bool {
    value > PRECISION
}

/// Returns `true` if `a` exceeds `b` by more than [`PRECISION`].
#[inline]
pub fn exceeds(a: f64, b: f64) -> bool {
    is_positive(a - b)
}

/// Returns `true` if `a` and `b` differ by at least [`PRECISION`].
#[inline]
pub fn differ(a: f64, b: f64) -> bool {
    (a - b).abs() >= PRECISION
}

/// Returns `true` if `value` is within [`PRECISION`] of an integer.
///
/// ```rust
/// # use fleetlease_core::num::tolerance::is_integral;
///
/// assert!(is_integral(2.0004));
/// assert!(is_integral(-0.0001));
/// assert!(!is_integral(0.5));
/// ```
#[inline]
pub fn is_integral(value: f64) -> bool {
    (value - value.round()).abs() < PRECISION
}

/// Distance of the fractional part of `value` to one half.
///
/// Branching prefers the most fractional value, i.e. the smallest distance.
#[inline]
pub fn distance_to_half(value: f64) -> f64 {
    (value.floor() + 0.5 - value).abs()
}

/// Rounds `value` half-up to `digits` decimal places.
///
/// ```rust
/// # use fleetlease_core::num::tolerance::smooth;
///
/// assert_eq!(smooth(0.1234567, 3), 0.123);
/// assert_eq!(smooth(2.25, 1), 2.3);
/// ```
#[inline]
pub fn smooth(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale + 0.5).floor() / scale
}

/// Rounds a fractional indicator against the weight `range` it is a part of.
///
/// Returns `true` when `value` reaches at least half of `range`. A range below
/// [`PRECISION`] rounds everything to `false`.
///
/// ```rust
/// # use fleetlease_core::num::tolerance::round_by_majority;
///
/// assert!(round_by_majority(0.3, 0.5));
/// assert!(!round_by_majority(0.2, 0.5));
/// assert!(!round_by_majority(0.0005, 0.0008));
/// ```
#[inline]
pub fn round_by_majority(value: f64, range: f64) -> bool {
    if range < PRECISION {
        return false;
    }
    value >= smooth(range * 0.5, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_threshold_is_strict() {
        assert!(!is_positive(PRECISION));
        assert!(is_positive(PRECISION * 1.01));
    }

    #[test]
    fn test_exceeds_and_differ() {
        assert!(exceeds(90.01, 90.0));
        assert!(!exceeds(90.0005, 90.0));
        assert!(differ(1.0, 1.002));
        assert!(!differ(1.0, 1.0002));
    }

    #[test]
    fn test_distance_to_half() {
        assert!((distance_to_half(0.5) - 0.0).abs() < 1e-12);
        assert!((distance_to_half(2.25) - 0.25).abs() < 1e-12);
        assert!((distance_to_half(0.9) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_integrality_near_boundaries() {
        assert!(is_integral(0.9995));
        assert!(!is_integral(0.998));
        assert!(is_integral(7.0));
    }
}
