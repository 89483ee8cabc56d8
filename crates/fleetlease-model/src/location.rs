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

//! Planar locations and the travel distance between them.

/// How distances between two locations are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceMetric {
    /// `|dx| + |dy|`.
    #[default]
    Manhattan,
    /// `sqrt(dx^2 + dy^2)`, rounded to the nearest integer.
    Euclidean,
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Manhattan => write!(f, "Manhattan"),
            DistanceMetric::Euclidean => write!(f, "Euclidean"),
        }
    }
}

/// A point in the plane where an equipment unit waits or an order is served.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to `other` under `metric`.
    ///
    /// ```rust
    /// # use fleetlease_model::location::{Location, DistanceMetric};
    ///
    /// let a = Location::new(0.0, 0.0);
    /// let b = Location::new(3.0, 4.0);
    /// assert_eq!(a.distance(b, DistanceMetric::Manhattan), 7.0);
    /// assert_eq!(a.distance(b, DistanceMetric::Euclidean), 5.0);
    /// ```
    #[inline]
    pub fn distance(&self, other: Location, metric: DistanceMetric) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        match metric {
            DistanceMetric::Manhattan => dx.abs() + dy.abs(),
            DistanceMetric::Euclidean => dx.hypot(dy).round(),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_symmetric() {
        let a = Location::new(1.0, -2.0);
        let b = Location::new(-4.0, 5.0);
        for metric in [DistanceMetric::Manhattan, DistanceMetric::Euclidean] {
            assert_eq!(a.distance(b, metric), b.distance(a, metric));
        }
    }

    #[test]
    fn test_euclidean_rounds() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(1.0, 1.0);
        assert_eq!(a.distance(b, DistanceMetric::Euclidean), 1.0);
    }
}
