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

//! # Piecewise Rent Function
//!
//! The leasing price of an equipment unit depends only on the length of the
//! lease term. Durations are partitioned into consecutive segments
//! `bp(n-1) < d <= bp(n)` (with `bp(-1) = 0`) and each segment prices a term
//! as `slope * d + intercept`. A term of length zero costs nothing, and
//! durations beyond the last breakpoint are priced by the last segment.

use smallvec::SmallVec;

/// One linear piece of a [`RentFunction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RentSegment {
    slope: f64,
    intercept: f64,
    breakpoint: usize,
}

impl RentSegment {
    /// Creates a segment that applies to durations up to and including `breakpoint`.
    #[inline]
    pub const fn new(slope: f64, intercept: f64, breakpoint: usize) -> Self {
        Self {
            slope,
            intercept,
            breakpoint,
        }
    }

    #[inline]
    pub const fn slope(&self) -> f64 {
        self.slope
    }

    #[inline]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    #[inline]
    pub const fn breakpoint(&self) -> usize {
        self.breakpoint
    }
}

/// Reasons a list of segments does not form a valid rent function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RentFunctionError {
    /// No segment was given.
    Empty,
    /// Breakpoint `index` does not exceed its predecessor (or is zero).
    NonIncreasingBreakpoint { index: usize },
    /// A slope or intercept is negative or not finite.
    InvalidCoefficient { index: usize },
}

impl std::fmt::Display for RentFunctionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "rent function has no segments"),
            Self::NonIncreasingBreakpoint { index } => {
                write!(f, "breakpoint of segment {} is not increasing", index)
            }
            Self::InvalidCoefficient { index } => {
                write!(f, "segment {} has a negative or non-finite coefficient", index)
            }
        }
    }
}

impl std::error::Error for RentFunctionError {}

/// A piecewise linear price over lease durations.
#[derive(Debug, Clone, PartialEq)]
pub struct RentFunction {
    segments: SmallVec<[RentSegment; 4]>,
}

impl RentFunction {
    /// Creates a rent function from segments ordered by breakpoint.
    ///
    /// # Errors
    ///
    /// Fails if the list is empty, the breakpoints are not strictly
    /// increasing from a positive first value, or a coefficient is negative.
    pub fn new<I>(segments: I) -> Result<Self, RentFunctionError>
    where
        I: IntoIterator<Item = RentSegment>,
    {
        let segments: SmallVec<[RentSegment; 4]> = segments.into_iter().collect();
        if segments.is_empty() {
            return Err(RentFunctionError::Empty);
        }
        let mut previous = 0;
        for (index, segment) in segments.iter().enumerate() {
            if segment.breakpoint <= previous {
                return Err(RentFunctionError::NonIncreasingBreakpoint { index });
            }
            if !(segment.slope.is_finite() && segment.intercept.is_finite())
                || segment.slope < 0.0
                || segment.intercept < 0.0
            {
                return Err(RentFunctionError::InvalidCoefficient { index });
            }
            previous = segment.breakpoint;
        }
        Ok(Self { segments })
    }

    /// A single segment charging `cost` for every duration up to `max_duration`.
    ///
    /// ```rust
    /// # use fleetlease_model::rent::RentFunction;
    ///
    /// let rent = RentFunction::flat(10.0, 5);
    /// assert_eq!(rent.rent(1), 10.0);
    /// assert_eq!(rent.rent(5), 10.0);
    /// assert_eq!(rent.rent(0), 0.0);
    /// ```
    #[inline]
    pub fn flat(cost: f64, max_duration: usize) -> Self {
        let mut segments = SmallVec::new();
        segments.push(RentSegment::new(0.0, cost.max(0.0), max_duration.max(1)));
        Self { segments }
    }

    #[inline]
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn segments(&self) -> &[RentSegment] {
        &self.segments
    }

    /// Index of the segment pricing `duration`, or `None` for a zero duration.
    ///
    /// ```rust
    /// # use fleetlease_model::rent::{RentFunction, RentSegment};
    ///
    /// let rent = RentFunction::new([
    ///     RentSegment::new(3.0, 0.0, 2),
    ///     RentSegment::new(1.0, 4.0, 6),
    /// ]).unwrap();
    /// assert_eq!(rent.segment_of(0), None);
    /// assert_eq!(rent.segment_of(2), Some(0));
    /// assert_eq!(rent.segment_of(3), Some(1));
    /// assert_eq!(rent.segment_of(40), Some(1));
    /// ```
    pub fn segment_of(&self, duration: usize) -> Option<usize> {
        if duration == 0 {
            return None;
        }
        let last = self.segments.len() - 1;
        let n = self
            .segments
            .iter()
            .position(|s| duration <= s.breakpoint)
            .unwrap_or(last);
        Some(n)
    }

    /// Cost of a lease term of `duration` periods.
    #[inline]
    pub fn rent(&self, duration: usize) -> f64 {
        match self.segment_of(duration) {
            Some(n) => self.rent_in_segment(n, duration),
            None => 0.0,
        }
    }

    /// Cost of `duration` priced by segment `n` regardless of its breakpoints.
    #[inline]
    pub fn rent_in_segment(&self, n: usize, duration: usize) -> f64 {
        let segment = &self.segments[n.min(self.segments.len() - 1)];
        segment.slope * duration as f64 + segment.intercept
    }

    /// The shortest and longest duration priced by segment `n`.
    ///
    /// The last segment extends to `horizon`.
    pub fn duration_range(&self, n: usize, horizon: usize) -> (usize, usize) {
        let lower = if n == 0 {
            1
        } else {
            self.segments[n - 1].breakpoint + 1
        };
        let upper = if n + 1 == self.segments.len() {
            horizon.max(self.segments[n].breakpoint)
        } else {
            self.segments[n].breakpoint
        };
        (lower, upper)
    }

    /// Keeps at most `max_segments` leading segments.
    pub fn truncated(&self, max_segments: usize) -> Self {
        let keep = max_segments.clamp(1, self.segments.len());
        Self {
            segments: self.segments.iter().copied().take(keep).collect(),
        }
    }
}

impl std::fmt::Display for RentFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RentFunction[")?;
        for (n, s) in self.segments.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}d+{} (<= {})", s.slope, s.intercept, s.breakpoint)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_piece() -> RentFunction {
        RentFunction::new([RentSegment::new(3.0, 0.0, 2), RentSegment::new(1.0, 4.0, 6)])
            .expect("valid rent function")
    }

    #[test]
    fn test_rejects_empty_and_unordered() {
        assert_eq!(
            RentFunction::new(Vec::new()),
            Err(RentFunctionError::Empty)
        );
        let bad = RentFunction::new([RentSegment::new(1.0, 0.0, 4), RentSegment::new(1.0, 0.0, 4)]);
        assert_eq!(
            bad,
            Err(RentFunctionError::NonIncreasingBreakpoint { index: 1 })
        );
        let negative = RentFunction::new([RentSegment::new(-1.0, 0.0, 4)]);
        assert_eq!(
            negative,
            Err(RentFunctionError::InvalidCoefficient { index: 0 })
        );
    }

    #[test]
    fn test_rent_per_segment() {
        let rent = two_piece();
        assert_eq!(rent.rent(1), 3.0);
        assert_eq!(rent.rent(2), 6.0);
        assert_eq!(rent.rent(3), 7.0);
        assert_eq!(rent.rent(6), 10.0);
    }

    #[test]
    fn test_durations_beyond_last_breakpoint_use_last_segment() {
        let rent = two_piece();
        assert_eq!(rent.segment_of(9), Some(1));
        assert_eq!(rent.rent(9), 13.0);
    }

    #[test]
    fn test_duration_range() {
        let rent = two_piece();
        assert_eq!(rent.duration_range(0, 10), (1, 2));
        assert_eq!(rent.duration_range(1, 10), (3, 10));
    }

    #[test]
    fn test_truncated_keeps_leading_segments() {
        let rent = two_piece().truncated(1);
        assert_eq!(rent.num_segments(), 1);
        assert_eq!(rent.rent(4), 12.0);
    }
}
