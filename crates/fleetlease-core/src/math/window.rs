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

use smallvec::{SmallVec, smallvec};
use std::cmp::{max, min};

/// A discrete time window `(begin, end]`.
///
/// The window excludes `begin` and includes `end`; it therefore covers
/// `end - begin` periods. Orders, shifts and lease terms all share this
/// convention, so two windows `(a, b]` and `(b, c]` touch without
/// overlapping.
///
/// # Invariants
///
/// `begin <= end` always holds.
///
/// # Examples
///
/// ```rust
/// # use fleetlease_core::math::window::TimeWindow;
///
/// let w = TimeWindow::new(0, 3);
/// assert_eq!(w.len(), 3);
/// assert_eq!(w.slots().collect::<Vec<_>>(), vec![0, 1, 2]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeWindow {
    begin: usize,
    end: usize,
}

impl TimeWindow {
    /// Creates a new window `(begin, end]`.
    ///
    /// # Panics
    ///
    /// Panics if `begin > end`.
    #[inline]
    pub fn new(begin: usize, end: usize) -> Self {
        assert!(
            begin <= end,
            "called `TimeWindow::new` with begin {} greater than end {}",
            begin,
            end
        );
        Self { begin, end }
    }

    /// Creates a new window if `begin <= end`.
    ///
    /// ```rust
    /// # use fleetlease_core::math::window::TimeWindow;
    ///
    /// assert!(TimeWindow::try_new(2, 5).is_some());
    /// assert!(TimeWindow::try_new(5, 2).is_none());
    /// ```
    #[inline]
    pub fn try_new(begin: usize, end: usize) -> Option<Self> {
        (begin <= end).then_some(Self { begin, end })
    }

    /// Creates a window without checking the invariant in release builds.
    #[inline]
    pub fn new_unchecked(begin: usize, end: usize) -> Self {
        debug_assert!(
            begin <= end,
            "called `TimeWindow::new_unchecked` with begin {} greater than end {}",
            begin,
            end
        );
        Self { begin, end }
    }

    /// The excluded start instant.
    #[inline]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// The included end instant.
    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Number of periods covered.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Zero-based slots covered by this window, i.e. `begin..end`.
    #[inline]
    pub fn slots(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }

    /// Returns `true` if the zero-based `slot` lies inside the window.
    #[inline]
    pub fn contains_slot(&self, slot: usize) -> bool {
        self.begin <= slot && slot < self.end
    }

    /// Returns `true` if `other` lies entirely within `self`.
    ///
    /// ```rust
    /// # use fleetlease_core::math::window::TimeWindow;
    ///
    /// let outer = TimeWindow::new(0, 10);
    /// assert!(outer.contains(TimeWindow::new(0, 10)));
    /// assert!(outer.contains(TimeWindow::new(3, 4)));
    /// assert!(!outer.contains(TimeWindow::new(9, 11)));
    /// ```
    #[inline]
    pub fn contains(&self, other: Self) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// Returns `true` if the windows share at least one period.
    #[inline]
    pub fn overlaps(&self, other: Self) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Returns `true` if one window ends exactly where the other begins.
    #[inline]
    pub fn adjacent(&self, other: Self) -> bool {
        self.end == other.begin || other.end == self.begin
    }

    /// Returns `true` if `inner` starts at this window's begin or ends at its end.
    #[inline]
    pub fn touches_border(&self, inner: Self) -> bool {
        inner.begin == self.begin || inner.end == self.end
    }

    /// The common periods of both windows, if any.
    #[inline]
    pub fn intersection(&self, other: Self) -> Option<Self> {
        let begin = max(self.begin, other.begin);
        let end = min(self.end, other.end);
        (begin < end).then_some(Self { begin, end })
    }

    /// The smallest window containing both windows.
    #[inline]
    pub fn hull(&self, other: Self) -> Self {
        Self {
            begin: min(self.begin, other.begin),
            end: max(self.end, other.end),
        }
    }

    /// The periods of `self` that are not covered by `other`.
    ///
    /// ```rust
    /// # use fleetlease_core::math::window::TimeWindow;
    ///
    /// let w = TimeWindow::new(0, 10);
    /// let parts = w.difference(TimeWindow::new(3, 5));
    /// assert_eq!(parts.as_slice(), &[TimeWindow::new(0, 3), TimeWindow::new(5, 10)]);
    /// ```
    pub fn difference(&self, other: Self) -> SmallVec<[Self; 2]> {
        if !self.overlaps(other) {
            return smallvec![*self];
        }
        let mut parts = SmallVec::new();
        if self.begin < other.begin {
            parts.push(Self::new_unchecked(self.begin, other.begin));
        }
        if other.end < self.end {
            parts.push(Self::new_unchecked(other.end, self.end));
        }
        parts
    }
}

impl std::fmt::Debug for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimeWindow({}, {}]", self.begin, self.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}]", self.begin, self.end)
    }
}

impl From<TimeWindow> for std::ops::Range<usize> {
    fn from(w: TimeWindow) -> Self {
        w.slots()
    }
}
