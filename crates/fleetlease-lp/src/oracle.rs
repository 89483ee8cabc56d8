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

//! The contract between the branch-and-price engine and a linear
//! programming engine.
//!
//! The engine builds an [`LpProblem`], hands it to an [`LpOracle`] together
//! with [`SolveLimits`], and reads back objective, primal values, duals and a
//! status. Oracles poll the limits at bounded intervals; there are no
//! callbacks into the caller.

use crate::{error::LpError, problem::LpProblem, solution::LpSolution};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

/// A deadline and an interrupt flag an oracle polls while solving.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveLimits<'a> {
    deadline: Option<Instant>,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> SolveLimits<'a> {
    /// No deadline and no interrupt flag.
    #[inline]
    pub fn none() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[inline]
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` once the deadline has passed or the flag was raised.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.interrupt
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Solves linear programs and honours integer columns. Row duals are
/// reported only for problems without integer columns.
pub trait LpOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Solves `problem` within `limits`.
    ///
    /// # Errors
    ///
    /// Only malformed problems produce an error; infeasibility,
    /// unboundedness and interruptions are reported through the status.
    fn solve(&self, problem: &LpProblem, limits: &SolveLimits<'_>) -> Result<LpSolution, LpError>;
}

impl std::fmt::Debug for dyn LpOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LpOracle({})", self.name())
    }
}

impl<O: LpOracle + ?Sized> LpOracle for &O {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &LpProblem, limits: &SolveLimits<'_>) -> Result<LpSolution, LpError> {
        (**self).solve(problem, limits)
    }
}

impl<O: LpOracle + ?Sized> LpOracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &LpProblem, limits: &SolveLimits<'_>) -> Result<LpSolution, LpError> {
        (**self).solve(problem, limits)
    }
}
