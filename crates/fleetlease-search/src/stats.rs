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

use std::time::Duration;

/// Run-level counters every solver front end reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SolverStatistics {
    pub solutions_found: u64,
    pub nodes_explored: u64,
    /// Columns added to the restricted masters over the whole run.
    pub columns_generated: u64,
    pub solve_duration: Duration,
}

impl std::fmt::Display for SolverStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solver Statistics:")?;
        writeln!(f, "  Solutions found:   {}", self.solutions_found)?;
        writeln!(f, "  Nodes explored:    {}", self.nodes_explored)?;
        writeln!(f, "  Columns generated: {}", self.columns_generated)?;
        writeln!(
            f,
            "  Solve time (secs): {:.3}",
            self.solve_duration.as_secs_f64()
        )
    }
}

/// Builder for [`SolverStatistics`]; unset counters stay zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SolverStatisticsBuilder {
    statistics: SolverStatistics,
}

impl SolverStatisticsBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn solutions_found(mut self, count: u64) -> Self {
        self.statistics.solutions_found = count;
        self
    }

    #[inline]
    pub fn nodes_explored(mut self, count: u64) -> Self {
        self.statistics.nodes_explored = count;
        self
    }

    #[inline]
    pub fn columns_generated(mut self, count: u64) -> Self {
        self.statistics.columns_generated = count;
        self
    }

    #[inline]
    pub fn solve_duration(mut self, duration: Duration) -> Self {
        self.statistics.solve_duration = duration;
        self
    }

    #[inline]
    pub fn build(self) -> SolverStatistics {
        self.statistics
    }
}
