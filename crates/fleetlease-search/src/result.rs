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

//! Final outcome of a search: the best plan found, why the search ended and
//! how far the proven bounds are apart.

use crate::stats::SolverStatistics;
use fleetlease_core::num::tolerance::PRECISION;
use fleetlease_model::solution::Solution;

#[derive(Debug, Clone, PartialEq)]
pub enum SolverResult {
    /// The solution is proven optimal within the gap tolerance.
    Optimal(Solution),
    /// A feasible solution without a completed optimality proof.
    Feasible(Solution),
}

impl SolverResult {
    #[inline]
    pub fn solution(&self) -> &Solution {
        match self {
            SolverResult::Optimal(s) | SolverResult::Feasible(s) => s,
        }
    }

    #[inline]
    pub fn into_solution(self) -> Solution {
        match self {
            SolverResult::Optimal(s) | SolverResult::Feasible(s) => s,
        }
    }
}

impl std::fmt::Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Optimal(solution) => {
                write!(f, "Optimal(objective={:.3})", solution.objective())
            }
            SolverResult::Feasible(solution) => {
                write!(f, "Feasible(objective={:.3})", solution.objective())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The search tree was exhausted.
    OptimalityProven,
    /// The relative gap dropped below the configured limit.
    GapReached,
    Aborted(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::OptimalityProven => write!(f, "Optimality Proven"),
            TerminationReason::GapReached => write!(f, "Gap Reached"),
            TerminationReason::Aborted(reason) => write!(f, "Aborted: {}", reason),
        }
    }
}

/// Relative optimality gap between a lower bound (incumbent profit) and an
/// upper bound on the best achievable profit.
///
/// ```rust
/// # use fleetlease_search::result::relative_gap;
///
/// assert_eq!(relative_gap(90.0, 90.0), 0.0);
/// assert_eq!(relative_gap(0.0, 20.0), 1.0);
/// assert!((relative_gap(80.0, 100.0) - 0.2).abs() < 1e-12);
/// ```
#[inline]
pub fn relative_gap(lower_bound: f64, upper_bound: f64) -> f64 {
    if upper_bound - lower_bound < PRECISION {
        0.0
    } else if lower_bound < PRECISION {
        1.0
    } else {
        1.0 - lower_bound / upper_bound
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub result: SolverResult,
    pub reason: TerminationReason,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub gap: f64,
    pub statistics: SolverStatistics,
}

impl SolverOutcome {
    #[inline]
    pub fn new(
        result: SolverResult,
        reason: TerminationReason,
        lower_bound: f64,
        upper_bound: f64,
        gap: f64,
        statistics: SolverStatistics,
    ) -> Self {
        Self {
            result,
            reason,
            lower_bound,
            upper_bound,
            gap,
            statistics,
        }
    }

    #[inline]
    pub fn is_optimal(&self) -> bool {
        matches!(self.result, SolverResult::Optimal(_))
    }

    #[inline]
    pub fn solution(&self) -> &Solution {
        self.result.solution()
    }

    #[inline]
    pub fn objective(&self) -> f64 {
        self.result.solution().objective()
    }
}

impl std::fmt::Display for SolverOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result: {}", self.result)?;
        writeln!(f, "Reason: {}", self.reason)?;
        writeln!(
            f,
            "Bounds: [{:.3}, {:.3}] gap {:.4}%",
            self.lower_bound,
            self.upper_bound,
            self.gap * 100.0
        )?;
        write!(f, "{}", self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::SolverStatisticsBuilder;
    use fleetlease_core::math::window::TimeWindow;
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentFunction,
    };

    fn idle_solution() -> Solution {
        let mut b = InstanceBuilder::new(4);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 4), RentFunction::flat(5.0, 4)));
        let c = b.add_customer(10.0);
        b.add_order(OrderSpec::new(c, 0, TimeWindow::new(0, 2)));
        let instance = b.build(&ModelOptions::default()).expect("valid instance");
        Solution::idle(&instance)
    }

    #[test]
    fn test_gap_edge_cases() {
        assert_eq!(relative_gap(10.0, 10.0005), 0.0);
        assert_eq!(relative_gap(0.0, 5.0), 1.0);
        assert!((relative_gap(50.0, 100.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = SolverOutcome::new(
            SolverResult::Optimal(idle_solution()),
            TerminationReason::OptimalityProven,
            0.0,
            0.0,
            0.0,
            SolverStatisticsBuilder::new().build(),
        );
        assert!(outcome.is_optimal());
        assert_eq!(outcome.objective(), 0.0);
        let rendered = format!("{}", outcome);
        assert!(rendered.contains("Optimal(objective=0.000)"));
        assert!(rendered.contains("Optimality Proven"));
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(
            TerminationReason::Aborted("time limit reached".into()).to_string(),
            "Aborted: time limit reached"
        );
        assert_eq!(TerminationReason::GapReached.to_string(), "Gap Reached");
    }
}
