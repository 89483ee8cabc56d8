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

use crate::stats::BnpStatistics;
use fleetlease_model::solution::Solution;
use fleetlease_search::{
    result::{SolverOutcome, SolverResult, TerminationReason},
    stats::SolverStatisticsBuilder,
};

/// Result of a branch-and-price run.
///
/// A run always holds an incumbent: the greedy plan, or the idle plan when
/// nothing is profitable, is available before the root is solved.
#[derive(Debug, Clone)]
pub struct BnpOutcome {
    result: SolverResult,
    termination_reason: TerminationReason,
    lower_bound: f64,
    upper_bound: f64,
    gap: f64,
    statistics: BnpStatistics,
}

impl BnpOutcome {
    /// The tree was exhausted; the incumbent is optimal.
    #[inline]
    pub fn optimal(solution: Solution, statistics: BnpStatistics) -> Self {
        let objective = solution.objective();
        Self {
            result: SolverResult::Optimal(solution),
            termination_reason: TerminationReason::OptimalityProven,
            lower_bound: objective,
            upper_bound: objective,
            gap: 0.0,
            statistics,
        }
    }

    /// The relative gap fell below the configured limit.
    #[inline]
    pub fn gap_reached(
        solution: Solution,
        upper_bound: f64,
        gap: f64,
        statistics: BnpStatistics,
    ) -> Self {
        let lower_bound = solution.objective();
        Self {
            result: SolverResult::Optimal(solution),
            termination_reason: TerminationReason::GapReached,
            lower_bound,
            upper_bound,
            gap,
            statistics,
        }
    }

    #[inline]
    pub fn aborted<R>(
        solution: Solution,
        reason: R,
        upper_bound: f64,
        gap: f64,
        statistics: BnpStatistics,
    ) -> Self
    where
        R: Into<String>,
    {
        let lower_bound = solution.objective();
        Self {
            result: SolverResult::Feasible(solution),
            termination_reason: TerminationReason::Aborted(reason.into()),
            lower_bound,
            upper_bound,
            gap,
            statistics,
        }
    }

    #[inline]
    pub fn result(&self) -> &SolverResult {
        &self.result
    }

    #[inline]
    pub fn solution(&self) -> &Solution {
        self.result.solution()
    }

    #[inline]
    pub fn termination_reason(&self) -> &TerminationReason {
        &self.termination_reason
    }

    /// Objective of the incumbent.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// Largest bound over the nodes left open.
    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    #[inline]
    pub fn gap(&self) -> f64 {
        self.gap
    }

    #[inline]
    pub fn statistics(&self) -> &BnpStatistics {
        &self.statistics
    }
}

impl std::fmt::Display for BnpOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result: {}", self.result)?;
        writeln!(f, "Reason: {}", self.termination_reason)?;
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

impl From<BnpOutcome> for SolverOutcome {
    fn from(val: BnpOutcome) -> Self {
        let statistics = SolverStatisticsBuilder::new()
            .solutions_found(val.statistics.solutions_found)
            .nodes_explored(val.statistics.nodes_explored)
            .columns_generated(val.statistics.columns_generated)
            .solve_duration(val.statistics.time_total)
            .build();
        SolverOutcome::new(
            val.result,
            val.termination_reason,
            val.lower_bound,
            val.upper_bound,
            val.gap,
            statistics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_core::math::window::TimeWindow;
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentFunction,
    };
    use std::time::Duration;

    fn idle_solution() -> Solution {
        let mut b = InstanceBuilder::new(4);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 4), RentFunction::flat(5.0, 4)));
        let c = b.add_customer(10.0);
        b.add_order(OrderSpec::new(c, 0, TimeWindow::new(0, 2)));
        let instance = b.build(&ModelOptions::default()).expect("valid instance");
        Solution::idle(&instance)
    }

    #[test]
    fn test_optimal_closes_the_gap() {
        let outcome = BnpOutcome::optimal(idle_solution(), BnpStatistics::default());
        assert!(matches!(outcome.result(), SolverResult::Optimal(_)));
        assert_eq!(outcome.gap(), 0.0);
        assert_eq!(outcome.lower_bound(), outcome.upper_bound());
    }

    #[test]
    fn test_aborted_keeps_incumbent_and_reason() {
        let outcome = BnpOutcome::aborted(
            idle_solution(),
            "time limit reached",
            12.0,
            1.0,
            BnpStatistics::default(),
        );
        assert!(matches!(outcome.result(), SolverResult::Feasible(_)));
        match outcome.termination_reason() {
            TerminationReason::Aborted(msg) => assert_eq!(msg, "time limit reached"),
            other => panic!("expected Aborted termination reason, got {:?}", other),
        }
        assert_eq!(outcome.upper_bound(), 12.0);
    }

    #[test]
    fn test_into_solver_outcome_carries_counters() {
        let statistics = BnpStatistics {
            nodes_explored: 7,
            solutions_found: 2,
            columns_generated: 11,
            time_total: Duration::from_millis(250),
            ..Default::default()
        };
        let outcome: SolverOutcome =
            BnpOutcome::gap_reached(idle_solution(), 0.0, 0.0, statistics).into();
        assert!(outcome.is_optimal());
        assert_eq!(outcome.reason, TerminationReason::GapReached);
        assert_eq!(outcome.statistics.nodes_explored, 7);
        assert_eq!(outcome.statistics.solutions_found, 2);
        assert_eq!(outcome.statistics.columns_generated, 11);
        assert_eq!(outcome.statistics.solve_duration, Duration::from_millis(250));
    }
}
