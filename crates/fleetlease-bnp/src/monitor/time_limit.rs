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

//! Wall-clock budget for a branch-and-price run.
//!
//! `TimeLimitMonitor` restarts its clock when the search is entered and asks
//! for termination once the budget is spent. Nodes are expensive, so the
//! clock is read on every poll unless a step mask says otherwise.

use crate::{
    branching::select::Branching,
    context::SearchProgress,
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    stats::BnpStatistics,
};
use fleetlease_model::{model::Instance, solution::Solution};
use fleetlease_search::monitor::search_monitor::SearchCommand;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimitMonitor {
    start_time: Instant,
    time_limit: Duration,
    clock_check_mask: u64,
    polls: u64,
}

impl TimeLimitMonitor {
    pub fn new(time_limit: Duration) -> Self {
        Self::with_clock_check_mask(time_limit, 0)
    }

    /// The clock is read on polls whose count has no bit of `mask` set.
    pub fn with_clock_check_mask(time_limit: Duration, mask: u64) -> Self {
        Self {
            start_time: Instant::now(),
            time_limit,
            clock_check_mask: mask,
            polls: 0,
        }
    }

    #[inline]
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }
}

impl TreeSearchMonitor for TimeLimitMonitor {
    fn name(&self) -> &str {
        "TimeLimitMonitor"
    }

    fn on_enter_search(&mut self, _instance: &Instance, _statistics: &BnpStatistics) {
        self.start_time = Instant::now();
        self.polls = 0;
    }

    fn on_exit_search(&mut self, _statistics: &BnpStatistics) {}

    fn search_command(
        &mut self,
        _progress: &SearchProgress,
        _statistics: &BnpStatistics,
    ) -> SearchCommand {
        let poll = self.polls;
        self.polls = self.polls.wrapping_add(1);
        if (poll & self.clock_check_mask) == 0 && self.start_time.elapsed() >= self.time_limit {
            return SearchCommand::Terminate("time limit reached".to_string());
        }
        SearchCommand::Continue
    }

    fn on_step(&mut self, _progress: &SearchProgress, _statistics: &BnpStatistics) {}

    fn on_bound_computed(
        &mut self,
        _progress: &SearchProgress,
        _relaxation: f64,
        _bound: Option<f64>,
        _statistics: &BnpStatistics,
    ) {
    }

    fn on_prune(
        &mut self,
        _progress: &SearchProgress,
        _reason: PruneReason,
        _statistics: &BnpStatistics,
    ) {
    }

    fn on_branch(
        &mut self,
        _progress: &SearchProgress,
        _branching: &Branching,
        _statistics: &BnpStatistics,
    ) {
    }

    fn on_solution_found(&mut self, _solution: &Solution, _statistics: &BnpStatistics) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> SearchProgress {
        SearchProgress {
            node: 0,
            depth: 0,
            node_bound: 0.0,
            lower_bound: 0.0,
            upper_bound: 0.0,
            open_nodes: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_zero_budget_terminates() {
        let mut monitor = TimeLimitMonitor::new(Duration::ZERO);
        let command = monitor.search_command(&progress(), &BnpStatistics::default());
        assert_eq!(command, SearchCommand::Terminate("time limit reached".to_string()));
    }

    #[test]
    fn test_large_budget_continues() {
        let mut monitor = TimeLimitMonitor::new(Duration::from_secs(3600));
        for _ in 0..4 {
            assert_eq!(
                monitor.search_command(&progress(), &BnpStatistics::default()),
                SearchCommand::Continue
            );
        }
    }

    #[test]
    fn test_mask_skips_clock_reads() {
        let mut monitor = TimeLimitMonitor::with_clock_check_mask(Duration::ZERO, 0b11);
        let stats = BnpStatistics::default();
        assert!(matches!(monitor.search_command(&progress(), &stats), SearchCommand::Terminate(_)));
        for _ in 0..3 {
            assert_eq!(monitor.search_command(&progress(), &stats), SearchCommand::Continue);
        }
        assert!(matches!(monitor.search_command(&progress(), &stats), SearchCommand::Terminate(_)));
    }
}
