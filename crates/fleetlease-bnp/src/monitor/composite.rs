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

//! Fan-out monitor
//!
//! `CompositeTreeSearchMonitor` forwards every event to its children in
//! insertion order. `search_command` short-circuits on the first
//! non-`Continue` answer, so stricter stop conditions go first.

use crate::{
    branching::select::Branching,
    context::SearchProgress,
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    stats::BnpStatistics,
};
use fleetlease_model::{model::Instance, solution::Solution};
use fleetlease_search::monitor::search_monitor::SearchCommand;

/// A tree search monitor that forwards events to several monitors.
#[derive(Default)]
pub struct CompositeTreeSearchMonitor<'a> {
    monitors: Vec<Box<dyn TreeSearchMonitor + 'a>>,
}

impl<'a> CompositeTreeSearchMonitor<'a> {
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            monitors: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: TreeSearchMonitor + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline(always)]
    pub fn monitors(&self) -> &[Box<dyn TreeSearchMonitor + 'a>] {
        &self.monitors
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl std::fmt::Debug for CompositeTreeSearchMonitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.monitors.iter().map(|m| m.name()))
            .finish()
    }
}

impl<'a> FromIterator<Box<dyn TreeSearchMonitor + 'a>> for CompositeTreeSearchMonitor<'a> {
    #[inline(always)]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn TreeSearchMonitor + 'a>>,
    {
        Self {
            monitors: iter.into_iter().collect(),
        }
    }
}

impl TreeSearchMonitor for CompositeTreeSearchMonitor<'_> {
    #[inline(always)]
    fn name(&self) -> &str {
        "CompositeTreeSearchMonitor"
    }

    fn on_enter_search(&mut self, instance: &Instance, statistics: &BnpStatistics) {
        for monitor in &mut self.monitors {
            monitor.on_enter_search(instance, statistics);
        }
    }

    fn on_exit_search(&mut self, statistics: &BnpStatistics) {
        for monitor in &mut self.monitors {
            monitor.on_exit_search(statistics);
        }
    }

    fn search_command(
        &mut self,
        progress: &SearchProgress,
        statistics: &BnpStatistics,
    ) -> SearchCommand {
        for monitor in &mut self.monitors {
            let cmd = monitor.search_command(progress, statistics);
            if !matches!(cmd, SearchCommand::Continue) {
                return cmd;
            }
        }
        SearchCommand::Continue
    }

    fn on_step(&mut self, progress: &SearchProgress, statistics: &BnpStatistics) {
        for monitor in &mut self.monitors {
            monitor.on_step(progress, statistics);
        }
    }

    fn on_bound_computed(
        &mut self,
        progress: &SearchProgress,
        relaxation: f64,
        bound: Option<f64>,
        statistics: &BnpStatistics,
    ) {
        for monitor in &mut self.monitors {
            monitor.on_bound_computed(progress, relaxation, bound, statistics);
        }
    }

    fn on_prune(&mut self, progress: &SearchProgress, reason: PruneReason, statistics: &BnpStatistics) {
        for monitor in &mut self.monitors {
            monitor.on_prune(progress, reason, statistics);
        }
    }

    fn on_branch(
        &mut self,
        progress: &SearchProgress,
        branching: &Branching,
        statistics: &BnpStatistics,
    ) {
        for monitor in &mut self.monitors {
            monitor.on_branch(progress, branching, statistics);
        }
    }

    fn on_solution_found(&mut self, solution: &Solution, statistics: &BnpStatistics) {
        for monitor in &mut self.monitors {
            monitor.on_solution_found(solution, statistics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::no_op::NoOperationMonitor;
    use std::time::Duration;

    struct StopAfter {
        steps: usize,
        seen: usize,
    }

    impl TreeSearchMonitor for StopAfter {
        fn name(&self) -> &str {
            "StopAfter"
        }
        fn on_enter_search(&mut self, _instance: &Instance, _statistics: &BnpStatistics) {}
        fn on_exit_search(&mut self, _statistics: &BnpStatistics) {}
        fn search_command(&mut self, _p: &SearchProgress, _s: &BnpStatistics) -> SearchCommand {
            if self.seen >= self.steps {
                SearchCommand::Terminate(format!("after {} steps", self.steps))
            } else {
                SearchCommand::Continue
            }
        }
        fn on_step(&mut self, _progress: &SearchProgress, _statistics: &BnpStatistics) {
            self.seen += 1;
        }
        fn on_bound_computed(&mut self, _p: &SearchProgress, _r: f64, _b: Option<f64>, _s: &BnpStatistics) {}
        fn on_prune(&mut self, _p: &SearchProgress, _r: PruneReason, _s: &BnpStatistics) {}
        fn on_branch(&mut self, _p: &SearchProgress, _b: &Branching, _s: &BnpStatistics) {}
        fn on_solution_found(&mut self, _solution: &Solution, _statistics: &BnpStatistics) {}
    }

    fn progress() -> SearchProgress {
        SearchProgress {
            node: 0,
            depth: 0,
            node_bound: 10.0,
            lower_bound: 0.0,
            upper_bound: 10.0,
            open_nodes: 1,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_fans_out_and_short_circuits() {
        let mut composite = CompositeTreeSearchMonitor::new();
        composite.add_monitor(NoOperationMonitor::new());
        composite.add_monitor(StopAfter { steps: 2, seen: 0 });
        composite.add_monitor(StopAfter { steps: 1, seen: 0 });
        assert_eq!(composite.len(), 3);

        let stats = BnpStatistics::default();
        assert_eq!(composite.search_command(&progress(), &stats), SearchCommand::Continue);
        composite.on_step(&progress(), &stats);
        // only the third child has seen enough steps
        assert_eq!(
            composite.search_command(&progress(), &stats),
            SearchCommand::Terminate("after 1 steps".to_string())
        );
        composite.on_step(&progress(), &stats);
        assert_eq!(
            composite.search_command(&progress(), &stats),
            SearchCommand::Terminate("after 2 steps".to_string())
        );
    }

    #[test]
    fn test_empty_composite_continues() {
        let mut composite: CompositeTreeSearchMonitor<'_> = std::iter::empty().collect();
        assert!(composite.is_empty());
        assert_eq!(
            composite.search_command(&progress(), &BnpStatistics::default()),
            SearchCommand::Continue
        );
    }
}
