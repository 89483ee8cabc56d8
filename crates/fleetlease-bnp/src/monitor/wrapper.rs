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

//! Adapter for generic search monitors
//!
//! `WrapperMonitor` lets a `fleetlease_search::SearchMonitor`, such as the
//! interrupt token of the solver facade, observe a branch-and-price run.
//!
//! Behavior
//! - Delegates: enter, step, solution, exit and `search_command`.
//! - Ignores: bound, prune and branch events.
//! - `name()` is `WrapperMonitor(inner.name())`.

use crate::{
    branching::select::Branching,
    context::SearchProgress,
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    stats::BnpStatistics,
};
use fleetlease_model::{model::Instance, solution::Solution};
use fleetlease_search::monitor::search_monitor::{SearchCommand, SearchMonitor};

/// A tree search monitor that wraps a general search monitor.
pub struct WrapperMonitor<'a> {
    inner: &'a mut dyn SearchMonitor,
    name: String,
}

impl<'a> WrapperMonitor<'a> {
    #[inline(always)]
    pub fn new(inner: &'a mut dyn SearchMonitor) -> Self {
        let name = format!("WrapperMonitor({})", inner.name());
        Self { inner, name }
    }
}

impl std::fmt::Debug for WrapperMonitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl TreeSearchMonitor for WrapperMonitor<'_> {
    #[inline(always)]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    fn on_enter_search(&mut self, instance: &Instance, _statistics: &BnpStatistics) {
        self.inner.on_enter_search(instance);
    }

    #[inline(always)]
    fn on_exit_search(&mut self, _statistics: &BnpStatistics) {
        self.inner.on_exit_search();
    }

    #[inline(always)]
    fn search_command(
        &mut self,
        _progress: &SearchProgress,
        _statistics: &BnpStatistics,
    ) -> SearchCommand {
        self.inner.search_command()
    }

    #[inline(always)]
    fn on_step(&mut self, _progress: &SearchProgress, _statistics: &BnpStatistics) {
        self.inner.on_step();
    }

    #[inline(always)]
    fn on_bound_computed(
        &mut self,
        _progress: &SearchProgress,
        _relaxation: f64,
        _bound: Option<f64>,
        _statistics: &BnpStatistics,
    ) {
    }

    #[inline(always)]
    fn on_prune(
        &mut self,
        _progress: &SearchProgress,
        _reason: PruneReason,
        _statistics: &BnpStatistics,
    ) {
    }

    #[inline(always)]
    fn on_branch(
        &mut self,
        _progress: &SearchProgress,
        _branching: &Branching,
        _statistics: &BnpStatistics,
    ) {
    }

    #[inline(always)]
    fn on_solution_found(&mut self, solution: &Solution, _statistics: &BnpStatistics) {
        self.inner.on_solution_found(solution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_search::monitor::interrupt::InterruptMonitor;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    #[test]
    fn test_forwards_the_interrupt() {
        let flag = AtomicBool::new(false);
        let mut interrupt = InterruptMonitor::new(&flag);
        let mut wrapper = WrapperMonitor::new(&mut interrupt);
        assert_eq!(wrapper.name(), "WrapperMonitor(InterruptMonitor)");
        let progress = SearchProgress {
            node: 0,
            depth: 0,
            node_bound: 0.0,
            lower_bound: 0.0,
            upper_bound: 0.0,
            open_nodes: 0,
            elapsed: Duration::ZERO,
        };
        let stats = BnpStatistics::default();
        assert_eq!(wrapper.search_command(&progress, &stats), SearchCommand::Continue);
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            wrapper.search_command(&progress, &stats),
            SearchCommand::Terminate(_)
        ));
    }
}
