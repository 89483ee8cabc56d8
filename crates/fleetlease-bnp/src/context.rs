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

//! Search-wide state owned by the driver.
//!
//! [`SearchContext`] holds the incumbent, the statistics, the clock and the
//! stop request of one run. The driver is its only owner; node processing
//! borrows it mutably between node evaluations and nothing else touches it.
//! [`SearchProgress`] is the read-only snapshot handed to monitors.

use crate::{node::Node, stats::BnpStatistics};
use fleetlease_core::num::tolerance::PRECISION;
use fleetlease_lp::oracle::SolveLimits;
use fleetlease_model::solution::Solution;
use fleetlease_search::result::relative_gap;
use std::time::{Duration, Instant};

/// A snapshot of the search as monitors see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchProgress {
    /// Id of the node being processed.
    pub node: usize,
    pub depth: usize,
    /// Current bound of the node being processed.
    pub node_bound: f64,
    /// Objective of the incumbent.
    pub lower_bound: f64,
    /// Largest bound over the open nodes and the node being processed.
    pub upper_bound: f64,
    pub open_nodes: usize,
    pub elapsed: Duration,
}

impl SearchProgress {
    #[inline]
    pub fn gap(&self) -> f64 {
        relative_gap(self.lower_bound, self.upper_bound)
    }
}

impl std::fmt::Display for SearchProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchProgress(node: {}, depth: {}, bounds: [{:.3}, {:.3}], open: {})",
            self.node, self.depth, self.lower_bound, self.upper_bound, self.open_nodes
        )
    }
}

/// Size and largest bound of the open set, apart from the node in hand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OpenNodes {
    pub count: usize,
    pub bound: Option<f64>,
}

#[derive(Debug)]
pub struct SearchContext<'a> {
    incumbent: Solution,
    statistics: BnpStatistics,
    start: Instant,
    limits: SolveLimits<'a>,
    stop: Option<String>,
}

impl<'a> SearchContext<'a> {
    /// Starts the clock with `incumbent` as the first lower bound.
    pub fn new(incumbent: Solution, time_limit: Option<Duration>, limits: SolveLimits<'a>) -> Self {
        let start = Instant::now();
        let limits = match time_limit.and_then(|t| start.checked_add(t)) {
            Some(deadline) => limits.with_deadline(deadline),
            None => limits,
        };
        Self {
            incumbent,
            statistics: BnpStatistics::default(),
            start,
            limits,
            stop: None,
        }
    }

    #[inline]
    pub fn incumbent(&self) -> &Solution {
        &self.incumbent
    }

    /// Objective of the incumbent.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.incumbent.objective()
    }

    /// Upper bound over `open` and `node`, never below the incumbent.
    pub fn upper_bound(&self, node: Option<&Node>, open: OpenNodes) -> f64 {
        let mut bound = self.lower_bound();
        if let Some(b) = open.bound {
            bound = bound.max(b);
        }
        if let Some(n) = node {
            bound = bound.max(n.bound());
        }
        bound
    }

    /// Snapshot for monitors while `node` is processed.
    pub fn progress(&self, node: &Node, open: OpenNodes) -> SearchProgress {
        SearchProgress {
            node: node.id(),
            depth: node.depth(),
            node_bound: node.bound(),
            lower_bound: self.lower_bound(),
            upper_bound: self.upper_bound(Some(node), open),
            open_nodes: open.count,
            elapsed: self.elapsed(),
        }
    }

    /// Installs `solution` if it beats the incumbent by more than the
    /// tolerance. Returns `true` if it was installed.
    pub fn offer(&mut self, solution: Solution) -> bool {
        if solution.objective() > self.incumbent.objective() + PRECISION {
            tracing::info!(
                objective = solution.objective(),
                previous = self.incumbent.objective(),
                accepted = solution.num_accepted(),
                "new incumbent"
            );
            self.incumbent = solution;
            self.statistics.on_solution_found();
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn statistics(&self) -> &BnpStatistics {
        &self.statistics
    }

    #[inline]
    pub fn statistics_mut(&mut self) -> &mut BnpStatistics {
        &mut self.statistics
    }

    /// Deadline and interrupt flag for the LP oracle and pricing.
    #[inline]
    pub fn limits(&self) -> SolveLimits<'a> {
        self.limits
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Records the first stop request; later ones are ignored.
    pub fn request_stop(&mut self, reason: impl Into<String>) {
        if self.stop.is_none() {
            let reason = reason.into();
            tracing::debug!(reason = %reason, "stop requested");
            self.stop = Some(reason);
        }
    }

    /// `true` once a stop was requested, the deadline passed or the
    /// interrupt flag was raised. Records the reason on the first trip.
    pub fn should_stop(&mut self) -> bool {
        if self.stop.is_some() {
            return true;
        }
        if self.limits.should_stop() {
            let timed_out = self.limits.deadline().is_some_and(|d| Instant::now() >= d);
            self.request_stop(if timed_out {
                "time limit reached"
            } else {
                "interrupted"
            });
            return true;
        }
        false
    }

    #[inline]
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop.as_deref()
    }

    /// Stops the clock and hands back the incumbent and the statistics.
    pub fn finish(mut self) -> (Solution, BnpStatistics) {
        self.statistics.set_total_time(self.start.elapsed());
        (self.incumbent, self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_core::math::window::TimeWindow;
    use fleetlease_model::{
        model::{EquipmentSpec, Instance, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentFunction,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(5);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 5), RentFunction::flat(10.0, 5)));
        let a = b.add_customer(50.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance")
    }

    #[test]
    fn test_offer_keeps_the_better_solution() {
        let inst = instance();
        let mut context = SearchContext::new(Solution::idle(&inst), None, SolveLimits::none());
        assert!(!context.offer(Solution::idle(&inst)));
        assert_eq!(context.statistics().solutions_found, 0);
        assert_eq!(context.lower_bound(), 0.0);
    }

    #[test]
    fn test_interrupt_is_recorded_once() {
        let inst = instance();
        let flag = AtomicBool::new(false);
        let mut context = SearchContext::new(
            Solution::idle(&inst),
            None,
            SolveLimits::none().with_interrupt(&flag),
        );
        assert!(!context.should_stop());
        flag.store(true, Ordering::Relaxed);
        assert!(context.should_stop());
        assert_eq!(context.stop_reason(), Some("interrupted"));
        context.request_stop("something else");
        assert_eq!(context.stop_reason(), Some("interrupted"));
    }

    #[test]
    fn test_zero_time_limit_stops_immediately() {
        let inst = instance();
        let mut context =
            SearchContext::new(Solution::idle(&inst), Some(Duration::ZERO), SolveLimits::none());
        assert!(context.should_stop());
        assert_eq!(context.stop_reason(), Some("time limit reached"));
    }

    #[test]
    fn test_upper_bound_covers_node_and_open_set() {
        use crate::pool::NodePools;
        let inst = instance();
        let context = SearchContext::new(Solution::idle(&inst), None, SolveLimits::none());
        let node = Node::root(NodePools::new(1), 30.0);
        let open = OpenNodes {
            count: 2,
            bound: Some(45.0),
        };
        assert_eq!(context.upper_bound(Some(&node), open), 45.0);
        assert_eq!(context.upper_bound(None, OpenNodes::default()), 0.0);
        let progress = context.progress(&node, open);
        assert_eq!(progress.node_bound, 30.0);
        assert_eq!(progress.open_nodes, 2);
    }

    #[test]
    fn test_progress_gap() {
        let progress = SearchProgress {
            node: 3,
            depth: 1,
            node_bound: 100.0,
            lower_bound: 80.0,
            upper_bound: 100.0,
            open_nodes: 2,
            elapsed: Duration::ZERO,
        };
        assert!((progress.gap() - 0.2).abs() < 1e-12);
    }
}
