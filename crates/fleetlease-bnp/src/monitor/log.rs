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

//! Periodic progress table on the `tracing` info level.

use crate::{
    branching::select::Branching,
    context::SearchProgress,
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    stats::BnpStatistics,
};
use fleetlease_model::{model::Instance, solution::Solution};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LogMonitor {
    last_log_time: Instant,
    log_interval: Duration,
    best_objective: Option<f64>,
    lines: u64,
}

impl LogMonitor {
    pub fn new(log_interval: Duration) -> Self {
        Self {
            last_log_time: Instant::now(),
            log_interval,
            best_objective: None,
            lines: 0,
        }
    }

    fn print_header(&self) {
        tracing::info!(
            "{:<9} | {:<8} | {:<5} | {:<6} | {:<12} | {:<12} | {:<8} | {:<8}",
            "Elapsed",
            "Nodes",
            "Depth",
            "Open",
            "Incumbent",
            "Bound",
            "Gap",
            "Columns"
        );
        tracing::info!("{}", "-".repeat(92));
    }

    fn log_line(&mut self, progress: &SearchProgress, stats: &BnpStatistics) {
        let incumbent = match self.best_objective {
            Some(obj) => format!("{:.3}", obj.max(progress.lower_bound)),
            None => format!("{:.3}", progress.lower_bound),
        };
        tracing::info!(
            "{:<9} | {:<8} | {:<5} | {:<6} | {:<12} | {:<12.3} | {:<8} | {:<8}",
            format!("{:.1}s", progress.elapsed.as_secs_f32()),
            stats.nodes_explored,
            progress.depth,
            progress.open_nodes,
            incumbent,
            progress.upper_bound,
            format!("{:.2}%", progress.gap() * 100.0),
            stats.columns_generated
        );
        self.last_log_time = Instant::now();
        self.lines += 1;
    }
}

impl Default for LogMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl std::fmt::Display for LogMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LogMonitor(log_interval: {:.1}s)",
            self.log_interval.as_secs_f32()
        )
    }
}

impl TreeSearchMonitor for LogMonitor {
    fn name(&self) -> &str {
        "LogMonitor"
    }

    fn on_enter_search(&mut self, instance: &Instance, _statistics: &BnpStatistics) {
        self.last_log_time = Instant::now();
        self.best_objective = None;
        self.lines = 0;
        tracing::info!(
            equipment = instance.num_equipment(),
            orders = instance.num_orders(),
            customers = instance.num_customers(),
            horizon = instance.horizon(),
            "branch-and-price started"
        );
        self.print_header();
    }

    fn on_exit_search(&mut self, statistics: &BnpStatistics) {
        tracing::info!("{}", "-".repeat(92));
        tracing::info!(
            nodes = statistics.nodes_explored,
            columns = statistics.columns_generated,
            elapsed = ?statistics.time_total,
            "search finished"
        );
    }

    fn on_step(&mut self, progress: &SearchProgress, statistics: &BnpStatistics) {
        // the root line is always printed
        if self.lines == 0 || self.last_log_time.elapsed() >= self.log_interval {
            self.log_line(progress, statistics);
        }
    }

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

    fn on_solution_found(&mut self, solution: &Solution, _statistics: &BnpStatistics) {
        self.best_objective = Some(solution.objective());
    }
}
