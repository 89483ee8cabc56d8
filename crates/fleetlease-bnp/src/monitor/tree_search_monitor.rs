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

//! Tree search monitoring interface
//!
//! Declares the `TreeSearchMonitor` trait and `PruneReason` for observing and
//! steering branch-and-price. Callbacks follow the life cycle of a run, and a
//! monitor can stop the search through `SearchCommand` (default: Continue).
//!
//! Life cycle
//! - enter -> { step -> bound* -> prune | branch } -> solution -> exit
//! - `search_command` is polled before every node and after every
//!   column-generation iteration.
//!
//! Methods take `&mut self`; monitors run on the driver thread only.

use crate::{branching::select::Branching, context::SearchProgress, stats::BnpStatistics};
use fleetlease_model::{model::Instance, solution::Solution};
use fleetlease_search::monitor::search_monitor::SearchCommand;

/// Reasons for closing a node without branching.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PruneReason {
    /// The relaxation has no proper solution.
    Infeasible,
    /// The bound does not exceed the incumbent.
    BoundDominated,
    /// The relaxation solution is integral.
    Integral,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneReason::Infeasible => write!(f, "Infeasible"),
            PruneReason::BoundDominated => write!(f, "BoundDominated"),
            PruneReason::Integral => write!(f, "Integral"),
        }
    }
}

/// Observes and controls a branch-and-price search.
pub trait TreeSearchMonitor {
    fn name(&self) -> &str;
    /// Called once before the root is solved.
    fn on_enter_search(&mut self, instance: &Instance, statistics: &BnpStatistics);
    /// Called once after the search ended, for any reason.
    fn on_exit_search(&mut self, statistics: &BnpStatistics);
    fn search_command(
        &mut self,
        _progress: &SearchProgress,
        _statistics: &BnpStatistics,
    ) -> SearchCommand {
        SearchCommand::Continue
    }
    /// Called when a node is taken from the open set.
    fn on_step(&mut self, progress: &SearchProgress, statistics: &BnpStatistics);
    /// Called after each column-generation iteration with the master
    /// objective and the Lagrangian bound of that iteration, if one exists.
    fn on_bound_computed(
        &mut self,
        progress: &SearchProgress,
        relaxation: f64,
        bound: Option<f64>,
        statistics: &BnpStatistics,
    );
    fn on_prune(&mut self, progress: &SearchProgress, reason: PruneReason, statistics: &BnpStatistics);
    fn on_branch(&mut self, progress: &SearchProgress, branching: &Branching, statistics: &BnpStatistics);
    /// Called when a new incumbent is installed.
    fn on_solution_found(&mut self, solution: &Solution, statistics: &BnpStatistics);
}

impl std::fmt::Debug for dyn TreeSearchMonitor + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeSearchMonitor({})", self.name())
    }
}

impl std::fmt::Display for dyn TreeSearchMonitor + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeSearchMonitor({})", self.name())
    }
}

impl<M: TreeSearchMonitor + ?Sized> TreeSearchMonitor for &mut M {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_enter_search(&mut self, instance: &Instance, statistics: &BnpStatistics) {
        (**self).on_enter_search(instance, statistics)
    }

    fn on_exit_search(&mut self, statistics: &BnpStatistics) {
        (**self).on_exit_search(statistics)
    }

    fn search_command(&mut self, progress: &SearchProgress, statistics: &BnpStatistics) -> SearchCommand {
        (**self).search_command(progress, statistics)
    }

    fn on_step(&mut self, progress: &SearchProgress, statistics: &BnpStatistics) {
        (**self).on_step(progress, statistics)
    }

    fn on_bound_computed(
        &mut self,
        progress: &SearchProgress,
        relaxation: f64,
        bound: Option<f64>,
        statistics: &BnpStatistics,
    ) {
        (**self).on_bound_computed(progress, relaxation, bound, statistics)
    }

    fn on_prune(&mut self, progress: &SearchProgress, reason: PruneReason, statistics: &BnpStatistics) {
        (**self).on_prune(progress, reason, statistics)
    }

    fn on_branch(&mut self, progress: &SearchProgress, branching: &Branching, statistics: &BnpStatistics) {
        (**self).on_branch(progress, branching, statistics)
    }

    fn on_solution_found(&mut self, solution: &Solution, statistics: &BnpStatistics) {
        (**self).on_solution_found(solution, statistics)
    }
}
