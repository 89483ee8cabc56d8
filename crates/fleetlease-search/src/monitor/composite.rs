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

use crate::monitor::search_monitor::{SearchCommand, SearchMonitor};
use fleetlease_model::{model::Instance, solution::Solution};

/// Forwards every event to all inner monitors. The first monitor that asks
/// to terminate decides the command.
pub struct CompositeMonitor<'a> {
    monitors: Vec<Box<dyn SearchMonitor + 'a>>,
}

impl std::fmt::Debug for CompositeMonitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let monitors_str = self
            .monitors
            .iter()
            .map(|m| m.name())
            .collect::<Vec<&str>>()
            .join(", ");

        f.debug_struct("CompositeMonitor")
            .field("monitors", &monitors_str)
            .finish()
    }
}

impl Default for CompositeMonitor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CompositeMonitor<'a> {
    #[inline]
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    #[inline]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: SearchMonitor + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl SearchMonitor for CompositeMonitor<'_> {
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_enter_search(&mut self, instance: &Instance) {
        for m in &mut self.monitors {
            m.on_enter_search(instance);
        }
    }

    fn on_exit_search(&mut self) {
        for m in &mut self.monitors {
            m.on_exit_search();
        }
    }

    fn on_solution_found(&mut self, solution: &Solution) {
        for m in &mut self.monitors {
            m.on_solution_found(solution);
        }
    }

    fn on_step(&mut self) {
        for m in &mut self.monitors {
            m.on_step();
        }
    }

    fn search_command(&self) -> SearchCommand {
        self.monitors
            .iter()
            .map(|m| m.search_command())
            .find(|c| *c != SearchCommand::Continue)
            .unwrap_or(SearchCommand::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::interrupt::InterruptMonitor;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_first_terminating_monitor_wins() {
        let idle = AtomicBool::new(false);
        let flag = AtomicBool::new(false);
        let mut composite = CompositeMonitor::new();
        composite.add_monitor(InterruptMonitor::new(&idle));
        composite.add_monitor(InterruptMonitor::new(&flag));
        assert_eq!(composite.len(), 2);
        composite.on_step();
        assert_eq!(composite.search_command(), SearchCommand::Continue);
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            composite.search_command(),
            SearchCommand::Terminate(_)
        ));
    }

    #[test]
    fn test_empty_composite_continues() {
        let composite = CompositeMonitor::default();
        assert!(composite.is_empty());
        assert_eq!(composite.search_command(), SearchCommand::Continue);
    }
}
