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

use crate::pricing::PricingStatus;
use fleetlease_core::num::ops::saturating_arithmetic::SaturatingAddVal;
use std::time::Duration;

/// Statistics collected during a branch-and-price run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BnpStatistics {
    /// Nodes whose column generation was started.
    pub nodes_explored: u64,
    /// Nodes whose relaxation stayed infeasible.
    pub prunings_infeasible: u64,
    /// Nodes closed because their bound did not beat the incumbent.
    pub prunings_bound: u64,
    /// Nodes whose relaxation was integral.
    pub integer_nodes: u64,
    /// Nodes split into two children.
    pub branchings: u64,
    /// The deepest level reached in the tree.
    pub max_depth: u64,
    /// Columns added to any pool by pricing.
    pub columns_generated: u64,
    /// Master solves across all nodes.
    pub colgen_iterations: u64,
    pub pricing_new: u64,
    pub pricing_old: u64,
    pub pricing_null: u64,
    /// Calls that stopped on the deadline before finishing.
    pub pricing_interrupted: u64,
    /// Incumbents produced by the rounding repair.
    pub repaired_incumbents: u64,
    pub solutions_found: u64,
    /// Lagrangian bound of the root after column generation.
    pub root_bound: f64,
    pub time_lp: Duration,
    pub time_pricing: Duration,
    pub time_total: Duration,
}

impl BnpStatistics {
    #[inline]
    pub fn on_node_explored(&mut self, depth: usize) {
        self.nodes_explored = self.nodes_explored.saturating_add_val(1);
        self.max_depth = self.max_depth.max(depth as u64);
    }

    #[inline]
    pub fn on_pruning_infeasible(&mut self) {
        self.prunings_infeasible = self.prunings_infeasible.saturating_add_val(1);
    }

    #[inline]
    pub fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add_val(1);
    }

    #[inline]
    pub fn on_integer_node(&mut self) {
        self.integer_nodes = self.integer_nodes.saturating_add_val(1);
    }

    #[inline]
    pub fn on_branching(&mut self) {
        self.branchings = self.branchings.saturating_add_val(1);
    }

    /// Records one master solve and the time it took.
    #[inline]
    pub fn on_master_solved(&mut self, elapsed: Duration) {
        self.colgen_iterations = self.colgen_iterations.saturating_add_val(1);
        self.time_lp += elapsed;
    }

    /// Records the classification of one pricing call.
    #[inline]
    pub fn on_pricing(&mut self, status: PricingStatus, added: usize, complete: bool) {
        match status {
            PricingStatus::New => self.pricing_new = self.pricing_new.saturating_add_val(1),
            PricingStatus::Old => self.pricing_old = self.pricing_old.saturating_add_val(1),
            PricingStatus::Null => self.pricing_null = self.pricing_null.saturating_add_val(1),
        }
        if !complete {
            self.pricing_interrupted = self.pricing_interrupted.saturating_add_val(1);
        }
        self.columns_generated = self.columns_generated.saturating_add_val(added as u64);
    }

    #[inline]
    pub fn on_pricing_round(&mut self, elapsed: Duration) {
        self.time_pricing += elapsed;
    }

    #[inline]
    pub fn on_repaired_incumbent(&mut self) {
        self.repaired_incumbents = self.repaired_incumbents.saturating_add_val(1);
    }

    #[inline]
    pub fn on_solution_found(&mut self) {
        self.solutions_found = self.solutions_found.saturating_add_val(1);
    }

    #[inline]
    pub fn set_root_bound(&mut self, bound: f64) {
        self.root_bound = bound;
    }

    #[inline]
    pub fn set_total_time(&mut self, duration: Duration) {
        self.time_total = duration;
    }

    /// Pricing calls of every outcome.
    #[inline]
    pub fn pricing_calls(&self) -> u64 {
        self.pricing_new
            .saturating_add_val(self.pricing_old)
            .saturating_add_val(self.pricing_null)
    }
}

impl std::fmt::Display for BnpStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Branch-and-Price Statistics:")?;
        writeln!(f, "  Nodes explored:        {}", self.nodes_explored)?;
        writeln!(f, "  Max depth reached:     {}", self.max_depth)?;
        writeln!(f, "  Branchings:            {}", self.branchings)?;
        writeln!(f, "  Prunings (infeasible): {}", self.prunings_infeasible)?;
        writeln!(f, "  Prunings (bound):      {}", self.prunings_bound)?;
        writeln!(f, "  Integer nodes:         {}", self.integer_nodes)?;
        writeln!(f, "  Columns generated:     {}", self.columns_generated)?;
        writeln!(f, "  CG iterations:         {}", self.colgen_iterations)?;
        writeln!(
            f,
            "  Pricing (new/old/null): {}/{}/{}",
            self.pricing_new, self.pricing_old, self.pricing_null
        )?;
        writeln!(f, "  Pricing interrupted:   {}", self.pricing_interrupted)?;
        writeln!(f, "  Repaired incumbents:   {}", self.repaired_incumbents)?;
        writeln!(f, "  Solutions found:       {}", self.solutions_found)?;
        writeln!(f, "  Root bound:            {:.3}", self.root_bound)?;
        writeln!(f, "  Time in LP:            {:.2?}", self.time_lp)?;
        writeln!(f, "  Time in pricing:       {:.2?}", self.time_pricing)?;
        writeln!(f, "  Total time:            {:.2?}", self.time_total)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut stats = BnpStatistics::default();
        stats.on_node_explored(0);
        stats.on_node_explored(4);
        stats.on_node_explored(2);
        stats.on_pricing(PricingStatus::New, 3, true);
        stats.on_pricing(PricingStatus::Old, 0, true);
        stats.on_pricing(PricingStatus::Null, 0, false);
        stats.on_master_solved(Duration::from_millis(5));
        stats.on_master_solved(Duration::from_millis(5));
        assert_eq!(stats.nodes_explored, 3);
        assert_eq!(stats.max_depth, 4);
        assert_eq!(stats.columns_generated, 3);
        assert_eq!(stats.pricing_calls(), 3);
        assert_eq!(stats.pricing_interrupted, 1);
        assert_eq!(stats.colgen_iterations, 2);
        assert_eq!(stats.time_lp, Duration::from_millis(10));
    }

    #[test]
    fn test_saturates_instead_of_wrapping() {
        let mut stats = BnpStatistics {
            columns_generated: u64::MAX - 1,
            ..Default::default()
        };
        stats.on_pricing(PricingStatus::New, 5, true);
        assert_eq!(stats.columns_generated, u64::MAX);
    }

    #[test]
    fn test_display_lists_counters() {
        let mut stats = BnpStatistics::default();
        stats.on_branching();
        stats.set_root_bound(90.0);
        let rendered = stats.to_string();
        assert!(rendered.contains("Branch-and-Price Statistics:"));
        assert!(rendered.contains("Branchings:            1"));
        assert!(rendered.contains("Root bound:            90.000"));
    }
}
