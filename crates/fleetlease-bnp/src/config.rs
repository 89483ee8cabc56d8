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

//! # Engine Configuration
//!
//! Every knob the branch-and-price engine reads. Instance-shaping options
//! (revisits, splitting, flexible windows, lease-term and segment caps, travel
//! costs) live in `ModelOptions` because they are applied once when the
//! instance is derived; everything here steers the search itself.

use crate::{error::BnpError, scheme::Family};
use std::time::Duration;

/// Order in which open nodes are explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchStrategy {
    /// Highest bound first, ties broken by node id.
    #[default]
    BestBound,
    DepthFirst,
    BreadthFirst,
}

/// Algorithm answering the schedule pricing subproblem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PricingMethod {
    /// Label setting with dominance, lease terms by dynamic programming.
    #[default]
    Labeling,
    /// Every admissible shift chain, lease terms by dynamic programming.
    Enumeration,
    /// Every admissible shift chain, lease terms by an integer program.
    LinearProgram,
}

/// Shape of the restricted master problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MasterLayout {
    /// One combined lease and schedule column family per unit.
    #[default]
    SingleFamily,
    /// Separate lease and schedule families tied by per-period linking rows.
    TwoFamily,
}

impl MasterLayout {
    /// Column families priced for every unit.
    #[inline]
    pub fn families(&self) -> &'static [Family] {
        match self {
            MasterLayout::SingleFamily => &[Family::Combined],
            MasterLayout::TwoFamily => &[Family::Lease, Family::Work],
        }
    }
}

/// Wavefront used by the label-setting algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LabelExtension {
    /// Labels are settled in order of their clock.
    #[default]
    ByTime,
    /// Labels are settled in order of the number of planned shifts.
    ByOrder,
}

/// How pricing results enter the Lagrangian bound of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LagrangianBound {
    /// Each unit contributes `max(0, best - convexity dual)`.
    #[default]
    Clamped,
    /// Each unit contributes `best - convexity dual`. The root stays clamped.
    Unclamped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BnpConfig {
    pub strategy: SearchStrategy,
    pub pricing: PricingMethod,
    pub layout: MasterLayout,
    pub label_extension: LabelExtension,
    pub lagrangian_bound: LagrangianBound,
    /// Relative gap below which the search stops.
    pub gap_limit: f64,
    pub time_limit: Option<Duration>,
    /// Compute the greedy profit bound before solving a node.
    pub greedy_bound: bool,
    /// Deepest node at which the greedy bound is still computed.
    pub greedy_depth: usize,
    /// Most new columns kept per unit and pricing call.
    pub column_cap: Option<usize>,
    pub parallel_pricing: bool,
    pub repair: bool,
    /// Re-run enumeration next to the configured pricing and fail on disagreement.
    pub cross_check_pricing: bool,
    /// Column-generation iterations allowed per node. A node that spends
    /// them without converging is never closed on its relaxation: it is
    /// split when fractional and otherwise the run stops with a gap.
    pub max_iterations: usize,
}

impl Default for BnpConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::default(),
            pricing: PricingMethod::default(),
            layout: MasterLayout::default(),
            label_extension: LabelExtension::default(),
            lagrangian_bound: LagrangianBound::default(),
            gap_limit: 1e-4,
            time_limit: None,
            greedy_bound: true,
            greedy_depth: 3,
            column_cap: None,
            parallel_pricing: false,
            repair: true,
            cross_check_pricing: false,
            max_iterations: 10_000,
        }
    }
}

impl BnpConfig {
    #[inline]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[inline]
    pub fn with_pricing(mut self, pricing: PricingMethod) -> Self {
        self.pricing = pricing;
        self
    }

    #[inline]
    pub fn with_layout(mut self, layout: MasterLayout) -> Self {
        self.layout = layout;
        self
    }

    #[inline]
    pub fn with_label_extension(mut self, extension: LabelExtension) -> Self {
        self.label_extension = extension;
        self
    }

    #[inline]
    pub fn with_lagrangian_bound(mut self, bound: LagrangianBound) -> Self {
        self.lagrangian_bound = bound;
        self
    }

    #[inline]
    pub fn with_gap_limit(mut self, gap: f64) -> Self {
        self.gap_limit = gap;
        self
    }

    #[inline]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    #[inline]
    pub fn with_greedy_bound(mut self, enabled: bool, depth: usize) -> Self {
        self.greedy_bound = enabled;
        self.greedy_depth = depth;
        self
    }

    #[inline]
    pub fn with_column_cap(mut self, cap: usize) -> Self {
        self.column_cap = Some(cap);
        self
    }

    #[inline]
    pub fn with_parallel_pricing(mut self, enabled: bool) -> Self {
        self.parallel_pricing = enabled;
        self
    }

    #[inline]
    pub fn with_repair(mut self, enabled: bool) -> Self {
        self.repair = enabled;
        self
    }

    #[inline]
    pub fn with_cross_check_pricing(mut self, enabled: bool) -> Self {
        self.cross_check_pricing = enabled;
        self
    }

    #[inline]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Rejects values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`BnpError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), BnpError> {
        if !self.gap_limit.is_finite() || self.gap_limit < 0.0 || self.gap_limit >= 1.0 {
            return Err(BnpError::InvalidConfig(format!(
                "gap_limit must lie in [0, 1), got {}",
                self.gap_limit
            )));
        }
        if self.column_cap == Some(0) {
            return Err(BnpError::InvalidConfig(
                "column_cap must keep at least one column".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(BnpError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for BnpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BnpConfig(strategy: {:?}, pricing: {:?}, layout: {:?}, gap: {}, time limit: {:?})",
            self.strategy, self.pricing, self.layout, self.gap_limit, self.time_limit
        )
    }
}
