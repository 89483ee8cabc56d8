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

//! # Solver Facade
//!
//! One entry point over the instance loader and the branch-and-price engine.
//!
//! ## Highlights
//!
//! - `SolverConfig` gathers every user-facing option. The instance-shaping
//!   subset becomes a `ModelOptions` for the loader, the rest a `BnpConfig`.
//! - `Solver` owns an interrupt token (`Arc<AtomicBool>`) that another thread
//!   may raise to stop the running search. The token reaches the LP oracle and
//!   pricing through the solve limits, and the tree search through a stack of
//!   generic search monitors holding an `InterruptMonitor`.
//! - A `LogMonitor` prints a progress table when a log interval is set.
//!
//! ## Usage
//!
//! ```rust
//! use fleetlease_solver::solver::{Solver, SolverConfig};
//!
//! let solver = Solver::new(SolverConfig::default().with_base_schedule_cost(0.0));
//! let instance = solver
//!     .load_instance_str("T 5\nE 0 0 5 - - 1 0 10 5\nC 50\nC 50\nO 0 0 0 3 - - 0 0\nO 1 0 3 5 - - 0 0\n")
//!     .unwrap();
//! let outcome = solver.solve(&instance).unwrap();
//! assert!((outcome.solution().objective() - 90.0).abs() < 1e-6);
//! ```

use fleetlease_bnp::{
    bnp::BnpSolver,
    config::{BnpConfig, LabelExtension, LagrangianBound, MasterLayout, PricingMethod, SearchStrategy},
    error::BnpError,
    monitor::{
        composite::CompositeTreeSearchMonitor, log::LogMonitor, no_op::NoOperationMonitor,
        tree_search_monitor::TreeSearchMonitor, wrapper::WrapperMonitor,
    },
    result::BnpOutcome,
};
use fleetlease_lp::highs::HighsOracle;
use fleetlease_model::{
    loading::{InstanceLoader, InstanceLoaderError},
    location::DistanceMetric,
    model::{DEFAULT_BASE_SCHEDULE_COST, Instance, ModelOptions},
};
use fleetlease_search::monitor::{composite::CompositeMonitor, interrupt::InterruptMonitor};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

/// Errors surfaced by the facade.
#[derive(Debug)]
pub enum SolverError {
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// The instance could not be read.
    Load(InstanceLoaderError),
    /// The search failed.
    Search(BnpError),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::Load(e) => write!(f, "failed to load instance: {}", e),
            Self::Search(e) => write!(f, "search failed: {}", e),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::Load(e) => Some(e),
            Self::Search(e) => Some(e),
        }
    }
}

impl From<InstanceLoaderError> for SolverError {
    fn from(e: InstanceLoaderError) -> Self {
        Self::Load(e)
    }
}

impl From<BnpError> for SolverError {
    fn from(e: BnpError) -> Self {
        match e {
            BnpError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::Search(other),
        }
    }
}

/// Every option the solver recognizes.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub time_limit: Option<Duration>,
    /// Relative gap below which the search stops.
    pub gap_limit: f64,
    pub strategy: SearchStrategy,
    pub pricing: PricingMethod,
    pub layout: MasterLayout,
    pub label_extension: LabelExtension,
    pub lagrangian_bound: LagrangianBound,
    /// Cap on lease terms per unit.
    pub max_lease_terms: Option<usize>,
    /// Cap on rent segments per unit.
    pub max_segments: Option<usize>,
    pub allow_revisit: bool,
    pub flexible: bool,
    pub forbid_split: bool,
    pub greedy_bound: bool,
    pub greedy_depth: usize,
    pub column_cap: Option<usize>,
    pub parallel_pricing: bool,
    pub repair: bool,
    pub cross_check_pricing: bool,
    /// Column-generation iterations per node before the run gives up on
    /// proving that node; see `BnpConfig::max_iterations`.
    pub max_iterations: usize,
    /// Added to every move between two distinct entities.
    pub base_schedule_cost: f64,
    pub distance_metric: DistanceMetric,
    /// Interval of the progress table; `None` disables it.
    pub log_interval: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let bnp = BnpConfig::default();
        let model = ModelOptions::default();
        Self {
            time_limit: bnp.time_limit,
            gap_limit: bnp.gap_limit,
            strategy: bnp.strategy,
            pricing: bnp.pricing,
            layout: bnp.layout,
            label_extension: bnp.label_extension,
            lagrangian_bound: bnp.lagrangian_bound,
            max_lease_terms: model.max_lease_terms,
            max_segments: model.max_segments,
            allow_revisit: model.allow_revisit,
            flexible: model.flexible,
            forbid_split: model.forbid_split,
            greedy_bound: bnp.greedy_bound,
            greedy_depth: bnp.greedy_depth,
            column_cap: bnp.column_cap,
            parallel_pricing: bnp.parallel_pricing,
            repair: bnp.repair,
            cross_check_pricing: bnp.cross_check_pricing,
            max_iterations: bnp.max_iterations,
            base_schedule_cost: DEFAULT_BASE_SCHEDULE_COST,
            distance_metric: model.metric,
            log_interval: None,
        }
    }
}

impl SolverConfig {
    #[inline]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    #[inline]
    pub fn with_gap_limit(mut self, gap: f64) -> Self {
        self.gap_limit = gap;
        self
    }

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
    pub fn with_max_lease_terms(mut self, terms: usize) -> Self {
        self.max_lease_terms = Some(terms);
        self
    }

    #[inline]
    pub fn with_max_segments(mut self, segments: usize) -> Self {
        self.max_segments = Some(segments);
        self
    }

    #[inline]
    pub fn with_allow_revisit(mut self, yes: bool) -> Self {
        self.allow_revisit = yes;
        self
    }

    #[inline]
    pub fn with_flexible(mut self, yes: bool) -> Self {
        self.flexible = yes;
        self
    }

    #[inline]
    pub fn with_forbid_split(mut self, yes: bool) -> Self {
        self.forbid_split = yes;
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

    #[inline]
    pub fn with_base_schedule_cost(mut self, cost: f64) -> Self {
        self.base_schedule_cost = cost;
        self
    }

    #[inline]
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    #[inline]
    pub fn with_log_interval(mut self, interval: Duration) -> Self {
        self.log_interval = Some(interval);
        self
    }

    /// Options applied when an instance is derived.
    pub fn model_options(&self) -> ModelOptions {
        let mut options = ModelOptions::default()
            .allow_revisit(self.allow_revisit)
            .forbid_split(self.forbid_split)
            .flexible(self.flexible)
            .base_schedule_cost(self.base_schedule_cost)
            .metric(self.distance_metric);
        if let Some(terms) = self.max_lease_terms {
            options = options.max_lease_terms(terms);
        }
        if let Some(segments) = self.max_segments {
            options = options.max_segments(segments);
        }
        options
    }

    /// Options of the search engine.
    pub fn bnp_config(&self) -> BnpConfig {
        let mut config = BnpConfig::default()
            .with_strategy(self.strategy)
            .with_pricing(self.pricing)
            .with_layout(self.layout)
            .with_label_extension(self.label_extension)
            .with_lagrangian_bound(self.lagrangian_bound)
            .with_gap_limit(self.gap_limit)
            .with_greedy_bound(self.greedy_bound, self.greedy_depth)
            .with_parallel_pricing(self.parallel_pricing)
            .with_repair(self.repair)
            .with_cross_check_pricing(self.cross_check_pricing)
            .with_max_iterations(self.max_iterations);
        config.time_limit = self.time_limit;
        config.column_cap = self.column_cap;
        config
    }

    /// Rejects values neither the loader nor the engine can work with.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.base_schedule_cost.is_finite() || self.base_schedule_cost < 0.0 {
            return Err(SolverError::InvalidConfig(format!(
                "base_schedule_cost must be finite and non-negative, got {}",
                self.base_schedule_cost
            )));
        }
        if self.max_lease_terms == Some(0) {
            return Err(SolverError::InvalidConfig(
                "max_lease_terms must allow at least one term".to_string(),
            ));
        }
        if self.max_segments == Some(0) {
            return Err(SolverError::InvalidConfig(
                "max_segments must keep at least one segment".to_string(),
            ));
        }
        if self.log_interval == Some(Duration::ZERO) {
            return Err(SolverError::InvalidConfig(
                "log_interval must be positive".to_string(),
            ));
        }
        self.bnp_config().validate()?;
        Ok(())
    }
}

impl std::fmt::Display for SolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SolverConfig(strategy: {:?}, pricing: {:?}, layout: {:?}, bound: {:?}, gap: {}, time limit: {:?})",
            self.strategy,
            self.pricing,
            self.layout,
            self.lagrangian_bound,
            self.gap_limit,
            self.time_limit
        )
    }
}

/// Loads instances and solves them by branch-and-price.
#[derive(Debug)]
pub struct Solver {
    config: SolverConfig,
    interrupt: Arc<AtomicBool>,
}

impl Solver {
    #[inline]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// A handle that stops the running search once set to `true`.
    #[inline]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Reads an instance file under the configured model options.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Load`] when the file cannot be read or parsed.
    pub fn load_instance<P: AsRef<Path>>(&self, path: P) -> Result<Instance, SolverError> {
        self.config.validate()?;
        let instance = InstanceLoader::new()
            .options(self.config.model_options())
            .from_path(path)?;
        Ok(instance)
    }

    /// Parses an instance from text under the configured model options.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Load`] when the text cannot be parsed.
    pub fn load_instance_str(&self, text: &str) -> Result<Instance, SolverError> {
        self.config.validate()?;
        let instance = InstanceLoader::new()
            .options(self.config.model_options())
            .from_str(text)?;
        Ok(instance)
    }

    /// Solves `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] for an unusable configuration
    /// and [`SolverError::Search`] when the engine fails.
    #[inline]
    pub fn solve(&self, instance: &Instance) -> Result<BnpOutcome, SolverError> {
        self.solve_with_monitor(instance, NoOperationMonitor::new())
    }

    /// Solves `instance` with an additional tree search monitor.
    ///
    /// The interrupt flag is cleared when the search starts.
    ///
    /// # Errors
    ///
    /// See [`Solver::solve`].
    pub fn solve_with_monitor<M>(&self, instance: &Instance, mut monitor: M) -> Result<BnpOutcome, SolverError>
    where
        M: TreeSearchMonitor,
    {
        self.config.validate()?;
        self.interrupt.store(false, Ordering::Relaxed);
        tracing::info!(
            equipment = instance.num_equipment(),
            customers = instance.num_customers(),
            orders = instance.num_orders(),
            horizon = instance.horizon(),
            config = %self.config,
            "solving instance"
        );

        let mut generic = CompositeMonitor::new();
        generic.add_monitor(InterruptMonitor::new(&*self.interrupt));
        let mut monitors = CompositeTreeSearchMonitor::with_capacity(3);
        if let Some(interval) = self.config.log_interval {
            monitors.add_monitor(LogMonitor::new(interval));
        }
        monitors.add_monitor(WrapperMonitor::new(&mut generic));
        monitors.add_monitor(&mut monitor);

        let engine = BnpSolver::new(HighsOracle::new(), self.config.bnp_config());
        let outcome = engine.solve_with(instance, monitors, Some(&*self.interrupt))?;
        Ok(outcome)
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_bnp::{
        branching::select::Branching, context::SearchProgress,
        monitor::tree_search_monitor::PruneReason, stats::BnpStatistics,
    };
    use fleetlease_model::solution::Solution;
    use fleetlease_search::result::{SolverOutcome, SolverResult, TerminationReason};

    const SCENARIO: &str = "\
# one unit, two customers
T 5
E 0 0 5 - - 1 0 10 5
C 50
C 50
O 0 0 0 3 - - 0 0
O 1 0 3 5 - - 0 0
";

    const ORPHAN: &str = "\
T 5
E 0 0 5 - - 1 0 10 5
C 50
C 500
O 0 0 0 3 - - 0 0
O 1 3 0 3 - - 0 0
";

    fn solver() -> Solver {
        Solver::new(SolverConfig::default().with_base_schedule_cost(0.0))
    }

    #[test]
    fn test_scenario_from_text() {
        let solver = solver();
        let instance = solver.load_instance_str(SCENARIO).expect("valid instance");
        let outcome = solver.solve(&instance).expect("search succeeds");
        assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
        assert!((outcome.solution().objective() - 90.0).abs() < 1e-6);
        assert_eq!(outcome.solution().num_accepted(), 2);

        let summary: SolverOutcome = outcome.into();
        assert!(summary.is_optimal());
        match summary.result {
            SolverResult::Optimal(solution) => assert!(solution.verify(&instance).is_ok()),
            other => panic!("expected an optimal result, got {}", other),
        }
    }

    #[test]
    fn test_orphan_customer_is_rejected() {
        let solver = solver();
        let instance = solver.load_instance_str(ORPHAN).expect("valid instance");
        assert_eq!(instance.rejected_customers().count(), 1);
        let outcome = solver.solve(&instance).expect("search succeeds");
        assert_eq!(outcome.solution().num_accepted(), 1);
        assert!((outcome.solution().objective() - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_maps_onto_model_and_engine() {
        let config = SolverConfig::default()
            .with_forbid_split(true)
            .with_max_lease_terms(2)
            .with_distance_metric(DistanceMetric::Euclidean)
            .with_strategy(SearchStrategy::DepthFirst)
            .with_column_cap(4)
            .with_time_limit(Duration::from_secs(3));
        let model = config.model_options();
        assert!(model.forbid_split);
        assert_eq!(model.max_lease_terms, Some(2));
        assert_eq!(model.metric, DistanceMetric::Euclidean);
        let bnp = config.bnp_config();
        assert_eq!(bnp.strategy, SearchStrategy::DepthFirst);
        assert_eq!(bnp.column_cap, Some(4));
        assert_eq!(bnp.time_limit, Some(Duration::from_secs(3)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for config in [
            SolverConfig::default().with_base_schedule_cost(-1.0),
            SolverConfig::default().with_max_lease_terms(0),
            SolverConfig::default().with_gap_limit(1.5),
            SolverConfig::default().with_log_interval(Duration::ZERO),
        ] {
            assert!(matches!(config.validate(), Err(SolverError::InvalidConfig(_))));
        }
        let solver = Solver::new(SolverConfig::default().with_max_iterations(0));
        assert!(matches!(
            solver.load_instance_str(SCENARIO),
            Err(SolverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_text_is_a_load_error() {
        let solver = solver();
        assert!(matches!(
            solver.load_instance_str("T 5\nE 0 0 x"),
            Err(SolverError::Load(_))
        ));
    }

    /// Raises the interrupt flag as soon as the search starts.
    struct RaiseOnEnter(Arc<AtomicBool>);

    impl TreeSearchMonitor for RaiseOnEnter {
        fn name(&self) -> &str {
            "RaiseOnEnter"
        }

        fn on_enter_search(&mut self, _instance: &Instance, _statistics: &BnpStatistics) {
            self.0.store(true, Ordering::Relaxed);
        }

        fn on_exit_search(&mut self, _statistics: &BnpStatistics) {}
        fn on_step(&mut self, _progress: &SearchProgress, _statistics: &BnpStatistics) {}
        fn on_bound_computed(&mut self, _: &SearchProgress, _: f64, _: Option<f64>, _: &BnpStatistics) {}
        fn on_prune(&mut self, _: &SearchProgress, _: PruneReason, _: &BnpStatistics) {}
        fn on_branch(&mut self, _: &SearchProgress, _: &Branching, _: &BnpStatistics) {}
        fn on_solution_found(&mut self, _: &Solution, _: &BnpStatistics) {}
    }

    #[test]
    fn test_interrupt_handle_stops_the_search() {
        let solver = solver();
        let instance = solver.load_instance_str(SCENARIO).expect("valid instance");
        let outcome = solver
            .solve_with_monitor(&instance, RaiseOnEnter(solver.interrupt_handle()))
            .expect("interrupting is not an error");
        assert!(matches!(outcome.termination_reason(), TerminationReason::Aborted(_)));
        assert!(outcome.solution().verify(&instance).is_ok());

        // the next run starts with a cleared flag
        let outcome = solver.solve(&instance).expect("search succeeds");
        assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
    }
}
