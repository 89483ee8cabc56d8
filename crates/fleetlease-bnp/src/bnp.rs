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

//! Branch-and-price search driver.
//!
//! `BnpSolver` owns the configuration and the LP oracle. Each call to
//! `solve` opens a search session that seeds the root with the greedy plan,
//! then takes nodes from the open set in the configured order, runs column
//! generation on each, and branches on the first fractional quantity until
//! the tree is exhausted, the relative gap falls below the limit, or a
//! monitor, the time limit or the interrupt flag stops the run.
//!
//! The session is the only writer of the incumbent, the bounds and the
//! counters; nodes are processed one at a time, so two runs with the same
//! instance and configuration explore the same tree.

use crate::{
    colgen::{ColumnGeneration, NodeOutcome},
    config::BnpConfig,
    context::{OpenNodes, SearchContext},
    error::{BnpError, invalid_plan},
    heuristics::greedy::{GreedyBound, greedy_service, seed_pools},
    monitor::{
        composite::CompositeTreeSearchMonitor, no_op::NoOperationMonitor,
        time_limit::TimeLimitMonitor, tree_search_monitor::TreeSearchMonitor,
    },
    node::Node,
    pricing::Pricer,
    queue::NodeQueue,
    result::BnpOutcome,
};
use fleetlease_core::num::tolerance::PRECISION;
use fleetlease_lp::oracle::{LpOracle, SolveLimits};
use fleetlease_model::model::Instance;
use fleetlease_search::{monitor::search_monitor::SearchCommand, result::relative_gap};
use std::sync::atomic::AtomicBool;

/// Why the session loop ended.
#[derive(Debug, Clone, PartialEq)]
enum SessionEnd {
    Exhausted,
    GapReached,
    Aborted(String),
}

/// A branch-and-price solver for the leasing and scheduling problem.
#[derive(Debug, Clone)]
pub struct BnpSolver<O> {
    config: BnpConfig,
    oracle: O,
}

impl<O> BnpSolver<O>
where
    O: LpOracle,
{
    #[inline]
    pub fn new(oracle: O, config: BnpConfig) -> Self {
        Self { config, oracle }
    }

    #[inline]
    pub fn config(&self) -> &BnpConfig {
        &self.config
    }

    #[inline]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Solves `instance` without monitors.
    ///
    /// # Errors
    ///
    /// See [`BnpSolver::solve_with`].
    #[inline]
    pub fn solve(&self, instance: &Instance) -> Result<BnpOutcome, BnpError> {
        self.solve_with(instance, NoOperationMonitor::new(), None)
    }

    /// Solves `instance` under `monitor`.
    ///
    /// # Errors
    ///
    /// See [`BnpSolver::solve_with`].
    #[inline]
    pub fn solve_with_monitor<M>(&self, instance: &Instance, monitor: M) -> Result<BnpOutcome, BnpError>
    where
        M: TreeSearchMonitor,
    {
        self.solve_with(instance, monitor, None)
    }

    /// Solves `instance` under `monitor`. Raising `interrupt` stops the search
    /// at the next poll, inside the LP oracle and pricing included.
    ///
    /// # Errors
    ///
    /// Returns [`BnpError::InvalidConfig`] for an unusable configuration,
    /// [`BnpError::Lp`] when the oracle rejects a problem and
    /// [`BnpError::Consistency`] when an internal cross-check fails.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            equipment = instance.num_equipment(),
            orders = instance.num_orders(),
            strategy = ?self.config.strategy,
        )
    )]
    pub fn solve_with<M>(
        &self,
        instance: &Instance,
        mut monitor: M,
        interrupt: Option<&AtomicBool>,
    ) -> Result<BnpOutcome, BnpError>
    where
        M: TreeSearchMonitor,
    {
        self.config.validate()?;

        let mut monitors = CompositeTreeSearchMonitor::with_capacity(2);
        if let Some(limit) = self.config.time_limit {
            monitors.add_monitor(TimeLimitMonitor::new(limit));
        }
        monitors.add_monitor(&mut monitor);

        let limits = match interrupt {
            Some(flag) => SolveLimits::none().with_interrupt(flag),
            None => SolveLimits::none(),
        };
        let pricer = Pricer::new(&self.config, &self.oracle);
        let greedy = GreedyBound::new(instance);
        let session = BnpSearchSession {
            columns: ColumnGeneration {
                instance,
                config: &self.config,
                oracle: &self.oracle,
                pricer: &pricer,
                greedy: &greedy,
            },
            monitor: &mut monitors,
            queue: NodeQueue::new(self.config.strategy),
            next_id: 1,
        };
        session.run(limits)
    }
}

/// State of one search run.
struct BnpSearchSession<'s, 'o, 'm, O: ?Sized> {
    columns: ColumnGeneration<'s, 'o, O>,
    monitor: &'m mut dyn TreeSearchMonitor,
    queue: NodeQueue,
    next_id: usize,
}

impl<O> BnpSearchSession<'_, '_, '_, O>
where
    O: LpOracle + ?Sized,
{
    fn run(mut self, limits: SolveLimits<'_>) -> Result<BnpOutcome, BnpError> {
        let instance = self.columns.instance;
        let config = self.columns.config;

        let seed = greedy_service(instance);
        seed.verify(instance)
            .map_err(|e| invalid_plan(0, "greedy service", e))?;
        let pools = seed_pools(instance, config.layout, &seed);
        let mut context = SearchContext::new(seed, config.time_limit, limits);
        if context.lower_bound() > PRECISION {
            context.statistics_mut().on_solution_found();
        }

        self.monitor.on_enter_search(instance, context.statistics());
        if context.lower_bound() > PRECISION {
            self.monitor
                .on_solution_found(context.incumbent(), context.statistics());
        }
        tracing::info!(
            incumbent = context.lower_bound(),
            columns = pools.num_columns(),
            rejected = instance.rejected_customers().count(),
            "root seeded"
        );

        self.queue
            .push(Node::root(pools, instance.attainable_revenue()));

        let end = match self.explore(&mut context) {
            Ok(end) => end,
            Err(e) => {
                tracing::warn!(error = %e, "search failed");
                self.monitor.on_exit_search(context.statistics());
                return Err(e);
            }
        };

        let upper_bound = context.upper_bound(None, self.open());
        let gap = match end {
            SessionEnd::Exhausted => 0.0,
            _ => relative_gap(context.lower_bound(), upper_bound),
        };
        let elapsed = context.elapsed();
        context.statistics_mut().set_total_time(elapsed);
        self.monitor.on_exit_search(context.statistics());
        tracing::info!(
            objective = context.lower_bound(),
            upper_bound,
            gap,
            nodes = context.statistics().nodes_explored,
            end = ?end,
            "search finished"
        );

        let (incumbent, statistics) = context.finish();
        Ok(match end {
            SessionEnd::Exhausted => BnpOutcome::optimal(incumbent, statistics),
            SessionEnd::GapReached => BnpOutcome::gap_reached(incumbent, upper_bound, gap, statistics),
            SessionEnd::Aborted(reason) => {
                BnpOutcome::aborted(incumbent, reason, upper_bound, gap, statistics)
            }
        })
    }

    #[inline]
    fn open(&self) -> OpenNodes {
        OpenNodes {
            count: self.queue.len(),
            bound: self.queue.max_bound(),
        }
    }

    fn explore(&mut self, context: &mut SearchContext<'_>) -> Result<SessionEnd, BnpError> {
        let gap_limit = self.columns.config.gap_limit;
        loop {
            if self.queue.is_empty() {
                return Ok(SessionEnd::Exhausted);
            }
            let upper_bound = context.upper_bound(None, self.open());
            let gap = relative_gap(context.lower_bound(), upper_bound);
            if gap < gap_limit {
                return Ok(SessionEnd::GapReached);
            }
            if context.should_stop() {
                return Ok(SessionEnd::Aborted(self.stop_reason(context)));
            }

            let Some(mut node) = self.queue.pop() else {
                return Ok(SessionEnd::Exhausted);
            };
            let open = self.open();
            let progress = context.progress(&node, open);
            if let SearchCommand::Terminate(reason) =
                self.monitor.search_command(&progress, context.statistics())
            {
                context.request_stop(reason);
                self.queue.push(node);
                return Ok(SessionEnd::Aborted(self.stop_reason(context)));
            }
            self.monitor.on_step(&progress, context.statistics());

            match self
                .columns
                .solve_node(&mut node, open, context, &mut *self.monitor)?
            {
                NodeOutcome::Closed(_) => {}
                NodeOutcome::Branch(branching) => {
                    tracing::debug!(
                        node = node.id(),
                        bound = node.bound(),
                        branching = %branching,
                        "branching"
                    );
                    context.statistics_mut().on_branching();
                    let progress = context.progress(&node, open);
                    self.monitor
                        .on_branch(&progress, &branching, context.statistics());
                    let children = node.branch(&branching, self.next_id);
                    self.next_id += 2;
                    node.release();
                    self.queue.push_children(children);
                }
                NodeOutcome::Stopped => {
                    self.queue.push(node);
                    return Ok(SessionEnd::Aborted(self.stop_reason(context)));
                }
            }
        }
    }

    fn stop_reason(&self, context: &SearchContext<'_>) -> String {
        context
            .stop_reason()
            .map_or_else(|| "stopped".to_string(), str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        branching::select::Branching,
        colgen::ITERATION_LIMIT_REACHED,
        config::{LagrangianBound, MasterLayout, PricingMethod, SearchStrategy},
        context::SearchProgress,
        monitor::tree_search_monitor::PruneReason,
        stats::BnpStatistics,
    };
    use fleetlease_core::{math::window::TimeWindow, num::tolerance::differ};
    use fleetlease_lp::highs::HighsOracle;
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentFunction,
        solution::Solution,
    };
    use fleetlease_search::result::{SolverResult, TerminationReason};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    fn scenario() -> Instance {
        let mut b = InstanceBuilder::new(5);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 5), RentFunction::flat(10.0, 5)));
        let a = b.add_customer(50.0);
        let c = b.add_customer(50.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.add_order(OrderSpec::new(c, 0, TimeWindow::new(3, 5)));
        b.build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance")
    }

    /// Two units, three pairwise overlapping orders.
    fn odd_cycle() -> Instance {
        let mut b = InstanceBuilder::new(6);
        for _ in 0..2 {
            b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 6), RentFunction::flat(1.0, 6)));
        }
        for (begin, end) in [(0, 3), (2, 5), (0, 6)] {
            let c = b.add_customer(10.0);
            b.add_order(OrderSpec::new(c, 0, TimeWindow::new(begin, end)));
        }
        b.build(
            &ModelOptions::default()
                .forbid_split(true)
                .base_schedule_cost(0.0),
        )
        .expect("valid instance")
    }

    fn random_instance(seed: u64) -> Instance {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let horizon = 6;
        let mut b = InstanceBuilder::new(horizon);
        for _ in 0..2 {
            let rent = RentFunction::flat(rng.random_range(1.0..8.0), horizon);
            b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, horizon), rent));
        }
        for _ in 0..rng.random_range(2..=4) {
            let begin = rng.random_range(0..horizon - 1);
            let end = rng.random_range(begin + 1..=horizon);
            let c = b.add_customer(rng.random_range(2.0..20.0));
            b.add_order(OrderSpec::new(c, 0, TimeWindow::new(begin, end)));
        }
        b.build(&ModelOptions::default().forbid_split(true).base_schedule_cost(0.0))
            .expect("valid instance")
    }

    /// One unit over four periods. The long order alone earns 29, the two
    /// short ones together 37.
    fn long_or_short() -> Instance {
        let mut b = InstanceBuilder::new(4);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 4), RentFunction::flat(1.0, 4)));
        for (begin, end, revenue) in [(0, 3, 30.0), (0, 2, 19.0), (2, 4, 19.0)] {
            let c = b.add_customer(revenue);
            b.add_order(OrderSpec::new(c, 0, TimeWindow::new(begin, end)));
        }
        b.build(
            &ModelOptions::default()
                .forbid_split(true)
                .base_schedule_cost(0.0),
        )
        .expect("valid instance")
    }

    /// Records `(lower, upper, gap)` at every callback that carries progress.
    #[derive(Default)]
    struct BoundRecorder {
        trace: Vec<(f64, f64, f64)>,
    }

    impl BoundRecorder {
        fn record(&mut self, progress: &SearchProgress) {
            self.trace
                .push((progress.lower_bound, progress.upper_bound, progress.gap()));
        }
    }

    impl TreeSearchMonitor for BoundRecorder {
        fn name(&self) -> &str {
            "BoundRecorder"
        }

        fn on_enter_search(&mut self, _instance: &Instance, _statistics: &BnpStatistics) {}

        fn on_exit_search(&mut self, _statistics: &BnpStatistics) {}

        fn on_step(&mut self, progress: &SearchProgress, _statistics: &BnpStatistics) {
            self.record(progress);
        }

        fn on_bound_computed(
            &mut self,
            progress: &SearchProgress,
            _relaxation: f64,
            _bound: Option<f64>,
            _statistics: &BnpStatistics,
        ) {
            self.record(progress);
        }

        fn on_prune(&mut self, progress: &SearchProgress, _reason: PruneReason, _statistics: &BnpStatistics) {
            self.record(progress);
        }

        fn on_branch(&mut self, progress: &SearchProgress, _branching: &Branching, _statistics: &BnpStatistics) {
            self.record(progress);
        }

        fn on_solution_found(&mut self, _solution: &Solution, _statistics: &BnpStatistics) {}
    }

    fn solve(inst: &Instance, config: BnpConfig) -> BnpOutcome {
        BnpSolver::new(HighsOracle::new(), config)
            .solve(inst)
            .expect("search succeeds")
    }

    #[test]
    fn test_two_order_scenario_is_proved_at_the_root() {
        let inst = scenario();
        let outcome = solve(&inst, BnpConfig::default());
        assert!(matches!(outcome.result(), SolverResult::Optimal(_)));
        assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
        assert!(!differ(outcome.solution().objective(), 90.0));
        assert_eq!(outcome.solution().num_accepted(), 2);
        assert_eq!(outcome.gap(), 0.0);
        assert_eq!(outcome.statistics().branchings, 0);
        assert!(outcome.solution().verify(&inst).is_ok());
        let plan = &outcome.solution().plans()[0];
        assert_eq!(plan.leases().len(), 1);
        assert_eq!(plan.leases()[0].window(), TimeWindow::new(0, 5));
    }

    #[test]
    fn test_order_without_equipment_is_rejected_up_front() {
        let mut b = InstanceBuilder::new(5);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 5), RentFunction::flat(10.0, 5)));
        let a = b.add_customer(50.0);
        let orphan = b.add_customer(500.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.add_order(OrderSpec::new(orphan, 7, TimeWindow::new(0, 3)));
        let inst = b
            .build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance");

        let outcome = solve(&inst, BnpConfig::default());
        assert!(!outcome.solution().is_accepted(orphan));
        assert!(!differ(outcome.solution().objective(), 40.0));
        assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
    }

    #[test]
    fn test_branching_closes_the_odd_cycle() {
        let inst = odd_cycle();
        for strategy in [
            SearchStrategy::BestBound,
            SearchStrategy::DepthFirst,
            SearchStrategy::BreadthFirst,
        ] {
            let outcome = solve(&inst, BnpConfig::default().with_strategy(strategy));
            assert!(outcome.solution().verify(&inst).is_ok());
            assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
            // two units hold at most two of the three pairwise overlapping orders
            assert!(outcome.solution().num_accepted() <= 2);
            assert!(!differ(outcome.solution().objective(), 18.0));
        }
    }

    #[test]
    fn test_layouts_and_pricing_methods_agree() {
        for seed in 0..6 {
            let inst = random_instance(seed);
            let reference = solve(&inst, BnpConfig::default());
            for config in [
                BnpConfig::default().with_layout(MasterLayout::TwoFamily),
                BnpConfig::default().with_pricing(PricingMethod::Enumeration),
                BnpConfig::default().with_pricing(PricingMethod::LinearProgram),
                BnpConfig::default().with_lagrangian_bound(LagrangianBound::Unclamped),
                BnpConfig::default().with_parallel_pricing(true),
                BnpConfig::default().with_cross_check_pricing(true).with_repair(false),
            ] {
                let outcome = solve(&inst, config.clone());
                assert!(
                    !differ(outcome.solution().objective(), reference.solution().objective()),
                    "seed {} config {}: {} vs {}",
                    seed,
                    config,
                    outcome.solution().objective(),
                    reference.solution().objective()
                );
                assert!(outcome.solution().verify(&inst).is_ok());
            }
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let inst = random_instance(42);
        let config = BnpConfig::default().with_strategy(SearchStrategy::DepthFirst);
        let a = solve(&inst, config.clone());
        let b = solve(&inst, config);
        assert_eq!(a.solution(), b.solution());
        assert_eq!(a.solution().objective().to_bits(), b.solution().objective().to_bits());
        assert_eq!(a.statistics().nodes_explored, b.statistics().nodes_explored);
        assert_eq!(a.statistics().columns_generated, b.statistics().columns_generated);
    }

    #[test]
    fn test_raised_interrupt_aborts_with_the_seed() {
        let inst = scenario();
        let flag = AtomicBool::new(true);
        let outcome = BnpSolver::new(HighsOracle::new(), BnpConfig::default())
            .solve_with(&inst, NoOperationMonitor::new(), Some(&flag))
            .expect("interrupting is not an error");
        match outcome.termination_reason() {
            TerminationReason::Aborted(reason) => assert_eq!(reason, "interrupted"),
            other => panic!("expected Aborted, got {:?}", other),
        }
        assert!(matches!(outcome.result(), SolverResult::Feasible(_)));
        assert!(outcome.solution().verify(&inst).is_ok());
        assert!(outcome.upper_bound() >= outcome.lower_bound());
    }

    #[test]
    fn test_zero_time_limit_aborts() {
        let inst = odd_cycle();
        let outcome = solve(&inst, BnpConfig::default().with_time_limit(Duration::ZERO));
        match outcome.termination_reason() {
            TerminationReason::Aborted(reason) => assert_eq!(reason, "time limit reached"),
            other => panic!("expected Aborted, got {:?}", other),
        }
        assert_eq!(outcome.statistics().nodes_explored, 0);
        assert!(outcome.solution().verify(&inst).is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let inst = scenario();
        let result = BnpSolver::new(HighsOracle::new(), BnpConfig::default().with_gap_limit(2.0))
            .solve(&inst);
        assert!(matches!(result, Err(BnpError::InvalidConfig(_))));
    }

    #[test]
    fn test_iteration_limit_leaves_the_gap_open() {
        let inst = long_or_short();
        let full = solve(&inst, BnpConfig::default());
        assert_eq!(full.termination_reason(), &TerminationReason::OptimalityProven);
        assert!(!differ(full.solution().objective(), 37.0));

        let capped = solve(&inst, BnpConfig::default().with_max_iterations(1));
        match capped.termination_reason() {
            TerminationReason::Aborted(reason) => assert_eq!(reason, ITERATION_LIMIT_REACHED),
            other => panic!("expected Aborted, got {:?}", other),
        }
        assert!(!matches!(capped.result(), SolverResult::Optimal(_)));
        assert!(capped.solution().verify(&inst).is_ok());
        assert!(capped.upper_bound() >= 37.0 - PRECISION);
        assert!(capped.gap() > 0.0);
    }

    #[test]
    fn test_reported_bounds_are_monotone() {
        let instances: Vec<Instance> = std::iter::once(odd_cycle())
            .chain((0..6).map(random_instance))
            .collect();
        for (k, inst) in instances.iter().enumerate() {
            for strategy in [SearchStrategy::BestBound, SearchStrategy::DepthFirst] {
                let mut recorder = BoundRecorder::default();
                let outcome = BnpSolver::new(HighsOracle::new(), BnpConfig::default().with_strategy(strategy))
                    .solve_with_monitor(inst, &mut recorder)
                    .expect("search succeeds");
                assert_eq!(outcome.termination_reason(), &TerminationReason::OptimalityProven);
                if k == 0 {
                    assert!(outcome.statistics().nodes_explored > 1);
                }
                assert!(!recorder.trace.is_empty());
                for (step, pair) in recorder.trace.windows(2).enumerate() {
                    let (lb0, ub0, gap0) = pair[0];
                    let (lb1, ub1, gap1) = pair[1];
                    assert!(lb1 >= lb0 - 1e-6, "instance {} step {}: lower bound fell {} -> {}", k, step, lb0, lb1);
                    assert!(ub1 <= ub0 + 1e-6, "instance {} step {}: upper bound rose {} -> {}", k, step, ub0, ub1);
                    assert!(gap1 <= gap0 + 1e-6, "instance {} step {}: gap rose {} -> {}", k, step, gap0, gap1);
                }
                let &(lb, ub, _) = recorder.trace.last().expect("non-empty trace");
                assert!(ub >= lb - 1e-6);
                assert!(ub >= outcome.solution().objective() - 1e-6);
            }
        }
    }
}
