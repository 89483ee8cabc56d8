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

//! # Column Generation
//!
//! Solves one node: the restricted master over the node's pools is solved,
//! every unit and family is priced under its duals, improving columns are
//! pooled and the Lagrangian bound tightens the node bound. The loop ends
//! when no new column appears, the search is asked to stop, the iteration
//! budget is spent, or the bound no longer exceeds both the master objective
//! and the incumbent.
//!
//! A spent budget is not a verdict. Such a node is pruned only when its bound
//! is already dominated and split only on a fractional candidate; otherwise
//! the run stops with the node left open, so the reported gap keeps its bound.
//!
//! Before the first master solve the greedy profit bound may close the node
//! outright. Integral master solutions are installed as incumbents; fractional
//! ones are rounded by the repair heuristic when the layout allows it.

use crate::{
    branching::select::{Branching, BranchingInput, select},
    config::{BnpConfig, LagrangianBound, MasterLayout},
    context::{OpenNodes, SearchContext},
    error::{BnpError, ConsistencyError, invalid_plan},
    heuristics::{greedy::GreedyBound, repair::repair},
    master::{MasterOutcome, MasterProblem, MasterSolution},
    monitor::tree_search_monitor::{PruneReason, TreeSearchMonitor},
    node::{Node, NodeState},
    pool::NodePools,
    pricing::{Pricer, PricingProblem, PricingStatus, restrictions::Restrictions},
    scheme::{Family, Scheme},
};
use fleetlease_core::num::tolerance::PRECISION;
use fleetlease_lp::oracle::LpOracle;
use fleetlease_model::{
    index::EquipmentIndex,
    model::Instance,
    solution::{EquipmentPlan, Solution},
};
use fleetlease_search::monitor::search_monitor::SearchCommand;
use std::time::Instant;

/// Stop reason recorded when a node exhausts its iteration budget without
/// a verdict.
pub const ITERATION_LIMIT_REACHED: &str = "column generation iteration limit reached";

/// How a node left column generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeOutcome {
    /// The node was closed; its state says why.
    Closed(PruneReason),
    /// The node must be split.
    Branch(Branching),
    /// The search was asked to stop while the node was open.
    Stopped,
}

/// Everything column generation reads but never changes.
pub struct ColumnGeneration<'s, 'o, O: ?Sized> {
    pub instance: &'s Instance,
    pub config: &'s BnpConfig,
    pub oracle: &'o O,
    pub pricer: &'s Pricer<'o>,
    pub greedy: &'s GreedyBound,
}

impl<O: LpOracle + ?Sized> std::fmt::Debug for ColumnGeneration<'_, '_, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnGeneration")
            .field("oracle", &self.oracle.name())
            .field("pricer", self.pricer)
            .finish()
    }
}

impl<O> ColumnGeneration<'_, '_, O>
where
    O: LpOracle + ?Sized,
{
    /// Runs column generation on `node` and leaves it either closed or ready
    /// to branch.
    ///
    /// # Errors
    ///
    /// Returns an error when the oracle rejects a master problem, when the
    /// cross-check of pricing fails, or when a plan read off the master fails
    /// verification.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(node = node.id(), depth = node.depth())
    )]
    pub fn solve_node(
        &self,
        node: &mut Node,
        open: OpenNodes,
        context: &mut SearchContext<'_>,
        monitor: &mut dyn TreeSearchMonitor,
    ) -> Result<NodeOutcome, BnpError> {
        let instance = self.instance;
        let config = self.config;
        let restrictions = node.restrictions(instance);
        context.statistics_mut().on_node_explored(node.depth());

        if config.greedy_bound && node.depth() <= config.greedy_depth {
            let greedy = self.greedy.evaluate(instance, &restrictions);
            if node.tighten(greedy) {
                tracing::debug!(bound = greedy, "greedy bound tightened the node");
            }
        }
        if node.bound() <= context.lower_bound() + PRECISION {
            return Ok(self.close(node, PruneReason::BoundDominated, open, context, monitor));
        }

        let removed = node.clean(instance, &restrictions);
        if removed > 0 {
            tracing::debug!(removed, "filtered columns ruled out by the branch");
        }

        let clamped = node.is_root() || config.lagrangian_bound == LagrangianBound::Clamped;
        let mut last: Option<(Box<MasterSolution>, Option<Branching>)> = None;
        let mut converged = false;
        let mut exhaustive = true;

        for iteration in 0..config.max_iterations {
            if context.should_stop() {
                return Ok(NodeOutcome::Stopped);
            }

            let master = MasterProblem::build(instance, config.layout, node.pools(), &restrictions)?;
            let started = Instant::now();
            let outcome = master.solve(instance, self.oracle, &context.limits())?;
            let solution = match outcome {
                MasterOutcome::Solved(solution) => solution,
                MasterOutcome::Infeasible => {
                    return Ok(self.close(node, PruneReason::Infeasible, open, context, monitor));
                }
                MasterOutcome::Interrupted => {
                    if !context.should_stop() {
                        context.request_stop("master solve interrupted");
                    }
                    return Ok(NodeOutcome::Stopped);
                }
            };
            context
                .statistics_mut()
                .on_master_solved(started.elapsed());
            let relaxation = solution.objective();
            node.set_relaxation(relaxation);

            let candidate = if solution.is_proper() {
                self.examine(node, &restrictions, &solution, context, monitor)?
            } else {
                None
            };

            let (bound, added) = self.price(node, &restrictions, &solution, clamped, context)?;
            if let Some(b) = bound {
                node.tighten(b);
            }
            tracing::debug!(
                iteration,
                relaxation,
                bound = node.bound(),
                added,
                artificial = solution.artificial(),
                "column generation iteration"
            );

            let progress = context.progress(node, open);
            monitor.on_bound_computed(&progress, relaxation, bound, context.statistics());
            if let SearchCommand::Terminate(reason) =
                monitor.search_command(&progress, context.statistics())
            {
                context.request_stop(reason);
            }

            exhaustive = bound.is_some();
            last = Some((solution, candidate));
            let target = relaxation.max(context.lower_bound());
            if added == 0 || node.bound() <= target + PRECISION {
                converged = true;
                break;
            }
        }

        if node.is_root() {
            context.statistics_mut().set_root_bound(node.bound());
            tracing::info!(bound = node.bound(), "root node solved");
        }

        let Some((solution, candidate)) = last else {
            return Ok(NodeOutcome::Stopped);
        };
        if !exhaustive && context.should_stop() {
            return Ok(NodeOutcome::Stopped);
        }
        if !converged {
            tracing::warn!(
                iterations = config.max_iterations,
                bound = node.bound(),
                "column generation hit the iteration limit"
            );
            // Only the bound and a fractional split stay valid on an
            // unconverged relaxation.
            if node.bound() <= context.lower_bound() + PRECISION {
                return Ok(self.close(node, PruneReason::BoundDominated, open, context, monitor));
            }
            if let (true, Some(branching)) = (solution.is_proper(), candidate) {
                return Ok(NodeOutcome::Branch(branching));
            }
            context.request_stop(ITERATION_LIMIT_REACHED);
            return Ok(NodeOutcome::Stopped);
        }

        let reason = if solution.is_proper() && candidate.is_none() {
            PruneReason::Integral
        } else if node.bound() <= context.lower_bound() + PRECISION {
            PruneReason::BoundDominated
        } else if !solution.is_proper() {
            // artificial weight left after convergence
            PruneReason::Infeasible
        } else {
            match candidate {
                Some(branching) => return Ok(NodeOutcome::Branch(branching)),
                None => PruneReason::Integral,
            }
        };
        Ok(self.close(node, reason, open, context, monitor))
    }

    /// Looks at a proper master solution: installs it when integral, rounds
    /// it otherwise. Returns the branching of a fractional solution.
    fn examine(
        &self,
        node: &Node,
        restrictions: &Restrictions,
        solution: &MasterSolution,
        context: &mut SearchContext<'_>,
        monitor: &mut dyn TreeSearchMonitor,
    ) -> Result<Option<Branching>, BnpError> {
        let instance = self.instance;
        let layout = self.config.layout;
        let branching = select(&BranchingInput {
            instance,
            layout,
            pools: node.pools(),
            solution,
            restrictions,
        });

        let found = match branching {
            None => {
                let plan = heaviest_plan(instance, layout, node.pools(), solution);
                plan.verify(instance)
                    .map_err(|e| invalid_plan(node.id(), "integral relaxation", e))?;
                Some(plan)
            }
            Some(_) if self.config.repair
                && layout == MasterLayout::SingleFamily
                && !instance.is_flexible() =>
            {
                let repaired = repair(instance, node.pools(), solution, node.id())?;
                if repaired.is_some() {
                    tracing::trace!("repair produced a plan");
                }
                repaired
            }
            Some(_) => None,
        };

        if let Some(plan) = found {
            let repaired = branching.is_some();
            let objective = plan.objective();
            if context.offer(plan) {
                if repaired {
                    context.statistics_mut().on_repaired_incumbent();
                }
                tracing::debug!(objective, repaired, "incumbent from node");
                monitor.on_solution_found(context.incumbent(), context.statistics());
            }
        }
        Ok(branching)
    }

    /// Prices every unit and family and pools the new columns. Returns the
    /// Lagrangian bound, `None` when some call was not exhaustive, and the
    /// number of columns added.
    fn price(
        &self,
        node: &mut Node,
        restrictions: &Restrictions,
        solution: &MasterSolution,
        clamped: bool,
        context: &mut SearchContext<'_>,
    ) -> Result<(Option<f64>, usize), BnpError> {
        let instance = self.instance;
        let duals = solution.duals();
        let limits = context.limits();
        let problems: Vec<PricingProblem<'_>> = (0..instance.num_equipment())
            .map(EquipmentIndex::new)
            .flat_map(|equipment| {
                self.config
                    .layout
                    .families()
                    .iter()
                    .map(move |&family| PricingProblem {
                        instance,
                        equipment,
                        family,
                        duals,
                        restrictions,
                        limits,
                    })
            })
            .collect();

        let started = Instant::now();
        let results = self.pricer.price(&problems);
        context.statistics_mut().on_pricing_round(started.elapsed());

        let mut bound = Some(solution.objective());
        let mut added = 0usize;
        for (problem, result) in problems.iter().zip(results) {
            if let Some((found, wanted)) = self.pricer.cross_check(problem, &result) {
                return Err(ConsistencyError::new(
                    node.id(),
                    format!(
                        "{} pricing found {:.6} but enumeration found {:.6} ({})",
                        self.pricer.oracle(problem.family).name(),
                        found,
                        wanted,
                        problem.family
                    ),
                )
                .with_equipment(problem.equipment)
                .with_duals(duals.raw().to_vec())
                .into());
            }
            let contribution = result.bound_contribution(problem.threshold(), clamped);
            bound = bound.zip(contribution).map(|(b, c)| b + c);

            let complete = result.is_complete();
            let pool = node.pools_mut().pool_mut(problem.equipment, problem.family);
            let (status, count) = result.insert_into(pool, self.config.column_cap);
            context.statistics_mut().on_pricing(status, count, complete);
            if status == PricingStatus::New {
                added += count;
            }
        }
        Ok((bound, added))
    }

    fn close(
        &self,
        node: &mut Node,
        reason: PruneReason,
        open: OpenNodes,
        context: &mut SearchContext<'_>,
        monitor: &mut dyn TreeSearchMonitor,
    ) -> NodeOutcome {
        let state = match reason {
            PruneReason::Infeasible => {
                context.statistics_mut().on_pruning_infeasible();
                NodeState::PrunedInfeasible
            }
            PruneReason::BoundDominated => {
                context.statistics_mut().on_pruning_bound();
                NodeState::PrunedByBound
            }
            PruneReason::Integral => {
                context.statistics_mut().on_integer_node();
                NodeState::Integer
            }
        };
        node.close(state);
        tracing::debug!(
            node = node.id(),
            state = %state,
            bound = node.bound(),
            incumbent = context.lower_bound(),
            "node closed"
        );
        let progress = context.progress(node, open);
        monitor.on_prune(&progress, reason, context.statistics());
        node.release();
        NodeOutcome::Closed(reason)
    }
}

fn heaviest<'p>(
    pools: &'p NodePools,
    solution: &MasterSolution,
    equipment: EquipmentIndex,
    family: Family,
) -> Option<&'p Scheme> {
    let mut best: Option<(&Scheme, f64)> = None;
    for (scheme, &w) in pools
        .pool(equipment, family)
        .iter()
        .zip(solution.weights(equipment, family))
    {
        if best.is_none_or(|(_, b)| w > b) {
            best = Some((scheme, w));
        }
    }
    best.map(|(s, _)| s)
}

/// The plan made of the heaviest column of every unit and family.
pub(crate) fn heaviest_plan(
    instance: &Instance,
    layout: MasterLayout,
    pools: &NodePools,
    solution: &MasterSolution,
) -> Solution {
    let plans = (0..instance.num_equipment())
        .map(EquipmentIndex::new)
        .map(|i| match layout {
            MasterLayout::SingleFamily => heaviest(pools, solution, i, Family::Combined)
                .map(Scheme::to_plan)
                .unwrap_or_default(),
            MasterLayout::TwoFamily => {
                let leases = heaviest(pools, solution, i, Family::Lease)
                    .map(|s| s.leases().to_vec())
                    .unwrap_or_default();
                let works = heaviest(pools, solution, i, Family::Work)
                    .map(|s| s.works().to_vec())
                    .unwrap_or_default();
                EquipmentPlan::new(leases, works)
            }
        })
        .collect();
    Solution::new(instance, plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        heuristics::greedy::{greedy_service, seed_pools},
        monitor::no_op::NoOperationMonitor,
    };
    use fleetlease_core::{math::window::TimeWindow, num::tolerance::differ};
    use fleetlease_lp::{highs::HighsOracle, oracle::SolveLimits};
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentFunction,
    };
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

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

    fn random_instance(seed: u64) -> Instance {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let horizon = 6;
        let mut b = InstanceBuilder::new(horizon);
        for _ in 0..2 {
            let rent = RentFunction::flat(rng.random_range(1.0..8.0), horizon);
            b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, horizon), rent));
        }
        for _ in 0..rng.random_range(2..=5) {
            let begin = rng.random_range(0..horizon - 1);
            let end = rng.random_range(begin + 1..=horizon);
            let c = b.add_customer(rng.random_range(2.0..20.0));
            b.add_order(OrderSpec::new(c, 0, TimeWindow::new(begin, end)));
        }
        b.build(&ModelOptions::default().forbid_split(true).base_schedule_cost(0.0))
            .expect("valid instance")
    }

    fn run(inst: &Instance, config: &BnpConfig, pools: NodePools) -> (NodeOutcome, Node, f64) {
        let oracle = HighsOracle::new();
        let pricer = Pricer::new(config, &oracle);
        let greedy = GreedyBound::new(inst);
        let cg = ColumnGeneration {
            instance: inst,
            config,
            oracle: &oracle,
            pricer: &pricer,
            greedy: &greedy,
        };
        let mut node = Node::root(pools, inst.attainable_revenue());
        let mut context = SearchContext::new(Solution::idle(inst), None, SolveLimits::none());
        let mut monitor = NoOperationMonitor::new();
        let outcome = cg
            .solve_node(&mut node, OpenNodes::default(), &mut context, &mut monitor)
            .expect("column generation succeeds");
        let incumbent = context.lower_bound();
        (outcome, node, incumbent)
    }

    #[test]
    fn test_root_of_the_two_order_scenario_is_closed() {
        let inst = scenario();
        let config = BnpConfig::default().with_greedy_bound(false, 0);
        let pools = seed_pools(&inst, config.layout, &Solution::idle(&inst));
        let (outcome, node, incumbent) = run(&inst, &config, pools);
        assert_eq!(outcome, NodeOutcome::Closed(PruneReason::Integral));
        assert_eq!(node.state(), NodeState::Integer);
        assert!(!differ(incumbent, 90.0));
        assert!(node.bound() <= 90.0 + PRECISION);
    }

    #[test]
    fn test_two_family_layout_reaches_the_same_profit() {
        let inst = scenario();
        let config = BnpConfig::default()
            .with_layout(MasterLayout::TwoFamily)
            .with_greedy_bound(false, 0);
        let pools = seed_pools(&inst, config.layout, &Solution::idle(&inst));
        let (outcome, node, incumbent) = run(&inst, &config, pools);
        match outcome {
            NodeOutcome::Closed(_) => assert!(!differ(incumbent, 90.0)),
            NodeOutcome::Branch(_) => assert!(node.bound() >= 90.0 - PRECISION),
            NodeOutcome::Stopped => panic!("expected the node to finish"),
        }
    }

    #[test]
    fn test_dominated_node_is_closed_before_the_master() {
        let inst = scenario();
        let config = BnpConfig::default();
        let oracle = HighsOracle::new();
        let pricer = Pricer::new(&config, &oracle);
        let greedy = GreedyBound::new(&inst);
        let cg = ColumnGeneration {
            instance: &inst,
            config: &config,
            oracle: &oracle,
            pricer: &pricer,
            greedy: &greedy,
        };
        let mut node = Node::root(NodePools::new(1), 50.0);
        let mut context = SearchContext::new(greedy_service(&inst), None, SolveLimits::none());
        assert!(context.lower_bound() > 50.0);
        let outcome = cg
            .solve_node(&mut node, OpenNodes::default(), &mut context, &mut NoOperationMonitor)
            .expect("no master is built");
        assert_eq!(outcome, NodeOutcome::Closed(PruneReason::BoundDominated));
        assert_eq!(context.statistics().colgen_iterations, 0);
        assert_eq!(context.statistics().prunings_bound, 1);
    }

    #[test]
    fn test_stop_request_leaves_the_node_open() {
        let inst = scenario();
        let config = BnpConfig::default().with_greedy_bound(false, 0);
        let oracle = HighsOracle::new();
        let pricer = Pricer::new(&config, &oracle);
        let greedy = GreedyBound::new(&inst);
        let cg = ColumnGeneration {
            instance: &inst,
            config: &config,
            oracle: &oracle,
            pricer: &pricer,
            greedy: &greedy,
        };
        let pools = seed_pools(&inst, config.layout, &Solution::idle(&inst));
        let mut node = Node::root(pools, inst.attainable_revenue());
        let mut context = SearchContext::new(Solution::idle(&inst), None, SolveLimits::none());
        context.request_stop("test");
        let outcome = cg
            .solve_node(&mut node, OpenNodes::default(), &mut context, &mut NoOperationMonitor)
            .expect("stopping is not an error");
        assert_eq!(outcome, NodeOutcome::Stopped);
        assert!(!node.state().is_terminal());
    }

    #[test]
    fn test_converged_root_meets_convexity_and_prices_out() {
        for layout in [MasterLayout::SingleFamily, MasterLayout::TwoFamily] {
            for seed in 0..6 {
                let inst = random_instance(seed);
                let config = BnpConfig::default().with_layout(layout);
                let oracle = HighsOracle::new();
                let pricer = Pricer::new(&config, &oracle);
                let greedy = GreedyBound::new(&inst);
                let cg = ColumnGeneration {
                    instance: &inst,
                    config: &config,
                    oracle: &oracle,
                    pricer: &pricer,
                    greedy: &greedy,
                };
                let pools = seed_pools(&inst, layout, &Solution::idle(&inst));
                let mut node = Node::root(pools, inst.attainable_revenue());
                let restrictions = node.restrictions(&inst);
                let mut context = SearchContext::new(Solution::idle(&inst), None, SolveLimits::none());

                let mut converged = None;
                for _ in 0..500 {
                    let master = MasterProblem::build(&inst, layout, node.pools(), &restrictions)
                        .expect("master assembles");
                    let solution = match master
                        .solve(&inst, &oracle, &SolveLimits::none())
                        .expect("master solves")
                    {
                        MasterOutcome::Solved(solution) => solution,
                        other => panic!("seed {}: root master not solved: {:?}", seed, other),
                    };
                    let (_, added) = cg
                        .price(&mut node, &restrictions, &solution, false, &mut context)
                        .expect("pricing succeeds");
                    if added == 0 {
                        converged = Some(solution);
                        break;
                    }
                }
                let solution = converged.expect("column generation converges");

                for i in EquipmentIndex::range(inst.num_equipment()) {
                    for &family in layout.families() {
                        let total: f64 = solution.weights(i, family).iter().sum();
                        assert!(
                            (total - 1.0).abs() <= PRECISION,
                            "seed {} {:?} unit {} {}: weights sum to {}",
                            seed,
                            layout,
                            i.get(),
                            family,
                            total
                        );
                    }
                }

                let problems: Vec<PricingProblem<'_>> = EquipmentIndex::range(inst.num_equipment())
                    .flat_map(|equipment| {
                        layout.families().iter().map(move |&family| (equipment, family))
                    })
                    .map(|(equipment, family)| PricingProblem {
                        instance: &inst,
                        equipment,
                        family,
                        duals: solution.duals(),
                        restrictions: &restrictions,
                        limits: SolveLimits::none(),
                    })
                    .collect();
                for (problem, result) in problems.iter().zip(pricer.price(&problems)) {
                    assert!(result.is_complete());
                    let contribution = result
                        .bound_contribution(problem.threshold(), false)
                        .expect("complete pricing bounds the node");
                    assert!(
                        contribution <= PRECISION,
                        "seed {} {:?} unit {} {}: reduced profit {} left at convergence",
                        seed,
                        layout,
                        problem.equipment.get(),
                        problem.family,
                        contribution
                    );
                }
            }
        }
    }
}
