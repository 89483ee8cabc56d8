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

//! Majority rounding of a fractional single-family master solution.
//!
//! Every period an order is served by a unit in at least half of the unit's
//! weight is kept. Customers accepted by majority are then taken in
//! decreasing average revenue; a customer is committed when the kept
//! periods cover each of its orders exactly once, the pieces are candidate
//! shifts on free units, and the cheapest covering lease exists. The plan
//! is verified before it is returned.

use super::UnitSchedule;
use crate::{
    error::{BnpError, invalid_plan},
    master::{MasterSolution, weighted},
    pool::NodePools,
    scheme::Family,
};
use fixedbitset::FixedBitSet;
use fleetlease_core::{
    math::window::TimeWindow,
    num::tolerance::{is_positive, round_by_majority},
};
use fleetlease_model::{
    index::{CustomerIndex, EquipmentIndex, OrderIndex},
    model::Instance,
    solution::Solution,
};
use rustc_hash::FxHashMap;

/// Rounds the solution of node `node`. Returns `Ok(None)` when no customer
/// could be committed.
///
/// # Errors
///
/// Returns a consistency error if the rounded plan fails verification.
pub fn repair(
    instance: &Instance,
    pools: &NodePools,
    solution: &MasterSolution,
    node: usize,
) -> Result<Option<Solution>, BnpError> {
    debug_assert!(
        !instance.is_flexible(),
        "called `repair` on an instance with flexible orders"
    );
    let served = rounded_service(instance, pools, solution);

    let mut units: Vec<UnitSchedule> = (0..instance.num_equipment())
        .map(|i| UnitSchedule::new(instance, EquipmentIndex::new(i)))
        .collect();

    let mut customers: Vec<CustomerIndex> = instance
        .customers()
        .iter()
        .filter(|c| !c.is_rejected() && round_by_majority(solution.customer(c.index()), 1.0))
        .map(|c| c.index())
        .collect();
    customers.sort_by(|a, b| {
        let ra = instance.customer(*a).average_revenue();
        let rb = instance.customer(*b).average_revenue();
        rb.total_cmp(&ra).then(a.cmp(b))
    });

    let mut committed = 0usize;
    for p in customers {
        let Some(extra) = pieces_of(instance, &units, &served, p) else {
            continue;
        };
        let mut delta = instance.customer(p).revenue();
        let mut extensions = Vec::with_capacity(extra.len());
        for (i, shifts) in &extra {
            let unit = &units[i.get()];
            let Some(ext) = unit.extend(instance, shifts) else {
                break;
            };
            delta -= ext.cost() - unit.cost();
            extensions.push((*i, ext));
        }
        if extensions.len() == extra.len() && is_positive(delta) {
            for (i, ext) in extensions {
                units[i.get()].commit(ext);
            }
            committed += 1;
        }
    }
    if committed == 0 {
        return Ok(None);
    }

    let plans = units.into_iter().map(UnitSchedule::into_plan).collect();
    let repaired = Solution::new(instance, plans);
    repaired
        .verify(instance)
        .map_err(|e| invalid_plan(node, "repaired plan", e))?;
    Ok(Some(repaired))
}

/// The periods each unit serves each order in by majority.
fn rounded_service(
    instance: &Instance,
    pools: &NodePools,
    solution: &MasterSolution,
) -> Vec<FxHashMap<OrderIndex, FixedBitSet>> {
    let horizon = instance.horizon();
    (0..instance.num_equipment())
        .map(|i| {
            let i = EquipmentIndex::new(i);
            let mut weight: FxHashMap<(OrderIndex, usize), f64> = FxHashMap::default();
            for (scheme, lambda) in weighted(pools, solution, i, Family::Combined) {
                for w in scheme.works() {
                    for t in w.window().slots() {
                        *weight.entry((w.order(), t)).or_default() += lambda;
                    }
                }
            }
            let mut kept: FxHashMap<OrderIndex, FixedBitSet> = FxHashMap::default();
            for ((j, t), value) in weight {
                if round_by_majority(value, 1.0) {
                    kept.entry(j)
                        .or_insert_with(|| FixedBitSet::with_capacity(horizon))
                        .insert(t);
                }
            }
            kept
        })
        .collect()
}

/// Splits the kept periods of every order of `customer` into shifts, first
/// unit first. Returns `None` unless each order is covered exactly by
/// candidate shifts that fit their units.
fn pieces_of(
    instance: &Instance,
    units: &[UnitSchedule],
    served: &[FxHashMap<OrderIndex, FixedBitSet>],
    customer: CustomerIndex,
) -> Option<Vec<(EquipmentIndex, Vec<(OrderIndex, TimeWindow)>)>> {
    let mut extra: Vec<(EquipmentIndex, Vec<(OrderIndex, TimeWindow)>)> = Vec::new();
    for &g in instance.customer(customer).groups() {
        let &j = instance.group(g).instances().first()?;
        let window = instance.order(j).window();
        let mut covered = FixedBitSet::with_capacity(instance.horizon());
        for &i in instance.order(j).equipment() {
            let Some(slots) = served[i.get()].get(&j) else {
                continue;
            };
            for run in runs(slots, window, &covered) {
                let fits = instance.work_windows_on(i, j).any(|w| w.window == run)
                    && units[i.get()].is_free(run)
                    && extra
                        .iter()
                        .filter(|(e, _)| *e == i)
                        .flat_map(|(_, s)| s.iter())
                        .all(|(_, w)| !w.overlaps(run));
                if !fits {
                    return None;
                }
                covered.insert_range(run.begin()..run.end());
                match extra.iter_mut().find(|(e, _)| *e == i) {
                    Some((_, shifts)) => shifts.push((j, run)),
                    None => extra.push((i, vec![(j, run)])),
                }
            }
        }
        if window.slots().any(|t| !covered.contains(t)) {
            return None;
        }
    }
    extra.sort_by_key(|(i, _)| *i);
    Some(extra)
}

/// Maximal runs of `slots` inside `window` not yet `covered`.
fn runs(slots: &FixedBitSet, window: TimeWindow, covered: &FixedBitSet) -> Vec<TimeWindow> {
    let mut out = Vec::new();
    let mut start = None;
    for t in window.slots() {
        let keep = slots.contains(t) && !covered.contains(t);
        match (keep, start) {
            (true, None) => start = Some(t),
            (false, Some(b)) => {
                out.push(TimeWindow::new_unchecked(b, t));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(b) = start {
        out.push(TimeWindow::new_unchecked(b, window.end()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MasterLayout,
        master::{MasterOutcome, MasterProblem},
        pricing::restrictions::Restrictions,
        scheme::Scheme,
    };
    use fleetlease_lp::{highs::HighsOracle, oracle::SolveLimits};
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        plan::{LeaseTerm, chain_work_orders},
        rent::RentFunction,
    };

    #[test]
    fn test_runs_split_at_gaps_and_cover() {
        let mut slots = FixedBitSet::with_capacity(10);
        slots.insert_range(1..3);
        slots.insert_range(4..7);
        let mut covered = FixedBitSet::with_capacity(10);
        covered.insert(5);
        let found = runs(&slots, TimeWindow::new(0, 8), &covered);
        assert_eq!(
            found,
            vec![
                TimeWindow::new(1, 3),
                TimeWindow::new(4, 5),
                TimeWindow::new(6, 7)
            ]
        );
    }

    #[test]
    fn test_repair_rounds_an_odd_cycle() {
        let mut b = InstanceBuilder::new(6);
        for _ in 0..2 {
            b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 6), RentFunction::flat(1.0, 6)));
        }
        for k in 0..3 {
            let p = b.add_customer(10.0);
            b.add_order(OrderSpec::new(p, 0, TimeWindow::new(2 * k, 2 * k + 2)));
        }
        let inst = b
            .build(&ModelOptions::default().forbid_split(true).base_schedule_cost(0.0))
            .expect("valid instance");

        let mut pools = NodePools::new(2);
        for i in (0..2).map(EquipmentIndex::new) {
            pools.insert(Scheme::null(i, Family::Combined));
            for (a, c) in [(0, 1), (1, 2), (0, 2)] {
                let shifts: Vec<_> = [a, c]
                    .iter()
                    .map(|&j| (OrderIndex::new(j), inst.order(OrderIndex::new(j)).window()))
                    .collect();
                let works = chain_work_orders(&inst, i, &shifts);
                let rent = inst.equipment(i).rent();
                pools.insert(Scheme::combined(
                    i,
                    [LeaseTerm::new(rent, TimeWindow::new(0, 6))],
                    works,
                ));
            }
        }
        let restrictions = Restrictions::compile(&inst, &[]);
        let master = MasterProblem::build(&inst, MasterLayout::SingleFamily, &pools, &restrictions)
            .expect("master builds");
        let MasterOutcome::Solved(solution) = master
            .solve(&inst, &HighsOracle::new(), &SolveLimits::none())
            .expect("solve succeeds")
        else {
            panic!("expected an optimal master");
        };

        let repaired = repair(&inst, &pools, &solution, 0).expect("verified plan");
        if let Some(plan) = repaired {
            assert!(plan.verify(&inst).is_ok());
            assert!(plan.objective() > 0.0);
            assert!(plan.objective() <= solution.objective() + 1e-6);
        }
    }
}
