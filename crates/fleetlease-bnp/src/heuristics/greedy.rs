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

//! Greedy bound and greedy service.
//!
//! The greedy bound charges every order the cheapest rent rate of its
//! compatible units over its whole window, the cheapest travel into it and
//! the fixed cost of a single full shift. A customer contributes its revenue
//! minus the cheapest way to serve each of its groups, clamped at zero
//! unless the node forces it in. Since a served order occupies at least its
//! window on some leased unit, the sum bounds every plan of the node.
//!
//! Greedy service inserts whole customers, by decreasing average revenue,
//! into the first compatible unit that is free over each order window, and
//! keeps a customer only if it pays for the extra rent and travel.

use super::UnitSchedule;
use crate::{
    config::MasterLayout,
    pool::NodePools,
    pricing::restrictions::Restrictions,
    scheme::{Family, Scheme},
};
use fleetlease_core::{math::window::TimeWindow, num::tolerance::is_positive};
use fleetlease_model::{
    index::{CustomerIndex, EquipmentIndex, OrderIndex},
    model::Instance,
    plan::LeaseTerm,
    solution::Solution,
};
use rustc_hash::FxHashMap;

/// Per-order cost floors of the greedy bound.
#[derive(Debug, Clone)]
pub struct GreedyBound {
    order_cost: Vec<f64>,
}

impl GreedyBound {
    pub fn new(instance: &Instance) -> Self {
        let order_cost = instance
            .orders()
            .iter()
            .map(|order| {
                let j = order.index();
                let units = order.equipment();
                let rate = units
                    .iter()
                    .map(|&i| {
                        let unit = instance.equipment(i);
                        (1..=unit.window().len())
                            .map(|d| unit.rent().rent(d) / d as f64)
                            .fold(f64::INFINITY, f64::min)
                    })
                    .fold(f64::INFINITY, f64::min);
                let travel = units
                    .iter()
                    .flat_map(|&i| {
                        let from_unit = instance.travel_cost(i, None, j);
                        instance
                            .equipment(i)
                            .orders()
                            .iter()
                            .filter(move |&&k| k != j)
                            .map(move |&k| instance.travel_cost(i, Some(k), j))
                            .chain(std::iter::once(from_unit))
                    })
                    .fold(f64::INFINITY, f64::min);
                let window = order.window();
                rate * window.len() as f64 + travel + instance.fixed_cost(j, window)
            })
            .collect();
        Self { order_cost }
    }

    /// Cost floor of serving `order`. Infinite for orders no unit can serve.
    #[inline]
    pub fn order_cost(&self, order: OrderIndex) -> f64 {
        self.order_cost[order.get()]
    }

    /// The bound of a node with the given decisions.
    pub fn evaluate(&self, instance: &Instance, restrictions: &Restrictions) -> f64 {
        instance
            .customers()
            .iter()
            .map(|customer| {
                let p = customer.index();
                let fix = restrictions.customer_fix(p);
                if customer.is_rejected() || fix == Some(false) {
                    return 0.0;
                }
                let cost: f64 = customer
                    .groups()
                    .iter()
                    .map(|&g| {
                        instance
                            .group(g)
                            .instances()
                            .iter()
                            .filter(|&&j| !restrictions.is_closed(j))
                            .map(|&j| self.order_cost(j))
                            .fold(f64::INFINITY, f64::min)
                    })
                    .sum();
                let margin = customer.revenue() - cost;
                if fix == Some(true) {
                    margin
                } else {
                    margin.max(0.0)
                }
            })
            .sum()
    }
}

/// Inserts customers greedily and returns the resulting plan.
pub fn greedy_service(instance: &Instance) -> Solution {
    let mut units: Vec<UnitSchedule> = (0..instance.num_equipment())
        .map(|i| UnitSchedule::new(instance, EquipmentIndex::new(i)))
        .collect();

    let mut customers: Vec<CustomerIndex> = instance
        .customers()
        .iter()
        .filter(|c| !c.is_rejected())
        .map(|c| c.index())
        .collect();
    customers.sort_by(|a, b| {
        let ra = instance.customer(*a).average_revenue();
        let rb = instance.customer(*b).average_revenue();
        rb.total_cmp(&ra).then(a.cmp(b))
    });

    for p in customers {
        let Some(extra) = place_customer(instance, &units, p) else {
            continue;
        };
        let mut delta = instance.customer(p).revenue();
        let mut extensions = Vec::with_capacity(extra.len());
        let mut feasible = true;
        for (i, shifts) in extra {
            let unit = &units[i.get()];
            match unit.extend(instance, &shifts) {
                Some(ext) => {
                    delta -= ext.cost() - unit.cost();
                    extensions.push((i, ext));
                }
                None => {
                    feasible = false;
                    break;
                }
            }
        }
        if feasible && is_positive(delta) {
            tracing::trace!(customer = %p, delta, "greedy service accepts customer");
            for (i, ext) in extensions {
                units[i.get()].commit(ext);
            }
        }
    }

    let plans = units.into_iter().map(UnitSchedule::into_plan).collect();
    Solution::new(instance, plans)
}

/// First-fit placement of every group of `customer`, one full-window shift
/// per group. Returns the new shifts per unit, in unit order.
fn place_customer(
    instance: &Instance,
    units: &[UnitSchedule],
    customer: CustomerIndex,
) -> Option<Vec<(EquipmentIndex, Vec<(OrderIndex, TimeWindow)>)>> {
    let mut extra: FxHashMap<EquipmentIndex, Vec<(OrderIndex, TimeWindow)>> = FxHashMap::default();
    for &g in instance.customer(customer).groups() {
        let placed = instance.group(g).instances().iter().find_map(|&j| {
            let window = instance.order(j).window();
            instance
                .order(j)
                .equipment()
                .iter()
                .copied()
                .find(|&i| {
                    let unit = &units[i.get()];
                    let pending = extra.get(&i);
                    unit.is_free(window)
                        && instance.work_windows_on(i, j).any(|w| w.window == window)
                        && unit.num_shifts() + pending.map_or(0, Vec::len)
                            < instance.equipment(i).max_shifts()
                        && pending.is_none_or(|p| p.iter().all(|(_, w)| !w.overlaps(window)))
                })
                .map(|i| (i, j, window))
        })?;
        let (i, j, window) = placed;
        extra.entry(i).or_default().push((j, window));
    }
    let mut extra: Vec<_> = extra.into_iter().collect();
    extra.sort_by_key(|(i, _)| *i);
    Some(extra)
}

/// Root pools: the null column of every unit and family, the greedy plan of
/// every unit, and in the two-family layout a lease over the whole
/// availability.
pub fn seed_pools(instance: &Instance, layout: MasterLayout, solution: &Solution) -> NodePools {
    let mut pools = NodePools::new(instance.num_equipment());
    for (i, plan) in solution.plans().iter().enumerate() {
        let i = EquipmentIndex::new(i);
        for &family in layout.families() {
            pools.insert(Scheme::null(i, family));
            if !plan.is_idle() {
                pools.insert(Scheme::from_plan(i, family, plan));
            }
            if family == Family::Lease {
                let unit = instance.equipment(i);
                if !unit.window().is_empty() && unit.max_lease_terms() > 0 {
                    pools.insert(Scheme::lease(
                        i,
                        [LeaseTerm::new(unit.rent(), unit.window())],
                    ));
                }
            }
        }
    }
    pools
}
