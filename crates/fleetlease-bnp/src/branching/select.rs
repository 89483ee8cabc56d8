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

//! # Branching Variable Selection
//!
//! Aggregates the master weights into the branching quantities, family by
//! family in a fixed priority, and returns the first family holding a
//! fractional quantity:
//!
//! 1. customer acceptance `Z`, then flexible instance acceptance `v`,
//! 2. split counts,
//! 3. service of an order by a unit,
//! 4. assignment of a shift window,
//! 5. begin and end of the shift at a position,
//! 6. service of an order in a period,
//! 7. lease occupancy, lease begin and end, rate segments (two-family only).
//!
//! Within a family the quantity closest to one half wins; ties go to the
//! first quantity in index order and the scan stops once a quantity is
//! within tolerance of one half.

use super::constraint::{Bound, BranchConstraint};
use crate::{
    config::MasterLayout,
    master::{MasterSolution, weighted},
    pool::NodePools,
    pricing::restrictions::Restrictions,
    scheme::{Family, Scheme},
};
use fleetlease_core::{
    math::window::TimeWindow,
    num::tolerance::{PRECISION, distance_to_half, is_integral},
};
use fleetlease_model::{
    index::{CustomerIndex, EquipmentIndex, OrderIndex},
    model::Instance,
};
use std::collections::BTreeMap;

/// A pair of complementary child constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branching {
    /// Fixes the quantity to 0 or bounds it by its floor.
    pub down: BranchConstraint,
    /// Fixes the quantity to 1 or bounds it by its ceiling.
    pub up: BranchConstraint,
    /// The fractional value branched on.
    pub value: f64,
}

impl std::fmt::Display for Branching {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {} (at {:.3})", self.down, self.up, self.value)
    }
}

/// Keeps the quantity closest to one half.
struct Closest {
    best: Option<(f64, Branching)>,
}

impl Closest {
    #[inline]
    fn new() -> Self {
        Self { best: None }
    }

    /// Offers a quantity. Returns `true` once the scan can stop.
    fn offer<F>(&mut self, value: f64, make: F) -> bool
    where
        F: FnOnce(f64) -> (BranchConstraint, BranchConstraint),
    {
        if is_integral(value) {
            return false;
        }
        let distance = distance_to_half(value);
        if self.best.as_ref().is_none_or(|(d, _)| distance < *d) {
            let (down, up) = make(value);
            self.best = Some((distance, Branching { down, up, value }));
        }
        distance < PRECISION
    }

    #[inline]
    fn finish(self) -> Option<Branching> {
        self.best.map(|(_, b)| b)
    }
}

#[inline]
fn bounds(value: f64) -> (Bound, Bound) {
    (
        Bound::AtMost(value.floor() as usize),
        Bound::AtLeast(value.ceil() as usize),
    )
}

/// Everything the selection reads from a solved node.
pub struct BranchingInput<'a> {
    pub instance: &'a Instance,
    pub layout: MasterLayout,
    pub pools: &'a NodePools,
    pub solution: &'a MasterSolution,
    pub restrictions: &'a Restrictions,
}

impl BranchingInput<'_> {
    /// The family whose columns carry the shifts.
    #[inline]
    fn work_family(&self) -> Family {
        match self.layout {
            MasterLayout::SingleFamily => Family::Combined,
            MasterLayout::TwoFamily => Family::Work,
        }
    }

    #[inline]
    fn units(&self) -> impl Iterator<Item = EquipmentIndex> {
        (0..self.instance.num_equipment()).map(EquipmentIndex::new)
    }
}

/// Selects the branching quantity of a solved node, or `None` if every
/// quantity is integral.
pub fn select(input: &BranchingInput<'_>) -> Option<Branching> {
    acceptance(input)
        .or_else(|| split(input))
        .or_else(|| service(input))
        .or_else(|| shift(input))
        .or_else(|| shift_bounds(input))
        .or_else(|| slot(input))
        .or_else(|| match input.layout {
            MasterLayout::TwoFamily => lease(input),
            MasterLayout::SingleFamily => None,
        })
}

fn acceptance(input: &BranchingInput<'_>) -> Option<Branching> {
    let instance = input.instance;
    let mut closest = Closest::new();
    for p in (0..instance.num_customers()).map(CustomerIndex::new) {
        if input.restrictions.customer_fix(p).is_some() {
            continue;
        }
        let stop = closest.offer(input.solution.customer(p), |_| {
            (
                BranchConstraint::Customer {
                    customer: p,
                    accept: false,
                },
                BranchConstraint::Customer {
                    customer: p,
                    accept: true,
                },
            )
        });
        if stop {
            break;
        }
    }
    if closest.best.is_some() {
        return closest.finish();
    }
    for group in instance.groups().iter().filter(|g| g.is_flexible()) {
        for &j in group.instances() {
            if input.restrictions.instance_fix(j).is_some() {
                continue;
            }
            let stop = closest.offer(input.solution.acceptance(j), |_| {
                (
                    BranchConstraint::Instance {
                        order: j,
                        accept: false,
                    },
                    BranchConstraint::Instance {
                        order: j,
                        accept: true,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

fn split(input: &BranchingInput<'_>) -> Option<Branching> {
    let mut pieces = vec![0.0; input.instance.num_orders()];
    let family = input.work_family();
    for i in input.units() {
        for (scheme, weight) in weighted(input.pools, input.solution, i, family) {
            for w in scheme.works() {
                pieces[w.order().get()] += weight;
            }
        }
    }
    let mut closest = Closest::new();
    for (j, &value) in pieces.iter().enumerate() {
        let order = OrderIndex::new(j);
        let stop = closest.offer(value, |v| {
            let (down, up) = bounds(v);
            (
                BranchConstraint::Split { order, bound: down },
                BranchConstraint::Split { order, bound: up },
            )
        });
        if stop {
            break;
        }
    }
    closest.finish()
}

fn service(input: &BranchingInput<'_>) -> Option<Branching> {
    let family = input.work_family();
    let mut closest = Closest::new();
    for i in input.units() {
        let mut served = vec![0.0; input.instance.num_orders()];
        for (scheme, weight) in weighted(input.pools, input.solution, i, family) {
            for j in scheme.served_orders() {
                served[j.get()] += weight;
            }
        }
        for (j, &value) in served.iter().enumerate() {
            let order = OrderIndex::new(j);
            let stop = closest.offer(value, |_| {
                (
                    BranchConstraint::Service {
                        equipment: i,
                        order,
                        serve: false,
                    },
                    BranchConstraint::Service {
                        equipment: i,
                        order,
                        serve: true,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

fn shift(input: &BranchingInput<'_>) -> Option<Branching> {
    let family = input.work_family();
    let mut closest = Closest::new();
    for i in input.units() {
        let mut assigned: BTreeMap<(OrderIndex, TimeWindow), f64> = BTreeMap::new();
        for (scheme, weight) in weighted(input.pools, input.solution, i, family) {
            for w in scheme.works() {
                *assigned.entry((w.order(), w.window())).or_default() += weight;
            }
        }
        for (&(order, window), &value) in &assigned {
            let stop = closest.offer(value, |_| {
                (
                    BranchConstraint::Shift {
                        equipment: i,
                        order,
                        window,
                        assign: false,
                    },
                    BranchConstraint::Shift {
                        equipment: i,
                        order,
                        window,
                        assign: true,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

fn shift_bounds(input: &BranchingInput<'_>) -> Option<Branching> {
    let family = input.work_family();
    let horizon = input.instance.horizon();
    let mut closest = Closest::new();
    for i in input.units() {
        let schemes: Vec<(&Scheme, f64)> = weighted(input.pools, input.solution, i, family).collect();
        let positions = schemes.iter().map(|(s, _)| s.works().len()).max().unwrap_or(0);
        for position in 0..positions {
            let begin: f64 = schemes
                .iter()
                .map(|(s, w)| w * s.shift_begin(position, horizon) as f64)
                .sum();
            let end: f64 = schemes
                .iter()
                .map(|(s, w)| w * s.shift_end(position, horizon) as f64)
                .sum();
            let stop = closest.offer(begin, |v| {
                let (down, up) = bounds(v);
                (
                    BranchConstraint::ShiftBegin {
                        equipment: i,
                        position,
                        bound: down,
                    },
                    BranchConstraint::ShiftBegin {
                        equipment: i,
                        position,
                        bound: up,
                    },
                )
            }) || closest.offer(end, |v| {
                let (down, up) = bounds(v);
                (
                    BranchConstraint::ShiftEnd {
                        equipment: i,
                        position,
                        bound: down,
                    },
                    BranchConstraint::ShiftEnd {
                        equipment: i,
                        position,
                        bound: up,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

fn slot(input: &BranchingInput<'_>) -> Option<Branching> {
    let family = input.work_family();
    let mut closest = Closest::new();
    for i in input.units() {
        let mut served: BTreeMap<(OrderIndex, usize), f64> = BTreeMap::new();
        for (scheme, weight) in weighted(input.pools, input.solution, i, family) {
            for w in scheme.works() {
                for t in w.window().slots() {
                    *served.entry((w.order(), t)).or_default() += weight;
                }
            }
        }
        for (&(order, slot), &value) in &served {
            let stop = closest.offer(value, |_| {
                (
                    BranchConstraint::Slot {
                        equipment: i,
                        order,
                        slot,
                        serve: false,
                    },
                    BranchConstraint::Slot {
                        equipment: i,
                        order,
                        slot,
                        serve: true,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

fn lease(input: &BranchingInput<'_>) -> Option<Branching> {
    lease_slot(input)
        .or_else(|| lease_bounds(input))
        .or_else(|| lease_segment(input))
}

fn lease_slot(input: &BranchingInput<'_>) -> Option<Branching> {
    let horizon = input.instance.horizon();
    let mut closest = Closest::new();
    for i in input.units() {
        let mut leased = vec![0.0; horizon];
        for (scheme, weight) in weighted(input.pools, input.solution, i, Family::Lease) {
            for term in scheme.leases() {
                for t in term.window().slots() {
                    leased[t] += weight;
                }
            }
        }
        for (slot, &value) in leased.iter().enumerate() {
            let stop = closest.offer(value, |_| {
                (
                    BranchConstraint::LeaseSlot {
                        equipment: i,
                        slot,
                        leased: false,
                    },
                    BranchConstraint::LeaseSlot {
                        equipment: i,
                        slot,
                        leased: true,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

fn lease_bounds(input: &BranchingInput<'_>) -> Option<Branching> {
    let horizon = input.instance.horizon();
    let mut closest = Closest::new();
    // Begins of every position are scanned before any end.
    for begin in [true, false] {
        for i in input.units() {
            let schemes: Vec<(&Scheme, f64)> = weighted(input.pools, input.solution, i, Family::Lease).collect();
            let positions = schemes.iter().map(|(s, _)| s.leases().len()).max().unwrap_or(0);
            for position in 0..positions {
                let value: f64 = schemes
                    .iter()
                    .map(|(s, w)| {
                        let at = if begin {
                            s.lease_begin(position, horizon)
                        } else {
                            s.lease_end(position, horizon)
                        };
                        w * at as f64
                    })
                    .sum();
                let stop = closest.offer(value, |v| {
                    let (down, up) = bounds(v);
                    let make = |bound| {
                        if begin {
                            BranchConstraint::LeaseBegin {
                                equipment: i,
                                position,
                                bound,
                            }
                        } else {
                            BranchConstraint::LeaseEnd {
                                equipment: i,
                                position,
                                bound,
                            }
                        }
                    };
                    (make(down), make(up))
                });
                if stop {
                    return closest.finish();
                }
            }
        }
        if closest.best.is_some() {
            break;
        }
    }
    closest.finish()
}

fn lease_segment(input: &BranchingInput<'_>) -> Option<Branching> {
    let mut closest = Closest::new();
    for i in input.units() {
        let mut chosen: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (scheme, weight) in weighted(input.pools, input.solution, i, Family::Lease) {
            for (position, term) in scheme.leases().iter().enumerate() {
                *chosen.entry((position, term.segment())).or_default() += weight;
            }
        }
        for (&(position, segment), &value) in &chosen {
            let stop = closest.offer(value, |_| {
                (
                    BranchConstraint::LeaseSegment {
                        equipment: i,
                        position,
                        segment,
                        fixed: false,
                    },
                    BranchConstraint::LeaseSegment {
                        equipment: i,
                        position,
                        segment,
                        fixed: true,
                    },
                )
            });
            if stop {
                return closest.finish();
            }
        }
    }
    closest.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::{MasterOutcome, MasterProblem};
    use fleetlease_lp::{highs::HighsOracle, oracle::SolveLimits};
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        plan::{LeaseTerm, chain_work_orders},
        rent::RentFunction,
    };

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(6);
        for _ in 0..2 {
            b.add_equipment(EquipmentSpec::new(
                0,
                TimeWindow::new(0, 6),
                RentFunction::flat(1.0, 6),
            ));
        }
        for k in 0..3 {
            let p = b.add_customer(10.0);
            b.add_order(OrderSpec::new(p, 0, TimeWindow::new(2 * k, 2 * k + 2)));
        }
        b.build(
            &ModelOptions::default()
                .forbid_split(true)
                .base_schedule_cost(0.0),
        )
        .expect("valid instance")
    }

    fn pair(inst: &Instance, i: EquipmentIndex, a: usize, b: usize) -> Scheme {
        let shifts: Vec<(OrderIndex, TimeWindow)> = [a, b]
            .iter()
            .map(|&j| (OrderIndex::new(j), inst.order(OrderIndex::new(j)).window()))
            .collect();
        let works = chain_work_orders(inst, i, &shifts);
        let rent = inst.equipment(i).rent();
        Scheme::combined(i, [LeaseTerm::new(rent, TimeWindow::new(0, 6))], works)
    }

    fn solve(inst: &Instance, pools: &NodePools) -> MasterSolution {
        let restrictions = Restrictions::compile(inst, &[]);
        let master = MasterProblem::build(inst, MasterLayout::SingleFamily, pools, &restrictions)
            .expect("master builds");
        match master
            .solve(inst, &HighsOracle::new(), &SolveLimits::none())
            .expect("solve succeeds")
        {
            MasterOutcome::Solved(solution) => *solution,
            _ => panic!("expected an optimal master"),
        }
    }

    #[test]
    fn test_odd_cycle_of_pairs_branches() {
        let inst = instance();
        let mut pools = NodePools::new(2);
        for i in (0..2).map(EquipmentIndex::new) {
            pools.insert(Scheme::null(i, Family::Combined));
            for (a, b) in [(0, 1), (1, 2), (0, 2)] {
                pools.insert(pair(&inst, i, a, b));
            }
        }
        let solution = solve(&inst, &pools);
        assert!(solution.objective() > 28.0);
        let restrictions = Restrictions::compile(&inst, &[]);
        let branching = select(&BranchingInput {
            instance: &inst,
            layout: MasterLayout::SingleFamily,
            pools: &pools,
            solution: &solution,
            restrictions: &restrictions,
        })
        .unwrap_or_else(|| panic!("expected a fractional quantity"));
        assert!(!is_integral(branching.value));
        assert_eq!(branching.down.equipment(), branching.up.equipment());
        assert_ne!(branching.down, branching.up);
        // every customer is served in full, so the first fractional family is a local one
        assert!(branching.down.equipment().is_some());
    }

    #[test]
    fn test_integral_solution_has_no_branching() {
        let inst = instance();
        let mut pools = NodePools::new(2);
        for i in (0..2).map(EquipmentIndex::new) {
            pools.insert(Scheme::null(i, Family::Combined));
        }
        pools.insert(pair(&inst, EquipmentIndex::new(0), 0, 1));
        let solution = solve(&inst, &pools);
        let restrictions = Restrictions::compile(&inst, &[]);
        let input = BranchingInput {
            instance: &inst,
            layout: MasterLayout::SingleFamily,
            pools: &pools,
            solution: &solution,
            restrictions: &restrictions,
        };
        assert!(select(&input).is_none());
    }

    #[test]
    fn test_closest_prefers_the_first_of_equals() {
        let mut closest = Closest::new();
        let c = |k: usize| BranchConstraint::Customer {
            customer: CustomerIndex::new(k),
            accept: false,
        };
        assert!(!closest.offer(0.3, |_| (c(0), c(0))));
        assert!(!closest.offer(0.7, |_| (c(1), c(1))));
        assert!(!closest.offer(1.0, |_| (c(2), c(2))));
        let best = closest.finish().unwrap_or_else(|| panic!("expected a candidate"));
        assert_eq!(best.down, c(0));
        assert_eq!(bounds(2.4), (Bound::AtMost(2), Bound::AtLeast(3)));
    }
}
