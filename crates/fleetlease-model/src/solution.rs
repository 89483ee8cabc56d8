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

//! Integral leasing and scheduling plans.
//!
//! A [`Solution`] stores, per equipment unit, the lease terms and the chain
//! of shifts. Revenue, rent and schedule costs are always recomputed from the
//! plans, and [`Solution::verify`] checks every side constraint against the
//! instance.

use crate::{
    index::{CustomerIndex, EquipmentIndex, GroupIndex, OrderIndex},
    model::Instance,
    plan::{LeaseTerm, WorkOrder},
};
use fleetlease_core::math::window::TimeWindow;

/// Lease terms and shifts of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentPlan {
    leases: Vec<LeaseTerm>,
    works: Vec<WorkOrder>,
}

impl EquipmentPlan {
    #[inline]
    pub fn new(leases: Vec<LeaseTerm>, works: Vec<WorkOrder>) -> Self {
        Self { leases, works }
    }

    #[inline]
    pub fn leases(&self) -> &[LeaseTerm] {
        &self.leases
    }

    #[inline]
    pub fn works(&self) -> &[WorkOrder] {
        &self.works
    }

    #[inline]
    pub fn rent_cost(&self) -> f64 {
        self.leases.iter().map(LeaseTerm::cost).sum()
    }

    #[inline]
    pub fn schedule_cost(&self) -> f64 {
        self.works.iter().map(WorkOrder::cost).sum()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.leases.is_empty() && self.works.is_empty()
    }
}

/// A violated side constraint found by [`Solution::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionError {
    /// The number of plans does not match the number of units.
    PlanCount { expected: usize, found: usize },
    /// A lease term or shift leaves the unit's availability window.
    OutsideAvailability {
        equipment: EquipmentIndex,
        window: TimeWindow,
    },
    /// Too many lease terms or too many shifts on one unit.
    CapacityExceeded { equipment: EquipmentIndex },
    /// Lease terms or shifts of one unit overlap or are out of order.
    Overlap { equipment: EquipmentIndex },
    /// A shift serves an order of another type or outside the order window.
    IncompatibleShift {
        equipment: EquipmentIndex,
        order: OrderIndex,
    },
    /// Part of a shift is not covered by a lease term.
    UnleasedShift {
        equipment: EquipmentIndex,
        window: TimeWindow,
    },
    /// The shift chain has wrong sequence numbers or predecessors.
    BrokenChain { equipment: EquipmentIndex },
    /// A unit returns to an order it already left while revisits are forbidden.
    Revisit {
        equipment: EquipmentIndex,
        order: OrderIndex,
    },
    /// A period of an order is served more than once.
    DoubleService { order: OrderIndex, slot: usize },
    /// An order is served in some but not all of its periods.
    PartialService { order: OrderIndex },
    /// More than one instance of a flexible order is served.
    SiblingConflict { group: GroupIndex },
    /// Some but not all orders of a customer are served.
    IncompleteCustomer { customer: CustomerIndex },
}

impl std::fmt::Display for SolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlanCount { expected, found } => {
                write!(f, "expected {} equipment plans, found {}", expected, found)
            }
            Self::OutsideAvailability { equipment, window } => {
                write!(f, "{} used outside its availability at {}", equipment, window)
            }
            Self::CapacityExceeded { equipment } => {
                write!(f, "{} exceeds its lease term or shift capacity", equipment)
            }
            Self::Overlap { equipment } => write!(f, "{} has overlapping entries", equipment),
            Self::IncompatibleShift { equipment, order } => {
                write!(f, "{} cannot serve {} as planned", equipment, order)
            }
            Self::UnleasedShift { equipment, window } => {
                write!(f, "{} works {} without a lease", equipment, window)
            }
            Self::BrokenChain { equipment } => write!(f, "{} has a broken shift chain", equipment),
            Self::Revisit { equipment, order } => {
                write!(f, "{} revisits {}", equipment, order)
            }
            Self::DoubleService { order, slot } => {
                write!(f, "{} is served twice in period {}", order, slot + 1)
            }
            Self::PartialService { order } => write!(f, "{} is only partially served", order),
            Self::SiblingConflict { group } => {
                write!(f, "more than one instance of {} is served", group)
            }
            Self::IncompleteCustomer { customer } => {
                write!(f, "{} is only partially served", customer)
            }
        }
    }
}

impl std::error::Error for SolutionError {}

/// An integral plan for all units.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    plans: Vec<EquipmentPlan>,
    accepted: Vec<bool>,
    revenue: f64,
    rent_cost: f64,
    schedule_cost: f64,
}

impl Solution {
    /// Builds a solution from per-unit plans. A customer counts as accepted
    /// when every one of its order groups has an instance whose whole window
    /// is served.
    pub fn new(instance: &Instance, plans: Vec<EquipmentPlan>) -> Self {
        let coverage = slot_coverage(instance, &plans);
        let accepted: Vec<bool> = instance
            .customers()
            .iter()
            .map(|c| {
                !c.groups().is_empty()
                    && c.groups().iter().all(|&g| {
                        instance
                            .group(g)
                            .instances()
                            .iter()
                            .any(|&j| fully_served(instance, &coverage, j))
                    })
            })
            .collect();
        let revenue = instance
            .customers()
            .iter()
            .zip(&accepted)
            .filter(|(_, a)| **a)
            .map(|(c, _)| c.revenue())
            .sum();
        let rent_cost = plans.iter().map(EquipmentPlan::rent_cost).sum();
        let schedule_cost = plans.iter().map(EquipmentPlan::schedule_cost).sum();
        Self {
            plans,
            accepted,
            revenue,
            rent_cost,
            schedule_cost,
        }
    }

    /// The solution that leases nothing and serves nobody.
    pub fn idle(instance: &Instance) -> Self {
        Self::new(instance, vec![EquipmentPlan::default(); instance.num_equipment()])
    }

    /// Revenue minus rent minus schedule costs.
    #[inline]
    pub fn objective(&self) -> f64 {
        self.revenue - self.rent_cost - self.schedule_cost
    }

    #[inline]
    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    #[inline]
    pub fn rent_cost(&self) -> f64 {
        self.rent_cost
    }

    #[inline]
    pub fn schedule_cost(&self) -> f64 {
        self.schedule_cost
    }

    #[inline]
    pub fn plans(&self) -> &[EquipmentPlan] {
        &self.plans
    }

    #[inline]
    pub fn plan(&self, equipment: EquipmentIndex) -> &EquipmentPlan {
        &self.plans[equipment.get()]
    }

    #[inline]
    pub fn is_accepted(&self, customer: CustomerIndex) -> bool {
        self.accepted[customer.get()]
    }

    #[inline]
    pub fn num_accepted(&self) -> usize {
        self.accepted.iter().filter(|a| **a).count()
    }

    /// Checks every side constraint of the problem.
    ///
    /// # Errors
    ///
    /// Returns the first [`SolutionError`] found.
    pub fn verify(&self, instance: &Instance) -> Result<(), SolutionError> {
        if self.plans.len() != instance.num_equipment() {
            return Err(SolutionError::PlanCount {
                expected: instance.num_equipment(),
                found: self.plans.len(),
            });
        }
        for (i, plan) in self.plans.iter().enumerate() {
            verify_plan(instance, EquipmentIndex::new(i), plan)?;
        }

        let coverage = slot_coverage(instance, &self.plans);
        for order in instance.orders() {
            let j = order.index();
            let counts = &coverage[j.get()];
            if let Some(slot) = order.window().slots().find(|&t| counts[t] > 1) {
                return Err(SolutionError::DoubleService { order: j, slot });
            }
            let served = order.window().slots().filter(|&t| counts[t] == 1).count();
            if served > 0 && served < order.window().len() {
                return Err(SolutionError::PartialService { order: j });
            }
        }
        for group in instance.groups() {
            let served = group
                .instances()
                .iter()
                .filter(|&&j| fully_served(instance, &coverage, j))
                .count();
            if served > 1 {
                return Err(SolutionError::SiblingConflict {
                    group: group.index(),
                });
            }
        }
        for customer in instance.customers() {
            let served = customer
                .groups()
                .iter()
                .filter(|&&g| {
                    instance
                        .group(g)
                        .instances()
                        .iter()
                        .any(|&j| fully_served(instance, &coverage, j))
                })
                .count();
            if served > 0 && served < customer.groups().len() {
                return Err(SolutionError::IncompleteCustomer {
                    customer: customer.index(),
                });
            }
        }
        Ok(())
    }
}

fn verify_plan(
    instance: &Instance,
    equipment: EquipmentIndex,
    plan: &EquipmentPlan,
) -> Result<(), SolutionError> {
    let unit = instance.equipment(equipment);
    let available = unit.window();
    if plan.leases().len() > unit.max_lease_terms() || plan.works().len() > unit.max_shifts() {
        return Err(SolutionError::CapacityExceeded { equipment });
    }
    for pair in plan.leases().windows(2) {
        if pair[0].window().end() > pair[1].window().begin() {
            return Err(SolutionError::Overlap { equipment });
        }
    }
    for term in plan.leases() {
        if !available.contains(term.window()) || term.window().is_empty() {
            return Err(SolutionError::OutsideAvailability {
                equipment,
                window: term.window(),
            });
        }
    }
    for pair in plan.works().windows(2) {
        if pair[0].window().end() > pair[1].window().begin() {
            return Err(SolutionError::Overlap { equipment });
        }
    }
    let mut previous: Option<OrderIndex> = None;
    for (position, work) in plan.works().iter().enumerate() {
        let order = instance.order(work.order());
        if !available.contains(work.window()) {
            return Err(SolutionError::OutsideAvailability {
                equipment,
                window: work.window(),
            });
        }
        if order.equipment_type() != unit.equipment_type()
            || !order.window().contains(work.window())
            || work.window().is_empty()
        {
            return Err(SolutionError::IncompatibleShift {
                equipment,
                order: work.order(),
            });
        }
        if work.sequence() != position || work.predecessor().order() != previous {
            return Err(SolutionError::BrokenChain { equipment });
        }
        if !instance.options().allow_revisit
            && plan.works()[..position]
                .iter()
                .any(|w| w.order() == work.order())
        {
            return Err(SolutionError::Revisit {
                equipment,
                order: work.order(),
            });
        }
        let leased = work
            .window()
            .slots()
            .all(|t| plan.leases().iter().any(|l| l.window().contains_slot(t)));
        if !leased {
            return Err(SolutionError::UnleasedShift {
                equipment,
                window: work.window(),
            });
        }
        previous = Some(work.order());
    }
    Ok(())
}

/// Number of shifts covering each slot of each order, indexed `[order][slot]`.
fn slot_coverage(instance: &Instance, plans: &[EquipmentPlan]) -> Vec<Vec<u32>> {
    let mut coverage = vec![vec![0u32; instance.horizon()]; instance.num_orders()];
    for plan in plans {
        for work in plan.works() {
            let counts = &mut coverage[work.order().get()];
            for t in work.window().slots() {
                if let Some(c) = counts.get_mut(t) {
                    *c += 1;
                }
            }
        }
    }
    coverage
}

fn fully_served(instance: &Instance, coverage: &[Vec<u32>], order: OrderIndex) -> bool {
    let counts = &coverage[order.get()];
    instance
        .order(order)
        .window()
        .slots()
        .all(|t| counts[t] >= 1)
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Solution(objective={:.3}, revenue={:.3}, rent={:.3}, schedule={:.3}, accepted={})",
            self.objective(),
            self.revenue,
            self.rent_cost,
            self.schedule_cost,
            self.num_accepted()
        )?;
        for (i, plan) in self.plans.iter().enumerate() {
            if plan.is_idle() {
                continue;
            }
            writeln!(f, "  {}:", EquipmentIndex::new(i))?;
            for term in plan.leases() {
                writeln!(f, "    {}", term)?;
            }
            for work in plan.works() {
                writeln!(f, "    {}", work)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        plan::chain_work_orders,
        rent::RentFunction,
    };

    fn two_orders() -> Instance {
        let mut b = InstanceBuilder::new(5);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 5), RentFunction::flat(10.0, 5)));
        let a = b.add_customer(50.0);
        let z = b.add_customer(50.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.add_order(OrderSpec::new(z, 0, TimeWindow::new(3, 5)));
        b.build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance")
    }

    fn full_plan(inst: &Instance) -> EquipmentPlan {
        let e = EquipmentIndex::new(0);
        let unit = inst.equipment(e);
        EquipmentPlan::new(
            vec![LeaseTerm::new(unit.rent(), TimeWindow::new(0, 5))],
            chain_work_orders(
                inst,
                e,
                &[
                    (OrderIndex::new(0), TimeWindow::new(0, 3)),
                    (OrderIndex::new(1), TimeWindow::new(3, 5)),
                ],
            ),
        )
    }

    #[test]
    fn test_objective_of_full_plan() {
        let inst = two_orders();
        let sol = Solution::new(&inst, vec![full_plan(&inst)]);
        assert_eq!(sol.revenue(), 100.0);
        assert_eq!(sol.rent_cost(), 10.0);
        assert_eq!(sol.schedule_cost(), 0.0);
        assert_eq!(sol.objective(), 90.0);
        assert_eq!(sol.num_accepted(), 2);
        assert_eq!(sol.verify(&inst), Ok(()));
    }

    #[test]
    fn test_idle_solution_is_feasible() {
        let inst = two_orders();
        let sol = Solution::idle(&inst);
        assert_eq!(sol.objective(), 0.0);
        assert_eq!(sol.verify(&inst), Ok(()));
    }

    #[test]
    fn test_unleased_shift_is_rejected() {
        let inst = two_orders();
        let e = EquipmentIndex::new(0);
        let unit = inst.equipment(e);
        let plan = EquipmentPlan::new(
            vec![LeaseTerm::new(unit.rent(), TimeWindow::new(0, 3))],
            chain_work_orders(
                &inst,
                e,
                &[
                    (OrderIndex::new(0), TimeWindow::new(0, 3)),
                    (OrderIndex::new(1), TimeWindow::new(3, 5)),
                ],
            ),
        );
        let sol = Solution::new(&inst, vec![plan]);
        assert!(matches!(
            sol.verify(&inst),
            Err(SolutionError::UnleasedShift { .. })
        ));
    }

    #[test]
    fn test_partial_service_is_rejected() {
        let inst = two_orders();
        let e = EquipmentIndex::new(0);
        let unit = inst.equipment(e);
        let plan = EquipmentPlan::new(
            vec![LeaseTerm::new(unit.rent(), TimeWindow::new(0, 2))],
            chain_work_orders(&inst, e, &[(OrderIndex::new(0), TimeWindow::new(0, 2))]),
        );
        let sol = Solution::new(&inst, vec![plan]);
        assert_eq!(sol.num_accepted(), 0);
        assert_eq!(
            sol.verify(&inst),
            Err(SolutionError::PartialService {
                order: OrderIndex::new(0)
            })
        );
    }

    #[test]
    fn test_plan_count_mismatch() {
        let inst = two_orders();
        let sol = Solution::new(&inst, Vec::new());
        assert_eq!(
            sol.verify(&inst),
            Err(SolutionError::PlanCount {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn test_display_lists_active_units() {
        let inst = two_orders();
        let sol = Solution::new(&inst, vec![full_plan(&inst)]);
        let rendered = format!("{}", sol);
        assert!(rendered.contains("objective=90.000"));
        assert!(rendered.contains("EquipmentIndex(0)"));
    }
}
