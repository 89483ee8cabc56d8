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

//! # Schemes
//!
//! A scheme is one candidate pattern of one equipment unit and becomes one
//! column of the restricted master problem. Depending on the master layout a
//! scheme carries lease terms only, shifts only, or both; the family tag
//! tells which convexity row it belongs to.
//!
//! Two schemes are identical when their family, unit, lease terms and shifts
//! match structurally. Column pools deduplicate on this identity, so the
//! derived costs never take part in comparisons.

use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::{
    index::{EquipmentIndex, OrderIndex},
    plan::{LeaseTerm, WorkOrder},
    solution::EquipmentPlan,
};
use smallvec::SmallVec;

/// The column family of a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Lease,
    Work,
    Combined,
}

impl Family {
    #[inline]
    pub fn has_leases(&self) -> bool {
        matches!(self, Family::Lease | Family::Combined)
    }

    #[inline]
    pub fn has_works(&self) -> bool {
        matches!(self, Family::Work | Family::Combined)
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Lease => write!(f, "lease"),
            Family::Work => write!(f, "work"),
            Family::Combined => write!(f, "combined"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scheme {
    equipment: EquipmentIndex,
    family: Family,
    leases: SmallVec<[LeaseTerm; 2]>,
    works: SmallVec<[WorkOrder; 4]>,
    rent_cost: f64,
    schedule_cost: f64,
}

impl Scheme {
    fn build(
        equipment: EquipmentIndex,
        family: Family,
        leases: SmallVec<[LeaseTerm; 2]>,
        works: SmallVec<[WorkOrder; 4]>,
    ) -> Self {
        debug_assert!(
            leases.windows(2).all(|p| p[0].window().end() <= p[1].window().begin()),
            "called `Scheme::build` with overlapping or unordered lease terms"
        );
        debug_assert!(
            works.windows(2).all(|p| p[0].window().end() <= p[1].window().begin()),
            "called `Scheme::build` with overlapping or unordered shifts"
        );
        let rent_cost = leases.iter().map(LeaseTerm::cost).sum();
        let schedule_cost = works.iter().map(WorkOrder::cost).sum();
        Self {
            equipment,
            family,
            leases,
            works,
            rent_cost,
            schedule_cost,
        }
    }

    /// A lease-only scheme.
    #[inline]
    pub fn lease<I>(equipment: EquipmentIndex, leases: I) -> Self
    where
        I: IntoIterator<Item = LeaseTerm>,
    {
        Self::build(
            equipment,
            Family::Lease,
            leases.into_iter().collect(),
            SmallVec::new(),
        )
    }

    /// A schedule-only scheme.
    #[inline]
    pub fn work<I>(equipment: EquipmentIndex, works: I) -> Self
    where
        I: IntoIterator<Item = WorkOrder>,
    {
        Self::build(
            equipment,
            Family::Work,
            SmallVec::new(),
            works.into_iter().collect(),
        )
    }

    /// A scheme carrying both lease terms and shifts.
    #[inline]
    pub fn combined<L, W>(equipment: EquipmentIndex, leases: L, works: W) -> Self
    where
        L: IntoIterator<Item = LeaseTerm>,
        W: IntoIterator<Item = WorkOrder>,
    {
        Self::build(
            equipment,
            Family::Combined,
            leases.into_iter().collect(),
            works.into_iter().collect(),
        )
    }

    /// The empty scheme of `family`: nothing leased, nothing served.
    #[inline]
    pub fn null(equipment: EquipmentIndex, family: Family) -> Self {
        Self::build(equipment, family, SmallVec::new(), SmallVec::new())
    }

    /// The part of `plan` that belongs to `family`.
    pub fn from_plan(equipment: EquipmentIndex, family: Family, plan: &EquipmentPlan) -> Self {
        let leases = if family.has_leases() {
            plan.leases().iter().copied().collect()
        } else {
            SmallVec::new()
        };
        let works = if family.has_works() {
            plan.works().iter().copied().collect()
        } else {
            SmallVec::new()
        };
        Self::build(equipment, family, leases, works)
    }

    #[inline]
    pub fn equipment(&self) -> EquipmentIndex {
        self.equipment
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
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
        self.rent_cost
    }

    #[inline]
    pub fn schedule_cost(&self) -> f64 {
        self.schedule_cost
    }

    /// Rent plus schedule cost; the negated objective coefficient of the column.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.rent_cost + self.schedule_cost
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.leases.is_empty() && self.works.is_empty()
    }

    /// Lease occupancy of period `slot`.
    #[inline]
    pub fn leases_slot(&self, slot: usize) -> bool {
        self.leases.iter().any(|l| l.window().contains_slot(slot))
    }

    /// Scheduling indicator `y(order, slot)`.
    #[inline]
    pub fn serves_slot(&self, order: OrderIndex, slot: usize) -> bool {
        self.works
            .iter()
            .any(|w| w.order() == order && w.window().contains_slot(slot))
    }

    #[inline]
    pub fn serves(&self, order: OrderIndex) -> bool {
        self.works.iter().any(|w| w.order() == order)
    }

    /// Number of shifts serving `order`.
    #[inline]
    pub fn pieces(&self, order: OrderIndex) -> usize {
        self.works.iter().filter(|w| w.order() == order).count()
    }

    /// `true` if a shift serves `order` over exactly `window`.
    #[inline]
    pub fn has_shift(&self, order: OrderIndex, window: TimeWindow) -> bool {
        self.works
            .iter()
            .any(|w| w.order() == order && w.window() == window)
    }

    /// Begin of the shift at `position`, or `missing` when there is none.
    #[inline]
    pub fn shift_begin(&self, position: usize, missing: usize) -> usize {
        self.works
            .get(position)
            .map_or(missing, |w| w.window().begin())
    }

    /// End of the shift at `position`, or `missing` when there is none.
    #[inline]
    pub fn shift_end(&self, position: usize, missing: usize) -> usize {
        self.works
            .get(position)
            .map_or(missing, |w| w.window().end())
    }

    #[inline]
    pub fn lease_begin(&self, position: usize, missing: usize) -> usize {
        self.leases
            .get(position)
            .map_or(missing, |l| l.window().begin())
    }

    #[inline]
    pub fn lease_end(&self, position: usize, missing: usize) -> usize {
        self.leases
            .get(position)
            .map_or(missing, |l| l.window().end())
    }

    /// Rent segment of the lease term at `position`.
    #[inline]
    pub fn lease_segment(&self, position: usize) -> Option<usize> {
        self.leases.get(position).map(LeaseTerm::segment)
    }

    /// Orders served by this scheme, each once, in shift order.
    pub fn served_orders(&self) -> SmallVec<[OrderIndex; 4]> {
        let mut served: SmallVec<[OrderIndex; 4]> = SmallVec::new();
        for w in &self.works {
            if !served.contains(&w.order()) {
                served.push(w.order());
            }
        }
        served
    }

    /// Converts the scheme into an equipment plan.
    #[inline]
    pub fn to_plan(&self) -> EquipmentPlan {
        EquipmentPlan::new(self.leases.to_vec(), self.works.to_vec())
    }
}

impl PartialEq for Scheme {
    fn eq(&self, other: &Self) -> bool {
        self.equipment == other.equipment
            && self.family == other.family
            && self.leases == other.leases
            && self.works == other.works
    }
}

impl Eq for Scheme {}

impl std::hash::Hash for Scheme {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.equipment.hash(state);
        self.family.hash(state);
        self.leases.as_slice().hash(state);
        self.works.as_slice().hash(state);
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scheme({} {}, cost {:.3}",
            self.equipment, self.family, self.cost()
        )?;
        for l in &self.leases {
            write!(f, ", {}", l)?;
        }
        for w in &self.works {
            write!(f, ", {}", w)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_model::{
        model::{EquipmentSpec, Instance, InstanceBuilder, ModelOptions, OrderSpec},
        plan::chain_work_orders,
        rent::RentFunction,
    };

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(5);
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 5), RentFunction::flat(10.0, 5)));
        let a = b.add_customer(50.0);
        let z = b.add_customer(50.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.add_order(OrderSpec::new(z, 0, TimeWindow::new(3, 5)));
        b.build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance")
    }

    fn full_scheme(inst: &Instance) -> Scheme {
        let e = EquipmentIndex::new(0);
        let works = chain_work_orders(
            inst,
            e,
            &[
                (OrderIndex::new(0), TimeWindow::new(0, 3)),
                (OrderIndex::new(1), TimeWindow::new(3, 5)),
            ],
        );
        let lease = LeaseTerm::new(inst.equipment(e).rent(), TimeWindow::new(0, 5));
        Scheme::combined(e, [lease], works)
    }

    #[test]
    fn test_coefficients() {
        let inst = instance();
        let s = full_scheme(&inst);
        assert_eq!(s.cost(), 10.0);
        assert!(s.leases_slot(4));
        assert!(s.serves_slot(OrderIndex::new(0), 2));
        assert!(!s.serves_slot(OrderIndex::new(0), 3));
        assert_eq!(s.pieces(OrderIndex::new(1)), 1);
        assert_eq!(s.shift_begin(1, 5), 3);
        assert_eq!(s.shift_begin(2, 5), 5);
        assert_eq!(s.lease_segment(0), Some(0));
        assert_eq!(s.lease_end(1, 5), 5);
        assert_eq!(
            s.served_orders().as_slice(),
            &[OrderIndex::new(0), OrderIndex::new(1)]
        );
    }

    #[test]
    fn test_identity_is_structural() {
        let inst = instance();
        let a = full_scheme(&inst);
        let b = full_scheme(&inst);
        assert_eq!(a, b);
        let null = Scheme::null(EquipmentIndex::new(0), Family::Combined);
        assert_ne!(a, null);
        assert_ne!(
            Scheme::null(EquipmentIndex::new(0), Family::Lease),
            Scheme::null(EquipmentIndex::new(0), Family::Work)
        );
    }

    #[test]
    fn test_plan_round_trip() {
        let inst = instance();
        let s = full_scheme(&inst);
        let plan = s.to_plan();
        let back = Scheme::from_plan(s.equipment(), Family::Combined, &plan);
        assert_eq!(s, back);
        let lease_only = Scheme::from_plan(s.equipment(), Family::Lease, &plan);
        assert!(lease_only.works().is_empty());
        assert_eq!(lease_only.cost(), 10.0);
    }
}
