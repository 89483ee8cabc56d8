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

//! # Node Restrictions
//!
//! The branch constraints on the path to a node, compiled once per node into
//! the forms the master problem and the pricing algorithms consume:
//!
//! - fixed acceptance of customers and flexible instances, and tightest split
//!   bounds per order (master bounds and rows),
//! - per-unit checks applied to every single shift while a chain is built,
//! - per-unit requirements a finished chain has to meet,
//! - lease rules and fixed lease periods for the lease-term program.
//!
//! The per-shift checks are necessary conditions only. Every finished scheme is
//! still passed through [`Restrictions::admits`], which asks each constraint.

use crate::{
    branching::constraint::{Bound, BranchConstraint, piece_limit},
    lease::dp::{LeaseRules, LeaseTermDp},
    scheme::Scheme,
};
use fixedbitset::FixedBitSet;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::{
    index::{CustomerIndex, EquipmentIndex, OrderIndex},
    model::Instance,
};
use smallvec::SmallVec;

/// Something a unit's chain of shifts must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Some shift serves the order.
    Order(OrderIndex),
    /// A shift serves the order over exactly this window.
    Shift(OrderIndex, TimeWindow),
    /// A shift serves the order in this period.
    Slot(OrderIndex, usize),
    /// A shift exists at this position.
    Position(usize),
}

impl Requirement {
    /// `true` if placing `(order, window)` at `position` meets this requirement.
    #[inline]
    pub fn is_met_by(&self, order: OrderIndex, window: TimeWindow, position: usize) -> bool {
        match *self {
            Requirement::Order(j) => j == order,
            Requirement::Shift(j, w) => j == order && w == window,
            Requirement::Slot(j, t) => j == order && window.contains_slot(t),
            Requirement::Position(p) => p == position,
        }
    }
}

/// Branch decisions local to one unit.
#[derive(Debug, Clone)]
pub struct UnitRestrictions {
    forbidden: FixedBitSet,
    forbidden_shifts: SmallVec<[(OrderIndex, TimeWindow); 4]>,
    forbidden_slots: SmallVec<[(OrderIndex, usize); 4]>,
    shift_begin: SmallVec<[(usize, Bound); 2]>,
    shift_end: SmallVec<[(usize, Bound); 2]>,
    requirements: Vec<Requirement>,
    lease_rules: LeaseRules,
    leased_slots: SmallVec<[usize; 4]>,
    unleased_slots: SmallVec<[usize; 4]>,
}

impl UnitRestrictions {
    fn new(num_orders: usize, horizon: usize) -> Self {
        Self {
            forbidden: FixedBitSet::with_capacity(num_orders),
            forbidden_shifts: SmallVec::new(),
            forbidden_slots: SmallVec::new(),
            shift_begin: SmallVec::new(),
            shift_end: SmallVec::new(),
            requirements: Vec::new(),
            lease_rules: LeaseRules::new(horizon),
            leased_slots: SmallVec::new(),
            unleased_slots: SmallVec::new(),
        }
    }

    #[inline]
    pub fn is_forbidden(&self, order: OrderIndex) -> bool {
        self.forbidden.contains(order.get())
    }

    #[inline]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// `true` if a shift position is bounded, so chains of different lengths
    /// are not comparable.
    #[inline]
    pub fn has_positional_rules(&self) -> bool {
        !self.shift_begin.is_empty() || !self.shift_end.is_empty()
    }

    #[inline]
    pub fn lease_rules(&self) -> &LeaseRules {
        &self.lease_rules
    }

    /// `true` if lease columns of this unit are restricted in any way.
    #[inline]
    pub fn restricts_leases(&self) -> bool {
        !self.lease_rules.is_empty()
            || !self.leased_slots.is_empty()
            || !self.unleased_slots.is_empty()
    }

    /// Copies the fixed lease periods into `dp`.
    pub fn apply_lease_slots(&self, dp: &mut LeaseTermDp<'_>) {
        for &t in &self.leased_slots {
            dp.require_slot(t);
        }
        for &t in &self.unleased_slots {
            dp.forbid_slot(t);
        }
    }

    #[inline]
    pub fn leased_slots(&self) -> &[usize] {
        &self.leased_slots
    }

    #[inline]
    pub fn unleased_slots(&self) -> &[usize] {
        &self.unleased_slots
    }

    /// `true` if a chain with `shifts` shifts and its clock at `clock` can
    /// still satisfy every upper bound on a missing position.
    pub fn is_reachable(&self, shifts: usize, clock: usize, horizon: usize) -> bool {
        let begin_ok = self.shift_begin.iter().all(|&(p, b)| match b {
            Bound::AtMost(v) if p >= shifts && v < horizon => clock <= v,
            _ => true,
        });
        let end_ok = self.shift_end.iter().all(|&(p, b)| match b {
            Bound::AtMost(v) if p >= shifts && v < horizon => clock < v,
            _ => true,
        });
        begin_ok && end_ok
    }

    fn admits_position(&self, position: usize, window: TimeWindow) -> bool {
        self.shift_begin
            .iter()
            .filter(|(p, _)| *p == position)
            .all(|(_, b)| b.holds(window.begin()))
            && self
                .shift_end
                .iter()
                .filter(|(p, _)| *p == position)
                .all(|(_, b)| b.holds(window.end()))
    }
}

/// All branch decisions of one node in compiled form.
#[derive(Debug, Clone)]
pub struct Restrictions {
    constraints: Vec<BranchConstraint>,
    customer: Vec<Option<bool>>,
    instance: Vec<Option<bool>>,
    split_upper: Vec<Option<usize>>,
    split_lower: Vec<usize>,
    units: Vec<UnitRestrictions>,
}

impl Restrictions {
    /// Compiles the constraints on a path from the root. Customers rejected at
    /// preprocessing are fixed to 0 in every node.
    pub fn compile(instance: &Instance, constraints: &[BranchConstraint]) -> Self {
        let num_orders = instance.num_orders();
        let horizon = instance.horizon();
        let mut r = Self {
            constraints: constraints.to_vec(),
            customer: vec![None; instance.num_customers()],
            instance: vec![None; num_orders],
            split_upper: vec![None; num_orders],
            split_lower: vec![0; num_orders],
            units: (0..instance.num_equipment())
                .map(|_| UnitRestrictions::new(num_orders, horizon))
                .collect(),
        };

        for p in instance.rejected_customers() {
            r.customer[p.get()] = Some(false);
        }
        for c in constraints {
            r.record(instance, *c);
        }

        for order in instance.orders() {
            let j = order.index();
            let closed = r.customer[order.customer().get()] == Some(false)
                || r.instance[j.get()] == Some(false)
                || r.split_upper[j.get()] == Some(0);
            if closed {
                for unit in &mut r.units {
                    unit.forbidden.insert(j.get());
                }
            }
        }
        r
    }

    fn record(&mut self, instance: &Instance, constraint: BranchConstraint) {
        match constraint {
            BranchConstraint::Customer { customer, accept } => {
                self.customer[customer.get()] = Some(accept);
            }
            BranchConstraint::Instance { order, accept } => {
                self.instance[order.get()] = Some(accept);
                if accept {
                    for &s in instance.siblings(order) {
                        if s != order {
                            self.instance[s.get()] = Some(false);
                        }
                    }
                }
            }
            BranchConstraint::Split { order, bound } => match bound {
                Bound::AtMost(b) => {
                    let slot = &mut self.split_upper[order.get()];
                    *slot = Some(slot.map_or(b, |u| u.min(b)));
                }
                Bound::AtLeast(b) => {
                    let slot = &mut self.split_lower[order.get()];
                    *slot = (*slot).max(b);
                }
            },
            BranchConstraint::Service {
                equipment,
                order,
                serve,
            } => {
                let unit = &mut self.units[equipment.get()];
                if serve {
                    unit.requirements.push(Requirement::Order(order));
                } else {
                    unit.forbidden.insert(order.get());
                }
            }
            BranchConstraint::Shift {
                equipment,
                order,
                window,
                assign,
            } => {
                let unit = &mut self.units[equipment.get()];
                if assign {
                    unit.requirements.push(Requirement::Shift(order, window));
                } else {
                    unit.forbidden_shifts.push((order, window));
                }
            }
            BranchConstraint::ShiftBegin {
                equipment,
                position,
                bound,
            } => {
                let horizon = instance.horizon();
                let unit = &mut self.units[equipment.get()];
                unit.shift_begin.push((position, bound));
                if !bound.holds(horizon) {
                    unit.requirements.push(Requirement::Position(position));
                }
            }
            BranchConstraint::ShiftEnd {
                equipment,
                position,
                bound,
            } => {
                let horizon = instance.horizon();
                let unit = &mut self.units[equipment.get()];
                unit.shift_end.push((position, bound));
                if !bound.holds(horizon) {
                    unit.requirements.push(Requirement::Position(position));
                }
            }
            BranchConstraint::Slot {
                equipment,
                order,
                slot,
                serve,
            } => {
                let unit = &mut self.units[equipment.get()];
                if serve {
                    unit.requirements.push(Requirement::Slot(order, slot));
                } else {
                    unit.forbidden_slots.push((order, slot));
                }
            }
            BranchConstraint::LeaseSlot {
                equipment,
                slot,
                leased,
            } => {
                let unit = &mut self.units[equipment.get()];
                if leased {
                    unit.leased_slots.push(slot);
                } else {
                    unit.unleased_slots.push(slot);
                }
            }
            BranchConstraint::LeaseBegin {
                equipment,
                position,
                bound,
            } => self.units[equipment.get()]
                .lease_rules
                .bound_begin(position, bound),
            BranchConstraint::LeaseEnd {
                equipment,
                position,
                bound,
            } => self.units[equipment.get()]
                .lease_rules
                .bound_end(position, bound),
            BranchConstraint::LeaseSegment {
                equipment,
                position,
                segment,
                fixed,
            } => self.units[equipment.get()]
                .lease_rules
                .fix_segment(position, segment, fixed),
        }
    }

    #[inline]
    pub fn constraints(&self) -> &[BranchConstraint] {
        &self.constraints
    }

    /// Fixed acceptance of `customer`, if any.
    #[inline]
    pub fn customer_fix(&self, customer: CustomerIndex) -> Option<bool> {
        self.customer[customer.get()]
    }

    /// Fixed acceptance of the flexible instance `order`, if any.
    #[inline]
    pub fn instance_fix(&self, order: OrderIndex) -> Option<bool> {
        self.instance[order.get()]
    }

    #[inline]
    pub fn split_upper(&self, order: OrderIndex) -> Option<usize> {
        self.split_upper[order.get()]
    }

    /// Lower split bound of `order`; 0 when unrestricted.
    #[inline]
    pub fn split_lower(&self, order: OrderIndex) -> usize {
        self.split_lower[order.get()]
    }

    #[inline]
    pub fn unit(&self, equipment: EquipmentIndex) -> &UnitRestrictions {
        &self.units[equipment.get()]
    }

    /// `true` if `customer` must be accepted.
    #[inline]
    pub fn is_forced(&self, customer: CustomerIndex) -> bool {
        self.customer[customer.get()] == Some(true)
    }

    /// `true` if `order` may not be served by any unit.
    #[inline]
    pub fn is_closed(&self, order: OrderIndex) -> bool {
        self.units
            .first()
            .is_some_and(|u| u.is_forbidden(order))
    }

    /// Necessary check for one shift of `order` over `window` placed at
    /// `position` on `equipment`, where `pieces` earlier shifts of the same
    /// order are already on the chain.
    pub fn admits_shift(
        &self,
        instance: &Instance,
        equipment: EquipmentIndex,
        order: OrderIndex,
        window: TimeWindow,
        position: usize,
        pieces: usize,
    ) -> bool {
        let unit = &self.units[equipment.get()];
        if unit.is_forbidden(order) {
            return false;
        }
        if self.split_upper[order.get()].is_some_and(|ub| pieces + 1 > ub) {
            return false;
        }
        let lb = self.split_lower[order.get()];
        if lb > 1 && piece_limit(instance, order, window) < lb {
            return false;
        }
        if unit
            .forbidden_shifts
            .iter()
            .any(|&(j, w)| j == order && w == window)
        {
            return false;
        }
        if unit
            .forbidden_slots
            .iter()
            .any(|&(j, t)| j == order && window.contains_slot(t))
        {
            return false;
        }
        unit.admits_position(position, window)
    }

    /// `true` if every constraint on the path admits `scheme`.
    pub fn admits(&self, instance: &Instance, scheme: &Scheme) -> bool {
        self.constraints
            .iter()
            .all(|c| c.admits(instance, scheme))
            && self.admits_preprocessing(instance, scheme)
    }

    fn admits_preprocessing(&self, instance: &Instance, scheme: &Scheme) -> bool {
        scheme.works().iter().all(|w| {
            self.customer[instance.order(w.order()).customer().get()] != Some(false)
        })
    }
}
