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

//! # Branch Constraints
//!
//! Every decision taken on the path from the root to a node is stored as one
//! `BranchConstraint`. A constraint is the single source of truth for its own
//! meaning: `admits` answers whether a scheme is compatible with it, and the
//! column filter, the pricing restrictions and the final acceptance of new
//! columns all go through that answer. Constraints on master variables that
//! no single column can decide (accepting a customer, lower split limits
//! across units) are additionally enforced by the master rows and bounds.

use crate::scheme::Scheme;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::{
    index::{CustomerIndex, EquipmentIndex, OrderIndex},
    model::Instance,
};

/// Direction of a bound on an integer-valued quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    /// `value <= bound`
    AtMost(usize),
    /// `value >= bound`
    AtLeast(usize),
}

impl Bound {
    #[inline]
    pub fn holds(&self, value: usize) -> bool {
        match *self {
            Bound::AtMost(b) => value <= b,
            Bound::AtLeast(b) => value >= b,
        }
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::AtMost(b) => write!(f, "<= {}", b),
            Bound::AtLeast(b) => write!(f, ">= {}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchConstraint {
    /// Customer acceptance `Z_p` fixed to 0 or 1.
    Customer { customer: CustomerIndex, accept: bool },
    /// Instance acceptance `v_j` of a flexible order fixed to 0 or 1.
    Instance { order: OrderIndex, accept: bool },
    /// Bound on the total number of shifts serving `order`.
    Split { order: OrderIndex, bound: Bound },
    /// Whether `equipment` serves `order` at all.
    Service {
        equipment: EquipmentIndex,
        order: OrderIndex,
        serve: bool,
    },
    /// Whether `equipment` serves `order` over exactly `window`.
    Shift {
        equipment: EquipmentIndex,
        order: OrderIndex,
        window: TimeWindow,
        assign: bool,
    },
    /// Bound on the begin of the shift at `position`; a missing shift begins at the horizon.
    ShiftBegin {
        equipment: EquipmentIndex,
        position: usize,
        bound: Bound,
    },
    /// Bound on the end of the shift at `position`; a missing shift ends at the horizon.
    ShiftEnd {
        equipment: EquipmentIndex,
        position: usize,
        bound: Bound,
    },
    /// Whether `equipment` serves `order` in period `slot`.
    Slot {
        equipment: EquipmentIndex,
        order: OrderIndex,
        slot: usize,
        serve: bool,
    },
    /// Whether `equipment` is leased in period `slot`.
    LeaseSlot {
        equipment: EquipmentIndex,
        slot: usize,
        leased: bool,
    },
    LeaseBegin {
        equipment: EquipmentIndex,
        position: usize,
        bound: Bound,
    },
    LeaseEnd {
        equipment: EquipmentIndex,
        position: usize,
        bound: Bound,
    },
    /// Whether the lease term at `position` is priced by rent segment `segment`.
    LeaseSegment {
        equipment: EquipmentIndex,
        position: usize,
        segment: usize,
        fixed: bool,
    },
}

impl BranchConstraint {
    /// The unit this constraint is local to, if any.
    #[inline]
    pub fn equipment(&self) -> Option<EquipmentIndex> {
        match *self {
            BranchConstraint::Customer { .. }
            | BranchConstraint::Instance { .. }
            | BranchConstraint::Split { .. } => None,
            BranchConstraint::Service { equipment, .. }
            | BranchConstraint::Shift { equipment, .. }
            | BranchConstraint::ShiftBegin { equipment, .. }
            | BranchConstraint::ShiftEnd { equipment, .. }
            | BranchConstraint::Slot { equipment, .. }
            | BranchConstraint::LeaseSlot { equipment, .. }
            | BranchConstraint::LeaseBegin { equipment, .. }
            | BranchConstraint::LeaseEnd { equipment, .. }
            | BranchConstraint::LeaseSegment { equipment, .. } => Some(equipment),
        }
    }

    /// `true` for constraints on lease-family columns.
    #[inline]
    pub fn is_lease(&self) -> bool {
        matches!(
            self,
            BranchConstraint::LeaseSlot { .. }
                | BranchConstraint::LeaseBegin { .. }
                | BranchConstraint::LeaseEnd { .. }
                | BranchConstraint::LeaseSegment { .. }
        )
    }

    /// `true` if a column of `scheme`'s unit and family is compatible with this constraint.
    pub fn admits(&self, instance: &Instance, scheme: &Scheme) -> bool {
        if let Some(e) = self.equipment()
            && e != scheme.equipment()
        {
            return true;
        }
        if self.is_lease() {
            if !scheme.family().has_leases() || scheme.family().has_works() {
                return true;
            }
        } else if !scheme.family().has_works() {
            return true;
        }
        let horizon = instance.horizon();
        match *self {
            BranchConstraint::Customer { customer, accept } => {
                accept
                    || !scheme
                        .works()
                        .iter()
                        .any(|w| instance.order(w.order()).customer() == customer)
            }
            BranchConstraint::Instance { order, accept } => {
                if accept {
                    !scheme
                        .works()
                        .iter()
                        .any(|w| w.order() != order && instance.siblings(order).contains(&w.order()))
                } else {
                    !scheme.serves(order)
                }
            }
            BranchConstraint::Split { order, bound } => match bound {
                Bound::AtMost(b) => scheme.pieces(order) <= b,
                Bound::AtLeast(b) => scheme
                    .works()
                    .iter()
                    .filter(|w| w.order() == order)
                    .all(|w| piece_limit(instance, order, w.window()) >= b),
            },
            BranchConstraint::Service { order, serve, .. } => scheme.serves(order) == serve,
            BranchConstraint::Shift {
                order,
                window,
                assign,
                ..
            } => scheme.has_shift(order, window) == assign,
            BranchConstraint::ShiftBegin {
                position, bound, ..
            } => bound.holds(scheme.shift_begin(position, horizon)),
            BranchConstraint::ShiftEnd {
                position, bound, ..
            } => bound.holds(scheme.shift_end(position, horizon)),
            BranchConstraint::Slot {
                order, slot, serve, ..
            } => scheme.serves_slot(order, slot) == serve,
            BranchConstraint::LeaseSlot { slot, leased, .. } => scheme.leases_slot(slot) == leased,
            BranchConstraint::LeaseBegin {
                position, bound, ..
            } => bound.holds(scheme.lease_begin(position, horizon)),
            BranchConstraint::LeaseEnd {
                position, bound, ..
            } => bound.holds(scheme.lease_end(position, horizon)),
            BranchConstraint::LeaseSegment {
                position,
                segment,
                fixed,
                ..
            } => (scheme.lease_segment(position) == Some(segment)) == fixed,
        }
    }
}

/// The largest number of pieces `order` can be split into when `window` is one of them.
#[inline]
pub fn piece_limit(instance: &Instance, order: OrderIndex, window: TimeWindow) -> usize {
    instance
        .order(order)
        .work_windows()
        .iter()
        .find(|w| w.window == window)
        .map_or(1, |w| w.max_pieces)
}

impl std::fmt::Display for BranchConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchConstraint::Customer { customer, accept } => {
                write!(f, "Z[{}] = {}", customer, *accept as u8)
            }
            BranchConstraint::Instance { order, accept } => {
                write!(f, "V[{}] = {}", order, *accept as u8)
            }
            BranchConstraint::Split { order, bound } => write!(f, "N[{}] {}", order, bound),
            BranchConstraint::Service {
                equipment,
                order,
                serve,
            } => write!(f, "S[{}, {}] = {}", equipment, order, *serve as u8),
            BranchConstraint::Shift {
                equipment,
                order,
                window,
                assign,
            } => write!(
                f,
                "X[{}, {}, {}] = {}",
                equipment, order, window, *assign as u8
            ),
            BranchConstraint::ShiftBegin {
                equipment,
                position,
                bound,
            } => write!(f, "HB[{}, {}] {}", equipment, position, bound),
            BranchConstraint::ShiftEnd {
                equipment,
                position,
                bound,
            } => write!(f, "HE[{}, {}] {}", equipment, position, bound),
            BranchConstraint::Slot {
                equipment,
                order,
                slot,
                serve,
            } => write!(f, "Y[{}, {}, {}] = {}", equipment, order, slot, *serve as u8),
            BranchConstraint::LeaseSlot {
                equipment,
                slot,
                leased,
            } => write!(f, "L[{}, {}] = {}", equipment, slot, *leased as u8),
            BranchConstraint::LeaseBegin {
                equipment,
                position,
                bound,
            } => write!(f, "TB[{}, {}] {}", equipment, position, bound),
            BranchConstraint::LeaseEnd {
                equipment,
                position,
                bound,
            } => write!(f, "TE[{}, {}] {}", equipment, position, bound),
            BranchConstraint::LeaseSegment {
                equipment,
                position,
                segment,
                fixed,
            } => write!(
                f,
                "Gamma[{}, {}, {}] = {}",
                equipment, position, segment, *fixed as u8
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::Family;
    use fleetlease_model::{
        model::{EquipmentSpec, FlexibleWindow, InstanceBuilder, ModelOptions, OrderSpec},
        plan::{LeaseTerm, chain_work_orders},
        rent::{RentFunction, RentSegment},
    };

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(8);
        let rent = RentFunction::new([RentSegment::new(0.0, 4.0, 3), RentSegment::new(1.0, 2.0, 8)])
            .expect("valid rent");
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 8), rent));
        let a = b.add_customer(20.0);
        let z = b.add_customer(20.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.add_order(OrderSpec::flexible(z, 0, FlexibleWindow::new(3, 8, 4)));
        b.build(&ModelOptions::default()).expect("valid instance")
    }

    fn scheme(inst: &Instance) -> Scheme {
        let e = EquipmentIndex::new(0);
        let works = chain_work_orders(
            inst,
            e,
            &[
                (OrderIndex::new(0), TimeWindow::new(0, 3)),
                (OrderIndex::new(1), TimeWindow::new(3, 7)),
            ],
        );
        Scheme::work(e, works)
    }

    #[test]
    fn test_customer_and_instance_constraints() {
        let inst = instance();
        let s = scheme(&inst);
        let reject_a = BranchConstraint::Customer {
            customer: CustomerIndex::new(0),
            accept: false,
        };
        assert!(!reject_a.admits(&inst, &s));
        let accept_sibling = BranchConstraint::Instance {
            order: OrderIndex::new(2),
            accept: true,
        };
        assert!(!accept_sibling.admits(&inst, &s));
        let accept_own = BranchConstraint::Instance {
            order: OrderIndex::new(1),
            accept: true,
        };
        assert!(accept_own.admits(&inst, &s));
    }

    #[test]
    fn test_positional_constraints_treat_missing_as_horizon() {
        let inst = instance();
        let s = scheme(&inst);
        let e = EquipmentIndex::new(0);
        let third_early = BranchConstraint::ShiftBegin {
            equipment: e,
            position: 2,
            bound: Bound::AtMost(5),
        };
        assert!(!third_early.admits(&inst, &s));
        let third_late = BranchConstraint::ShiftBegin {
            equipment: e,
            position: 2,
            bound: Bound::AtLeast(6),
        };
        assert!(third_late.admits(&inst, &s));
        let second_end = BranchConstraint::ShiftEnd {
            equipment: e,
            position: 1,
            bound: Bound::AtMost(7),
        };
        assert!(second_end.admits(&inst, &s));
    }

    #[test]
    fn test_lease_constraints_only_touch_lease_family() {
        let inst = instance();
        let e = EquipmentIndex::new(0);
        let rent = inst.equipment(e).rent();
        let lease = Scheme::lease(e, [LeaseTerm::new(rent, TimeWindow::new(0, 5))]);
        let seg0 = BranchConstraint::LeaseSegment {
            equipment: e,
            position: 0,
            segment: 0,
            fixed: true,
        };
        assert!(!seg0.admits(&inst, &lease));
        assert!(seg0.admits(&inst, &scheme(&inst)));
        let slot = BranchConstraint::LeaseSlot {
            equipment: e,
            slot: 6,
            leased: false,
        };
        assert!(slot.admits(&inst, &lease));
        assert!(slot.admits(&inst, &Scheme::null(e, Family::Lease)));
        let other_unit = BranchConstraint::LeaseSlot {
            equipment: EquipmentIndex::new(3),
            slot: 0,
            leased: true,
        };
        assert!(other_unit.admits(&inst, &lease));
    }

    #[test]
    fn test_display() {
        let c = BranchConstraint::Split {
            order: OrderIndex::new(4),
            bound: Bound::AtLeast(2),
        };
        assert_eq!(c.to_string(), "N[OrderIndex(4)] >= 2");
    }
}
