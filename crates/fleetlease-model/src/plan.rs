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

//! Concrete lease terms and shifts of one equipment unit.
//!
//! Both types compare and hash by structure only (windows, orders, sequence
//! position); the derived cost fields follow from the structure and the
//! instance, so two entries that look the same are the same.

use crate::{
    index::{EquipmentIndex, OrderIndex},
    model::Instance,
    rent::RentFunction,
};
use fleetlease_core::math::window::TimeWindow;

/// A rental interval bound to the rent segment that prices it.
#[derive(Debug, Clone, Copy)]
pub struct LeaseTerm {
    window: TimeWindow,
    segment: usize,
    cost: f64,
}

impl LeaseTerm {
    /// Prices `window` with `rent`.
    #[inline]
    pub fn new(rent: &RentFunction, window: TimeWindow) -> Self {
        Self {
            window,
            segment: rent.segment_of(window.len()).unwrap_or(0),
            cost: rent.rent(window.len()),
        }
    }

    #[inline]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    #[inline]
    pub fn segment(&self) -> usize {
        self.segment
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }
}

impl PartialEq for LeaseTerm {
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window && self.segment == other.segment
    }
}

impl Eq for LeaseTerm {}

impl std::hash::Hash for LeaseTerm {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.window.hash(state);
        self.segment.hash(state);
    }
}

impl std::fmt::Display for LeaseTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lease {} seg {} cost {:.2}", self.window, self.segment, self.cost)
    }
}

/// The entity a shift moves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predecessor {
    /// The first shift starts at the unit itself.
    Equipment,
    Order(OrderIndex),
}

impl Predecessor {
    #[inline]
    pub fn order(&self) -> Option<OrderIndex> {
        match self {
            Predecessor::Equipment => None,
            Predecessor::Order(j) => Some(*j),
        }
    }
}

/// One shift: an equipment unit serving one order over a window.
#[derive(Debug, Clone, Copy)]
pub struct WorkOrder {
    order: OrderIndex,
    window: TimeWindow,
    sequence: usize,
    predecessor: Predecessor,
    travel_cost: f64,
    fixed_cost: f64,
}

impl WorkOrder {
    /// Creates the shift and derives its travel and fixed costs.
    pub fn new(
        instance: &Instance,
        equipment: EquipmentIndex,
        order: OrderIndex,
        window: TimeWindow,
        sequence: usize,
        predecessor: Predecessor,
    ) -> Self {
        Self {
            order,
            window,
            sequence,
            predecessor,
            travel_cost: instance.travel_cost(equipment, predecessor.order(), order),
            fixed_cost: instance.fixed_cost(order, window),
        }
    }

    #[inline]
    pub fn order(&self) -> OrderIndex {
        self.order
    }

    #[inline]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Zero-based position in the unit's chain of shifts.
    #[inline]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    #[inline]
    pub fn predecessor(&self) -> Predecessor {
        self.predecessor
    }

    #[inline]
    pub fn travel_cost(&self) -> f64 {
        self.travel_cost
    }

    #[inline]
    pub fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }

    /// Travel plus fixed cost.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.travel_cost + self.fixed_cost
    }
}

impl PartialEq for WorkOrder {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
            && self.window == other.window
            && self.sequence == other.sequence
            && self.predecessor == other.predecessor
    }
}

impl Eq for WorkOrder {}

impl std::hash::Hash for WorkOrder {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.order.hash(state);
        self.window.hash(state);
        self.sequence.hash(state);
        self.predecessor.hash(state);
    }
}

impl std::fmt::Display for WorkOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} {} cost {:.2}",
            self.sequence,
            self.order,
            self.window,
            self.cost()
        )
    }
}

/// Links `(order, window)` pairs into a chain of shifts, each preceded by
/// the one before it and the first by the unit itself.
pub fn chain_work_orders(
    instance: &Instance,
    equipment: EquipmentIndex,
    shifts: &[(OrderIndex, TimeWindow)],
) -> Vec<WorkOrder> {
    let mut previous = Predecessor::Equipment;
    shifts
        .iter()
        .enumerate()
        .map(|(sequence, &(order, window))| {
            let work = WorkOrder::new(instance, equipment, order, window, sequence, previous);
            previous = Predecessor::Order(order);
            work
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::CustomerIndex,
        location::Location,
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentSegment,
    };

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(10);
        b.add_equipment(
            EquipmentSpec::new(0, TimeWindow::new(0, 10), RentFunction::flat(4.0, 10))
                .with_location(Location::new(0.0, 0.0)),
        );
        let c = b.add_customer(30.0);
        assert_eq!(c, CustomerIndex::new(0));
        b.add_order(
            OrderSpec::new(c, 0, TimeWindow::new(0, 3)).with_location(Location::new(0.0, 1.0)),
        );
        b.add_order(
            OrderSpec::new(c, 0, TimeWindow::new(5, 9)).with_location(Location::new(0.0, 4.0)),
        );
        b.build(&ModelOptions::default()).expect("valid instance")
    }

    #[test]
    fn test_lease_term_uses_segment_pricing() {
        let rent = RentFunction::new([RentSegment::new(2.0, 1.0, 3), RentSegment::new(1.0, 4.0, 9)])
            .expect("valid rent");
        let term = LeaseTerm::new(&rent, TimeWindow::new(2, 7));
        assert_eq!(term.segment(), 1);
        assert_eq!(term.cost(), 9.0);
    }

    #[test]
    fn test_chain_links_predecessors_and_costs() {
        let inst = instance();
        let e = EquipmentIndex::new(0);
        let chain = chain_work_orders(
            &inst,
            e,
            &[
                (OrderIndex::new(0), TimeWindow::new(0, 3)),
                (OrderIndex::new(1), TimeWindow::new(5, 9)),
            ],
        );
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].predecessor(), Predecessor::Equipment);
        assert_eq!(chain[0].travel_cost(), 1.0 + 2.0);
        assert_eq!(chain[1].predecessor(), Predecessor::Order(OrderIndex::new(0)));
        assert_eq!(chain[1].travel_cost(), 3.0 + 2.0);
        assert_eq!(chain[1].sequence(), 1);
    }

    #[test]
    fn test_structural_equality() {
        let inst = instance();
        let e = EquipmentIndex::new(0);
        let a = WorkOrder::new(
            &inst,
            e,
            OrderIndex::new(0),
            TimeWindow::new(0, 3),
            0,
            Predecessor::Equipment,
        );
        let b = a;
        assert_eq!(a, b);
        let c = WorkOrder::new(
            &inst,
            e,
            OrderIndex::new(0),
            TimeWindow::new(0, 3),
            1,
            Predecessor::Order(OrderIndex::new(1)),
        );
        assert_ne!(a, c);
    }
}
