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

//! # Primal Heuristics and Bounds
//!
//! - `greedy`: the LP-free upper bound of a node, and the insertion
//!   heuristic that seeds the root with columns and a first incumbent.
//! - `repair`: majority rounding of a fractional master solution into a
//!   feasible plan.
//!
//! Both heuristics build plans on [`UnitSchedule`]s, which track the free
//! periods of a unit and price a tentative set of extra shifts exactly: the
//! shifts are chained in time order and covered by the cheapest admissible
//! lease.

pub mod greedy;
pub mod repair;

use crate::lease::dp::{LeasePlan, cheapest_cover};
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::{
    index::{EquipmentIndex, OrderIndex},
    model::Instance,
    plan::chain_work_orders,
    solution::EquipmentPlan,
};
use rangemap::RangeSet;

/// The shifts committed to one unit so far.
#[derive(Debug, Clone)]
pub(crate) struct UnitSchedule {
    equipment: EquipmentIndex,
    free: RangeSet<usize>,
    shifts: Vec<(OrderIndex, TimeWindow)>,
    cost: f64,
    plan: EquipmentPlan,
}

/// A priced extension of a [`UnitSchedule`].
#[derive(Debug, Clone)]
pub(crate) struct Extension {
    shifts: Vec<(OrderIndex, TimeWindow)>,
    cost: f64,
    plan: EquipmentPlan,
}

impl Extension {
    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }
}

impl UnitSchedule {
    pub fn new(instance: &Instance, equipment: EquipmentIndex) -> Self {
        let window = instance.equipment(equipment).window();
        let mut free = RangeSet::new();
        if !window.is_empty() {
            free.insert(window.begin()..window.end());
        }
        Self {
            equipment,
            free,
            shifts: Vec::new(),
            cost: 0.0,
            plan: EquipmentPlan::default(),
        }
    }

    #[inline]
    pub fn equipment(&self) -> EquipmentIndex {
        self.equipment
    }

    /// Rent and schedule cost of the committed shifts.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[inline]
    pub fn num_shifts(&self) -> usize {
        self.shifts.len()
    }

    /// `true` if every period of `window` is available and unused.
    #[inline]
    pub fn is_free(&self, window: TimeWindow) -> bool {
        window.is_empty() || self.free.gaps(&(window.begin()..window.end())).next().is_none()
    }

    /// Prices the committed shifts together with `extra`. Returns `None` if
    /// no lease with at most the unit's number of terms covers them.
    pub fn extend(&self, instance: &Instance, extra: &[(OrderIndex, TimeWindow)]) -> Option<Extension> {
        let unit = instance.equipment(self.equipment);
        let mut shifts = Vec::with_capacity(self.shifts.len() + extra.len());
        shifts.extend_from_slice(&self.shifts);
        shifts.extend_from_slice(extra);
        shifts.sort_by_key(|&(j, w)| (w.begin(), w.end(), j));
        if shifts.len() > unit.max_shifts() {
            return None;
        }
        let cover: LeasePlan = cheapest_cover(
            unit.rent(),
            unit.window(),
            unit.max_lease_terms(),
            shifts.iter().map(|&(_, w)| w),
        )?;
        let works = chain_work_orders(instance, self.equipment, &shifts);
        let plan = EquipmentPlan::new(cover.lease_terms(unit.rent()), works);
        let cost = plan.rent_cost() + plan.schedule_cost();
        Some(Extension { shifts, cost, plan })
    }

    /// Adopts a priced extension.
    pub fn commit(&mut self, extension: Extension) {
        for &(_, w) in &extension.shifts {
            self.free.remove(w.begin()..w.end());
        }
        self.shifts = extension.shifts;
        self.cost = extension.cost;
        self.plan = extension.plan;
    }

    #[inline]
    pub fn plan(&self) -> &EquipmentPlan {
        &self.plan
    }

    #[inline]
    pub fn into_plan(self) -> EquipmentPlan {
        self.plan
    }
}
