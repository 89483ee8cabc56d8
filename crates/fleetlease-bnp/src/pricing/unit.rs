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

//! Candidate shifts of one unit and the step that appends a shift to a chain.

use super::{PricingProblem, restrictions::UnitRestrictions};
use crate::{
    lease::dp::{LeasePlan, cheapest_cover},
    scheme::Scheme,
};
use fixedbitset::FixedBitSet;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::{
    index::OrderIndex,
    model::Equipment,
    plan::chain_work_orders,
};
use smallvec::SmallVec;

/// A shift window of an order with its dual value net of the fixed cost.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShiftCandidate {
    pub window: TimeWindow,
    pub core: f64,
}

/// One admissible way to append a shift to a chain.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub order: OrderIndex,
    pub window: TimeWindow,
    /// Core value minus the travel cost from the chain's last order.
    pub gain: f64,
    pub remaining: FixedBitSet,
    pub met: FixedBitSet,
}

pub(crate) struct UnitData<'a> {
    pub problem: PricingProblem<'a>,
    pub unit: &'a Equipment,
    pub rules: &'a UnitRestrictions,
    candidates: Vec<SmallVec<[ShiftCandidate; 4]>>,
    latest_begin: Vec<Option<usize>>,
    revisit: bool,
}

impl<'a> UnitData<'a> {
    pub fn new(problem: PricingProblem<'a>) -> Self {
        let instance = problem.instance;
        let i = problem.equipment;
        let unit = instance.equipment(i);
        let rules = problem.restrictions.unit(i);
        let mut candidates = vec![SmallVec::new(); instance.num_orders()];
        let mut latest_begin = vec![None; instance.num_orders()];
        for &j in unit.orders() {
            if rules.is_forbidden(j) {
                continue;
            }
            let list: SmallVec<[ShiftCandidate; 4]> = instance
                .work_windows_on(i, j)
                .map(|w| ShiftCandidate {
                    window: w.window,
                    core: problem.duals.shift_value(instance, i, j, w.window)
                        - instance.fixed_cost(j, w.window),
                })
                .collect();
            latest_begin[j.get()] = list.iter().map(|c| c.window.begin()).max();
            candidates[j.get()] = list;
        }
        Self {
            problem,
            unit,
            rules,
            candidates,
            latest_begin,
            revisit: instance.options().allow_revisit,
        }
    }

    #[inline]
    pub fn allows_revisit(&self) -> bool {
        self.revisit
    }

    #[inline]
    pub fn max_terms(&self) -> usize {
        self.unit.max_lease_terms()
    }

    /// Orders with a candidate shift at or after the start of availability.
    pub fn initial_remaining(&self) -> FixedBitSet {
        self.prune(FixedBitSet::with_capacity(self.candidates.len()), true, self.unit.window().begin())
    }

    fn prune(&self, mut remaining: FixedBitSet, fill: bool, clock: usize) -> FixedBitSet {
        for (j, latest) in self.latest_begin.iter().enumerate() {
            let keep = latest.is_some_and(|b| b >= clock) && (fill || remaining.contains(j));
            remaining.set(j, keep);
        }
        remaining
    }

    #[inline]
    pub fn initial_met(&self) -> FixedBitSet {
        FixedBitSet::with_capacity(self.rules.requirements().len())
    }

    /// `true` if every requirement of the unit is met.
    #[inline]
    pub fn is_complete(&self, met: &FixedBitSet) -> bool {
        met.count_ones(..) == self.rules.requirements().len()
    }

    #[inline]
    pub fn is_reachable(&self, shifts: usize, clock: usize) -> bool {
        self.rules
            .is_reachable(shifts, clock, self.problem.instance.horizon())
    }

    /// The largest travel cost out of `last` into any order of `remaining`.
    pub fn max_travel_from(&self, last: Option<OrderIndex>, remaining: &FixedBitSet) -> f64 {
        let instance = self.problem.instance;
        remaining
            .ones()
            .map(|j| instance.travel_cost(self.problem.equipment, last, OrderIndex::new(j)))
            .fold(0.0, f64::max)
    }

    /// Every admissible shift that can follow a chain.
    pub fn steps(
        &self,
        clock: usize,
        remaining: &FixedBitSet,
        last: Option<OrderIndex>,
        shifts: &[(OrderIndex, TimeWindow)],
        met: &FixedBitSet,
    ) -> Vec<Step> {
        let position = shifts.len();
        if position >= self.unit.max_shifts() {
            return Vec::new();
        }
        let instance = self.problem.instance;
        let i = self.problem.equipment;
        let mut steps = Vec::new();
        for j in remaining.ones() {
            let order = OrderIndex::new(j);
            let pieces = shifts.iter().filter(|(o, _)| *o == order).count();
            let travel = instance.travel_cost(i, last, order);
            for c in self.candidates[j].iter().filter(|c| c.window.begin() >= clock) {
                if !self.problem.restrictions.admits_shift(
                    instance, i, order, c.window, position, pieces,
                ) {
                    continue;
                }
                let end = c.window.end();
                if !self.is_reachable(position + 1, end) {
                    continue;
                }
                let mut next = remaining.clone();
                if !self.revisit {
                    next.set(j, false);
                }
                for &s in instance.siblings(order) {
                    if s != order {
                        next.set(s.get(), false);
                    }
                }
                let next = self.prune(next, false, end);
                let mut now_met = met.clone();
                for (k, r) in self.rules.requirements().iter().enumerate() {
                    if r.is_met_by(order, c.window, position) {
                        now_met.insert(k);
                    }
                }
                steps.push(Step {
                    order,
                    window: c.window,
                    gain: c.core - travel,
                    remaining: next,
                    met: now_met,
                });
            }
        }
        steps
    }

    /// The cheapest admissible lease covering `shifts`.
    #[inline]
    pub fn cover(&self, shifts: &[(OrderIndex, TimeWindow)]) -> Option<LeasePlan> {
        cheapest_cover(
            self.unit.rent(),
            self.unit.window(),
            self.max_terms(),
            shifts.iter().map(|&(_, w)| w),
        )
    }

    /// Materializes a chain, with the lease of `plan` when given.
    pub fn scheme(&self, shifts: &[(OrderIndex, TimeWindow)], plan: Option<&LeasePlan>) -> Scheme {
        let i = self.problem.equipment;
        let works = chain_work_orders(self.problem.instance, i, shifts);
        match plan {
            Some(plan) => Scheme::combined(i, plan.lease_terms(self.unit.rent()), works),
            None => Scheme::work(i, works),
        }
    }
}
