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

//! # Label Setting
//!
//! Builds chains of shifts for one unit as labels. A label records the clock
//! (end of its last shift), the orders that may still follow, the last order
//! (for travel), the shifts so far, the start of the open lease term, the
//! number of closed terms and the profit without the open term.
//!
//! Appending a shift either stretches the open term over the gap or closes
//! it at the clock and opens a new one at the shift begin. Labels are
//! settled in wavefronts, by clock (`ByTime`) or by number of shifts
//! (`ByOrder`), and discarded when dominated:
//!
//! 1. Same remaining orders, last order, open-term start and met
//!    requirements: `A` dominates `B` if it has no more terms, no more shifts
//!    (the same number when shift positions are bounded), an earlier or equal
//!    clock and no less profit, with and without its open term.
//! 2. Without revisits, among labels with the same clock and remaining
//!    orders: `A` dominates `B` if `A`'s profit minus the largest travel out
//!    of `A`'s last order into a remaining order is still no less than `B`'s.
//!    A `ByOrder` wave is split by clock before the rule is applied.
//!
//! Every settled label is also a candidate stop. For combined columns the
//! chain is priced with its cheapest covering lease from the lease-term
//! program once its value before rent beats the convexity dual.

use super::{
    ColumnCollector, PricingOracle, PricingProblem, PricingResult,
    unit::{Step, UnitData},
};
use crate::{config::LabelExtension, lease::dp::LeasePlan, scheme::Family};
use fixedbitset::FixedBitSet;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::index::OrderIndex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Labels settled between two polls of the stop condition.
const POLL_INTERVAL: usize = 256;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Label {
    clock: usize,
    remaining: FixedBitSet,
    last: Option<OrderIndex>,
    shifts: SmallVec<[(OrderIndex, TimeWindow); 4]>,
    open: Option<usize>,
    terms: usize,
    /// Shift gains minus the rent of closed terms.
    profit: f64,
    /// Shift gains only.
    gains: f64,
    met: FixedBitSet,
    counted: SmallVec<[u16; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LabelKey {
    remaining: FixedBitSet,
    last: Option<OrderIndex>,
    open: Option<usize>,
    met: FixedBitSet,
    counted: SmallVec<[u16; 4]>,
}

/// The fields dominance compares.
#[derive(Debug, Clone, Copy)]
struct Summary {
    clock: usize,
    terms: usize,
    shifts: usize,
    profit: f64,
    value: f64,
}

impl Summary {
    #[inline]
    fn dominates(&self, other: &Summary, positional: bool) -> bool {
        let shifts_ok = if positional {
            self.shifts == other.shifts
        } else {
            self.shifts <= other.shifts
        };
        self.terms <= other.terms
            && shifts_ok
            && self.clock <= other.clock
            && self.profit + EPSILON >= other.profit
            && self.value + EPSILON >= other.value
    }
}

/// Label-setting pricing for combined and schedule columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelPricing {
    extension: LabelExtension,
}

impl LabelPricing {
    #[inline]
    pub fn new(extension: LabelExtension) -> Self {
        Self { extension }
    }
}

struct Search<'a, 'c> {
    data: &'c UnitData<'a>,
    leases: bool,
    positional: bool,
    /// Orders whose piece count is bounded and may repeat on the chain.
    tracked: SmallVec<[OrderIndex; 4]>,
    covers: FxHashMap<SmallVec<[TimeWindow; 4]>, Option<LeasePlan>>,
}

impl<'a, 'c> Search<'a, 'c> {
    fn value(&self, label: &Label) -> f64 {
        match label.open {
            Some(s) => label.profit - self.data.unit.rent().rent(label.clock - s),
            None => label.profit,
        }
    }

    fn summary(&self, label: &Label) -> Summary {
        Summary {
            clock: label.clock,
            terms: label.terms,
            shifts: label.shifts.len(),
            profit: label.profit,
            value: self.value(label),
        }
    }

    fn key(label: &Label) -> LabelKey {
        LabelKey {
            remaining: label.remaining.clone(),
            last: label.last,
            open: label.open,
            met: label.met.clone(),
            counted: label.counted.clone(),
        }
    }

    fn root(&self) -> Label {
        Label {
            clock: self.data.unit.window().begin(),
            remaining: self.data.initial_remaining(),
            last: None,
            shifts: SmallVec::new(),
            open: None,
            terms: 0,
            profit: 0.0,
            gains: 0.0,
            met: self.data.initial_met(),
            counted: SmallVec::from_elem(0, self.tracked.len()),
        }
    }

    fn children(&self, label: &Label) -> Vec<Label> {
        let steps = self.data.steps(
            label.clock,
            &label.remaining,
            label.last,
            &label.shifts,
            &label.met,
        );
        let mut out = Vec::with_capacity(steps.len());
        for step in steps {
            let Step {
                order,
                window,
                gain,
                remaining,
                met,
            } = step;
            let mut shifts = label.shifts.clone();
            shifts.push((order, window));
            let mut counted = label.counted.clone();
            if let Some(k) = self.tracked.iter().position(|&o| o == order) {
                counted[k] = counted[k].saturating_add(1);
            }
            let child = Label {
                clock: window.end(),
                remaining,
                last: Some(order),
                shifts,
                open: label.open,
                terms: label.terms,
                profit: label.profit + gain,
                gains: label.gains + gain,
                met,
                counted,
            };
            if !self.leases {
                out.push(child);
                continue;
            }
            match label.open {
                None => {
                    if self.data.max_terms() >= 1 {
                        out.push(Label {
                            open: Some(window.begin()),
                            ..child
                        });
                    }
                }
                Some(s) => {
                    if label.terms + 2 <= self.data.max_terms() {
                        let rent = self.data.unit.rent().rent(label.clock - s);
                        out.push(Label {
                            open: Some(window.begin()),
                            terms: label.terms + 1,
                            profit: child.profit - rent,
                            ..child.clone()
                        });
                    }
                    out.push(child);
                }
            }
        }
        out
    }

    fn stop(&mut self, label: &Label, collector: &mut ColumnCollector<'a>) {
        if !self.data.is_complete(&label.met) {
            return;
        }
        if !self.leases {
            collector.observe(label.profit);
            if collector.improves(label.profit) {
                collector.offer(self.data.scheme(&label.shifts, None));
            }
            return;
        }
        let value = self.value(label);
        collector.observe(value);
        if !collector.improves(label.gains) {
            return;
        }
        let windows: SmallVec<[TimeWindow; 4]> = label.shifts.iter().map(|&(_, w)| w).collect();
        let data = self.data;
        let plan = self
            .covers
            .entry(windows)
            .or_insert_with(|| data.cover(&label.shifts));
        if let Some(plan) = plan.as_ref() {
            let covered = label.gains - plan.rent_cost;
            collector.observe(covered);
            if collector.improves(covered) {
                let scheme = data.scheme(&label.shifts, Some(plan));
                collector.offer(scheme);
            }
        }
    }

    /// Applies rule 2 to the labels of one clock, in order.
    fn thin_by_travel(&self, labels: Vec<Label>) -> Vec<Label> {
        let mut kept: Vec<(Label, Summary, f64)> = Vec::with_capacity(labels.len());
        for label in labels {
            let summary = self.summary(&label);
            let dominated = kept.iter().any(|(a, sa, travel)| {
                a.remaining == label.remaining
                    && a.open == label.open
                    && a.met == label.met
                    && a.counted == label.counted
                    && Summary {
                        profit: sa.profit - travel,
                        value: sa.value - travel,
                        ..*sa
                    }
                    .dominates(&summary, self.positional)
            });
            if !dominated {
                let travel = self.data.max_travel_from(label.last, &label.remaining);
                kept.push((label, summary, travel));
            }
        }
        kept.into_iter().map(|(l, _, _)| l).collect()
    }

    /// Applies rule 2 to a wave of equal shift counts, one clock at a time.
    fn thin_by_clock(&self, mut labels: Vec<Label>) -> Vec<Label> {
        labels.sort_by_key(|l| l.clock);
        let mut out = Vec::with_capacity(labels.len());
        let mut rest = labels.into_iter().peekable();
        while let Some(first) = rest.next() {
            let clock = first.clock;
            let mut group = vec![first];
            while let Some(next) = rest.next_if(|l| l.clock == clock) {
                group.push(next);
            }
            out.extend(self.thin_by_travel(group));
        }
        out
    }
}

impl PricingOracle for LabelPricing {
    fn name(&self) -> &str {
        match self.extension {
            LabelExtension::ByTime => "LabelPricing(by time)",
            LabelExtension::ByOrder => "LabelPricing(by order)",
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(equipment = %problem.equipment))]
    fn price(&self, problem: &PricingProblem<'_>) -> PricingResult {
        debug_assert!(
            problem.family != Family::Lease,
            "called `LabelPricing::price` with a lease problem"
        );
        let data = UnitData::new(*problem);
        let tracked = if data.allows_revisit() {
            data.unit
                .orders()
                .iter()
                .copied()
                .filter(|&j| problem.restrictions.split_upper(j).is_some())
                .collect()
        } else {
            SmallVec::new()
        };
        let mut search = Search {
            data: &data,
            leases: problem.family.has_leases(),
            positional: data.rules.has_positional_rules(),
            tracked,
            covers: FxHashMap::default(),
        };
        let mut collector = ColumnCollector::new(*problem);

        let horizon = problem.instance.horizon();
        let waves = match self.extension {
            LabelExtension::ByTime => horizon + 1,
            LabelExtension::ByOrder => data.unit.max_shifts() + 1,
        };
        let mut buckets: Vec<Vec<Label>> = vec![Vec::new(); waves.max(1)];
        buckets[0].push(search.root());

        let mut settled: FxHashMap<LabelKey, Vec<Summary>> = FxHashMap::default();
        let mut explored = 0usize;
        let mut complete = true;

        'waves: for wave in 0..buckets.len() {
            let mut labels = std::mem::take(&mut buckets[wave]);
            if labels.is_empty() {
                continue;
            }
            if !data.allows_revisit() {
                labels = match self.extension {
                    LabelExtension::ByTime => search.thin_by_travel(labels),
                    LabelExtension::ByOrder => search.thin_by_clock(labels),
                };
            }
            for label in labels {
                explored += 1;
                if explored % POLL_INTERVAL == 0 && problem.limits.should_stop() {
                    complete = false;
                    break 'waves;
                }
                let summary = search.summary(&label);
                let entry = settled.entry(Search::key(&label)).or_default();
                if entry.iter().any(|s| s.dominates(&summary, search.positional)) {
                    continue;
                }
                entry.push(summary);

                search.stop(&label, &mut collector);
                for child in search.children(&label) {
                    let slot = match self.extension {
                        LabelExtension::ByTime => child.clock,
                        LabelExtension::ByOrder => child.shifts.len(),
                    };
                    if let Some(bucket) = buckets.get_mut(slot) {
                        bucket.push(child);
                    }
                }
            }
        }

        tracing::trace!(explored, complete, "label setting finished");
        collector.finish(complete, explored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        branching::constraint::{Bound, BranchConstraint},
        master::Duals,
        pricing::{enumerate::EnumerationPricing, restrictions::Restrictions},
    };
    use fleetlease_core::num::tolerance::{PRECISION, differ};
    use fleetlease_lp::oracle::SolveLimits;
    use fleetlease_model::{
        index::{EquipmentIndex, OrderIndex},
        model::{EquipmentSpec, Instance, InstanceBuilder, ModelOptions, OrderSpec},
        rent::{RentFunction, RentSegment},
    };
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const E0: EquipmentIndex = EquipmentIndex::new(0);

    fn scenario() -> Instance {
        let mut b = InstanceBuilder::new(5);
        b.add_equipment(EquipmentSpec::new(
            0,
            TimeWindow::new(0, 5),
            RentFunction::flat(10.0, 5),
        ));
        let a = b.add_customer(50.0);
        let c = b.add_customer(50.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
        b.add_order(OrderSpec::new(c, 0, TimeWindow::new(3, 5)));
        b.build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance")
    }

    fn revenue_duals(inst: &Instance) -> Duals {
        let mut duals = Duals::zero(inst);
        for order in inst.orders() {
            let per_slot = inst.customer(order.customer()).revenue() / order.window().len() as f64;
            for t in order.window().slots() {
                duals.set_slot_value(inst, order.index(), t, per_slot);
            }
        }
        duals
    }

    fn problem<'a>(
        inst: &'a Instance,
        duals: &'a Duals,
        restrictions: &'a Restrictions,
        family: Family,
    ) -> PricingProblem<'a> {
        PricingProblem {
            instance: inst,
            equipment: E0,
            family,
            duals,
            restrictions,
            limits: SolveLimits::none(),
        }
    }

    #[test]
    fn test_best_chain_serves_both_orders_under_one_term() {
        let inst = scenario();
        let duals = revenue_duals(&inst);
        let restrictions = Restrictions::compile(&inst, &[]);
        for extension in [LabelExtension::ByTime, LabelExtension::ByOrder] {
            let result = LabelPricing::new(extension)
                .price(&problem(&inst, &duals, &restrictions, Family::Combined));
            assert!(result.is_complete());
            assert!(!differ(result.best().unwrap_or(0.0), 90.0));
            let (scheme, reduced) = &result.candidates()[0];
            assert!(!differ(*reduced, 90.0));
            assert_eq!(scheme.works().len(), 2);
            assert_eq!(scheme.leases().len(), 1);
            assert_eq!(scheme.leases()[0].window(), TimeWindow::new(0, 5));
        }
    }

    #[test]
    fn test_threshold_suppresses_columns_but_not_best() {
        let inst = scenario();
        let mut duals = revenue_duals(&inst);
        duals.set_threshold(E0, Family::Combined, 95.0);
        let restrictions = Restrictions::compile(&inst, &[]);
        let result = LabelPricing::default()
            .price(&problem(&inst, &duals, &restrictions, Family::Combined));
        assert!(result.candidates().is_empty());
        assert!(!differ(result.best().unwrap_or(0.0), 90.0));
    }

    #[test]
    fn test_forbidden_service_is_respected() {
        let inst = scenario();
        let duals = revenue_duals(&inst);
        let restrictions = Restrictions::compile(
            &inst,
            &[BranchConstraint::Service {
                equipment: E0,
                order: OrderIndex::new(0),
                serve: false,
            }],
        );
        let result = LabelPricing::default()
            .price(&problem(&inst, &duals, &restrictions, Family::Combined));
        // order 1 alone over (3, 5] with a term of rent 10
        assert!(!differ(result.best().unwrap_or(0.0), 40.0));
        assert!(result
            .candidates()
            .iter()
            .all(|(s, _)| !s.serves(OrderIndex::new(0))));
    }

    #[test]
    fn test_required_position_excludes_the_empty_chain() {
        let inst = scenario();
        let duals = Duals::zero(&inst);
        let restrictions = Restrictions::compile(
            &inst,
            &[BranchConstraint::ShiftBegin {
                equipment: E0,
                position: 0,
                bound: Bound::AtMost(0),
            }],
        );
        let result = LabelPricing::default()
            .price(&problem(&inst, &duals, &restrictions, Family::Work));
        // the cheapest admissible chain starts order 0 at 0 and stops there
        assert!(!differ(result.best().unwrap_or(f64::NAN), 0.0));
    }

    fn random_instance(rng: &mut ChaCha8Rng, revisit: bool) -> (Instance, Duals) {
        let horizon = rng.random_range(4..=6);
        let mut b = InstanceBuilder::new(horizon);
        for _ in 0..2 {
            let slope = rng.random_range(1..=3) as f64;
            let intercept = rng.random_range(0..=4) as f64;
            let rent = RentFunction::new([
                RentSegment::new(slope, intercept, 2),
                RentSegment::new(slope, intercept + 1.0, horizon),
            ])
            .expect("valid rent");
            b.add_equipment(
                EquipmentSpec::new(0, TimeWindow::new(0, horizon), rent)
                    .with_max_lease_terms(rng.random_range(1..=3)),
            );
        }
        let orders = rng.random_range(2..=4);
        for _ in 0..orders {
            let begin = rng.random_range(0..horizon - 1);
            let end = rng.random_range(begin + 1..=horizon);
            let customer = b.add_customer(rng.random_range(5..=30) as f64);
            b.add_order(
                OrderSpec::new(customer, 0, TimeWindow::new(begin, end))
                    .with_switch_cost(rng.random_range(0..=2) as f64),
            );
        }
        let options = ModelOptions::default()
            .allow_revisit(revisit)
            .base_schedule_cost(rng.random_range(0..=2) as f64);
        let inst = b.build(&options).expect("valid instance");
        let mut duals = Duals::zero(&inst);
        for order in inst.orders() {
            for t in order.window().slots() {
                duals.set_slot_value(&inst, order.index(), t, rng.random_range(-2.0..8.0));
            }
        }
        (inst, duals)
    }

    #[test]
    fn test_travel_rule_thins_order_waves_per_clock() {
        let inst = scenario();
        let duals = revenue_duals(&inst);
        let restrictions = Restrictions::compile(&inst, &[]);
        let p = problem(&inst, &duals, &restrictions, Family::Work);
        let data = UnitData::new(p);
        let search = Search {
            data: &data,
            leases: false,
            positional: false,
            tracked: SmallVec::new(),
            covers: FxHashMap::default(),
        };
        let at = |clock: usize, profit: f64| Label {
            clock,
            profit,
            gains: profit,
            ..search.root()
        };
        // a later clock is never compared with an earlier one
        let wave = vec![at(4, 5.0), at(3, 40.0), at(3, 10.0)];
        let kept = search.thin_by_clock(wave);
        let summary: Vec<(usize, f64)> = kept.iter().map(|l| (l.clock, l.profit)).collect();
        assert_eq!(summary, vec![(3, 40.0), (4, 5.0)]);
    }

    #[test]
    fn test_agrees_with_enumeration_on_random_instances() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for round in 0..40 {
            let (inst, duals) = random_instance(&mut rng, round % 3 == 0);
            let restrictions = Restrictions::compile(&inst, &[]);
            for family in [Family::Combined, Family::Work] {
                for i in EquipmentIndex::range(inst.num_equipment()) {
                    let p = PricingProblem {
                        equipment: i,
                        ..problem(&inst, &duals, &restrictions, family)
                    };
                    let reference = EnumerationPricing::new().price(&p);
                    for extension in [LabelExtension::ByTime, LabelExtension::ByOrder] {
                        let found = LabelPricing::new(extension).price(&p);
                        let (a, b) = (
                            found.best().unwrap_or(f64::NEG_INFINITY),
                            reference.best().unwrap_or(f64::NEG_INFINITY),
                        );
                        assert!(
                            (a - b).abs() < PRECISION,
                            "round {round} {family} {extension:?}: label {a} vs enumeration {b}"
                        );
                    }
                }
            }
        }
    }
}
