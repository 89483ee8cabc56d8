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

//! Exhaustive pricing over every admissible chain of shifts.
//!
//! Depth-first over the same extension step the label algorithm uses, with no
//! dominance. Combined chains are priced with their cheapest covering lease.
//! Only meant for small instances and for checking the label algorithm.

use super::{
    ColumnCollector, PricingOracle, PricingProblem, PricingResult,
    unit::UnitData,
};
use crate::scheme::Family;
use fixedbitset::FixedBitSet;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::index::OrderIndex;

const POLL_INTERVAL: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationPricing;

impl EnumerationPricing {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

/// Visits every chain reachable from the empty one, depth first.
/// `visit` returns `false` to abort.
pub(crate) fn for_each_chain<F>(data: &UnitData<'_>, mut visit: F) -> bool
where
    F: FnMut(&[(OrderIndex, TimeWindow)], f64, &FixedBitSet) -> bool,
{
    struct Frame {
        clock: usize,
        remaining: FixedBitSet,
        last: Option<OrderIndex>,
        shifts: Vec<(OrderIndex, TimeWindow)>,
        gains: f64,
        met: FixedBitSet,
    }

    let mut stack = vec![Frame {
        clock: data.unit.window().begin(),
        remaining: data.initial_remaining(),
        last: None,
        shifts: Vec::new(),
        gains: 0.0,
        met: data.initial_met(),
    }];
    while let Some(frame) = stack.pop() {
        if !visit(&frame.shifts, frame.gains, &frame.met) {
            return false;
        }
        let steps = data.steps(
            frame.clock,
            &frame.remaining,
            frame.last,
            &frame.shifts,
            &frame.met,
        );
        // reversed so chains come out in step order
        for step in steps.into_iter().rev() {
            let mut shifts = frame.shifts.clone();
            shifts.push((step.order, step.window));
            stack.push(Frame {
                clock: step.window.end(),
                remaining: step.remaining,
                last: Some(step.order),
                shifts,
                gains: frame.gains + step.gain,
                met: step.met,
            });
        }
    }
    true
}

impl PricingOracle for EnumerationPricing {
    fn name(&self) -> &str {
        "EnumerationPricing"
    }

    fn price(&self, problem: &PricingProblem<'_>) -> PricingResult {
        debug_assert!(
            problem.family != Family::Lease,
            "called `EnumerationPricing::price` with a lease problem"
        );
        let data = UnitData::new(*problem);
        let leases = problem.family.has_leases();
        let mut collector = ColumnCollector::new(*problem);
        let mut explored = 0usize;

        let complete = for_each_chain(&data, |shifts, gains, met| {
            explored += 1;
            if explored % POLL_INTERVAL == 0 && problem.limits.should_stop() {
                return false;
            }
            if !data.is_complete(met) {
                return true;
            }
            if !leases {
                collector.observe(gains);
                if collector.improves(gains) {
                    collector.offer(data.scheme(shifts, None));
                }
                return true;
            }
            if let Some(plan) = data.cover(shifts) {
                let value = gains - plan.rent_cost;
                collector.observe(value);
                if collector.improves(value) {
                    collector.offer(data.scheme(shifts, Some(&plan)));
                }
            }
            true
        });

        collector.finish(complete, explored)
    }
}
