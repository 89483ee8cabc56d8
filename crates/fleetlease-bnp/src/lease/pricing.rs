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

//! Lease-column pricing of the two-family layout.
//!
//! The lease-term program is solved with the per-period lease weights of the
//! unit (the negated linking duals) and the lease decisions of the node. Its
//! optimum is the best lease pattern, so a single call either yields the one
//! improving column or proves there is none.

use super::dp::LeaseTermDp;
use crate::{
    pricing::{ColumnCollector, PricingOracle, PricingProblem, PricingResult},
    scheme::{Family, Scheme},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct LeasePricing;

impl LeasePricing {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl PricingOracle for LeasePricing {
    fn name(&self) -> &str {
        "LeasePricing"
    }

    fn price(&self, problem: &PricingProblem<'_>) -> PricingResult {
        debug_assert!(
            problem.family == Family::Lease,
            "called `LeasePricing::price` with a {} problem",
            problem.family
        );
        let i = problem.equipment;
        let unit = problem.instance.equipment(i);
        let rules = problem.restrictions.unit(i);
        let mut dp = LeaseTermDp::new(unit.rent(), unit.window(), unit.max_lease_terms())
            .with_weights(problem.duals.lease_weights(i))
            .with_rules(rules.lease_rules());
        rules.apply_lease_slots(&mut dp);

        let mut collector = ColumnCollector::new(*problem);
        if let Some(plan) = dp.solve() {
            collector.observe(plan.value);
            if collector.improves(plan.value) {
                collector.offer(Scheme::lease(i, plan.lease_terms(unit.rent())));
            }
        }
        collector.finish(true, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        branching::constraint::BranchConstraint, master::Duals,
        pricing::restrictions::Restrictions,
    };
    use fleetlease_core::{math::window::TimeWindow, num::tolerance::differ};
    use fleetlease_lp::oracle::SolveLimits;
    use fleetlease_model::{
        index::EquipmentIndex,
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        rent::{RentFunction, RentSegment},
    };

    const E0: EquipmentIndex = EquipmentIndex::new(0);

    #[test]
    fn test_lease_pricing_follows_weights_and_decisions() {
        let mut b = InstanceBuilder::new(6);
        let rent = RentFunction::new([RentSegment::new(1.0, 0.0, 6)]).expect("valid rent");
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 6), rent));
        let a = b.add_customer(10.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 2)));
        let inst = b.build(&ModelOptions::default()).expect("valid instance");

        let mut duals = Duals::zero(&inst);
        duals.set_lease_weight(E0, 0, 3.0);
        duals.set_lease_weight(E0, 1, 3.0);
        duals.set_threshold(E0, Family::Lease, 1.0);
        let free = Restrictions::compile(&inst, &[]);
        let problem = PricingProblem {
            instance: &inst,
            equipment: E0,
            family: Family::Lease,
            duals: &duals,
            restrictions: &free,
            limits: SolveLimits::none(),
        };
        let result = LeasePricing::new().price(&problem);
        assert!(!differ(result.best().unwrap_or(f64::NAN), 4.0));
        let (scheme, reduced) = &result.candidates()[0];
        assert!(!differ(*reduced, 3.0));
        assert_eq!(scheme.leases()[0].window(), TimeWindow::new(0, 2));

        let fixed = Restrictions::compile(
            &inst,
            &[BranchConstraint::LeaseSlot {
                equipment: E0,
                slot: 1,
                leased: false,
            }],
        );
        let result = LeasePricing::new().price(&PricingProblem {
            restrictions: &fixed,
            ..problem
        });
        assert!(!differ(result.best().unwrap_or(f64::NAN), 2.0));
        assert!(result.candidates()[0].0.leases().iter().all(|l| !l.window().contains_slot(1)));
    }
}
