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

//! Pricing with the lease decided by an integer program.
//!
//! Chains of shifts are enumerated exactly as in [`super::enumerate`]. The
//! lease of a finished chain, and the lease columns of the two-family
//! layout, come from a binary program over every candidate term `(b, e]` of
//! the unit:
//!
//! ```text
//! max  sum_(b,e) (w(b..e) - rent(e - b)) x_(b,e)
//! s.t. sum_(b,e) covering t  x_(b,e)  = 1    t required
//!      sum_(b,e) covering t  x_(b,e) <= 1    otherwise
//!      sum x <= q
//! ```
//!
//! solved as a mixed-integer program by the configured LP oracle. Lease
//! columns of a unit with positional lease decisions (term begin, end or
//! segment) are priced by the lease-term program instead.

use super::{
    ColumnCollector, PricingOracle, PricingProblem, PricingResult, enumerate::for_each_chain,
    unit::UnitData,
};
use crate::{
    lease::{dp::LeasePlan, pricing::LeasePricing},
    scheme::{Family, Scheme},
};
use fixedbitset::FixedBitSet;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_lp::{
    error::LpError,
    oracle::{LpOracle, SolveLimits},
    problem::{ColumnIndex, LpProblem, Objective, RowSense},
    solution::LpStatus,
};
use fleetlease_model::{model::Equipment, rent::RentFunction};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

const POLL_INTERVAL: usize = 512;

/// Outcome of one lease program.
#[derive(Debug, Clone)]
enum LeaseSolve {
    Plan(LeasePlan),
    Infeasible,
    /// Interrupted, or the oracle stopped before proving optimality.
    Unfinished,
}

/// Builds the lease program of `unit`. Terms covering a `forbidden` period are
/// left out. Returns `None` if a `required` period cannot be covered at all.
fn lease_program(
    unit: &Equipment,
    weights: Option<&[f64]>,
    required: &FixedBitSet,
    forbidden: &FixedBitSet,
) -> Result<Option<(LpProblem, Vec<(ColumnIndex, TimeWindow)>)>, LpError> {
    let window = unit.window();
    let rent = unit.rent();
    let weight = |t: usize| weights.and_then(|w| w.get(t).copied()).unwrap_or(0.0);

    let mut problem = LpProblem::new(Objective::Maximize);
    let mut terms = Vec::new();
    for b in window.slots() {
        let mut gained = 0.0;
        for e in (b + 1)..=window.end() {
            if forbidden.contains(e - 1) {
                break;
            }
            gained += weight(e - 1);
            let cost = gained - rent.rent(e - b);
            let x = problem.add_integer_column(format!("x_{}_{}", b, e), 0.0, 1.0, cost)?;
            terms.push((x, TimeWindow::new_unchecked(b, e)));
        }
    }

    for t in window.slots() {
        let covering: Vec<(ColumnIndex, f64)> = terms
            .iter()
            .filter(|(_, w)| w.contains_slot(t))
            .map(|&(x, _)| (x, 1.0))
            .collect();
        let is_required = required.contains(t);
        if covering.is_empty() {
            if is_required {
                return Ok(None);
            }
            continue;
        }
        let sense = if is_required {
            RowSense::Equal
        } else {
            RowSense::LessEqual
        };
        problem.add_row(format!("cover_{}", t), sense, 1.0, covering)?;
    }
    if required.ones().any(|t| !window.contains_slot(t)) {
        return Ok(None);
    }
    problem.add_row(
        "terms",
        RowSense::LessEqual,
        unit.max_lease_terms() as f64,
        terms.iter().map(|&(x, _)| (x, 1.0)),
    )?;
    Ok(Some((problem, terms)))
}

fn solve_lease(
    oracle: &dyn LpOracle,
    unit: &Equipment,
    weights: Option<&[f64]>,
    required: &FixedBitSet,
    forbidden: &FixedBitSet,
    limits: &SolveLimits<'_>,
) -> Result<LeaseSolve, LpError> {
    let Some((problem, terms)) = lease_program(unit, weights, required, forbidden)? else {
        return Ok(LeaseSolve::Infeasible);
    };
    let solution = oracle.solve(&problem, limits)?;
    match solution.status() {
        LpStatus::Optimal => {}
        LpStatus::Infeasible => return Ok(LeaseSolve::Infeasible),
        LpStatus::Feasible | LpStatus::TimeLimited | LpStatus::Unbounded => {
            return Ok(LeaseSolve::Unfinished);
        }
    }
    let mut chosen: SmallVec<[TimeWindow; 4]> = terms
        .iter()
        .filter(|&&(x, _)| solution.value(x) > 0.5)
        .map(|&(_, w)| w)
        .collect();
    chosen.sort_unstable();
    Ok(LeaseSolve::Plan(plan_of(unit.rent(), chosen, solution.objective())))
}

fn plan_of(rent: &RentFunction, terms: SmallVec<[TimeWindow; 4]>, value: f64) -> LeasePlan {
    let rent_cost = terms.iter().map(|w| rent.rent(w.len())).sum();
    LeasePlan {
        value,
        rent_cost,
        terms,
    }
}

/// Prices chains by enumeration and leases by integer programming.
pub struct LinearProgramPricing<'o> {
    oracle: &'o dyn LpOracle,
}

impl<'o> LinearProgramPricing<'o> {
    #[inline]
    pub fn new(oracle: &'o dyn LpOracle) -> Self {
        Self { oracle }
    }

    fn price_leases(&self, problem: &PricingProblem<'_>) -> PricingResult {
        let i = problem.equipment;
        let rules = problem.restrictions.unit(i);
        if !rules.lease_rules().is_empty() {
            return LeasePricing::new().price(problem);
        }
        let unit = problem.instance.equipment(i);
        let horizon = problem.instance.horizon();
        let mut required = FixedBitSet::with_capacity(horizon);
        let mut forbidden = FixedBitSet::with_capacity(horizon);
        for &t in rules.leased_slots() {
            required.grow(t + 1);
            required.insert(t);
        }
        for &t in rules.unleased_slots() {
            forbidden.grow(t + 1);
            forbidden.insert(t);
        }

        let mut collector = ColumnCollector::new(*problem);
        let weights = Some(problem.duals.lease_weights(i));
        let complete =
            match solve_lease(self.oracle, unit, weights, &required, &forbidden, &problem.limits) {
                Ok(LeaseSolve::Plan(plan)) => {
                    collector.observe(plan.value);
                    if collector.improves(plan.value) {
                        collector.offer(Scheme::lease(i, plan.lease_terms(unit.rent())));
                    }
                    true
                }
                Ok(LeaseSolve::Infeasible) => true,
                Ok(LeaseSolve::Unfinished) => false,
                Err(err) => {
                    tracing::warn!(equipment = %i, error = %err, "lease program rejected");
                    false
                }
            };
        collector.finish(complete, 1)
    }

    fn price_chains(&self, problem: &PricingProblem<'_>) -> PricingResult {
        let data = UnitData::new(*problem);
        let leases = problem.family.has_leases();
        let unit = data.unit;
        let horizon = problem.instance.horizon();
        let no_slots = FixedBitSet::with_capacity(horizon);
        let mut covers: FxHashMap<SmallVec<[TimeWindow; 8]>, Option<LeasePlan>> =
            FxHashMap::default();
        let mut collector = ColumnCollector::new(*problem);
        let mut explored = 0usize;
        let mut unfinished = false;

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
            let key: SmallVec<[TimeWindow; 8]> = shifts.iter().map(|&(_, w)| w).collect();
            let plan = match covers.get(&key) {
                Some(plan) => plan.clone(),
                None => {
                    let mut required = FixedBitSet::with_capacity(horizon);
                    for w in &key {
                        for t in w.slots() {
                            required.grow(t + 1);
                            required.insert(t);
                        }
                    }
                    let solved = solve_lease(
                        self.oracle,
                        unit,
                        None,
                        &required,
                        &no_slots,
                        &problem.limits,
                    );
                    let plan = match solved {
                        Ok(LeaseSolve::Plan(plan)) => Some(plan),
                        Ok(LeaseSolve::Infeasible) => None,
                        Ok(LeaseSolve::Unfinished) => {
                            unfinished = true;
                            return false;
                        }
                        Err(err) => {
                            tracing::warn!(equipment = %problem.equipment, error = %err, "cover program rejected");
                            unfinished = true;
                            return false;
                        }
                    };
                    covers.insert(key, plan.clone());
                    plan
                }
            };
            if let Some(plan) = plan {
                let value = gains - plan.rent_cost;
                collector.observe(value);
                if collector.improves(value) {
                    collector.offer(data.scheme(shifts, Some(&plan)));
                }
            }
            true
        });

        tracing::trace!(
            equipment = %problem.equipment,
            explored,
            programs = covers.len(),
            "chains priced"
        );
        collector.finish(complete && !unfinished, explored)
    }
}

impl PricingOracle for LinearProgramPricing<'_> {
    fn name(&self) -> &str {
        "LinearProgramPricing"
    }

    fn price(&self, problem: &PricingProblem<'_>) -> PricingResult {
        match problem.family {
            Family::Lease => self.price_leases(problem),
            Family::Work | Family::Combined => self.price_chains(problem),
        }
    }
}

impl std::fmt::Debug for LinearProgramPricing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearProgramPricing")
            .field("oracle", &self.oracle.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        branching::constraint::{BranchConstraint, Bound},
        master::Duals,
        pricing::{enumerate::EnumerationPricing, restrictions::Restrictions},
    };
    use fleetlease_core::num::tolerance::differ;
    use fleetlease_lp::highs::HighsOracle;
    use fleetlease_model::{
        index::EquipmentIndex,
        model::{EquipmentSpec, Instance, InstanceBuilder, ModelOptions, OrderSpec},
        rent::RentSegment,
    };
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const E0: EquipmentIndex = EquipmentIndex::new(0);

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(6);
        let rent = RentFunction::new([
            RentSegment::new(0.0, 4.0, 2),
            RentSegment::new(1.0, 3.0, 6),
        ])
        .expect("valid rent");
        b.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 6), rent).with_max_lease_terms(2));
        let a = b.add_customer(20.0);
        let c = b.add_customer(20.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 2)));
        b.add_order(OrderSpec::new(c, 0, TimeWindow::new(3, 6)));
        b.build(&ModelOptions::default().base_schedule_cost(0.0))
            .expect("valid instance")
    }

    #[test]
    fn test_cover_program_matches_enumeration() {
        let inst = instance();
        let mut duals = Duals::zero(&inst);
        for order in inst.orders() {
            for t in order.window().slots() {
                duals.set_slot_value(&inst, order.index(), t, 2.5);
            }
        }
        let restrictions = Restrictions::compile(&inst, &[]);
        let problem = PricingProblem {
            instance: &inst,
            equipment: E0,
            family: Family::Combined,
            duals: &duals,
            restrictions: &restrictions,
            limits: SolveLimits::none(),
        };
        let highs = HighsOracle::new();
        let found = LinearProgramPricing::new(&highs).price(&problem);
        let expected = EnumerationPricing::new().price(&problem);
        assert!(found.is_complete());
        let (f, e) = (
            found.best().unwrap_or(f64::NAN),
            expected.best().unwrap_or(f64::NAN),
        );
        assert!(!differ(f, e), "program {} vs enumeration {}", f, e);
        assert_eq!(found.candidates().len(), expected.candidates().len());
    }

    #[test]
    fn test_lease_program_matches_lease_dp() {
        let inst = instance();
        let highs = HighsOracle::new();
        let oracle = LinearProgramPricing::new(&highs);
        let free = Restrictions::compile(&inst, &[]);
        let fixed = Restrictions::compile(
            &inst,
            &[
                BranchConstraint::LeaseSlot {
                    equipment: E0,
                    slot: 2,
                    leased: true,
                },
                BranchConstraint::LeaseSlot {
                    equipment: E0,
                    slot: 4,
                    leased: false,
                },
            ],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..10 {
            let mut duals = Duals::zero(&inst);
            for t in 0..inst.horizon() {
                duals.set_lease_weight(E0, t, rng.random_range(0.0..4.0));
            }
            for restrictions in [&free, &fixed] {
                let problem = PricingProblem {
                    instance: &inst,
                    equipment: E0,
                    family: Family::Lease,
                    duals: &duals,
                    restrictions,
                    limits: SolveLimits::none(),
                };
                let found = oracle.price(&problem).best().unwrap_or(f64::NAN);
                let expected = LeasePricing::new().price(&problem).best().unwrap_or(f64::NAN);
                assert!(!differ(found, expected), "program {} vs dp {}", found, expected);
            }
        }
    }

    #[test]
    fn test_positional_lease_rules_use_the_dp() {
        let inst = instance();
        let highs = HighsOracle::new();
        let restrictions = Restrictions::compile(
            &inst,
            &[BranchConstraint::LeaseBegin {
                equipment: E0,
                position: 0,
                bound: Bound::AtLeast(3),
            }],
        );
        let mut duals = Duals::zero(&inst);
        for t in 0..inst.horizon() {
            duals.set_lease_weight(E0, t, 3.0);
        }
        let problem = PricingProblem {
            instance: &inst,
            equipment: E0,
            family: Family::Lease,
            duals: &duals,
            restrictions: &restrictions,
            limits: SolveLimits::none(),
        };
        let result = LinearProgramPricing::new(&highs).price(&problem);
        let (scheme, _) = &result.candidates()[0];
        assert!(scheme.leases()[0].window().begin() >= 3);
    }
}
