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

//! # Pricing
//!
//! Per-unit subproblems that search for columns with positive reduced profit
//! under the duals of the current master solve.
//!
//! - `restrictions`: branch decisions compiled into per-unit checks.
//! - `unit`: candidate shifts of one unit and the extension step shared by
//!   the chain-building algorithms.
//! - `label`: label setting with dominance, the production algorithm.
//! - `enumerate`: every admissible chain, for cross-checking.
//! - `lp`: chains with the lease solved as an integer program on the LP oracle.
//!
//! Lease columns of the two-family layout are priced by the lease-term
//! program in [`crate::lease::pricing`].
//!
//! Units are independent within one round, so [`Pricer::price`] may run them
//! on the rayon pool. Results come back in unit order.

pub mod enumerate;
pub mod label;
pub mod lp;
pub mod restrictions;
pub(crate) mod unit;

use crate::{
    config::{BnpConfig, PricingMethod},
    lease::pricing::LeasePricing,
    master::Duals,
    pool::ColumnPool,
    scheme::{Family, Scheme},
};
use fleetlease_core::num::tolerance::PRECISION;
use fleetlease_lp::oracle::{LpOracle, SolveLimits};
use fleetlease_model::{index::EquipmentIndex, model::Instance};
use rayon::prelude::*;
use restrictions::Restrictions;
use rustc_hash::FxHashSet;

/// Outcome class of one pricing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PricingStatus {
    /// At least one improving column was added to the pool.
    New,
    /// Improving columns were found but all of them are already pooled.
    Old,
    /// No improving column exists.
    Null,
}

impl std::fmt::Display for PricingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingStatus::New => write!(f, "NEW_COLUMN"),
            PricingStatus::Old => write!(f, "OLD_COLUMN"),
            PricingStatus::Null => write!(f, "NULL_COLUMN"),
        }
    }
}

/// Input of one pricing call.
#[derive(Debug, Clone, Copy)]
pub struct PricingProblem<'a> {
    pub instance: &'a Instance,
    pub equipment: EquipmentIndex,
    pub family: Family,
    pub duals: &'a Duals,
    pub restrictions: &'a Restrictions,
    pub limits: SolveLimits<'a>,
}

impl<'a> PricingProblem<'a> {
    /// The convexity dual a column has to beat.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.duals.threshold(self.equipment, self.family)
    }
}

/// Output of one pricing call.
#[derive(Debug, Clone)]
pub struct PricingResult {
    equipment: EquipmentIndex,
    family: Family,
    best: Option<f64>,
    candidates: Vec<(Scheme, f64)>,
    complete: bool,
    explored: usize,
}

impl PricingResult {
    #[inline]
    pub fn equipment(&self) -> EquipmentIndex {
        self.equipment
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    /// The best pricing objective over admissible schemes, not counting the
    /// convexity dual. `None` when none was seen.
    #[inline]
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Improving schemes with their reduced profit, best first.
    #[inline]
    pub fn candidates(&self) -> &[(Scheme, f64)] {
        &self.candidates
    }

    /// `false` if the search stopped early on the deadline or interrupt.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of labels or chains visited.
    #[inline]
    pub fn explored(&self) -> usize {
        self.explored
    }

    /// Contribution of this unit and family to the Lagrangian bound, or
    /// `None` when the search was not exhaustive. An exhaustive search without
    /// any admissible scheme yields negative infinity in both modes: the
    /// convexity row of the unit cannot be met, so the node is infeasible.
    pub fn bound_contribution(&self, threshold: f64, clamped: bool) -> Option<f64> {
        if !self.complete {
            return None;
        }
        let Some(best) = self.best else {
            return Some(f64::NEG_INFINITY);
        };
        let gap = best - threshold;
        Some(if clamped { gap.max(0.0) } else { gap })
    }

    /// Adds the candidates to `pool`, at most `cap` new ones, and classifies
    /// the call. Returns the status and the number of columns added.
    pub fn insert_into(self, pool: &mut ColumnPool, cap: Option<usize>) -> (PricingStatus, usize) {
        if self.candidates.is_empty() {
            return (PricingStatus::Null, 0);
        }
        let limit = cap.unwrap_or(usize::MAX);
        let mut added = 0usize;
        for (scheme, _) in self.candidates {
            if added >= limit {
                break;
            }
            if pool.insert(scheme).is_some() {
                added += 1;
            }
        }
        if added > 0 {
            (PricingStatus::New, added)
        } else {
            (PricingStatus::Old, 0)
        }
    }
}

/// Collects the best value and the improving schemes of one call.
#[derive(Debug)]
pub(crate) struct ColumnCollector<'a> {
    problem: PricingProblem<'a>,
    best: Option<f64>,
    candidates: Vec<(Scheme, f64)>,
    seen: FxHashSet<Scheme>,
}

impl<'a> ColumnCollector<'a> {
    pub(crate) fn new(problem: PricingProblem<'a>) -> Self {
        Self {
            problem,
            best: None,
            candidates: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    /// Records the objective of an admissible stop.
    #[inline]
    pub(crate) fn observe(&mut self, value: f64) {
        self.best = Some(self.best.map_or(value, |b| b.max(value)));
    }

    /// `true` if `value` beats the convexity dual.
    #[inline]
    pub(crate) fn improves(&self, value: f64) -> bool {
        value - self.problem.threshold() > PRECISION
    }

    /// Offers a finished scheme. It is kept if the branch decisions admit it
    /// and its reduced profit, recomputed from its own terms and shifts, is
    /// positive.
    pub(crate) fn offer(&mut self, scheme: Scheme) {
        let p = &self.problem;
        let reduced = p.duals.reduced_profit(p.instance, &scheme);
        if reduced <= PRECISION || self.seen.contains(&scheme) {
            return;
        }
        if !p.restrictions.admits(p.instance, &scheme) {
            return;
        }
        self.seen.insert(scheme.clone());
        self.candidates.push((scheme, reduced));
    }

    pub(crate) fn finish(mut self, complete: bool, explored: usize) -> PricingResult {
        self.candidates
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        PricingResult {
            equipment: self.problem.equipment,
            family: self.problem.family,
            best: self.best,
            candidates: self.candidates,
            complete,
            explored,
        }
    }
}

/// Searches improving columns for one unit and family.
pub trait PricingOracle: Send + Sync {
    fn name(&self) -> &str;

    fn price(&self, problem: &PricingProblem<'_>) -> PricingResult;
}

impl std::fmt::Debug for dyn PricingOracle + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PricingOracle({})", self.name())
    }
}

/// The oracles configured for a search.
pub struct Pricer<'o> {
    schedule: Box<dyn PricingOracle + 'o>,
    lease: Box<dyn PricingOracle + 'o>,
    reference: Option<enumerate::EnumerationPricing>,
    parallel: bool,
}

impl<'o> Pricer<'o> {
    /// Selects the oracles named by `config`. `lp` serves the integer-program
    /// pricing method.
    pub fn new(config: &BnpConfig, lp: &'o dyn LpOracle) -> Self {
        let schedule: Box<dyn PricingOracle + 'o> = match config.pricing {
            PricingMethod::Labeling => Box::new(label::LabelPricing::new(config.label_extension)),
            PricingMethod::Enumeration => Box::new(enumerate::EnumerationPricing::new()),
            PricingMethod::LinearProgram => Box::new(lp::LinearProgramPricing::new(lp)),
        };
        let lease: Box<dyn PricingOracle + 'o> = match config.pricing {
            PricingMethod::LinearProgram => Box::new(lp::LinearProgramPricing::new(lp)),
            PricingMethod::Labeling | PricingMethod::Enumeration => Box::new(LeasePricing::new()),
        };
        let reference = (config.cross_check_pricing
            && config.pricing != PricingMethod::Enumeration)
            .then(enumerate::EnumerationPricing::new);
        Self {
            schedule,
            lease,
            reference,
            parallel: config.parallel_pricing,
        }
    }

    #[inline]
    pub fn oracle(&self, family: Family) -> &dyn PricingOracle {
        match family {
            Family::Lease => self.lease.as_ref(),
            Family::Work | Family::Combined => self.schedule.as_ref(),
        }
    }

    /// Prices every problem, in order.
    pub fn price(&self, problems: &[PricingProblem<'_>]) -> Vec<PricingResult> {
        if self.parallel {
            problems
                .par_iter()
                .map(|p| self.oracle(p.family).price(p))
                .collect()
        } else {
            problems
                .iter()
                .map(|p| self.oracle(p.family).price(p))
                .collect()
        }
    }

    /// Re-prices `problem` by enumeration and returns both best values when
    /// they disagree. Lease problems and interrupted runs are not checked.
    pub fn cross_check(
        &self,
        problem: &PricingProblem<'_>,
        result: &PricingResult,
    ) -> Option<(f64, f64)> {
        let reference = self.reference.as_ref()?;
        if problem.family == Family::Lease || !result.is_complete() {
            return None;
        }
        let expected = reference.price(problem);
        if !expected.is_complete() {
            return None;
        }
        let found = result.best().unwrap_or(f64::NEG_INFINITY);
        let wanted = expected.best().unwrap_or(f64::NEG_INFINITY);
        let agree = (found == wanted) || (found - wanted).abs() < PRECISION;
        (!agree).then_some((found, wanted))
    }
}

impl std::fmt::Debug for Pricer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pricer")
            .field("schedule", &self.schedule.name())
            .field("lease", &self.lease.name())
            .field("cross_check", &self.reference.is_some())
            .field("parallel", &self.parallel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_core::math::window::TimeWindow;
    use fleetlease_model::{
        model::{EquipmentSpec, InstanceBuilder, ModelOptions, OrderSpec},
        plan::LeaseTerm,
        rent::RentFunction,
    };

    fn instance() -> Instance {
        let mut b = InstanceBuilder::new(4);
        b.add_equipment(EquipmentSpec::new(
            0,
            TimeWindow::new(0, 4),
            RentFunction::flat(4.0, 4),
        ));
        let a = b.add_customer(10.0);
        b.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 2)));
        b.build(&ModelOptions::default()).expect("valid instance")
    }

    const E0: EquipmentIndex = EquipmentIndex::new(0);

    #[test]
    fn test_contribution_is_clamped_on_request() {
        let result = PricingResult {
            equipment: E0,
            family: Family::Combined,
            best: Some(3.0),
            candidates: Vec::new(),
            complete: true,
            explored: 1,
        };
        assert_eq!(result.bound_contribution(5.0, true), Some(0.0));
        assert_eq!(result.bound_contribution(5.0, false), Some(-2.0));
        assert_eq!(result.bound_contribution(1.0, true), Some(2.0));
        let partial = PricingResult {
            complete: false,
            ..result
        };
        assert_eq!(partial.bound_contribution(1.0, true), None);
    }

    #[test]
    fn test_exhaustive_search_without_admissible_scheme_is_infeasible() {
        let empty = PricingResult {
            equipment: E0,
            family: Family::Combined,
            best: None,
            candidates: Vec::new(),
            complete: true,
            explored: 3,
        };
        assert_eq!(empty.bound_contribution(2.0, true), Some(f64::NEG_INFINITY));
        assert_eq!(empty.bound_contribution(2.0, false), Some(f64::NEG_INFINITY));
        let interrupted = PricingResult {
            complete: false,
            ..empty
        };
        assert_eq!(interrupted.bound_contribution(2.0, true), None);
    }

    #[test]
    fn test_insert_classifies_new_old_and_null() {
        let inst = instance();
        let rent = inst.equipment(E0).rent();
        let scheme = Scheme::lease(E0, [LeaseTerm::new(rent, TimeWindow::new(0, 2))]);
        let result = PricingResult {
            equipment: E0,
            family: Family::Lease,
            best: Some(1.0),
            candidates: vec![(scheme, 1.0)],
            complete: true,
            explored: 1,
        };
        let mut pool = ColumnPool::new();
        assert_eq!(
            result.clone().insert_into(&mut pool, None),
            (PricingStatus::New, 1)
        );
        assert_eq!(result.insert_into(&mut pool, None), (PricingStatus::Old, 0));
        let empty = PricingResult {
            equipment: E0,
            family: Family::Lease,
            best: Some(0.0),
            candidates: Vec::new(),
            complete: true,
            explored: 1,
        };
        assert_eq!(empty.insert_into(&mut pool, None), (PricingStatus::Null, 0));
    }

    #[test]
    fn test_collector_keeps_improving_admitted_schemes_once() {
        let inst = instance();
        let mut duals = Duals::zero(&inst);
        duals.set_threshold(E0, Family::Lease, -10.0);
        let restrictions = Restrictions::compile(&inst, &[]);
        let problem = PricingProblem {
            instance: &inst,
            equipment: E0,
            family: Family::Lease,
            duals: &duals,
            restrictions: &restrictions,
            limits: SolveLimits::none(),
        };
        let rent = inst.equipment(E0).rent();
        let scheme = Scheme::lease(E0, [LeaseTerm::new(rent, TimeWindow::new(0, 2))]);
        let mut collector = ColumnCollector::new(problem);
        collector.observe(-4.0);
        assert!(collector.improves(-4.0));
        collector.offer(scheme.clone());
        collector.offer(scheme);
        collector.offer(Scheme::null(E0, Family::Lease));
        let result = collector.finish(true, 2);
        assert_eq!(result.candidates().len(), 2);
        assert!(result.candidates()[0].0.is_null());
        assert_eq!(result.best(), Some(-4.0));
    }
}
