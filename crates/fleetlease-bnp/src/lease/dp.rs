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

//! # Lease-Term Dynamic Program
//!
//! Chooses at most `q` disjoint, chronologically ordered lease terms inside
//! the availability window of a unit. Each term `(b, e]` earns the sum of
//! per-period weights it covers and pays `rent(e - b)`; the program maximizes
//! the total. With zero weights and a set of required periods it is the
//! cheapest covering of a shift pattern; with dual weights it is the lease
//! pricing problem of the two-family master.
//!
//! `F(k, t)` is the best value obtainable from instant `t` on with terms
//! `k..q`. Either the pattern stops at `t` (allowed when no required period
//! and no positional rule remains) or the next term starts at some `b >= t`
//! without skipping a required period:
//!
//! ```text
//! G(k, b) = max_{e > b} W(b, e) - rent(e - b) + F(k + 1, e)
//! H(k, t) = max(G(k, t), H(k, t + 1) if period t is not required)
//! F(k, t) = max(stop(k, t), H(k, t))
//! ```
//!
//! Terms never cover a forbidden period, and every positional rule (begin and
//! end bounds, fixed or forbidden rent segment of the term at a position) is
//! checked before a term is scored, so infeasible states are never scored.

use crate::branching::constraint::Bound;
use fixedbitset::FixedBitSet;
use fleetlease_core::math::window::TimeWindow;
use fleetlease_model::{plan::LeaseTerm, rent::RentFunction};
use smallvec::SmallVec;

/// Positional restrictions on the lease terms of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaseRules {
    horizon: usize,
    begin: Vec<(usize, Bound)>,
    end: Vec<(usize, Bound)>,
    segment: Vec<(usize, usize, bool)>,
}

impl LeaseRules {
    /// Rules for a horizon of `horizon` periods. Missing terms begin and end at the horizon.
    #[inline]
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin.is_empty() && self.end.is_empty() && self.segment.is_empty()
    }

    #[inline]
    pub fn bound_begin(&mut self, position: usize, bound: Bound) {
        self.begin.push((position, bound));
    }

    #[inline]
    pub fn bound_end(&mut self, position: usize, bound: Bound) {
        self.end.push((position, bound));
    }

    #[inline]
    pub fn fix_segment(&mut self, position: usize, segment: usize, fixed: bool) {
        self.segment.push((position, segment, fixed));
    }

    /// `true` if a term over `window` may sit at `position`.
    pub fn admits_term(&self, position: usize, window: TimeWindow, rent: &RentFunction) -> bool {
        self.begin
            .iter()
            .filter(|(p, _)| *p == position)
            .all(|(_, b)| b.holds(window.begin()))
            && self
                .end
                .iter()
                .filter(|(p, _)| *p == position)
                .all(|(_, b)| b.holds(window.end()))
            && self
                .segment
                .iter()
                .filter(|(p, _, _)| *p == position)
                .all(|&(_, n, fixed)| (rent.segment_of(window.len()) == Some(n)) == fixed)
    }

    /// `true` if the pattern may end with exactly `terms` terms.
    pub fn admits_stop(&self, terms: usize) -> bool {
        self.begin
            .iter()
            .filter(|(p, _)| *p >= terms)
            .all(|(_, b)| b.holds(self.horizon))
            && self
                .end
                .iter()
                .filter(|(p, _)| *p >= terms)
                .all(|(_, b)| b.holds(self.horizon))
            && self
                .segment
                .iter()
                .filter(|(p, _, _)| *p >= terms)
                .all(|&(_, _, fixed)| !fixed)
    }
}

/// An optimal lease pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct LeasePlan {
    pub value: f64,
    pub rent_cost: f64,
    pub terms: SmallVec<[TimeWindow; 4]>,
}

impl LeasePlan {
    /// Materializes the terms priced by `rent`.
    pub fn lease_terms(&self, rent: &RentFunction) -> Vec<LeaseTerm> {
        self.terms
            .iter()
            .map(|&w| LeaseTerm::new(rent, w))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Choice {
    Stop,
    Start(usize),
    Infeasible,
}

/// The lease-term program for one unit.
#[derive(Debug, Clone)]
pub struct LeaseTermDp<'a> {
    rent: &'a RentFunction,
    window: TimeWindow,
    max_terms: usize,
    weights: Option<&'a [f64]>,
    required: FixedBitSet,
    forbidden: FixedBitSet,
    rules: Option<&'a LeaseRules>,
}

impl<'a> LeaseTermDp<'a> {
    #[inline]
    pub fn new(rent: &'a RentFunction, window: TimeWindow, max_terms: usize) -> Self {
        Self {
            rent,
            window,
            max_terms,
            weights: None,
            required: FixedBitSet::with_capacity(window.end()),
            forbidden: FixedBitSet::with_capacity(window.end()),
            rules: None,
        }
    }

    /// Per-period weights indexed by absolute period.
    #[inline]
    pub fn with_weights(mut self, weights: &'a [f64]) -> Self {
        self.weights = Some(weights);
        self
    }

    #[inline]
    pub fn with_rules(mut self, rules: &'a LeaseRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Requires every period of `window` to be leased.
    pub fn require(&mut self, window: TimeWindow) {
        for t in window.slots() {
            self.require_slot(t);
        }
    }

    #[inline]
    pub fn require_slot(&mut self, slot: usize) {
        self.required.grow(slot + 1);
        self.required.insert(slot);
    }

    #[inline]
    pub fn forbid_slot(&mut self, slot: usize) {
        self.forbidden.grow(slot + 1);
        self.forbidden.insert(slot);
    }

    #[inline]
    fn weight(&self, slot: usize) -> f64 {
        self.weights
            .and_then(|w| w.get(slot).copied())
            .unwrap_or(0.0)
    }

    /// Solves the program. Returns `None` when no admissible pattern exists,
    /// for instance when a required period lies outside the window.
    pub fn solve(&self) -> Option<LeasePlan> {
        let a = self.window.begin();
        let z = self.window.end();
        if self
            .required
            .ones()
            .any(|t| t < a || t >= z || self.forbidden.contains(t))
        {
            return None;
        }
        let q = self.max_terms;
        let len = z - a + 1;

        // required_after[i]: whether a required period exists at or after instant a + i.
        let mut required_after = vec![false; len + 1];
        for i in (0..len).rev() {
            let t = a + i;
            required_after[i] = required_after[i + 1] || (t < z && self.required.contains(t));
        }
        // first forbidden period at or after each instant.
        let mut next_forbidden = vec![z; len + 1];
        for i in (0..len).rev() {
            let t = a + i;
            next_forbidden[i] = if t < z && self.forbidden.contains(t) {
                t
            } else {
                next_forbidden[i + 1]
            };
        }
        let mut prefix = vec![0.0; len];
        for i in 1..len {
            prefix[i] = prefix[i - 1] + self.weight(a + i - 1);
        }

        let neg = f64::NEG_INFINITY;
        let mut f = vec![vec![neg; len]; q + 1];
        let mut f_choice = vec![vec![Choice::Infeasible; len]; q + 1];
        let mut g_end = vec![vec![0usize; len]; q];

        for k in (0..=q).rev() {
            let can_stop = self.rules.is_none_or(|r| r.admits_stop(k));
            let mut h = neg;
            let mut h_start = 0usize;
            for i in (0..len).rev() {
                let t = a + i;
                if k < q && t < z {
                    // G(k, t)
                    let mut g = neg;
                    let mut best_e = 0;
                    let limit = next_forbidden[i];
                    for e in (t + 1)..=limit {
                        let window = TimeWindow::new_unchecked(t, e);
                        if let Some(rules) = self.rules
                            && !rules.admits_term(k, window, self.rent)
                        {
                            continue;
                        }
                        let tail = f[k + 1][e - a];
                        if tail == neg {
                            continue;
                        }
                        let value =
                            prefix[e - a] - prefix[i] - self.rent.rent(e - t) + tail;
                        if value > g {
                            g = value;
                            best_e = e;
                        }
                    }
                    g_end[k][i] = best_e;
                    let required_here = self.required.contains(t);
                    if required_here || g > h {
                        h = g;
                        h_start = t;
                    }
                } else {
                    h = neg;
                }
                let stop = if can_stop && !required_after[i] {
                    0.0
                } else {
                    neg
                };
                if stop >= h && stop > neg {
                    f[k][i] = stop;
                    f_choice[k][i] = Choice::Stop;
                } else if h > neg {
                    f[k][i] = h;
                    f_choice[k][i] = Choice::Start(h_start);
                }
            }
        }

        let value = f[0][0];
        if value == neg {
            return None;
        }
        let mut terms: SmallVec<[TimeWindow; 4]> = SmallVec::new();
        let mut k = 0;
        let mut i = 0;
        while k <= q {
            match f_choice[k][i] {
                Choice::Stop | Choice::Infeasible => break,
                Choice::Start(b) => {
                    let e = g_end[k][b - a];
                    terms.push(TimeWindow::new_unchecked(b, e));
                    i = e - a;
                    k += 1;
                }
            }
        }
        let rent_cost = terms.iter().map(|w| self.rent.rent(w.len())).sum();
        Some(LeasePlan {
            value,
            rent_cost,
            terms,
        })
    }
}

/// The cheapest covering of `windows` with at most `max_terms` terms inside `available`.
pub fn cheapest_cover<I>(
    rent: &RentFunction,
    available: TimeWindow,
    max_terms: usize,
    windows: I,
) -> Option<LeasePlan>
where
    I: IntoIterator<Item = TimeWindow>,
{
    let mut dp = LeaseTermDp::new(rent, available, max_terms);
    for w in windows {
        dp.require(w);
    }
    dp.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlease_model::rent::RentSegment;

    #[test]
    fn test_single_term_covers_everything() {
        let rent = RentFunction::flat(10.0, 5);
        let plan = cheapest_cover(
            &rent,
            TimeWindow::new(0, 5),
            2,
            [TimeWindow::new(0, 3), TimeWindow::new(3, 5)],
        )
        .expect("coverable");
        assert_eq!(plan.rent_cost, 10.0);
        assert_eq!(plan.value, -10.0);
        assert_eq!(plan.terms.as_slice(), &[TimeWindow::new(0, 5)]);
    }

    #[test]
    fn test_gap_is_skipped_with_linear_rent() {
        // 1 + 2d per term: two short terms beat one long term over a gap of 4
        let rent = RentFunction::new([RentSegment::new(2.0, 1.0, 20)]).expect("valid rent");
        let plan = cheapest_cover(
            &rent,
            TimeWindow::new(0, 10),
            2,
            [TimeWindow::new(0, 2), TimeWindow::new(6, 8)],
        )
        .expect("coverable");
        assert_eq!(
            plan.terms.as_slice(),
            &[TimeWindow::new(0, 2), TimeWindow::new(6, 8)]
        );
        assert_eq!(plan.rent_cost, 10.0);

        let one = cheapest_cover(
            &rent,
            TimeWindow::new(0, 10),
            1,
            [TimeWindow::new(0, 2), TimeWindow::new(6, 8)],
        )
        .expect("coverable");
        assert_eq!(one.terms.as_slice(), &[TimeWindow::new(0, 8)]);
        assert_eq!(one.rent_cost, 17.0);
    }

    #[test]
    fn test_empty_requirement_leases_nothing() {
        let rent = RentFunction::flat(3.0, 5);
        let plan = cheapest_cover(&rent, TimeWindow::new(0, 5), 3, []).expect("trivial");
        assert!(plan.terms.is_empty());
        assert_eq!(plan.value, 0.0);
    }

    #[test]
    fn test_required_outside_window_is_infeasible() {
        let rent = RentFunction::flat(3.0, 5);
        assert!(cheapest_cover(&rent, TimeWindow::new(2, 5), 1, [TimeWindow::new(0, 3)]).is_none());
        assert!(cheapest_cover(&rent, TimeWindow::new(0, 5), 0, [TimeWindow::new(0, 3)]).is_none());
    }

    #[test]
    fn test_weights_pick_profitable_terms() {
        let rent = RentFunction::new([RentSegment::new(2.0, 0.0, 10)]).expect("valid rent");
        let weights = [3.0, 3.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        let plan = LeaseTermDp::new(&rent, TimeWindow::new(0, 8), 2)
            .with_weights(&weights)
            .solve()
            .expect("feasible");
        assert_eq!(plan.terms.as_slice(), &[TimeWindow::new(0, 2)]);
        assert_eq!(plan.value, 2.0);
    }

    #[test]
    fn test_forbidden_slot_splits_terms() {
        let rent = RentFunction::flat(1.0, 10);
        let mut dp = LeaseTermDp::new(&rent, TimeWindow::new(0, 6), 3);
        dp.require(TimeWindow::new(0, 2));
        dp.require(TimeWindow::new(4, 6));
        dp.forbid_slot(3);
        let plan = dp.solve().expect("feasible");
        assert_eq!(plan.terms.len(), 2);
        assert!(plan.terms.iter().all(|w| !w.contains_slot(3)));
        assert_eq!(plan.rent_cost, 2.0);
    }

    #[test]
    fn test_rules_fix_segment_and_bounds() {
        let rent = RentFunction::new([RentSegment::new(0.0, 5.0, 2), RentSegment::new(0.0, 6.0, 10)])
            .expect("valid rent");
        let mut rules = LeaseRules::new(10);
        // the first term must use the short segment
        rules.fix_segment(0, 0, true);
        let mut dp = LeaseTermDp::new(&rent, TimeWindow::new(0, 10), 3).with_rules(&rules);
        dp.require(TimeWindow::new(0, 4));
        let plan = dp.solve().expect("feasible");
        assert!(plan.terms[0].len() <= 2);
        assert_eq!(plan.terms.len(), 2);
        assert_eq!(plan.rent_cost, 10.0);

        let mut rules = LeaseRules::new(10);
        rules.bound_begin(1, Bound::AtMost(6));
        let mut dp = LeaseTermDp::new(&rent, TimeWindow::new(0, 10), 3).with_rules(&rules);
        dp.require(TimeWindow::new(0, 4));
        let plan = dp.solve().expect("feasible");
        assert_eq!(plan.terms.len(), 2, "a second term must exist");
        assert!(plan.terms[1].begin() <= 6);
    }

    #[test]
    fn test_stop_rules() {
        let mut rules = LeaseRules::new(8);
        rules.bound_end(1, Bound::AtMost(7));
        assert!(!rules.admits_stop(1));
        assert!(rules.admits_stop(2));
        let mut rules = LeaseRules::new(8);
        rules.bound_begin(0, Bound::AtLeast(3));
        assert!(rules.admits_stop(0));
    }
}
