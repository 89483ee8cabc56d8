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

//! # HiGHS Oracle
//!
//! Hands an [`LpProblem`] to HiGHS through `good_lp`. Columns become
//! variables with their bounds and integrality. Rows are added in `<=` or `=`
//! orientation, a `>=` row negated, so the row duals HiGHS reports can be
//! mapped back to the sense of each row. A maximization is passed to HiGHS
//! with its objective negated.
//!
//! Duals are read only for problems without integer columns. The deadline
//! of the [`SolveLimits`] becomes the HiGHS time limit; the interrupt flag
//! is checked before and after the call.

use crate::{
    error::LpError,
    oracle::{LpOracle, SolveLimits},
    problem::{LpProblem, Objective, RowSense},
    solution::{LpSolution, LpStatus},
};
use good_lp::solvers::highs::highs;
use good_lp::*;
use std::{
    sync::{Mutex, PoisonError},
    time::Instant,
};

/// Largest bound or row violation accepted for a point HiGHS returned on a
/// time limit.
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// An LP and MIP oracle backed by HiGHS.
///
/// Solves are serialized through a single slot, so pricing threads sharing
/// the oracle never run two HiGHS instances at once.
#[derive(Debug, Default)]
pub struct HighsOracle {
    slot: Mutex<()>,
}

impl HighsOracle {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LpOracle for HighsOracle {
    fn name(&self) -> &str {
        "HiGHS"
    }

    fn solve(&self, problem: &LpProblem, limits: &SolveLimits<'_>) -> Result<LpSolution, LpError> {
        if limits.should_stop() {
            return Ok(LpSolution::empty(LpStatus::TimeLimited));
        }
        if problem.num_columns() == 0 {
            return Ok(without_columns(problem));
        }

        let integer = problem.has_integers();
        let sign = match problem.objective() {
            Objective::Minimize => 1.0,
            Objective::Maximize => -1.0,
        };

        let mut vars = ProblemVariables::new();
        let columns: Vec<Variable> = problem
            .columns()
            .iter()
            .map(|c| {
                let definition = variable().min(c.lower()).max(c.upper());
                if c.is_integer() {
                    vars.add(definition.integer())
                } else {
                    vars.add(definition)
                }
            })
            .collect();
        let objective = problem
            .columns()
            .iter()
            .zip(&columns)
            .fold(Expression::from(0.0), |acc, (c, &x)| acc + (sign * c.cost()) * x);

        let mut model = vars.minimise(objective).using(highs);
        if let Some(deadline) = limits.deadline() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            model = model.with_time_limit(remaining.as_secs_f64());
        }

        let mut references = Vec::with_capacity(problem.num_rows());
        let mut orientation = Vec::with_capacity(problem.num_rows());
        for row in problem.rows() {
            let flip = match row.sense() {
                RowSense::GreaterEqual => -1.0,
                RowSense::LessEqual | RowSense::Equal => 1.0,
            };
            let lhs = row
                .entries()
                .iter()
                .fold(Expression::from(0.0), |acc, &(c, a)| acc + (flip * a) * columns[c.get()]);
            let constraint = match row.sense() {
                RowSense::Equal => lhs.eq(row.rhs()),
                RowSense::LessEqual | RowSense::GreaterEqual => lhs.leq(flip * row.rhs()),
            };
            references.push(model.add_constraint(constraint));
            orientation.push(flip);
        }

        let solved = {
            let _slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            model.solve()
        };
        let cut_short = limits.should_stop();
        let mut solution = match solved {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => return Ok(LpSolution::empty(LpStatus::Infeasible)),
            Err(ResolutionError::Unbounded) => return Ok(LpSolution::empty(LpStatus::Unbounded)),
            Err(_) if cut_short => return Ok(LpSolution::empty(LpStatus::TimeLimited)),
            Err(e) => return Err(LpError::Backend(e.to_string())),
        };

        let primal: Vec<f64> = problem
            .columns()
            .iter()
            .zip(&columns)
            .map(|(c, &x)| {
                let value = solution.value(x);
                if c.is_integer() { value.round() } else { value }
            })
            .collect();
        let objective = problem.evaluate(&primal);

        if cut_short {
            tracing::debug!(integer, "HiGHS returned after the deadline");
            if integer && problem.max_violation(&primal) <= FEASIBILITY_TOLERANCE {
                return Ok(LpSolution::new(LpStatus::Feasible, objective, primal, Vec::new()));
            }
            return Ok(LpSolution::empty(LpStatus::TimeLimited));
        }

        let duals = if integer {
            Vec::new()
        } else {
            // d(objective)/d(rhs) in the sense of each row
            let dual = solution.compute_dual();
            references
                .into_iter()
                .zip(orientation)
                .map(|(r, flip)| sign * flip * dual.dual(r))
                .collect()
        };
        tracing::trace!(
            columns = problem.num_columns(),
            rows = problem.num_rows(),
            integer,
            objective,
            "HiGHS solve finished"
        );
        Ok(LpSolution::new(LpStatus::Optimal, objective, primal, duals))
    }
}

/// A problem without columns is decided by its right-hand sides alone.
fn without_columns(problem: &LpProblem) -> LpSolution {
    if problem.max_violation(&[]) <= FEASIBILITY_TOLERANCE {
        LpSolution::new(LpStatus::Optimal, 0.0, Vec::new(), vec![0.0; problem.num_rows()])
    } else {
        LpSolution::empty(LpStatus::Infeasible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ColumnIndex;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::AtomicBool;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn solve(lp: &LpProblem) -> LpSolution {
        HighsOracle::new()
            .solve(lp, &SolveLimits::none())
            .expect("solve")
    }

    #[test]
    fn test_maximize_with_duals() {
        let mut lp = LpProblem::new(Objective::Maximize);
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0).expect("column");
        let y = lp.add_column("y", 0.0, f64::INFINITY, 1.0).expect("column");
        let r1 = lp
            .add_row("r1", RowSense::LessEqual, 4.0, [(x, 1.0), (y, 2.0)])
            .expect("row");
        let r2 = lp
            .add_row("r2", RowSense::LessEqual, 6.0, [(x, 3.0), (y, 1.0)])
            .expect("row");
        let sol = solve(&lp);
        assert_eq!(sol.status(), LpStatus::Optimal);
        assert!(close(sol.objective(), 2.8));
        assert!(close(sol.value(x), 1.6));
        assert!(close(sol.value(y), 1.2));
        assert!(close(sol.dual(r1), 0.4));
        assert!(close(sol.dual(r2), 0.2));
    }

    #[test]
    fn test_greater_equal_row_reports_a_positive_price() {
        let mut lp = LpProblem::new(Objective::Minimize);
        let x = lp.add_column("x", 0.0, 3.0, 2.0).expect("column");
        let y = lp.add_column("y", 0.0, f64::INFINITY, 3.0).expect("column");
        let r = lp
            .add_row("cover", RowSense::GreaterEqual, 4.0, [(x, 1.0), (y, 1.0)])
            .expect("row");
        let sol = solve(&lp);
        assert_eq!(sol.status(), LpStatus::Optimal);
        assert!(close(sol.objective(), 9.0));
        assert!(close(sol.value(x), 3.0));
        assert!(close(sol.value(y), 1.0));
        assert!(close(sol.dual(r), 3.0));
    }

    #[test]
    fn test_equality_with_shifted_lower_bound() {
        let mut lp = LpProblem::new(Objective::Minimize);
        let x = lp.add_column("x", 2.0, f64::INFINITY, 1.0).expect("column");
        let y = lp.add_column("y", 0.0, 10.0, 1.0).expect("column");
        let r = lp
            .add_row("link", RowSense::Equal, 1.0, [(x, 1.0), (y, -1.0)])
            .expect("row");
        let sol = solve(&lp);
        assert_eq!(sol.status(), LpStatus::Optimal);
        assert!(close(sol.objective(), 3.0));
        assert!(close(sol.value(x), 2.0));
        assert!(close(sol.value(y), 1.0));
        assert!(close(sol.dual(r), -1.0));
    }

    #[test]
    fn test_infeasible() {
        let mut lp = LpProblem::new(Objective::Maximize);
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0).expect("column");
        let y = lp.add_column("y", 0.0, f64::INFINITY, 1.0).expect("column");
        lp.add_row("a", RowSense::LessEqual, 1.0, [(x, 1.0), (y, 1.0)])
            .expect("row");
        lp.add_row("b", RowSense::GreaterEqual, 2.0, [(x, 1.0), (y, 1.0)])
            .expect("row");
        let sol = solve(&lp);
        assert_eq!(sol.status(), LpStatus::Infeasible);
        assert!(!sol.status().has_solution());
    }

    #[test]
    fn test_unbounded_has_no_solution() {
        let mut lp = LpProblem::new(Objective::Maximize);
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0).expect("column");
        let y = lp.add_column("y", 0.0, f64::INFINITY, 0.0).expect("column");
        lp.add_row("a", RowSense::LessEqual, 1.0, [(x, 1.0), (y, -1.0)])
            .expect("row");
        let sol = solve(&lp);
        // presolve may not tell an unbounded ray from an empty region
        assert!(matches!(
            sol.status(),
            LpStatus::Unbounded | LpStatus::Infeasible
        ));
    }

    #[test]
    fn test_raised_flag_skips_the_solve() {
        let mut lp = LpProblem::new(Objective::Minimize);
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0).expect("column");
        lp.add_row("a", RowSense::GreaterEqual, 1.0, [(x, 1.0)])
            .expect("row");
        let flag = AtomicBool::new(true);
        let sol = HighsOracle::new()
            .solve(&lp, &SolveLimits::none().with_interrupt(&flag))
            .expect("solve");
        assert_eq!(sol.status(), LpStatus::TimeLimited);
        assert!(sol.primal().is_empty());
    }

    #[test]
    fn test_binary_knapsack() {
        let mut lp = LpProblem::new(Objective::Maximize);
        let a = lp.add_integer_column("a", 0.0, 1.0, 10.0).expect("column");
        let b = lp.add_integer_column("b", 0.0, 1.0, 13.0).expect("column");
        let c = lp.add_integer_column("c", 0.0, 1.0, 7.0).expect("column");
        lp.add_row(
            "weight",
            RowSense::LessEqual,
            9.0,
            [(a, 4.0), (b, 6.0), (c, 3.0)],
        )
        .expect("row");
        let sol = solve(&lp);
        assert_eq!(sol.status(), LpStatus::Optimal);
        assert!(close(sol.objective(), 20.0));
        assert_eq!(sol.value(a), 0.0);
        assert_eq!(sol.value(b), 1.0);
        assert_eq!(sol.value(c), 1.0);
        assert!(sol.duals().is_empty());
    }

    #[test]
    fn test_integer_infeasible() {
        let mut lp = LpProblem::new(Objective::Minimize);
        let x = lp.add_integer_column("x", 0.0, 1.0, 1.0).expect("column");
        lp.add_row("half", RowSense::Equal, 1.0, [(x, 2.0)])
            .expect("row");
        assert_eq!(solve(&lp).status(), LpStatus::Infeasible);
    }

    #[test]
    fn test_problem_without_columns() {
        let mut lp = LpProblem::new(Objective::Maximize);
        lp.add_row("slack", RowSense::LessEqual, 1.0, Vec::new())
            .expect("row");
        let sol = solve(&lp);
        assert_eq!(sol.status(), LpStatus::Optimal);
        assert_eq!(sol.objective(), 0.0);
        assert_eq!(sol.duals(), &[0.0]);

        lp.add_row("impossible", RowSense::GreaterEqual, 1.0, Vec::new())
            .expect("row");
        assert_eq!(solve(&lp).status(), LpStatus::Infeasible);
    }

    #[test]
    fn test_random_packing_problems_satisfy_strong_duality() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..25 {
            let n = rng.random_range(2..8);
            let m = rng.random_range(1..6);
            let mut lp = LpProblem::new(Objective::Maximize);
            let cols: Vec<ColumnIndex> = (0..n)
                .map(|j| {
                    lp.add_column(format!("x{}", j), 0.0, f64::INFINITY, rng.random_range(0.0..10.0))
                        .expect("column")
                })
                .collect();
            let mut rhs = Vec::with_capacity(m);
            for i in 0..m {
                let b = rng.random_range(1.0..20.0);
                rhs.push(b);
                let entries: Vec<(ColumnIndex, f64)> = cols
                    .iter()
                    .map(|&c| (c, rng.random_range(0.5..5.0)))
                    .collect();
                lp.add_row(format!("r{}", i), RowSense::LessEqual, b, entries)
                    .expect("row");
            }
            let sol = solve(&lp);
            assert_eq!(sol.status(), LpStatus::Optimal);
            assert!(lp.max_violation(sol.primal()) < 1e-6);
            let dual_objective: f64 = sol.duals().iter().zip(&rhs).map(|(y, b)| y * b).sum();
            assert!(close(sol.objective(), dual_objective));
            for (j, column) in lp.columns().iter().enumerate() {
                let priced: f64 = lp
                    .rows()
                    .iter()
                    .zip(sol.duals())
                    .map(|(row, y)| {
                        row.entries()
                            .iter()
                            .filter(|(c, _)| c.get() == j)
                            .map(|(_, a)| a * y)
                            .sum::<f64>()
                    })
                    .sum();
                assert!(column.cost() - priced <= 1e-6);
            }
            assert!(sol.duals().iter().all(|&y| y >= -1e-9));
        }
    }
}
