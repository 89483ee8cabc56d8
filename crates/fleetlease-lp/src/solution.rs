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

//! Results returned by an [`LpOracle`](crate::oracle::LpOracle).

use crate::problem::{ColumnIndex, RowIndex};

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LpStatus {
    /// The returned point is optimal.
    Optimal,
    /// The returned point is feasible but optimality was not proven.
    Feasible,
    Infeasible,
    Unbounded,
    /// The deadline passed or the solve was interrupted before a feasible
    /// point was found.
    TimeLimited,
}

impl LpStatus {
    /// `true` if the primal vector satisfies every row and bound.
    #[inline]
    pub fn has_solution(&self) -> bool {
        matches!(self, LpStatus::Optimal | LpStatus::Feasible)
    }
}

impl std::fmt::Display for LpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LpStatus::Optimal => write!(f, "Optimal"),
            LpStatus::Feasible => write!(f, "Feasible"),
            LpStatus::Infeasible => write!(f, "Infeasible"),
            LpStatus::Unbounded => write!(f, "Unbounded"),
            LpStatus::TimeLimited => write!(f, "TimeLimited"),
        }
    }
}

/// Primal and dual information of a solve.
///
/// Duals follow the convention that the reduced cost of a column is
/// `cost - sum(row coefficient * dual)`. In a maximization problem the duals
/// of `<=` rows are therefore non-negative and those of `>=` rows
/// non-positive. Integer solves report no duals.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    status: LpStatus,
    objective: f64,
    primal: Vec<f64>,
    duals: Vec<f64>,
}

impl LpSolution {
    #[inline]
    pub fn new(status: LpStatus, objective: f64, primal: Vec<f64>, duals: Vec<f64>) -> Self {
        Self {
            status,
            objective,
            primal,
            duals,
        }
    }

    /// A solution without primal or dual values.
    #[inline]
    pub fn empty(status: LpStatus) -> Self {
        Self::new(status, f64::NAN, Vec::new(), Vec::new())
    }

    #[inline]
    pub fn status(&self) -> LpStatus {
        self.status
    }

    #[inline]
    pub fn objective(&self) -> f64 {
        self.objective
    }

    #[inline]
    pub fn primal(&self) -> &[f64] {
        &self.primal
    }

    #[inline]
    pub fn duals(&self) -> &[f64] {
        &self.duals
    }

    #[inline]
    pub fn value(&self, column: ColumnIndex) -> f64 {
        self.primal.get(column.get()).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn dual(&self, row: RowIndex) -> f64 {
        self.duals.get(row.get()).copied().unwrap_or(0.0)
    }
}
