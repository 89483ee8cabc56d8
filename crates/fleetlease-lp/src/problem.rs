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

//! # Linear Program Builder
//!
//! An `LpProblem` is assembled from named columns (decision variables with
//! bounds, a cost and an integrality flag) and named rows (sparse linear
//! constraints with a sense and a right-hand side). Names are unique within
//! their kind and can be looked up after construction; oracles only ever see
//! the finished problem.

use crate::error::LpError;
use fleetlease_core::utils::index::{TypedIndex, TypedIndexTag};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ColumnIndexTag;

impl TypedIndexTag for ColumnIndexTag {
    const NAME: &'static str = "ColumnIndex";
}

/// Index of a column in an [`LpProblem`].
pub type ColumnIndex = TypedIndex<ColumnIndexTag>;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RowIndexTag;

impl TypedIndexTag for RowIndexTag {
    const NAME: &'static str = "RowIndex";
}

/// Index of a row in an [`LpProblem`].
pub type RowIndex = TypedIndex<RowIndexTag>;

/// Direction of optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Objective {
    #[default]
    Minimize,
    Maximize,
}

/// Relation between the left-hand side of a row and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowSense {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl std::fmt::Display for RowSense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSense::LessEqual => write!(f, "<="),
            RowSense::GreaterEqual => write!(f, ">="),
            RowSense::Equal => write!(f, "="),
        }
    }
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    lower: f64,
    upper: f64,
    cost: f64,
    integer: bool,
}

impl Column {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        self.integer
    }
}

/// A sparse linear constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    name: String,
    sense: RowSense,
    rhs: f64,
    entries: Vec<(ColumnIndex, f64)>,
}

impl Row {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn sense(&self) -> RowSense {
        self.sense
    }

    #[inline]
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Nonzero coefficients; a column appears at most once.
    #[inline]
    pub fn entries(&self) -> &[(ColumnIndex, f64)] {
        &self.entries
    }

    /// Left-hand side value for the primal vector `x`.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.entries.iter().map(|(c, a)| a * x[c.get()]).sum()
    }
}

/// A linear program with optional integrality restrictions.
///
/// ```rust
/// # use fleetlease_lp::problem::{LpProblem, Objective, RowSense};
///
/// let mut lp = LpProblem::new(Objective::Maximize);
/// let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0).unwrap();
/// let y = lp.add_column("y", 0.0, 2.0, 1.0).unwrap();
/// lp.add_row("cap", RowSense::LessEqual, 4.0, [(x, 1.0), (y, 2.0)]).unwrap();
/// assert_eq!(lp.num_columns(), 2);
/// assert_eq!(lp.column_by_name("y"), Some(y));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    objective: Objective,
    columns: Vec<Column>,
    rows: Vec<Row>,
    column_names: FxHashMap<String, ColumnIndex>,
    row_names: FxHashMap<String, RowIndex>,
}

impl LpProblem {
    #[inline]
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            ..Self::default()
        }
    }

    #[inline]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn column(&self, index: ColumnIndex) -> &Column {
        &self.columns[index.get()]
    }

    #[inline]
    pub fn row(&self, index: RowIndex) -> &Row {
        &self.rows[index.get()]
    }

    #[inline]
    pub fn column_by_name(&self, name: &str) -> Option<ColumnIndex> {
        self.column_names.get(name).copied()
    }

    #[inline]
    pub fn row_by_name(&self, name: &str) -> Option<RowIndex> {
        self.row_names.get(name).copied()
    }

    /// `true` if any column carries an integrality restriction.
    #[inline]
    pub fn has_integers(&self) -> bool {
        self.columns.iter().any(|c| c.integer)
    }

    /// Adds a continuous column.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name or when the bounds are inverted, the lower
    /// bound is not finite, or the cost is not finite.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        cost: f64,
    ) -> Result<ColumnIndex, LpError> {
        self.push_column(name.into(), lower, upper, cost, false)
    }

    /// Adds a column restricted to integer values.
    pub fn add_integer_column(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        cost: f64,
    ) -> Result<ColumnIndex, LpError> {
        self.push_column(name.into(), lower, upper, cost, true)
    }

    fn push_column(
        &mut self,
        name: String,
        lower: f64,
        upper: f64,
        cost: f64,
        integer: bool,
    ) -> Result<ColumnIndex, LpError> {
        if self.column_names.contains_key(&name) {
            return Err(LpError::DuplicateName(name));
        }
        let index = ColumnIndex::new(self.columns.len());
        check_bounds(index, lower, upper)?;
        if !cost.is_finite() {
            return Err(LpError::InvalidCoefficient { name });
        }
        self.column_names.insert(name.clone(), index);
        self.columns.push(Column {
            name,
            lower,
            upper,
            cost,
            integer,
        });
        Ok(index)
    }

    /// Adds a row `sum(entries) sense rhs`. Repeated columns are summed and
    /// zero coefficients dropped.
    pub fn add_row<I>(
        &mut self,
        name: impl Into<String>,
        sense: RowSense,
        rhs: f64,
        entries: I,
    ) -> Result<RowIndex, LpError>
    where
        I: IntoIterator<Item = (ColumnIndex, f64)>,
    {
        let name = name.into();
        if self.row_names.contains_key(&name) {
            return Err(LpError::DuplicateName(name));
        }
        if !rhs.is_finite() {
            return Err(LpError::InvalidCoefficient { name });
        }
        let mut merged: FxHashMap<ColumnIndex, f64> = FxHashMap::default();
        let mut order: Vec<ColumnIndex> = Vec::new();
        for (column, value) in entries {
            if column.get() >= self.columns.len() {
                return Err(LpError::UnknownColumn(column));
            }
            if !value.is_finite() {
                return Err(LpError::InvalidCoefficient { name });
            }
            let slot = merged.entry(column).or_insert_with(|| {
                order.push(column);
                0.0
            });
            *slot += value;
        }
        let entries: Vec<(ColumnIndex, f64)> = order
            .into_iter()
            .filter_map(|c| {
                let v = merged.get(&c).copied().unwrap_or(0.0);
                (v != 0.0).then_some((c, v))
            })
            .collect();
        let index = RowIndex::new(self.rows.len());
        self.row_names.insert(name.clone(), index);
        self.rows.push(Row {
            name,
            sense,
            rhs,
            entries,
        });
        Ok(index)
    }

    /// Replaces the bounds of `column`.
    pub fn set_bounds(&mut self, column: ColumnIndex, lower: f64, upper: f64) -> Result<(), LpError> {
        if column.get() >= self.columns.len() {
            return Err(LpError::UnknownColumn(column));
        }
        check_bounds(column, lower, upper)?;
        let c = &mut self.columns[column.get()];
        c.lower = lower;
        c.upper = upper;
        Ok(())
    }

    /// Objective value of the primal vector `x`.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(x)
            .map(|(c, v)| c.cost * v)
            .sum()
    }

    /// Largest violation of any row or bound by `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let bounds = self
            .columns
            .iter()
            .zip(x)
            .map(|(c, &v)| (c.lower - v).max(v - c.upper).max(0.0));
        let rows = self.rows.iter().map(|r| {
            let lhs = r.activity(x);
            match r.sense {
                RowSense::LessEqual => (lhs - r.rhs).max(0.0),
                RowSense::GreaterEqual => (r.rhs - lhs).max(0.0),
                RowSense::Equal => (lhs - r.rhs).abs(),
            }
        });
        bounds.chain(rows).fold(0.0, f64::max)
    }
}

fn check_bounds(column: ColumnIndex, lower: f64, upper: f64) -> Result<(), LpError> {
    if !lower.is_finite() || upper.is_nan() || lower > upper {
        return Err(LpError::InvalidBounds {
            column,
            lower,
            upper,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut lp = LpProblem::new(Objective::Minimize);
        lp.add_column("x", 0.0, 1.0, 1.0).expect("column");
        assert_eq!(
            lp.add_column("x", 0.0, 1.0, 1.0),
            Err(LpError::DuplicateName("x".to_owned()))
        );
        let x = ColumnIndex::new(0);
        lp.add_row("r", RowSense::Equal, 1.0, [(x, 1.0)]).expect("row");
        assert!(matches!(
            lp.add_row("r", RowSense::Equal, 1.0, [(x, 1.0)]),
            Err(LpError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_repeated_entries_are_merged() {
        let mut lp = LpProblem::new(Objective::Minimize);
        let x = lp.add_column("x", 0.0, 1.0, 1.0).expect("column");
        let y = lp.add_column("y", 0.0, 1.0, 1.0).expect("column");
        let r = lp
            .add_row("r", RowSense::LessEqual, 3.0, [(x, 1.0), (y, 2.0), (x, 0.5), (y, -2.0)])
            .expect("row");
        assert_eq!(lp.row(r).entries(), &[(x, 1.5)]);
    }

    #[test]
    fn test_invalid_bounds_and_unknown_column() {
        let mut lp = LpProblem::new(Objective::Minimize);
        assert!(matches!(
            lp.add_column("x", 2.0, 1.0, 0.0),
            Err(LpError::InvalidBounds { .. })
        ));
        assert!(matches!(
            lp.add_column("y", f64::NEG_INFINITY, 1.0, 0.0),
            Err(LpError::InvalidBounds { .. })
        ));
        assert_eq!(
            lp.add_row("r", RowSense::Equal, 0.0, [(ColumnIndex::new(4), 1.0)]),
            Err(LpError::UnknownColumn(ColumnIndex::new(4)))
        );
    }

    #[test]
    fn test_violation_measure() {
        let mut lp = LpProblem::new(Objective::Minimize);
        let x = lp.add_column("x", 0.0, 1.0, 1.0).expect("column");
        lp.add_row("r", RowSense::GreaterEqual, 2.0, [(x, 1.0)])
            .expect("row");
        assert_eq!(lp.max_violation(&[1.0]), 1.0);
        assert_eq!(lp.max_violation(&[1.5]), 0.5);
    }
}
