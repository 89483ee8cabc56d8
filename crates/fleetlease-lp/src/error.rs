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

//! Errors raised while building or solving a linear program.

use crate::problem::ColumnIndex;

#[derive(Debug, Clone, PartialEq)]
pub enum LpError {
    /// A column or row name is already taken.
    DuplicateName(String),
    /// A row references a column that does not exist.
    UnknownColumn(ColumnIndex),
    /// Bounds are inverted or the lower bound is not finite.
    InvalidBounds {
        column: ColumnIndex,
        lower: f64,
        upper: f64,
    },
    /// A cost, coefficient or right-hand side is not finite.
    InvalidCoefficient { name: String },
    /// The solver backend failed for a reason other than infeasibility,
    /// unboundedness or a limit.
    Backend(String),
}

impl std::fmt::Display for LpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "name '{}' is already in use", name),
            Self::UnknownColumn(c) => write!(f, "unknown column {}", c),
            Self::InvalidBounds {
                column,
                lower,
                upper,
            } => write!(f, "{} has invalid bounds [{}, {}]", column, lower, upper),
            Self::InvalidCoefficient { name } => {
                write!(f, "'{}' has a coefficient that is not finite", name)
            }
            Self::Backend(message) => write!(f, "solver backend failed: {}", message),
        }
    }
}

impl std::error::Error for LpError {}
