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

//! # Fleetlease LP
//!
//! The linear programming layer of the branch-and-price engine.
//!
//! The engine never depends on solver internals. It assembles an
//! [`LpProblem`](problem::LpProblem) from named columns and rows, passes it
//! to an [`LpOracle`](oracle::LpOracle) together with a deadline and an
//! interrupt flag, and reads back objective, primal values, row duals and a
//! status.
//!
//! ## Modules
//!
//! - `problem`: the problem builder with typed column and row indices.
//! - `oracle`: the `LpOracle` trait and `SolveLimits`.
//! - `solution`: `LpSolution` and `LpStatus`.
//! - `highs`: `HighsOracle`, the `good_lp` binding to HiGHS for linear and
//!   mixed-integer problems.
//! - `error`: `LpError`.

pub mod error;
pub mod highs;
pub mod oracle;
pub mod problem;
pub mod solution;
