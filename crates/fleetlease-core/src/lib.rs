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

//! # Fleetlease Core
//!
//! Foundational utilities shared by the fleetlease crates: numeric
//! tolerances used by every floating point comparison in the column
//! generation engine, saturating counters for statistics, strongly typed
//! indices, and the half-open discrete time windows `(begin, end]` that
//! describe orders, shifts and lease terms.
//!
//! ## Modules
//!
//! - `math`: `TimeWindow`, a window `(begin, end]` over discrete periods with
//!   overlap, containment, hull and period iteration.
//! - `num`: the solver tolerance (`PRECISION`) and helpers built on it, plus
//!   by-value saturating arithmetic traits.
//! - `utils`: phantom-tagged typed indices (`TypedIndex<T>`).

pub mod math;
pub mod num;
pub mod utils;
