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

//! # Fleetlease Model
//!
//! **The domain model of the equipment leasing and scheduling problem.**
//!
//! A company leases equipment units from a supplier under piecewise rent
//! functions and uses them to serve customer orders. A customer pays its
//! revenue only if all of its orders are served over their whole windows.
//! This crate describes instances and solutions; the solving engine lives in
//! `fleetlease_bnp`.
//!
//! ## Architecture
//!
//! * **`index`**: strongly typed indices for equipment, order instances,
//!   customers and order groups.
//! * **`rent`**: the piecewise rent function of a unit.
//! * **`location`**: planar locations and distance metrics.
//! * **`model`**: raw input specs, `InstanceBuilder` and the derived,
//!   immutable `Instance` (compatible units, split windows, flexible
//!   instances, shift and lease-term limits, travel costs).
//! * **`plan`**: concrete lease terms and shifts.
//! * **`solution`**: integral plans, objective bookkeeping and verification.
//! * **`loading`**: a tagged-record text format for instances.

pub mod index;
pub mod loading;
pub mod location;
pub mod model;
pub mod plan;
pub mod rent;
pub mod solution;
