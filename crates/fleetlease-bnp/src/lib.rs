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

//! Fleetlease-BnP: branch-and-price for equipment leasing and scheduling
//!
//! Decides which customers to accept, which lease terms to sign for every
//! equipment unit and how each unit serves the accepted orders, so that
//! revenue minus rent and schedule costs is maximal.
//!
//! Core flow
//! - Provide a `fleetlease_model::model::Instance`.
//! - Pick a `config::BnpConfig` (search order, pricing method, master layout).
//! - Pick an `LpOracle` for the restricted master, e.g. `HighsOracle`.
//! - Run `bnp::BnpSolver`, optionally with monitors and an interrupt flag.
//!
//! Design highlights
//! - Columns are schemes: a lease plan, a work plan, or both, for one unit.
//!   Pools live on the nodes and children inherit their parent's columns.
//! - Pricing is exact per unit: label setting, enumeration, or an integer
//!   program for the lease terms. Every call yields a Lagrangian bound.
//! - Branching fixes acceptance, usage or lease-term quantities; constraints
//!   filter pools and are passed to pricing as restrictions.
//! - One writer: nodes are processed one at a time and the driver owns the
//!   incumbent, so runs are deterministic. Pricing of the units of one node
//!   may run in parallel.
//!
//! Module map
//! - `bnp`: the solver and its search session.
//! - `colgen`: column generation at one node.
//! - `master`: the restricted master problem and its duals.
//! - `pricing`: pricing problems and the three pricing methods.
//! - `lease`: cheapest lease covers by dynamic programming.
//! - `branching`: branching constraints, candidate selection, pool filters.
//! - `heuristics`: greedy seed and bound, rounding repair.
//! - `node`, `queue`: search-tree nodes and the open set.
//! - `monitor`: tree-search monitors (log, time limit, composite, wrapper).
//! - `context`, `stats`, `result`: run state, counters and outcomes.

pub mod bnp;
pub mod branching;
pub mod colgen;
pub mod config;
pub mod context;
pub mod error;
pub mod heuristics;
pub mod lease;
pub mod master;
pub mod monitor;
pub mod node;
pub mod pool;
pub mod pricing;
pub mod queue;
pub mod result;
pub mod scheme;
pub mod stats;
