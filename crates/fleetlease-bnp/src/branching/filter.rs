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

//! Removal of pooled columns a node's decisions no longer admit.

use super::constraint::BranchConstraint;
use crate::{pool::NodePools, pricing::restrictions::Restrictions};
use fleetlease_model::model::Instance;

/// Drops every column `constraint` rules out. A child inherits pools that
/// already satisfy its parent's decisions, so only the new one is checked.
/// Returns the number of removed columns.
pub fn filter_by(instance: &Instance, pools: &mut NodePools, constraint: &BranchConstraint) -> usize {
    pools.retain(|scheme| constraint.admits(instance, scheme))
}

/// Drops every column the compiled decisions rule out, including services of
/// customers rejected at preprocessing.
pub fn filter_all(instance: &Instance, pools: &mut NodePools, restrictions: &Restrictions) -> usize {
    pools.retain(|scheme| restrictions.admits(instance, scheme))
}
