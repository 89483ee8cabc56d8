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

//! # Search Tree Nodes
//!
//! A node owns the branch decisions on its path from the root, its own copy
//! of the column pools, and the best relaxation bound proven for it so far.
//! Children deep-copy their parent's pools when created and from then on
//! evolve independently, so no column removed in one subtree can resurface in
//! it through a sibling.
//!
//! State machine:
//!
//! ```text
//! Active -> PrunedInfeasible | PrunedByBound | Integer | Branched
//! ```

use crate::{
    branching::{constraint::BranchConstraint, filter, select::Branching},
    pool::NodePools,
    pricing::restrictions::Restrictions,
};
use fleetlease_core::num::tolerance::PRECISION;
use fleetlease_model::model::Instance;

/// Life-cycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeState {
    #[default]
    Active,
    /// The relaxation has no proper solution.
    PrunedInfeasible,
    /// The bound does not exceed the incumbent.
    PrunedByBound,
    /// The relaxation solution is integral.
    Integer,
    /// Two children were created.
    Branched,
}

impl NodeState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NodeState::Active)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Active => write!(f, "ACTIVE"),
            NodeState::PrunedInfeasible => write!(f, "PRUNED_INFEASIBLE"),
            NodeState::PrunedByBound => write!(f, "PRUNED_BY_BOUND"),
            NodeState::Integer => write!(f, "INTEGER_SOLUTION"),
            NodeState::Branched => write!(f, "BRANCHED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: usize,
    parent: Option<usize>,
    depth: usize,
    constraints: Vec<BranchConstraint>,
    pools: NodePools,
    bound: f64,
    relaxation: Option<f64>,
    state: NodeState,
}

impl Node {
    /// The root node with the seeded pools and an initial bound.
    pub fn root(pools: NodePools, bound: f64) -> Self {
        Self {
            id: 0,
            parent: None,
            depth: 0,
            constraints: Vec::new(),
            pools,
            bound,
            relaxation: None,
            state: NodeState::Active,
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The decisions on the path from the root, oldest first.
    #[inline]
    pub fn constraints(&self) -> &[BranchConstraint] {
        &self.constraints
    }

    /// The decision that created this node.
    #[inline]
    pub fn constraint(&self) -> Option<&BranchConstraint> {
        self.constraints.last()
    }

    #[inline]
    pub fn pools(&self) -> &NodePools {
        &self.pools
    }

    #[inline]
    pub fn pools_mut(&mut self) -> &mut NodePools {
        &mut self.pools
    }

    /// Best bound proven for this node.
    #[inline]
    pub fn bound(&self) -> f64 {
        self.bound
    }

    /// Objective of the last relaxation solved at this node.
    #[inline]
    pub fn relaxation(&self) -> Option<f64> {
        self.relaxation
    }

    #[inline]
    pub fn set_relaxation(&mut self, objective: f64) {
        self.relaxation = Some(objective);
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Replaces the bound when `bound` is smaller by more than the tolerance.
    /// Returns `true` if it was replaced.
    #[inline]
    pub fn tighten(&mut self, bound: f64) -> bool {
        if bound < self.bound - PRECISION {
            self.bound = bound;
            true
        } else {
            false
        }
    }

    /// Moves an active node to a terminal state.
    pub fn close(&mut self, state: NodeState) {
        debug_assert!(
            !self.state.is_terminal(),
            "called `Node::close` on node {} which is already {}",
            self.id,
            self.state
        );
        debug_assert!(
            state.is_terminal(),
            "called `Node::close` with the non-terminal state {}",
            state
        );
        self.state = state;
    }

    /// Compiles the decisions on this node's path.
    #[inline]
    pub fn restrictions(&self, instance: &Instance) -> Restrictions {
        Restrictions::compile(instance, &self.constraints)
    }

    /// Removes the pooled columns this node's decisions rule out. The root
    /// checks every decision, children only the one that created them.
    /// Returns the number of removed columns.
    pub fn clean(&mut self, instance: &Instance, restrictions: &Restrictions) -> usize {
        match self.constraints.last() {
            Some(c) => filter::filter_by(instance, &mut self.pools, c),
            None => filter::filter_all(instance, &mut self.pools, restrictions),
        }
    }

    /// Creates the two children of `branching` with ids `first_id` and
    /// `first_id + 1`, the down child first.
    pub fn branch(&mut self, branching: &Branching, first_id: usize) -> [Node; 2] {
        self.close(NodeState::Branched);
        let make = |id: usize, constraint: BranchConstraint| {
            let mut constraints = Vec::with_capacity(self.constraints.len() + 1);
            constraints.extend_from_slice(&self.constraints);
            constraints.push(constraint);
            Node {
                id,
                parent: Some(self.id),
                depth: self.depth + 1,
                constraints,
                pools: self.pools.clone(),
                bound: self.bound,
                relaxation: None,
                state: NodeState::Active,
            }
        };
        [
            make(first_id, branching.down),
            make(first_id + 1, branching.up),
        ]
    }

    /// Releases the pools of a node that will not be solved again.
    #[inline]
    pub fn release(&mut self) {
        self.pools = NodePools::default();
    }
}
