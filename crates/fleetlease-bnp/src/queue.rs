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

//! Open nodes of the search tree, ordered by the configured strategy.
//!
//! - best bound: a max-heap on the node bound, ties to the smaller id,
//! - depth first: children go to the front, the down child ahead,
//! - breadth first: children go to the back, the down child ahead.

use crate::{config::SearchStrategy, node::Node};
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

/// Heap entry of the best-bound order.
#[derive(Debug)]
struct Ranked(Node);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .bound()
            .total_cmp(&other.0.bound())
            .then_with(|| other.0.id().cmp(&self.0.id()))
    }
}

#[derive(Debug)]
enum Open {
    Heap(BinaryHeap<Ranked>),
    Deque(VecDeque<Node>),
}

#[derive(Debug)]
pub struct NodeQueue {
    strategy: SearchStrategy,
    open: Open,
}

impl NodeQueue {
    pub fn new(strategy: SearchStrategy) -> Self {
        let open = match strategy {
            SearchStrategy::BestBound => Open::Heap(BinaryHeap::new()),
            SearchStrategy::DepthFirst | SearchStrategy::BreadthFirst => {
                Open::Deque(VecDeque::new())
            }
        };
        Self { strategy, open }
    }

    #[inline]
    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.open {
            Open::Heap(h) => h.len(),
            Open::Deque(d) => d.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a single node; it is the next one taken in the deque orders.
    pub fn push(&mut self, node: Node) {
        match &mut self.open {
            Open::Heap(h) => h.push(Ranked(node)),
            Open::Deque(d) => d.push_front(node),
        }
    }

    /// Adds the two children of a branching, down child first.
    pub fn push_children(&mut self, children: [Node; 2]) {
        let [down, up] = children;
        match &mut self.open {
            Open::Heap(h) => {
                h.push(Ranked(down));
                h.push(Ranked(up));
            }
            Open::Deque(d) => match self.strategy {
                SearchStrategy::DepthFirst => {
                    d.push_front(up);
                    d.push_front(down);
                }
                SearchStrategy::BreadthFirst | SearchStrategy::BestBound => {
                    d.push_back(down);
                    d.push_back(up);
                }
            },
        }
    }

    pub fn pop(&mut self) -> Option<Node> {
        match &mut self.open {
            Open::Heap(h) => h.pop().map(|r| r.0),
            Open::Deque(d) => d.pop_front(),
        }
    }

    /// Largest bound over the open nodes.
    pub fn max_bound(&self) -> Option<f64> {
        match &self.open {
            Open::Heap(h) => h.peek().map(|r| r.0.bound()),
            Open::Deque(d) => d.iter().map(Node::bound).reduce(f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        branching::{
            constraint::{Bound, BranchConstraint},
            select::Branching,
        },
        pool::NodePools,
    };
    use fleetlease_model::index::OrderIndex;

    fn branching() -> Branching {
        let order = OrderIndex::new(0);
        Branching {
            down: BranchConstraint::Split {
                order,
                bound: Bound::AtMost(1),
            },
            up: BranchConstraint::Split {
                order,
                bound: Bound::AtLeast(2),
            },
            value: 1.5,
        }
    }

    fn children() -> [Node; 2] {
        let mut root = Node::root(NodePools::new(1), 10.0);
        root.branch(&branching(), 1)
    }

    #[test]
    fn test_depth_first_takes_down_child_first() {
        let mut queue = NodeQueue::new(SearchStrategy::DepthFirst);
        let mut other = Node::root(NodePools::new(1), 3.0);
        let [a, b] = other.branch(&branching(), 10);
        queue.push_children([a, b]);
        queue.push_children(children());
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).map(|n| n.id()).collect();
        assert_eq!(order, vec![1, 2, 10, 11]);
    }

    #[test]
    fn test_breadth_first_is_fifo() {
        let mut queue = NodeQueue::new(SearchStrategy::BreadthFirst);
        queue.push_children(children());
        let mut other = Node::root(NodePools::new(1), 3.0);
        queue.push_children(other.branch(&branching(), 10));
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).map(|n| n.id()).collect();
        assert_eq!(order, vec![1, 2, 10, 11]);
    }

    #[test]
    fn test_best_bound_prefers_bound_then_id() {
        let mut queue = NodeQueue::new(SearchStrategy::BestBound);
        let [mut down, mut up] = children();
        down.tighten(4.0);
        up.tighten(8.0);
        queue.push_children([down, up]);
        let mut other = Node::root(NodePools::new(1), 8.0);
        let [c, d] = other.branch(&branching(), 10);
        queue.push_children([c, d]);
        assert_eq!(queue.max_bound(), Some(8.0));
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).map(|n| n.id()).collect();
        assert_eq!(order, vec![2, 10, 11, 1]);
        assert!(queue.is_empty());
        assert_eq!(queue.max_bound(), None);
    }
}
