//! Nodes of the condition graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{Action, CombinatorKind, CompareOp, ConditionId, SensorId, TypedValue};

/// Stable handle of a node in a [`ConditionGraph`](super::ConditionGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node with its cached status and incoming parent edges.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub status: bool,
    /// One entry per edge. A parent listing this node twice as a child
    /// appears here twice, so each edge gets its own counter step.
    pub parents: SmallVec<[NodeId; 2]>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Predicate(PredicateNode),
    Combinator(CombinatorNode),
    Root(RootNode),
}

/// Leaf test `field OP literal` on one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateNode {
    pub sensor: SensorId,
    pub field: String,
    pub op: CompareOp,
    /// Already coerced to the field's declared type.
    pub literal: TypedValue,
}

impl PredicateNode {
    /// Status for a field value; undefined comparisons yield `None`.
    pub fn test(&self, value: &TypedValue) -> Option<bool> {
        value.compare(self.op, &self.literal)
    }
}

/// AND/OR aggregation over an ordered child list.
#[derive(Debug, Clone)]
pub struct CombinatorNode {
    pub kind: CombinatorKind,
    pub children: SmallVec<[NodeId; 4]>,
    /// Number of child edges whose child is currently true.
    pub true_children: usize,
}

/// Top of one named condition.
#[derive(Debug, Clone)]
pub struct RootNode {
    pub condition: ConditionId,
    pub name: Option<String>,
    pub child: NodeId,
    pub actions: Vec<Action>,
}

impl Node {
    pub(crate) fn leaf(predicate: PredicateNode, status: bool) -> Self {
        Self {
            kind: NodeKind::Predicate(predicate),
            status,
            parents: SmallVec::new(),
        }
    }

    pub fn as_predicate(&self) -> Option<&PredicateNode> {
        match &self.kind {
            NodeKind::Predicate(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_combinator(&self) -> Option<&CombinatorNode> {
        match &self.kind {
            NodeKind::Combinator(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_root(&self) -> Option<&RootNode> {
        match &self.kind {
            NodeKind::Root(r) => Some(r),
            _ => None,
        }
    }

    /// Apply one child edge transition and recompute the status.
    ///
    /// Returns whether the status changed.
    pub(crate) fn shift(&mut self, child_became_true: bool) -> bool {
        let before = self.status;
        match &mut self.kind {
            NodeKind::Combinator(c) => {
                if child_became_true {
                    debug_assert!(c.true_children < c.children.len());
                    c.true_children = (c.true_children + 1).min(c.children.len());
                } else {
                    debug_assert!(c.true_children > 0);
                    c.true_children = c.true_children.saturating_sub(1);
                }
                self.status = c.kind.status(c.true_children, c.children.len());
            }
            NodeKind::Root(_) => self.status = child_became_true,
            // leaves have no children
            NodeKind::Predicate(_) => {}
        }
        self.status != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn and_of(n: usize) -> Node {
        Node {
            kind: NodeKind::Combinator(CombinatorNode {
                kind: CombinatorKind::And,
                children: (0..n as u32).map(NodeId).collect(),
                true_children: 0,
            }),
            status: false,
            parents: smallvec![],
        }
    }

    #[test]
    fn test_and_shift() {
        let mut node = and_of(2);
        assert!(!node.shift(true));
        assert!(node.shift(true));
        assert!(node.status);
        assert!(node.shift(false));
        assert!(!node.status);
    }

    #[test]
    fn test_root_mirrors_child() {
        let mut root = Node {
            kind: NodeKind::Root(RootNode {
                condition: ConditionId(1),
                name: None,
                child: NodeId(0),
                actions: Vec::new(),
            }),
            status: false,
            parents: smallvec![],
        };
        assert!(root.shift(true));
        assert!(!root.shift(true));
        assert!(root.shift(false));
    }
}
