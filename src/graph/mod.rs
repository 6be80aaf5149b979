//! # Condition Graph
//!
//! Arena of predicate, combinator and root nodes addressed by [`NodeId`].
//! Edges are handle lists, never pointers. A structural index maps each
//! node's canonical signature to its handle, so identical sub-expressions
//! collapse into one shared node with several parents.
//!
//! The arena is append-only: conditions are validated before any node is
//! allocated, and nothing is removed short of rebuilding the registry.

pub mod node;
pub(crate) mod builder;

use std::fmt::Write as _;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::{CombinatorKind, CompareOp, SensorId, ValueKey};

pub use node::{CombinatorNode, Node, NodeId, NodeKind, PredicateNode, RootNode};

/// Canonical identity of a shareable node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Signature {
    Predicate {
        sensor: SensorId,
        field: String,
        op: CompareOp,
        literal: ValueKey,
    },
    /// Children are already interned, so their handles stand in for their
    /// signatures. Sorted, duplicates kept: a multiset.
    Combinator {
        kind: CombinatorKind,
        children: SmallVec<[NodeId; 4]>,
    },
}

/// The shared evaluation DAG.
#[derive(Debug, Default)]
pub struct ConditionGraph {
    nodes: Vec<Node>,
    index: HashMap<Signature, NodeId>,
}

impl ConditionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Number of interned (shareable) nodes: predicates plus combinators.
    pub fn shared_len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Find or allocate a predicate. `status` seeds a newly allocated node.
    ///
    /// Returns the handle and whether it was newly allocated.
    pub(crate) fn intern_predicate(&mut self, predicate: PredicateNode, status: bool) -> (NodeId, bool) {
        let sig = Signature::Predicate {
            sensor: predicate.sensor,
            field: predicate.field.clone(),
            op: predicate.op,
            literal: ValueKey::from(&predicate.literal),
        };
        if let Some(&id) = self.index.get(&sig) {
            tracing::debug!(node = %id, "reusing shared predicate");
            return (id, false);
        }
        let id = self.push(Node::leaf(predicate, status));
        self.index.insert(sig, id);
        (id, true)
    }

    /// Find or allocate a combinator over already interned children.
    ///
    /// A new node gets one parent edge on each child and a counter seeded
    /// from the children's current status.
    pub(crate) fn intern_combinator(&mut self, kind: CombinatorKind, children: SmallVec<[NodeId; 4]>) -> NodeId {
        let mut key = children.clone();
        key.sort_unstable();
        let sig = Signature::Combinator { kind, children: key };
        if let Some(&id) = self.index.get(&sig) {
            tracing::debug!(node = %id, "reusing shared combinator");
            return id;
        }

        let true_children = children.iter().filter(|&&c| self.get(c).status).count();
        let status = kind.status(true_children, children.len());
        let id = self.push(Node {
            kind: NodeKind::Combinator(CombinatorNode {
                kind,
                children: children.clone(),
                true_children,
            }),
            status,
            parents: SmallVec::new(),
        });
        for child in children {
            self.get_mut(child).parents.push(id);
        }
        self.index.insert(sig, id);
        id
    }

    /// Allocate a root on top of `child`. Roots are never shared.
    pub(crate) fn add_root(&mut self, root: RootNode) -> NodeId {
        let child = root.child;
        let status = self.get(child).status;
        let id = self.push(Node {
            kind: NodeKind::Root(root),
            status,
            parents: SmallVec::new(),
        });
        self.get_mut(child).parents.push(id);
        id
    }

    /// Canonical, re-parseable text of the subtree under `id`.
    ///
    /// Every predicate carries its own scope, so the output does not depend
    /// on where scopes were written in the source.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Predicate(p) => {
                let _ = write!(out, "[{}]{}({},{})", p.sensor, p.op, p.field, p.literal);
            }
            NodeKind::Combinator(c) => {
                out.push_str(c.kind.symbol());
                out.push('(');
                for (i, child) in c.children.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.render_into(*child, out);
                }
                out.push(')');
            }
            NodeKind::Root(r) => self.render_into(r.child, out),
        }
    }
}
