//! Incremental evaluator.
//!
//! On a field update only the predicates subscribed to that field are
//! re-tested. Each predicate that flips sends one counter step to every
//! parent edge; a parent whose status flips passes the step on to its own
//! parents. Counting true children (instead of recomputing from scratch)
//! keeps a node reached through several changed children correct without
//! visiting it more than once per child transition.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use tracing::debug;

use crate::graph::{ConditionGraph, NodeId, NodeKind};
use crate::model::{Action, ConditionId, Sensor, TypedValue};
use crate::{Error, ErrorSink};

/// A root that turned true, with the actions to hand to a dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredCondition {
    pub condition: ConditionId,
    pub name: Option<String>,
    pub actions: Vec<Action>,
    pub fired_at: DateTime<Utc>,
}

/// Result of applying one or more field updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Roots that went false → true.
    pub fired: Vec<FiredCondition>,
    /// Roots that went true → false.
    pub cleared: Vec<ConditionId>,
    /// Predicate comparisons performed.
    pub comparisons: usize,
    /// Predicates whose status flipped.
    pub predicate_transitions: usize,
}

impl UpdateOutcome {
    pub fn is_quiet(&self) -> bool {
        self.fired.is_empty() && self.cleared.is_empty() && self.predicate_transitions == 0
    }

    pub(crate) fn merge(&mut self, other: UpdateOutcome) {
        self.fired.extend(other.fired);
        self.cleared.extend(other.cleared);
        self.comparisons += other.comparisons;
        self.predicate_transitions += other.predicate_transitions;
    }
}

/// Net status change of a root over one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RootTransition {
    pub node: NodeId,
    pub condition: ConditionId,
    pub now: bool,
}

/// Effects of one field update on the graph.
#[derive(Debug, Default)]
pub(crate) struct FieldEffect {
    pub comparisons: usize,
    pub predicate_transitions: usize,
    pub roots: Vec<RootTransition>,
}

/// Store `value` into `sensor.fields[field]` and settle the graph.
///
/// An undeclared field is reported to `sink` and leaves everything
/// untouched. Predicates whose comparison is undefined for `value` are
/// reported and keep their previous status.
pub(crate) fn apply_field(
    graph: &mut ConditionGraph,
    sensor: &mut Sensor,
    field: &str,
    value: TypedValue,
    sink: &mut dyn ErrorSink,
) -> FieldEffect {
    let sensor_id = sensor.id;
    let Some(slot) = sensor.fields.get_mut(field) else {
        sink.report(Error::UnknownField {
            sensor: sensor_id,
            field: field.to_owned(),
        });
        return FieldEffect::default();
    };

    let mut effect = FieldEffect::default();
    let mut flipped = Vec::new();

    for &id in &slot.subscribers {
        let node = graph.get_mut(id);
        let Some(predicate) = node.as_predicate() else {
            continue;
        };
        let Some(status) = predicate.test(&value) else {
            sink.report(Error::TypeMismatch {
                sensor: sensor_id,
                field: field.to_owned(),
                op: predicate.op,
                expected: predicate.literal.field_type(),
                got: value.field_type(),
            });
            continue;
        };
        effect.comparisons += 1;
        if status != node.status {
            node.status = status;
            flipped.push((id, status));
        }
    }
    slot.value = Some(value);

    effect.predicate_transitions = flipped.len();
    effect.roots = propagate(graph, flipped);
    effect
}

/// Push leaf transitions up to the roots.
///
/// Intermediate nodes may flip more than once while several leaves settle;
/// only each root's net change against its status before the walk is
/// returned, so a root never reports a transient transition.
pub(crate) fn propagate(graph: &mut ConditionGraph, flipped: Vec<(NodeId, bool)>) -> Vec<RootTransition> {
    let mut before: HashMap<NodeId, bool> = HashMap::new();
    let mut order = Vec::new();
    let mut stack = flipped;

    while let Some((child, became_true)) = stack.pop() {
        for i in 0..graph.get(child).parents.len() {
            let parent = graph.get(child).parents[i];
            let node = graph.get_mut(parent);
            let old = node.status;
            if !node.shift(became_true) {
                continue;
            }
            debug!(node = %parent, status = node.status, "node transition");
            if let NodeKind::Root(_) = node.kind {
                if !before.contains_key(&parent) {
                    before.insert(parent, old);
                    order.push(parent);
                }
            } else {
                stack.push((parent, node.status));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let node = graph.get(id);
            let root = node.as_root()?;
            (before.get(&id) != Some(&node.status)).then_some(RootTransition {
                node: id,
                condition: root.condition,
                now: node.status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PredicateNode, RootNode};
    use crate::model::{CombinatorKind, CompareOp, FieldType, SensorId};
    use smallvec::smallvec;

    fn pred(field: &str) -> PredicateNode {
        PredicateNode {
            sensor: SensorId(1),
            field: field.into(),
            op: CompareOp::Eq,
            literal: TypedValue::UnsignedInt(1),
        }
    }

    fn root(graph: &mut ConditionGraph, child: NodeId) -> NodeId {
        graph.add_root(RootNode {
            condition: ConditionId(1),
            name: None,
            child,
            actions: Vec::new(),
        })
    }

    #[test]
    fn test_transient_root_flip_is_not_reported() {
        let mut g = ConditionGraph::new();
        let (p1, _) = g.intern_predicate(pred("A"), false);
        let (p2, _) = g.intern_predicate(pred("B"), true);
        let and = g.intern_combinator(CombinatorKind::And, smallvec![p1, p2]);
        let r = root(&mut g, and);

        g.get_mut(p1).status = true;
        g.get_mut(p2).status = false;
        // popped last-first: p1 rises before p2 falls
        let roots = propagate(&mut g, vec![(p2, false), (p1, true)]);

        assert!(roots.is_empty());
        assert!(!g.get(r).status);
        assert_eq!(g.get(and).as_combinator().map(|c| c.true_children), Some(1));
    }

    #[test]
    fn test_shared_child_reaches_both_roots() {
        let mut g = ConditionGraph::new();
        let (p, _) = g.intern_predicate(pred("A"), false);
        let r1 = root(&mut g, p);
        let r2 = g.add_root(RootNode {
            condition: ConditionId(2),
            name: None,
            child: p,
            actions: Vec::new(),
        });

        g.get_mut(p).status = true;
        let roots = propagate(&mut g, vec![(p, true)]);
        let nodes: Vec<_> = roots.iter().map(|t| t.node).collect();
        assert_eq!(nodes, vec![r1, r2]);
        assert!(roots.iter().all(|t| t.now));
    }

    #[test]
    fn test_apply_unknown_field_is_reported() {
        let mut g = ConditionGraph::new();
        let mut sensor = Sensor::new(SensorId(1)).with_field("A", FieldType::UnsignedInt);
        let mut errors: Vec<Error> = Vec::new();
        let effect = apply_field(&mut g, &mut sensor, "Nope", TypedValue::UnsignedInt(1), &mut errors);
        assert_eq!(effect.comparisons, 0);
        assert!(matches!(errors.as_slice(), [Error::UnknownField { .. }]));
        assert_eq!(sensor.value("A"), None);
    }

    #[test]
    fn test_apply_type_mismatch_keeps_status() {
        let mut g = ConditionGraph::new();
        let mut sensor = Sensor::new(SensorId(1)).with_field("A", FieldType::UnsignedInt);
        let (p, _) = g.intern_predicate(pred("A"), true);
        sensor.fields.get_mut("A").unwrap().subscribe(p);

        let mut errors: Vec<Error> = Vec::new();
        let effect = apply_field(&mut g, &mut sensor, "A", TypedValue::SignedInt(1), &mut errors);
        assert_eq!(effect.comparisons, 0);
        assert!(g.get(p).status);
        assert!(matches!(errors.as_slice(), [Error::TypeMismatch { .. }]));
        // the value is still recorded
        assert_eq!(sensor.value("A"), Some(&TypedValue::SignedInt(1)));
    }
}
