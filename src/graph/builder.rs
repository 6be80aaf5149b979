//! Turns a parsed expression into graph nodes.
//!
//! Two passes. [`resolve`] checks every reference and coerces every literal
//! without touching the graph; only a fully resolved expression reaches
//! [`build`], which cannot fail. A rejected condition therefore never
//! leaves stray nodes or subscriptions behind.

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::{ConditionGraph, NodeId, PredicateNode};
use crate::expr::ast::{Expr, PredicateExpr};
use crate::model::{CombinatorKind, Sensor, SensorId};
use crate::{Error, Result};

/// An expression whose references are known to be valid.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Predicate(PredicateNode),
    Combinator(CombinatorKind, Vec<Resolved>),
}

pub(crate) fn resolve(expr: &Expr, sensors: &HashMap<SensorId, Sensor>) -> Result<Resolved> {
    match expr {
        Expr::Predicate(p) => resolve_predicate(p, sensors).map(Resolved::Predicate),
        Expr::Combinator(c) => {
            let children = c
                .children
                .iter()
                .map(|child| resolve(child, sensors))
                .collect::<Result<Vec<_>>>()?;
            Ok(Resolved::Combinator(c.kind, children))
        }
    }
}

fn resolve_predicate(p: &PredicateExpr, sensors: &HashMap<SensorId, Sensor>) -> Result<PredicateNode> {
    let sensor = sensors.get(&p.sensor).ok_or(Error::UnknownSensor(p.sensor))?;
    let field = sensor.field(&p.field).ok_or_else(|| Error::UnknownField {
        sensor: p.sensor,
        field: p.field.clone(),
    })?;
    let literal = field.ty.coerce(&p.literal.text).ok_or_else(|| Error::MalformedExpression {
        position: p.literal.span.start,
        message: format!("Literal '{}' is not a valid {} for field '{}'", p.literal.text, field.ty, p.field),
    })?;

    Ok(PredicateNode {
        sensor: p.sensor,
        field: p.field.clone(),
        op: p.op,
        literal,
    })
}

/// Intern a resolved expression bottom-up and return its top node.
///
/// New predicates are seeded from the field's current value and
/// subscribed to it.
pub(crate) fn build(
    graph: &mut ConditionGraph,
    sensors: &mut HashMap<SensorId, Sensor>,
    resolved: Resolved,
) -> NodeId {
    match resolved {
        Resolved::Predicate(predicate) => {
            let sensor_id = predicate.sensor;
            let field_name = predicate.field.clone();
            let field = sensors
                .get_mut(&sensor_id)
                .and_then(|s| s.fields.get_mut(&field_name));

            let status = field
                .as_ref()
                .and_then(|f| f.value.as_ref())
                .and_then(|v| predicate.test(v))
                .unwrap_or(false);

            let (id, created) = graph.intern_predicate(predicate, status);
            if created {
                if let Some(field) = field {
                    field.subscribe(id);
                }
            }
            id
        }
        Resolved::Combinator(kind, children) => {
            let children: SmallVec<[NodeId; 4]> = children
                .into_iter()
                .map(|child| build(graph, sensors, child))
                .collect();
            graph.intern_combinator(kind, children)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use crate::model::{FieldType, TypedValue};

    fn sensors() -> HashMap<SensorId, Sensor> {
        let mut map = HashMap::new();
        map.insert(
            SensorId(2),
            Sensor::new(SensorId(2))
                .with_field("Pressure", FieldType::UnsignedInt)
                .with_field("Temperature", FieldType::UnsignedInt),
        );
        map
    }

    #[test]
    fn test_resolve_coerces_literal() {
        let expr = parse("[2]>(Pressure,20)").unwrap();
        let Resolved::Predicate(p) = resolve(&expr, &sensors()).unwrap() else {
            panic!("expected predicate");
        };
        assert_eq!(p.literal, TypedValue::UnsignedInt(20));
    }

    #[test]
    fn test_resolve_rejects_bad_references() {
        let s = sensors();
        let err = resolve(&parse("[9]>(Pressure,20)").unwrap(), &s).unwrap_err();
        assert!(matches!(err, Error::UnknownSensor(SensorId(9))));

        let err = resolve(&parse("[2]>(Flow,20)").unwrap(), &s).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));

        let err = resolve(&parse("[2]>(Pressure,hot)").unwrap(), &s).unwrap_err();
        assert!(matches!(err, Error::MalformedExpression { position: 14, .. }));
    }

    #[test]
    fn test_build_subscribes_once() {
        let mut s = sensors();
        let mut g = ConditionGraph::new();
        let expr = parse("[2]|(>(Pressure,20),>(Pressure,20))").unwrap();
        let resolved = resolve(&expr, &s).unwrap();
        build(&mut g, &mut s, resolved);

        let field = s[&SensorId(2)].field("Pressure").unwrap();
        assert_eq!(field.subscribers.len(), 1);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_build_seeds_from_current_value() {
        let mut s = sensors();
        s.get_mut(&SensorId(2))
            .unwrap()
            .fields
            .get_mut("Pressure")
            .unwrap()
            .value = Some(TypedValue::UnsignedInt(30));

        let mut g = ConditionGraph::new();
        let resolved = resolve(&parse("[2]>(Pressure,20)").unwrap(), &s).unwrap();
        let id = build(&mut g, &mut s, resolved);
        assert!(g.get(id).status);
    }
}
