//! Per-source field state.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{FieldType, TypedValue};
use crate::graph::NodeId;

/// Identifier of a sensor process (a data source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub u32);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, typed telemetry field and the predicates watching it.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    /// Latest decoded value; `None` until the first update arrives.
    pub value: Option<TypedValue>,
    /// Predicate nodes comparing against this field. Each appears once.
    pub subscribers: SmallVec<[NodeId; 4]>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
            subscribers: SmallVec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, node: NodeId) {
        if !self.subscribers.contains(&node) {
            self.subscribers.push(node);
        }
    }
}

/// A configured data source with its declared fields.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: SensorId,
    pub name: Option<String>,
    pub fields: HashMap<String, Field>,
}

impl Sensor {
    pub fn new(id: SensorId) -> Self {
        Self {
            id,
            name: None,
            fields: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare a field. Re-declaring a name replaces its type.
    pub fn with_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        self.fields.insert(name.clone(), Field::new(name, ty));
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Latest value of `name`, if declared and already received.
    pub fn value(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name).and_then(|f| f.value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut field = Field::new("Status", FieldType::UnsignedInt);
        field.subscribe(NodeId(3));
        field.subscribe(NodeId(3));
        field.subscribe(NodeId(4));
        assert_eq!(field.subscribers.as_slice(), &[NodeId(3), NodeId(4)]);
    }

    #[test]
    fn test_sensor_builder() {
        let sensor = Sensor::new(SensorId(2))
            .with_name("boiler")
            .with_field("Pressure", FieldType::Double);
        assert_eq!(sensor.field("Pressure").map(|f| f.ty), Some(FieldType::Double));
        assert_eq!(sensor.value("Pressure"), None);
    }
}
