//! Actions sent back to sensor processes when a condition fires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{SensorId, TypedValue};

/// A message to deliver to a sensor process.
///
/// The engine never sends these itself; they are handed to an
/// [`ActionDispatcher`](crate::dispatch::ActionDispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub target: SensorId,
    pub message: String,
    #[serde(default)]
    pub payload: BTreeMap<String, TypedValue>,
}

impl Action {
    pub fn new(target: SensorId, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
            payload: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }
}
