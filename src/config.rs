//! Startup configuration.
//!
//! The persistence layer hands over sensor declarations and condition
//! definitions; this module gives them a serde shape so they can also be
//! read from a JSON document.
//!
//! ```json
//! {
//!   "sensors": [
//!     { "id": 3, "name": "pump", "fields": [ { "name": "Status", "type": "UnsignedInt" } ] }
//!   ],
//!   "conditions": [
//!     { "id": 1, "expression": "[3]=(Status,50)",
//!       "actions": [ { "target": 3, "message": "Stop" } ] }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Action, ConditionId, FieldType, Sensor, SensorId};
use crate::{Error, Result};

/// Everything needed to build a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Largest explicitly assigned condition id, if any.
    pub(crate) fn max_condition_id(&self) -> Option<ConditionId> {
        self.conditions.iter().filter_map(|c| c.id).max()
    }
}

/// A data source and its declared fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: SensorId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl SensorConfig {
    pub fn into_sensor(self) -> Result<Sensor> {
        let mut sensor = Sensor::new(self.id);
        sensor.name = self.name;
        for decl in self.fields {
            if sensor.fields.contains_key(&decl.name) {
                return Err(Error::Config(format!(
                    "sensor {} declares field '{}' twice",
                    self.id, decl.name
                )));
            }
            sensor = sensor.with_field(decl.name, decl.ty);
        }
        Ok(sensor)
    }
}

/// A named condition: expression text plus the actions it triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Assigned sequentially at load time when absent.
    #[serde(default)]
    pub id: Option<ConditionId>,
    #[serde(default)]
    pub name: Option<String>,
    pub expression: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ConditionConfig {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            expression: expression.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(ConditionId(id));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_json_config() {
        let config = EngineConfig::from_json_str(r#"{
            "sensors": [
                { "id": 3, "name": "pump", "fields": [ { "name": "Status", "type": "UnsignedInt" } ] }
            ],
            "conditions": [
                { "expression": "[3]=(Status,50)",
                  "actions": [ { "target": 3, "message": "Stop",
                                 "payload": { "Code": { "type": "SignedInt", "value": -2 } } } ] }
            ]
        }"#).unwrap();

        assert_eq!(config.sensors[0].id, SensorId(3));
        assert_eq!(config.sensors[0].fields[0].ty, FieldType::UnsignedInt);
        assert_eq!(config.conditions[0].id, None);
        assert_eq!(
            config.conditions[0].actions[0],
            Action::new(SensorId(3), "Stop").with_field("Code", -2i64)
        );
    }

    #[test]
    fn test_duplicate_field_declaration() {
        let sensor = SensorConfig {
            id: SensorId(1),
            name: None,
            fields: vec![
                FieldDecl { name: "A".into(), ty: FieldType::Text },
                FieldDecl { name: "A".into(), ty: FieldType::Double },
            ],
        };
        assert!(matches!(sensor.into_sensor(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(EngineConfig::from_json_str("{"), Err(Error::Json(_))));
    }
}
