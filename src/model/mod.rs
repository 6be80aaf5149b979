//! # Telemetry & Condition Model
//!
//! Plain data shared by the parser, the condition graph and the registry.
//! No I/O, no locking, no evaluation state beyond the latest field values.

pub mod value;
pub mod sensor;
pub mod condition;
pub mod action;

pub use value::{FieldType, TypedValue, ValueKey};
pub use sensor::{Field, Sensor, SensorId};
pub use condition::{CombinatorKind, CompareOp, ConditionId};
pub use action::Action;
