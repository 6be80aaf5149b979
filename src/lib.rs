//! # trigger-rs — Incremental Trigger Conditions over Sensor Telemetry
//!
//! Sensor processes report typed fields; named conditions over those
//! fields fire their actions the moment they become true.
//!
//! ## Design Principles
//!
//! 1. **Parser owns nothing**: expression text → scope-resolved AST is a pure function
//! 2. **A DAG, not a tree**: identical sub-expressions share one node, evaluated once
//! 3. **Counters, not re-evaluation**: a field update touches only its subscribers and their ancestors
//! 4. **Fail closed**: a condition that does not parse or validate is never registered
//!
//! ## Quick Start
//!
//! ```rust
//! use trigger_rs::{ConditionConfig, FieldType, Registry, Sensor, SensorId, TypedValue};
//!
//! # fn example() -> trigger_rs::Result<()> {
//! let mut registry = Registry::new();
//! registry.register_sensor(Sensor::new(SensorId(3)).with_field("Status", FieldType::UnsignedInt))?;
//! let id = registry.register_root_condition(ConditionConfig::new("[3]=(Status,50)"))?;
//!
//! let outcome = registry.on_field_update(SensorId(3), "Status", TypedValue::UnsignedInt(50))?;
//! assert_eq!(outcome.fired[0].condition, id);
//! assert!(registry.is_satisfied(id));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Expression Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `[n]expr` | resolve fields in `expr` against sensor `n` |
//! | `&(a, b, ...)` | all children true |
//! | `\|(a, b, ...)` | any child true |
//! | `op(Field, literal)` | `op` is one of `=` `!=` `<` `>` `<=` `>=` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod expr;
pub mod graph;
pub mod eval;
pub mod registry;
pub mod config;
pub mod dispatch;
pub mod export;
#[cfg(feature = "runtime")]
pub mod runtime;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Action, CombinatorKind, CompareOp, ConditionId, Field, FieldType,
    Sensor, SensorId, TypedValue,
};
pub use graph::{ConditionGraph, Node, NodeId, NodeKind};
pub use eval::{FiredCondition, UpdateOutcome};
pub use registry::{LoadReport, Registry, RejectedCondition, SharedRegistry};
pub use config::{ConditionConfig, EngineConfig, FieldDecl, SensorConfig};
pub use dispatch::{ActionDispatcher, RecordingDispatcher};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed expression at position {position}: {message}")]
    MalformedExpression { position: usize, message: String },

    #[error("Predicate at position {position} has no enclosing sensor scope")]
    UnscopedPredicate { position: usize },

    #[error("Unknown sensor: {0}")]
    UnknownSensor(SensorId),

    #[error("Unknown field '{field}' on sensor {sensor}")]
    UnknownField { sensor: SensorId, field: String },

    #[error("Type mismatch on sensor {sensor} field '{field}': '{op}' expects {expected}, got {got}")]
    TypeMismatch {
        sensor: SensorId,
        field: String,
        op: CompareOp,
        expected: FieldType,
        got: FieldType,
    },

    #[error("Sensor {0} is already registered")]
    DuplicateSensor(SensorId),

    #[error("Condition {0} is already registered")]
    DuplicateCondition(ConditionId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Evaluation queue is closed")]
    Closed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error only skips part of an update.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownField { .. } | Error::TypeMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Error sinks
// ============================================================================

/// Receives recoverable errors raised while an update is applied.
pub trait ErrorSink {
    fn report(&mut self, error: Error);
}

/// Logs every reported error at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&mut self, error: Error) {
        tracing::warn!(%error, "update error");
    }
}

impl ErrorSink for Vec<Error> {
    fn report(&mut self, error: Error) {
        self.push(error);
    }
}
