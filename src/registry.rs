//! The registry: sensors, root conditions and the live true-set.
//!
//! All graph mutation goes through a [`Registry`]. It is an ordinary
//! owned value: build one at startup, drop it at shutdown, and rebuild it
//! to reconfigure. Nothing is removed from a live registry.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::config::{ConditionConfig, EngineConfig};
use crate::eval::{self, FiredCondition, UpdateOutcome};
use crate::graph::{builder, ConditionGraph, NodeId, RootNode};
use crate::model::{ConditionId, Sensor, SensorId, TypedValue};
use crate::{expr, Error, ErrorSink, LogSink, Result};

// ============================================================================
// Registry
// ============================================================================

/// Process-wide table of sensors, root conditions and satisfied ids.
#[derive(Debug, Default)]
pub struct Registry {
    sensors: HashMap<SensorId, Sensor>,
    roots: BTreeMap<ConditionId, NodeId>,
    graph: ConditionGraph,
    satisfied: BTreeSet<ConditionId>,
    next_condition: u32,
}

/// What [`Registry::load`] accepted and rejected.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub sensors: usize,
    pub loaded: Vec<ConditionId>,
    pub rejected: Vec<RejectedCondition>,
}

/// A condition that failed to parse or validate. It is not registered and
/// stays permanently false.
#[derive(Debug)]
pub struct RejectedCondition {
    pub id: Option<ConditionId>,
    pub name: Option<String>,
    pub expression: String,
    pub error: Error,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a startup configuration.
    ///
    /// Sensor errors are fatal. A condition that fails is recorded in the
    /// report and skipped; the others still load.
    pub fn load(config: &EngineConfig) -> Result<(Self, LoadReport)> {
        let mut registry = Self::new();
        let mut report = LoadReport::default();

        for sensor in &config.sensors {
            registry.register_sensor(sensor.clone().into_sensor()?)?;
            report.sensors += 1;
        }

        if let Some(max) = config.max_condition_id() {
            registry.next_condition = registry.next_condition.max(max.0.saturating_add(1));
        }

        for condition in &config.conditions {
            match registry.register_root_condition(condition.clone()) {
                Ok(id) => report.loaded.push(id),
                Err(error) => {
                    warn!(
                        id = ?condition.id,
                        expression = %condition.expression,
                        %error,
                        "rejected condition"
                    );
                    report.rejected.push(RejectedCondition {
                        id: condition.id,
                        name: condition.name.clone(),
                        expression: condition.expression.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            sensors = report.sensors,
            conditions = report.loaded.len(),
            rejected = report.rejected.len(),
            nodes = registry.graph.len(),
            "registry loaded"
        );
        Ok((registry, report))
    }

    pub fn register_sensor(&mut self, sensor: Sensor) -> Result<()> {
        if self.sensors.contains_key(&sensor.id) {
            return Err(Error::DuplicateSensor(sensor.id));
        }
        debug!(sensor = %sensor.id, fields = sensor.fields.len(), "registered sensor");
        self.sensors.insert(sensor.id, sensor);
        Ok(())
    }

    /// Parse, validate and wire one condition into the graph.
    ///
    /// The graph is only touched once the whole expression is known to be
    /// valid. A condition that is already true on registration joins the
    /// true-set without firing.
    pub fn register_root_condition(&mut self, condition: ConditionConfig) -> Result<ConditionId> {
        let id = condition.id.unwrap_or(ConditionId(self.next_condition));
        if self.roots.contains_key(&id) {
            return Err(Error::DuplicateCondition(id));
        }

        let ast = expr::parse(&condition.expression)?;
        let resolved = builder::resolve(&ast, &self.sensors)?;

        let child = builder::build(&mut self.graph, &mut self.sensors, resolved);
        let node = self.graph.add_root(RootNode {
            condition: id,
            name: condition.name,
            child,
            actions: condition.actions,
        });
        self.roots.insert(id, node);
        self.next_condition = self.next_condition.max(id.0.saturating_add(1));

        let status = self.graph.get(node).status;
        if status {
            self.satisfied.insert(id);
        }
        debug!(condition = %id, root = %node, status, "registered condition");
        Ok(id)
    }

    /// Apply one decoded field value, reporting recoverable errors through
    /// `tracing`.
    pub fn on_field_update(
        &mut self,
        sensor: SensorId,
        field: &str,
        value: TypedValue,
    ) -> Result<UpdateOutcome> {
        self.on_field_update_with(sensor, field, value, &mut LogSink)
    }

    /// Apply one decoded field value and settle the graph.
    ///
    /// An unknown sensor rejects the update. An unknown field or a type
    /// mismatch goes to `sink` and only skips what it concerns.
    pub fn on_field_update_with(
        &mut self,
        sensor: SensorId,
        field: &str,
        value: TypedValue,
        sink: &mut dyn ErrorSink,
    ) -> Result<UpdateOutcome> {
        let target = self.sensors.get_mut(&sensor).ok_or(Error::UnknownSensor(sensor))?;
        let effect = eval::apply_field(&mut self.graph, target, field, value, sink);

        let mut outcome = UpdateOutcome {
            comparisons: effect.comparisons,
            predicate_transitions: effect.predicate_transitions,
            ..UpdateOutcome::default()
        };

        for transition in effect.roots {
            if transition.now {
                self.satisfied.insert(transition.condition);
                let Some(root) = self.graph.get(transition.node).as_root() else {
                    continue;
                };
                debug!(condition = %root.condition, "condition satisfied");
                outcome.fired.push(FiredCondition {
                    condition: root.condition,
                    name: root.name.clone(),
                    actions: root.actions.clone(),
                    fired_at: Utc::now(),
                });
            } else {
                self.satisfied.remove(&transition.condition);
                debug!(condition = %transition.condition, "condition cleared");
                outcome.cleared.push(transition.condition);
            }
        }
        Ok(outcome)
    }

    /// Apply every field of one decoded payload, each to quiescence before
    /// the next.
    pub fn apply_payload<I, S>(&mut self, sensor: SensorId, fields: I) -> Result<UpdateOutcome>
    where
        I: IntoIterator<Item = (S, TypedValue)>,
        S: AsRef<str>,
    {
        self.apply_payload_with(sensor, fields, &mut LogSink)
    }

    pub fn apply_payload_with<I, S>(
        &mut self,
        sensor: SensorId,
        fields: I,
        sink: &mut dyn ErrorSink,
    ) -> Result<UpdateOutcome>
    where
        I: IntoIterator<Item = (S, TypedValue)>,
        S: AsRef<str>,
    {
        if !self.sensors.contains_key(&sensor) {
            return Err(Error::UnknownSensor(sensor));
        }
        let mut total = UpdateOutcome::default();
        for (name, value) in fields {
            total.merge(self.on_field_update_with(sensor, name.as_ref(), value, sink)?);
        }
        Ok(total)
    }

    pub fn is_satisfied(&self, condition: ConditionId) -> bool {
        self.satisfied.contains(&condition)
    }

    /// Snapshot of the true-set.
    pub fn satisfied_conditions(&self) -> BTreeSet<ConditionId> {
        self.satisfied.clone()
    }

    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(&id)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values()
    }

    pub fn root(&self, condition: ConditionId) -> Option<&RootNode> {
        self.roots
            .get(&condition)
            .and_then(|&node| self.graph.get(node).as_root())
    }

    /// Graph handle of a condition's root node.
    pub fn root_node(&self, condition: ConditionId) -> Option<NodeId> {
        self.roots.get(&condition).copied()
    }

    /// Registered condition ids in ascending order.
    pub fn conditions(&self) -> impl Iterator<Item = ConditionId> + '_ {
        self.roots.keys().copied()
    }

    /// Canonical expression text of a registered condition.
    pub fn render(&self, condition: ConditionId) -> Option<String> {
        self.roots.get(&condition).map(|&node| self.graph.render(node))
    }

    pub fn graph(&self) -> &ConditionGraph {
        &self.graph
    }
}

// ============================================================================
// SharedRegistry
// ============================================================================

/// A [`Registry`] behind a reader/writer lock.
///
/// Each update holds the write lock for its whole propagation, which
/// serializes concurrent deliveries. Readers of the true-set take the read
/// lock and get a snapshot.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    inner: RwLock<Registry>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self { inner: RwLock::new(registry) }
    }

    pub fn load(config: &EngineConfig) -> Result<(Self, LoadReport)> {
        let (registry, report) = Registry::load(config)?;
        Ok((Self::new(registry), report))
    }

    pub fn on_field_update(&self, sensor: SensorId, field: &str, value: TypedValue) -> Result<UpdateOutcome> {
        self.inner.write().on_field_update(sensor, field, value)
    }

    pub fn on_field_update_with(
        &self,
        sensor: SensorId,
        field: &str,
        value: TypedValue,
        sink: &mut dyn ErrorSink,
    ) -> Result<UpdateOutcome> {
        self.inner.write().on_field_update_with(sensor, field, value, sink)
    }

    pub fn is_satisfied(&self, condition: ConditionId) -> bool {
        self.inner.read().is_satisfied(condition)
    }

    pub fn satisfied_conditions(&self) -> BTreeSet<ConditionId> {
        self.inner.read().satisfied_conditions()
    }

    /// Rebuild from `config` and swap it in. On error the current registry
    /// stays in place.
    pub fn reload(&self, config: &EngineConfig) -> Result<LoadReport> {
        let (registry, report) = Registry::load(config)?;
        *self.inner.write() = registry;
        info!("registry reloaded");
        Ok(report)
    }

    /// Read access for inspection and export.
    pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read()
    }
}
