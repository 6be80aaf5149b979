//! Single-worker evaluation queue.
//!
//! Field updates may arrive from many connections at once, but the graph
//! must settle one update before the next begins. Producers enqueue
//! [`FieldUpdate`]s; one task applies them in order and passes each fired
//! condition to an [`ActionDispatcher`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::dispatch::ActionDispatcher;
use crate::model::{SensorId, TypedValue};
use crate::registry::SharedRegistry;
use crate::{Error, Result};

/// One decoded field value from a sensor payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub sensor: SensorId,
    pub field: String,
    pub value: TypedValue,
}

impl FieldUpdate {
    pub fn new(sensor: SensorId, field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self {
            sensor,
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Counters returned when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub applied: u64,
    pub rejected: u64,
    pub fired: u64,
    pub dispatch_failures: u64,
}

pub struct EvaluationWorker;

impl EvaluationWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// `capacity` bounds the queue; producers wait when it is full.
    pub fn spawn<D>(registry: Arc<SharedRegistry>, dispatcher: Arc<D>, capacity: usize) -> WorkerHandle
    where
        D: ActionDispatcher + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<FieldUpdate>(capacity.max(1));

        let join = tokio::spawn(async move {
            let mut stats = WorkerStats::default();
            while let Some(update) = rx.recv().await {
                // The write lock is released before any await.
                let outcome = match registry.on_field_update(update.sensor, &update.field, update.value) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(sensor = %update.sensor, field = %update.field, %err, "update rejected");
                        stats.rejected += 1;
                        continue;
                    }
                };
                stats.applied += 1;

                for fired in &outcome.fired {
                    stats.fired += 1;
                    if let Err(err) = dispatcher.dispatch(fired).await {
                        error!(condition = %fired.condition, %err, "dispatch failed");
                        stats.dispatch_failures += 1;
                    }
                }
            }
            stats
        });

        WorkerHandle { tx, join }
    }
}

/// Producer side of the evaluation queue.
pub struct WorkerHandle {
    tx: mpsc::Sender<FieldUpdate>,
    join: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    /// A sender that can be cloned into other tasks.
    pub fn sender(&self) -> mpsc::Sender<FieldUpdate> {
        self.tx.clone()
    }

    pub async fn submit(&self, update: FieldUpdate) -> Result<()> {
        self.tx.send(update).await.map_err(|_| Error::Closed)
    }

    /// Close the queue, let the worker drain it, and return its counters.
    ///
    /// Senders obtained from [`sender`](Self::sender) keep the queue open
    /// until they are dropped too.
    pub async fn shutdown(self) -> Result<WorkerStats> {
        drop(self.tx);
        self.join.await.map_err(|e| Error::Dispatch(e.to_string()))
    }
}
