//! Hand-off of fired conditions to whatever delivers their actions.
//!
//! The engine never performs network I/O. A dispatcher receives each
//! [`FiredCondition`] and owns getting its actions to the target sensors.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::eval::FiredCondition;
use crate::Result;

/// Delivers the actions of a fired condition.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, fired: &FiredCondition) -> Result<()>;
}

/// Keeps every fired condition in memory.
///
/// Reference implementation of [`ActionDispatcher`]; useful for tests and
/// for embedding where the caller polls instead of being pushed to.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    fired: Mutex<Vec<FiredCondition>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<FiredCondition> {
        std::mem::take(&mut *self.fired.lock())
    }

    pub fn len(&self) -> usize {
        self.fired.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.lock().is_empty()
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn dispatch(&self, fired: &FiredCondition) -> Result<()> {
        self.fired.lock().push(fired.clone());
        Ok(())
    }
}
