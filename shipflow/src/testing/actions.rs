//! Mock actions and finalizers for tests.

use crate::errors::StageError;
use crate::pipeline::Finalizer;
use crate::stage::{StageAction, StageContext};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// An action that records calls and the variables it observed.
#[derive(Debug, Default)]
pub struct RecordingAction {
    detail: serde_json::Value,
    calls: Mutex<usize>,
    observed: Mutex<Vec<HashMap<String, String>>>,
}

impl RecordingAction {
    /// Creates a recording action returning empty detail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the detail value to return.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    /// Returns the number of times the action ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    /// Returns the variable sets observed on each call.
    #[must_use]
    pub fn observed_variables(&self) -> Vec<HashMap<String, String>> {
        self.observed.lock().clone()
    }
}

#[async_trait]
impl StageAction for RecordingAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        *self.calls.lock() += 1;
        let snapshot = ctx
            .variables()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.observed.lock().push(snapshot);
        Ok(self.detail.clone())
    }
}

/// An action that always fails with a configured error.
#[derive(Debug)]
pub struct FailingAction {
    error: StageError,
}

impl FailingAction {
    /// Creates an action that returns the given error.
    #[must_use]
    pub fn new(error: StageError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl StageAction for FailingAction {
    async fn execute(&self, _ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        Err(self.error.clone())
    }
}

/// An action that sleeps, for timeout and cancellation tests.
#[derive(Debug)]
pub struct SleepAction {
    duration: Duration,
}

impl SleepAction {
    /// Creates an action sleeping for the given duration.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl StageAction for SleepAction {
    async fn execute(&self, _ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        tokio::time::sleep(self.duration).await;
        Ok(serde_json::json!({
            "slept_ms": u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
        }))
    }
}

/// A finalizer that counts invocations and can be made to fail.
#[derive(Debug, Default)]
pub struct CountingFinalizer {
    calls: Mutex<usize>,
    fail: bool,
}

impl CountingFinalizer {
    /// Creates a succeeding counting finalizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counting finalizer that fails every invocation.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(0),
            fail: true,
        }
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Finalizer for CountingFinalizer {
    async fn finalize(&self) -> anyhow::Result<()> {
        *self.calls.lock() += 1;
        if self.fail {
            anyhow::bail!("finalizer failed");
        }
        Ok(())
    }
}
