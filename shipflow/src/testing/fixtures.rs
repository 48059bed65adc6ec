//! Ready-made stages and variable sets for tests and benchmarks.

use super::actions::{FailingAction, SleepAction};
use crate::errors::StageError;
use crate::stage::{FnAction, StageDef};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A stage that succeeds with empty detail.
#[must_use]
pub fn ok_stage(name: &str) -> StageDef {
    StageDef::new(name, Arc::new(FnAction::new(|_ctx| Ok(serde_json::json!({})))))
}

/// A stage that fails with the given error.
#[must_use]
pub fn failing_stage(name: &str, error: StageError) -> StageDef {
    StageDef::new(name, Arc::new(FailingAction::new(error)))
}

/// A stage that sleeps for the given duration.
#[must_use]
pub fn sleeping_stage(name: &str, duration: Duration) -> StageDef {
    StageDef::new(name, Arc::new(SleepAction::new(duration)))
}

/// A plausible variable set for a deployment run.
#[must_use]
pub fn static_variables() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("revision".to_string(), "abc123".to_string());
    map.insert("branch".to_string(), "main".to_string());
    map.insert("image".to_string(), "registry.example.com/backend:42".to_string());
    map.insert("IMAGE".to_string(), "registry.example.com/backend:42".to_string());
    map
}
