//! Stage outcome type with factory methods.

use super::StageStatus;
use crate::errors::StageError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The outcome of a single stage execution.
///
/// `StageOutcome` is immutable once created; the runner builds one per
/// declared stage and collects them, in execution order, into the final
/// pipeline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// The terminal status of the stage.
    pub status: StageStatus,

    /// The classified error (for failed, timed-out, or cancelled stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,

    /// Why the stage was skipped (for skipped stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Structured detail produced by the action (for successful stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,

    /// Wall-clock time the stage spent executing, in milliseconds.
    #[serde(default)]
    pub duration_ms: f64,
}

impl StageOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn succeeded(elapsed: Duration) -> Self {
        Self {
            status: StageStatus::Succeeded,
            error: None,
            skip_reason: None,
            detail: None,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Creates a skipped outcome with a reason.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            error: None,
            skip_reason: Some(reason.into()),
            detail: None,
            duration_ms: 0.0,
        }
    }

    /// Creates a failed outcome from a classified error.
    #[must_use]
    pub fn failed(error: StageError, elapsed: Duration) -> Self {
        Self {
            status: StageStatus::Failed,
            error: Some(error),
            skip_reason: None,
            detail: None,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Creates a timed-out outcome.
    #[must_use]
    pub fn timed_out(error: StageError, elapsed: Duration) -> Self {
        Self {
            status: StageStatus::TimedOut,
            error: Some(error),
            skip_reason: None,
            detail: None,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Creates a cancelled outcome.
    #[must_use]
    pub fn cancelled(error: StageError, elapsed: Duration) -> Self {
        Self {
            status: StageStatus::Cancelled,
            error: Some(error),
            skip_reason: None,
            detail: None,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Attaches structured action detail.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Returns true if the outcome does not count against the run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_outcome() {
        let outcome = StageOutcome::succeeded(Duration::from_millis(120))
            .with_detail(serde_json::json!({"artifact": "registry/app:42"}));

        assert_eq!(outcome.status, StageStatus::Succeeded);
        assert!(outcome.is_success());
        assert!(outcome.error.is_none());
        assert!((outcome.duration_ms - 120.0).abs() < 1.0);
    }

    #[test]
    fn test_skipped_outcome() {
        let outcome = StageOutcome::skipped("disabled by configuration");

        assert_eq!(outcome.status, StageStatus::Skipped);
        assert!(outcome.is_success());
        assert_eq!(
            outcome.skip_reason.as_deref(),
            Some("disabled by configuration")
        );
    }

    #[test]
    fn test_failed_outcome() {
        let outcome = StageOutcome::failed(
            StageError::action("push rejected"),
            Duration::from_millis(10),
        );

        assert_eq!(outcome.status, StageStatus::Failed);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error.as_ref().map(StageError::kind), Some("action_failed"));
    }

    #[test]
    fn test_outcome_serialize_round_trip() {
        let outcome = StageOutcome::timed_out(
            StageError::Timeout { elapsed_ms: 5000 },
            Duration::from_secs(5),
        );

        let json = serde_json::to_string(&outcome).unwrap();
        let back: StageOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, StageStatus::TimedOut);
        assert_eq!(back.error, outcome.error);
    }
}
