//! Event types emitted by the runner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The kind of a pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A run started executing.
    RunStarted,
    /// A run reached a terminal status.
    RunCompleted,
    /// A run was cancelled by an external signal.
    RunCancelled,
    /// The run's finalizer was invoked.
    RunFinalized,
    /// A stage started executing.
    StageStarted,
    /// A stage completed successfully.
    StageCompleted,
    /// A stage was skipped.
    StageSkipped,
    /// A stage failed.
    StageFailed,
    /// A stage exceeded its timeout.
    StageTimedOut,
    /// A stage was terminated by cancellation.
    StageCancelled,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RunStarted => "run.started",
            Self::RunCompleted => "run.completed",
            Self::RunCancelled => "run.cancelled",
            Self::RunFinalized => "run.finalized",
            Self::StageStarted => "stage.started",
            Self::StageCompleted => "stage.completed",
            Self::StageSkipped => "stage.skipped",
            Self::StageFailed => "stage.failed",
            Self::StageTimedOut => "stage.timed_out",
            Self::StageCancelled => "stage.cancelled",
        };
        write!(f, "{name}")
    }
}

/// One observable event in a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// What happened.
    pub kind: EventKind,
    /// The run this event belongs to.
    pub run_id: Uuid,
    /// The stage this event belongs to, for stage-level events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Structured event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// When the event was created.
    pub at: DateTime<Utc>,
}

impl PipelineEvent {
    /// Creates a run-level event.
    #[must_use]
    pub fn run(kind: EventKind, run_id: Uuid) -> Self {
        Self {
            kind,
            run_id,
            stage: None,
            data: None,
            at: Utc::now(),
        }
    }

    /// Creates a stage-level event.
    #[must_use]
    pub fn stage(kind: EventKind, run_id: Uuid, stage: impl Into<String>) -> Self {
        Self {
            kind,
            run_id,
            stage: Some(stage.into()),
            data: None,
            at: Utc::now(),
        }
    }

    /// Attaches a structured payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
