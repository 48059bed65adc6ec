//! Run and stage status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a whole pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run has been created but not started.
    Pending,
    /// Run is executing stages.
    Running,
    /// Every non-skipped stage succeeded.
    Succeeded,
    /// The run stopped with a failure (including cancellation).
    Failed,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// The execution status of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started yet.
    Pending,
    /// Stage is currently executing.
    Running,
    /// Stage completed successfully.
    Succeeded,
    /// Stage was skipped (gate false, toggle off, or earlier abort).
    Skipped,
    /// Stage failed.
    Failed,
    /// Stage exceeded its timeout.
    TimedOut,
    /// Stage was terminated by run cancellation.
    Cancelled,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Returns true if the status does not count against the run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }

    /// Returns true if the status counts as a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::TimedOut.to_string(), "timed_out");
        assert_eq!(StageStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_stage_status_classification() {
        assert!(StageStatus::Succeeded.is_success());
        assert!(StageStatus::Skipped.is_success());
        assert!(StageStatus::Failed.is_failure());
        assert!(StageStatus::TimedOut.is_failure());
        assert!(StageStatus::Cancelled.is_failure());
        assert!(!StageStatus::Pending.is_terminal());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::TimedOut).unwrap();
        assert_eq!(json, r#""timed_out""#);

        let back: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StageStatus::TimedOut);
    }
}
