//! Error types for the shipflow runner.
//!
//! The stage-level taxonomy distinguishes gate verdicts, action failures,
//! timeouts, credential problems, and cancellation so the runner can report
//! the exact boundary at which a pipeline stopped.

use crate::core::Verdict;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The error taxonomy for a single stage execution.
///
/// Every failure an action can produce is classified into exactly one of
/// these variants; the runner maps the variant onto the stage's terminal
/// status and applies the stage's failure policy.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageError {
    /// The quality gate returned a non-passing verdict.
    #[error("quality gate verdict was {verdict}, expected pass")]
    GateFailed {
        /// The verdict the oracle returned.
        verdict: Verdict,
    },

    /// An external action returned a failing status or raised an
    /// execution error (process error, network error, malformed result).
    #[error("action failed: {reason}")]
    ActionFailed {
        /// Human-readable failure description.
        reason: String,
        /// Exit code of the external command, when one exists.
        exit_code: Option<i32>,
    },

    /// The stage (or a bounded wait inside it) exceeded its time budget.
    #[error("timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time when the bound fired, in milliseconds.
        elapsed_ms: u64,
    },

    /// A scoped credential could not be resolved, or was used outside
    /// its owning stage's execution window.
    #[error("credential scope '{scope}' unavailable: {reason}")]
    CredentialUnavailable {
        /// The credential scope name.
        scope: String,
        /// Why the credential was not available.
        reason: String,
    },

    /// The run was cancelled by an external signal.
    #[error("cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl StageError {
    /// Creates an action failure with no exit code.
    #[must_use]
    pub fn action(reason: impl Into<String>) -> Self {
        Self::ActionFailed {
            reason: reason.into(),
            exit_code: None,
        }
    }

    /// Creates an action failure carrying the command's exit code.
    #[must_use]
    pub fn action_with_exit(reason: impl Into<String>, exit_code: i32) -> Self {
        Self::ActionFailed {
            reason: reason.into(),
            exit_code: Some(exit_code),
        }
    }

    /// Creates a timeout error from an elapsed duration.
    #[must_use]
    pub fn timeout_after(elapsed: Duration) -> Self {
        Self::Timeout {
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Creates a credential-unavailable error.
    #[must_use]
    pub fn credential(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CredentialUnavailable {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Returns a short machine-friendly name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GateFailed { .. } => "gate_failed",
            Self::ActionFailed { .. } => "action_failed",
            Self::Timeout { .. } => "timeout",
            Self::CredentialUnavailable { .. } => "credential_unavailable",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Error raised while resolving the pipeline's variable set.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableError {
    /// A required key was absent from the resolved set.
    #[error("missing variable '{key}'")]
    Missing {
        /// The absent key.
        key: String,
    },

    /// The resolver itself failed.
    #[error("variable resolution failed: {reason}")]
    Resolution {
        /// Why resolution failed.
        reason: String,
    },
}

impl VariableError {
    /// Creates a missing-variable error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Creates a resolution error.
    #[must_use]
    pub fn resolution(reason: impl Into<String>) -> Self {
        Self::Resolution {
            reason: reason.into(),
        }
    }
}

/// Error raised when a pipeline definition fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The pipeline name is empty or whitespace-only.
    #[error("pipeline name cannot be empty or whitespace-only")]
    EmptyPipelineName,

    /// A stage name is empty or whitespace-only.
    #[error("stage name cannot be empty or whitespace-only")]
    EmptyStageName,

    /// Two stages share the same name.
    #[error("duplicate stage name '{name}'")]
    DuplicateStage {
        /// The repeated name.
        name: String,
    },

    /// A toggle refers to a stage that is not in the pipeline.
    #[error("toggle refers to unknown stage '{name}'")]
    UnknownToggle {
        /// The unknown stage name.
        name: String,
    },
}

/// Error raised while loading or validating declarative run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// The reason a whole run ended `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunFailure {
    /// Variable resolution failed before any stage executed.
    #[error("variable resolution failed: {error}")]
    Variables {
        /// The underlying resolution error.
        error: VariableError,
    },

    /// A stage with abort policy reached a non-success outcome.
    #[error("stage '{stage}' failed: {error}")]
    Stage {
        /// The stage at which the pipeline stopped.
        stage: String,
        /// The classified stage error.
        error: StageError,
    },

    /// The run was cancelled by an external signal.
    #[error("run cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl RunFailure {
    /// Returns the stage boundary at which the run stopped, if one exists.
    #[must_use]
    pub fn boundary(&self) -> Option<(&str, &StageError)> {
        match self {
            Self::Stage { stage, error } => Some((stage.as_str(), error)),
            Self::Variables { .. } | Self::Cancelled { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = StageError::action_with_exit("scanner exited", 2);
        assert_eq!(err.to_string(), "action failed: scanner exited");
        assert_eq!(err.kind(), "action_failed");

        let err = StageError::GateFailed {
            verdict: Verdict::Fail,
        };
        assert_eq!(err.to_string(), "quality gate verdict was fail, expected pass");
    }

    #[test]
    fn test_timeout_after() {
        let err = StageError::timeout_after(Duration::from_millis(1500));
        assert_eq!(err, StageError::Timeout { elapsed_ms: 1500 });
    }

    #[test]
    fn test_stage_error_serialize_round_trip() {
        let err = StageError::credential("registry-push", "unknown scope");
        let json = serde_json::to_string(&err).unwrap();
        let back: StageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_run_failure_boundary() {
        let failure = RunFailure::Stage {
            stage: "quality-gate".to_string(),
            error: StageError::GateFailed {
                verdict: Verdict::Fail,
            },
        };
        let (stage, error) = failure.boundary().unwrap();
        assert_eq!(stage, "quality-gate");
        assert_eq!(error.kind(), "gate_failed");

        let cancelled = RunFailure::Cancelled {
            reason: "operator abort".to_string(),
        };
        assert!(cancelled.boundary().is_none());
    }

    #[test]
    fn test_definition_error_display() {
        let err = DefinitionError::DuplicateStage {
            name: "build".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate stage name 'build'");
    }
}
