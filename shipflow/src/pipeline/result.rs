//! The aggregated result of a pipeline run.

use crate::core::{RunStatus, StageOutcome};
use crate::errors::{RunFailure, StageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stage's outcome, paired with its name, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage name.
    pub name: String,
    /// The stage outcome.
    pub outcome: StageOutcome,
}

/// A recorded non-fatal failure from a continue-with-warning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWarning {
    /// The stage that failed.
    pub stage: String,
    /// The classified error.
    pub error: StageError,
}

/// The terminal report for one pipeline run.
///
/// Contains the overall status, the boundary at which the run stopped on
/// failure, and one report per declared stage in execution order, so an
/// operator can act without reading raw logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The run id.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// The terminal run status.
    pub status: RunStatus,
    /// Why the run failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    /// Per-stage outcomes in execution order.
    pub stages: Vec<StageReport>,
    /// Warnings recorded by continue-with-warning stages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StageWarning>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished (after finalization).
    pub finished_at: DateTime<Utc>,
    /// Total elapsed wall-clock time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineResult {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Returns the stage boundary at which the run stopped, if any.
    #[must_use]
    pub fn boundary(&self) -> Option<(&str, &StageError)> {
        self.failure.as_ref().and_then(RunFailure::boundary)
    }

    /// Returns the outcome of a stage by name.
    #[must_use]
    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|report| report.name == stage)
            .map(|report| &report.outcome)
    }

    /// Returns a one-line human summary of the result.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.failure {
            None => format!(
                "pipeline '{}' succeeded in {:.0}ms ({} stages)",
                self.pipeline,
                self.duration_ms,
                self.stages.len()
            ),
            Some(failure) => format!(
                "pipeline '{}' failed after {:.0}ms: {failure}",
                self.pipeline, self.duration_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;
    use crate::core::Verdict;
    use std::time::Duration;

    fn sample_failed() -> PipelineResult {
        PipelineResult {
            run_id: Uuid::new_v4(),
            pipeline: "deploy".to_string(),
            status: RunStatus::Failed,
            failure: Some(RunFailure::Stage {
                stage: "quality-gate".to_string(),
                error: StageError::GateFailed {
                    verdict: Verdict::Fail,
                },
            }),
            stages: vec![
                StageReport {
                    name: "checkout".to_string(),
                    outcome: StageOutcome::succeeded(Duration::from_millis(5)),
                },
                StageReport {
                    name: "quality-gate".to_string(),
                    outcome: StageOutcome::failed(
                        StageError::GateFailed {
                            verdict: Verdict::Fail,
                        },
                        Duration::from_millis(10),
                    ),
                },
            ],
            warnings: Vec::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            duration_ms: 15.0,
        }
    }

    #[test]
    fn test_boundary_reporting() {
        let result = sample_failed();

        assert!(!result.is_success());
        let (stage, error) = result.boundary().unwrap();
        assert_eq!(stage, "quality-gate");
        assert_eq!(error.kind(), "gate_failed");
    }

    #[test]
    fn test_outcome_lookup() {
        let result = sample_failed();

        assert_eq!(
            result.outcome("checkout").map(|o| o.status),
            Some(StageStatus::Succeeded)
        );
        assert!(result.outcome("missing").is_none());
    }

    #[test]
    fn test_summary_mentions_failure() {
        let result = sample_failed();
        let summary = result.summary();

        assert!(summary.contains("deploy"));
        assert!(summary.contains("quality-gate"));
    }

    #[test]
    fn test_result_serialize_round_trip() {
        let result = sample_failed();
        let json = serde_json::to_string(&result).unwrap();
        let back: PipelineResult = serde_json::from_str(&json).unwrap();

        assert_eq!(back.status, RunStatus::Failed);
        assert_eq!(back.stages.len(), 2);
        assert_eq!(back.failure, result.failure);
    }
}
