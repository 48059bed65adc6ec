//! Static-analysis submission and the quality-gate stage.
//!
//! The quality gate is the one conditional-abort point in the pipeline:
//! it submits an analysis, then polls the oracle for its asynchronous
//! verdict up to a bounded wait.

use crate::core::Verdict;
use crate::errors::StageError;
use crate::stage::{StageAction, StageContext, StageDef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;

/// Opaque handle to a submitted analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisHandle {
    id: String,
}

impl AnalysisHandle {
    /// Creates a handle from the engine's task id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns the task id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// What to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Project key under which the analysis is filed.
    pub project_key: String,
    /// Branch being analyzed, when the engine distinguishes branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl AnalysisConfig {
    /// Creates a config for a project key.
    #[must_use]
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            branch: None,
        }
    }

    /// Sets the analyzed branch.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Submits sources to an external static-analysis engine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Submits the sources for analysis, returning a pollable handle.
    async fn submit(
        &self,
        sources: &Path,
        config: &AnalysisConfig,
    ) -> Result<AnalysisHandle, StageError>;
}

/// Answers whether a submitted analysis passed its quality gate.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QualityGateOracle: Send + Sync {
    /// Polls for the verdict; `None` means not yet available.
    async fn poll(&self, handle: &AnalysisHandle) -> Result<Option<Verdict>, StageError>;
}

/// Action that submits an analysis and blocks on its verdict.
///
/// A non-pass verdict (including `Error`) is a gate failure; an absent
/// verdict past the wait bound is a timeout, never an indefinite block.
pub struct QualityGateAction {
    engine: Arc<dyn AnalysisEngine>,
    oracle: Arc<dyn QualityGateOracle>,
    config: AnalysisConfig,
    wait: Duration,
    poll_interval: Duration,
}

impl QualityGateAction {
    /// Creates a quality-gate action with a bounded verdict wait.
    #[must_use]
    pub fn new(
        engine: Arc<dyn AnalysisEngine>,
        oracle: Arc<dyn QualityGateOracle>,
        config: AnalysisConfig,
        wait: Duration,
    ) -> Self {
        Self {
            engine,
            oracle,
            config,
            wait,
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Overrides the polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl StageAction for QualityGateAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        let handle = self.engine.submit(ctx.workspace(), &self.config).await?;
        let deadline = Instant::now() + self.wait;

        loop {
            if let Some(verdict) = self.oracle.poll(&handle).await? {
                if verdict.is_pass() {
                    return Ok(serde_json::json!({
                        "verdict": verdict.to_string(),
                        "analysis": handle.id(),
                    }));
                }
                return Err(StageError::GateFailed { verdict });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(StageError::timeout_after(self.wait));
            }
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

/// Builds the canonical quality-gate stage.
///
/// Carries the abort policy: a failed gate stops the pipeline.
#[must_use]
pub fn quality_gate_stage(
    engine: Arc<dyn AnalysisEngine>,
    oracle: Arc<dyn QualityGateOracle>,
    config: AnalysisConfig,
    wait: Duration,
) -> StageDef {
    StageDef::new(
        "quality-gate",
        Arc::new(QualityGateAction::new(engine, oracle, config, wait)),
    )
}
