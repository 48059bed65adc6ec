//! Terminal status reporting.
//!
//! Whatever triggered a run (a source-control event, a chat notification
//! hook) learns the outcome through a [`StatusReporter`]; the report
//! names the boundary at which a failed run stopped.

use crate::pipeline::PipelineResult;
use async_trait::async_trait;
use tracing::{error, info};

/// Trait for reporting a run's terminal status to its trigger.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Reports one finished run.
    async fn report(&self, result: &PipelineResult);
}

/// A reporter that logs through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

#[async_trait]
impl StatusReporter for LoggingReporter {
    async fn report(&self, result: &PipelineResult) {
        if result.is_success() {
            info!(
                pipeline = %result.pipeline,
                run_id = %result.run_id,
                duration_ms = result.duration_ms,
                warnings = result.warnings.len(),
                "run succeeded"
            );
        } else {
            let boundary = result.boundary();
            error!(
                pipeline = %result.pipeline,
                run_id = %result.run_id,
                duration_ms = result.duration_ms,
                stage = boundary.map(|(stage, _)| stage),
                error_kind = boundary.map(|(_, err)| err.kind()),
                failure = result.failure.as_ref().map(ToString::to_string),
                "run failed"
            );
        }
    }
}

/// A reporter that collects results for tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    results: parking_lot::Mutex<Vec<PipelineResult>>,
}

impl CollectingReporter {
    /// Creates a new collecting reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all reported results.
    #[must_use]
    pub fn results(&self) -> Vec<PipelineResult> {
        self.results.lock().clone()
    }

    /// Returns the number of reported results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    /// Returns true if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }
}

#[async_trait]
impl StatusReporter for CollectingReporter {
    async fn report(&self, result: &PipelineResult) {
        self.results.lock().push(result.clone());
    }
}
