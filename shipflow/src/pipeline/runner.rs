//! The strictly sequential pipeline runner.

use super::{PipelineDef, PipelineResult, StageReport, StageWarning, Variables};
use crate::cancellation::CancelToken;
use crate::core::{RunStatus, StageOutcome, StageStatus};
use crate::credentials::{CredentialLease, CredentialStore, StaticCredentialStore};
use crate::errors::{RunFailure, StageError};
use crate::events::{EventKind, EventSink, NoOpEventSink, PipelineEvent};
use crate::report::{LoggingReporter, StatusReporter};
use crate::stage::{FailurePolicy, StageContext, StageDef};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Executes pipeline definitions, one run at a time.
///
/// Stages run strictly in declaration order with at most one attempt
/// each. `run` takes `&mut self`, so a runner can never host two
/// concurrent runs; the workspace stays exclusive to the active run.
pub struct Runner {
    credentials: Arc<dyn CredentialStore>,
    sink: Arc<dyn EventSink>,
    reporter: Arc<dyn StatusReporter>,
    cancel: Arc<CancelToken>,
    workspace: PathBuf,
}

impl Runner {
    /// Creates a runner with default services.
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials: Arc::new(StaticCredentialStore::new()),
            sink: Arc::new(NoOpEventSink),
            reporter: Arc::new(LoggingReporter::default()),
            cancel: CancelToken::new(),
            workspace: std::env::temp_dir().join("shipflow-workspace"),
        }
    }

    /// Sets the credential store.
    #[must_use]
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = store;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the terminal status reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the workspace directory handed to stage actions.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Returns the run's cancellation token, for operator abort.
    #[must_use]
    pub fn cancel_token(&self) -> Arc<CancelToken> {
        self.cancel.clone()
    }

    /// Executes a pipeline definition to completion.
    ///
    /// Resolves variables once, iterates stages strictly in order, always
    /// runs the finalizer exactly once, and reports the terminal status
    /// through the configured reporter.
    pub async fn run(&mut self, def: PipelineDef) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        info!(pipeline = def.name(), %run_id, "run started");
        self.sink
            .try_emit(PipelineEvent::run(EventKind::RunStarted, run_id));

        let mut reports = Vec::with_capacity(def.stages.len());
        let mut warnings = Vec::new();

        let failure = match (def.resolver)() {
            Err(err) => {
                error!(error = %err, "variable resolution failed; no stages executed");
                Some(RunFailure::Variables { error: err })
            }
            Ok(map) => {
                let variables = Variables::from(map);
                self.execute_stages(&def, run_id, &variables, &mut reports, &mut warnings)
                    .await
            }
        };

        let status = if failure.is_none() {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };

        self.finalize(&def, run_id).await;

        let result = PipelineResult {
            run_id,
            pipeline: def.name.clone(),
            status,
            failure,
            stages: reports,
            warnings,
            started_at,
            finished_at: Utc::now(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        self.sink.try_emit(
            PipelineEvent::run(EventKind::RunCompleted, run_id)
                .with_data(serde_json::json!({ "status": status.to_string() })),
        );
        self.reporter.report(&result).await;
        result
    }

    async fn execute_stages(
        &self,
        def: &PipelineDef,
        run_id: Uuid,
        variables: &Variables,
        reports: &mut Vec<StageReport>,
        warnings: &mut Vec<StageWarning>,
    ) -> Option<RunFailure> {
        for (index, stage) in def.stages.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let reason = self
                    .cancel
                    .reason()
                    .unwrap_or_else(|| "cancelled".to_string());
                self.skip_remaining(def, index, run_id, "run cancelled", reports);
                self.sink.try_emit(
                    PipelineEvent::run(EventKind::RunCancelled, run_id)
                        .with_data(serde_json::json!({ "reason": &reason })),
                );
                return Some(RunFailure::Cancelled { reason });
            }

            if !def.toggles.included(stage.name()) {
                debug!(stage = stage.name(), "stage disabled by configuration");
                self.push_skip(run_id, stage.name(), "disabled by configuration", reports);
                continue;
            }

            if let Some(gate) = stage.gate() {
                if !gate.allows(variables) {
                    let reason = format!("gate '{}' not satisfied", gate.description());
                    self.push_skip(run_id, stage.name(), &reason, reports);
                    continue;
                }
            }

            let stage_started = Instant::now();

            // Credential acquisition happens inside the stage's execution
            // window; the action is never attempted without it.
            let lease = match stage.credential_scope() {
                Some(scope) => {
                    match CredentialLease::acquire(self.credentials.clone(), scope).await {
                        Ok(lease) => Some(lease),
                        Err(err) => {
                            let outcome = StageOutcome::failed(err, stage_started.elapsed());
                            self.emit_outcome(run_id, stage.name(), &outcome);
                            match self.settle(def, index, run_id, stage, outcome, reports, warnings)
                            {
                                Some(failure) => return Some(failure),
                                None => continue,
                            }
                        }
                    }
                }
                None => None,
            };

            let mut ctx = StageContext::new(
                run_id,
                stage.name(),
                variables.clone(),
                self.workspace.clone(),
                self.cancel.clone(),
                self.sink.clone(),
            );
            if let Some(lease) = &lease {
                ctx = ctx.with_credential(lease.handle());
            }

            self.sink.try_emit(PipelineEvent::stage(
                EventKind::StageStarted,
                run_id,
                stage.name(),
            ));

            let executed = self.run_action(stage, &ctx).await;

            // Release is unconditional: the handle goes dead before the
            // outcome is even classified.
            drop(lease);

            let outcome = classify(executed, stage_started.elapsed());
            self.emit_outcome(run_id, stage.name(), &outcome);
            if let Some(failure) =
                self.settle(def, index, run_id, stage, outcome, reports, warnings)
            {
                return Some(failure);
            }
        }

        None
    }

    /// Races the stage's action against its timeout and the cancel token.
    ///
    /// Dropping the losing future is what terminates an in-flight
    /// external call; partial output is discarded with it.
    async fn run_action(
        &self,
        stage: &StageDef,
        ctx: &StageContext,
    ) -> Result<serde_json::Value, StageError> {
        let action = stage.action().clone();
        let fut = action.execute(ctx);

        match stage.timeout() {
            Some(limit) => {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Err(self.cancel_error()),
                    res = tokio::time::timeout(limit, fut) => match res {
                        Ok(inner) => inner,
                        Err(_) => Err(StageError::timeout_after(limit)),
                    },
                }
            }
            None => {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Err(self.cancel_error()),
                    res = fut => res,
                }
            }
        }
    }

    /// Records an outcome and applies the stage's failure policy.
    #[allow(clippy::too_many_arguments)]
    fn settle(
        &self,
        def: &PipelineDef,
        index: usize,
        run_id: Uuid,
        stage: &StageDef,
        outcome: StageOutcome,
        reports: &mut Vec<StageReport>,
        warnings: &mut Vec<StageWarning>,
    ) -> Option<RunFailure> {
        let is_success = outcome.is_success();
        let err = outcome.error.clone();
        reports.push(StageReport {
            name: stage.name().to_string(),
            outcome,
        });

        if is_success {
            return None;
        }

        let err =
            err.unwrap_or_else(|| StageError::action("stage failed without classified error"));

        // Cancellation ends the run regardless of the stage's policy; no
        // stage is resumed after an abort signal.
        if let StageError::Cancelled { reason } = &err {
            let reason = reason.clone();
            self.skip_remaining(def, index + 1, run_id, "run cancelled", reports);
            self.sink.try_emit(
                PipelineEvent::run(EventKind::RunCancelled, run_id)
                    .with_data(serde_json::json!({ "reason": &reason })),
            );
            return Some(RunFailure::Cancelled { reason });
        }

        match stage.failure_policy() {
            FailurePolicy::Abort => {
                warn!(stage = stage.name(), error = %err, "stage failed; aborting run");
                self.skip_remaining(def, index + 1, run_id, "aborted by earlier stage", reports);
                Some(RunFailure::Stage {
                    stage: stage.name().to_string(),
                    error: err,
                })
            }
            FailurePolicy::ContinueWithWarning => {
                warn!(stage = stage.name(), error = %err, "stage failed; continuing with warning");
                warnings.push(StageWarning {
                    stage: stage.name().to_string(),
                    error: err,
                });
                None
            }
        }
    }

    fn push_skip(
        &self,
        run_id: Uuid,
        stage: &str,
        reason: &str,
        reports: &mut Vec<StageReport>,
    ) {
        self.sink.try_emit(
            PipelineEvent::stage(EventKind::StageSkipped, run_id, stage)
                .with_data(serde_json::json!({ "reason": reason })),
        );
        reports.push(StageReport {
            name: stage.to_string(),
            outcome: StageOutcome::skipped(reason),
        });
    }

    fn skip_remaining(
        &self,
        def: &PipelineDef,
        from: usize,
        run_id: Uuid,
        reason: &str,
        reports: &mut Vec<StageReport>,
    ) {
        for stage in &def.stages[from..] {
            self.push_skip(run_id, stage.name(), reason, reports);
        }
    }

    fn emit_outcome(&self, run_id: Uuid, stage: &str, outcome: &StageOutcome) {
        let kind = match outcome.status {
            StageStatus::Succeeded => EventKind::StageCompleted,
            StageStatus::Skipped => EventKind::StageSkipped,
            StageStatus::TimedOut => EventKind::StageTimedOut,
            StageStatus::Cancelled => EventKind::StageCancelled,
            _ => EventKind::StageFailed,
        };
        let data = serde_json::json!({
            "duration_ms": outcome.duration_ms,
            "error": outcome.error.as_ref().map(StageError::kind),
        });
        self.sink
            .try_emit(PipelineEvent::stage(kind, run_id, stage).with_data(data));
    }

    async fn finalize(&self, def: &PipelineDef, run_id: Uuid) {
        if let Some(finalizer) = &def.finalizer {
            if let Err(err) = finalizer.finalize().await {
                warn!(error = %err, "finalizer failed; run status unchanged");
            }
        }
        self.sink
            .try_emit(PipelineEvent::run(EventKind::RunFinalized, run_id));
    }

    fn cancel_error(&self) -> StageError {
        StageError::cancelled(
            self.cancel
                .reason()
                .unwrap_or_else(|| "cancelled".to_string()),
        )
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("workspace", &self.workspace)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

fn classify(
    executed: Result<serde_json::Value, StageError>,
    elapsed: Duration,
) -> StageOutcome {
    match executed {
        Ok(detail) => StageOutcome::succeeded(elapsed).with_detail(detail),
        Err(err @ StageError::Timeout { .. }) => StageOutcome::timed_out(err, elapsed),
        Err(err @ StageError::Cancelled { .. }) => StageOutcome::cancelled(err, elapsed),
        Err(err) => StageOutcome::failed(err, elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineBuilder;
    use crate::testing::fixtures::ok_stage;

    #[tokio::test]
    async fn test_empty_pipeline_succeeds() {
        let def = PipelineBuilder::new("empty").build().unwrap();

        let result = Runner::new().run(def).await;
        assert!(result.is_success());
        assert!(result.stages.is_empty());
    }

    #[tokio::test]
    async fn test_single_stage_success() {
        let def = PipelineBuilder::new("one")
            .stage(ok_stage("checkout"))
            .build()
            .unwrap();

        let result = Runner::new().run(def).await;
        assert!(result.is_success());
        assert_eq!(result.stages.len(), 1);
        assert_eq!(result.stages[0].outcome.status, StageStatus::Succeeded);
    }

    #[test]
    fn test_classify_timeout() {
        let outcome = classify(
            Err(StageError::Timeout { elapsed_ms: 100 }),
            Duration::from_millis(100),
        );
        assert_eq!(outcome.status, StageStatus::TimedOut);
    }

    #[test]
    fn test_classify_cancelled() {
        let outcome = classify(
            Err(StageError::cancelled("abort")),
            Duration::from_millis(1),
        );
        assert_eq!(outcome.status, StageStatus::Cancelled);
    }
}
