//! Stage action trait and adapters.
//!
//! Actions are the units of work the runner invokes, at most once per
//! stage per run.

use super::StageContext;
use crate::errors::StageError;
use crate::exec::{run_command, CommandOutcome, CommandSpec};
use async_trait::async_trait;

/// Trait for stage actions.
///
/// An action returns structured detail on success; every failure mode is
/// expressed through the [`StageError`] taxonomy so the runner can
/// classify the stage's outcome.
#[async_trait]
pub trait StageAction: Send + Sync {
    /// Executes the action.
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError>;
}

/// A simple function-based action.
pub struct FnAction<F>
where
    F: Fn(&StageContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    func: F,
}

impl<F> FnAction<F>
where
    F: Fn(&StageContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    /// Creates a new function-based action.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for FnAction<F>
where
    F: Fn(&StageContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction").finish()
    }
}

#[async_trait]
impl<F> StageAction for FnAction<F>
where
    F: Fn(&StageContext) -> Result<serde_json::Value, StageError> + Send + Sync,
{
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        (self.func)(ctx)
    }
}

/// An action that invokes one external command.
///
/// The stage's credential, when present, is injected as an environment
/// variable at execution time; it never appears in an argument list.
#[derive(Debug, Clone)]
pub struct CommandAction {
    spec: CommandSpec,
    credential_env: Option<String>,
}

impl CommandAction {
    /// Creates a new command action.
    #[must_use]
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            credential_env: None,
        }
    }

    /// Injects the stage credential under the given environment key.
    #[must_use]
    pub fn with_credential_env(mut self, key: impl Into<String>) -> Self {
        self.credential_env = Some(key.into());
        self
    }
}

#[async_trait]
impl StageAction for CommandAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        let mut spec = self.spec.clone().current_dir(ctx.workspace());
        if let Some(key) = &self.credential_env {
            let handle = ctx.require_credential()?;
            spec = spec.env(key, handle.reveal()?);
        }

        // Stage-level timeout enforcement happens in the runner; the
        // command still races the cancel token directly so an abort kills
        // the child immediately.
        match run_command(&spec, None, ctx.cancel()).await? {
            CommandOutcome::Completed {
                exit_code: 0,
                stdout,
                ..
            } => Ok(serde_json::json!({
                "program": spec.program(),
                "stdout_bytes": stdout.len(),
            })),
            CommandOutcome::Completed {
                exit_code, stderr, ..
            } => Err(StageError::action_with_exit(
                format!(
                    "'{}' exited with status {exit_code}: {}",
                    spec.program(),
                    stderr.trim()
                ),
                exit_code,
            )),
            CommandOutcome::TimedOut { elapsed_ms } => {
                Err(StageError::Timeout { elapsed_ms })
            }
            CommandOutcome::Cancelled { reason } => Err(StageError::cancelled(reason)),
        }
    }
}
