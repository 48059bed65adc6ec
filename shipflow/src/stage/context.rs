//! The read-only context handed to a stage's action.

use crate::cancellation::CancelToken;
use crate::credentials::CredentialHandle;
use crate::errors::StageError;
use crate::events::{EventKind, EventSink, PipelineEvent};
use crate::pipeline::Variables;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// The context for a single stage execution.
///
/// Every stage observes the same immutable variable set; the credential
/// handle is present only when the stage declared a scope, and it goes
/// dead when the stage's execution window ends.
pub struct StageContext {
    run_id: Uuid,
    stage: String,
    variables: Variables,
    workspace: PathBuf,
    credential: Option<CredentialHandle>,
    cancel: Arc<CancelToken>,
    sink: Arc<dyn EventSink>,
}

impl StageContext {
    /// Creates a new stage context.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        stage: impl Into<String>,
        variables: Variables,
        workspace: impl Into<PathBuf>,
        cancel: Arc<CancelToken>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            run_id,
            stage: stage.into(),
            variables,
            workspace: workspace.into(),
            credential: None,
            cancel,
            sink,
        }
    }

    /// Attaches the stage's leased credential handle.
    #[must_use]
    pub fn with_credential(mut self, handle: CredentialHandle) -> Self {
        self.credential = Some(handle);
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage
    }

    /// Returns the resolved variable set.
    #[must_use]
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Returns a variable's value, if defined.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.variables.get(key)
    }

    /// Returns a variable's value, or an action failure naming the key.
    pub fn require_var(&self, key: &str) -> Result<&str, StageError> {
        self.variables
            .get(key)
            .ok_or_else(|| StageError::action(format!("missing variable '{key}'")))
    }

    /// Returns the run's workspace directory.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Returns the leased credential handle, if the stage declared a scope.
    #[must_use]
    pub fn credential(&self) -> Option<&CredentialHandle> {
        self.credential.as_ref()
    }

    /// Returns the credential handle, or a credential error if the stage
    /// declared no scope.
    pub fn require_credential(&self) -> Result<&CredentialHandle, StageError> {
        self.credential.as_ref().ok_or_else(|| {
            StageError::credential(&self.stage, "stage declared no credential scope")
        })
    }

    /// Returns the run's cancellation token.
    #[must_use]
    pub fn cancel(&self) -> &Arc<CancelToken> {
        &self.cancel
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emits a stage-level event through the run's sink.
    pub fn emit(&self, kind: EventKind, data: Option<serde_json::Value>) {
        let mut event = PipelineEvent::stage(kind, self.run_id, &self.stage);
        if let Some(data) = data {
            event = event.with_data(data);
        }
        self.sink.try_emit(event);
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.run_id)
            .field("stage", &self.stage)
            .field("workspace", &self.workspace)
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoOpEventSink;
    use std::collections::HashMap;

    fn context() -> StageContext {
        let mut map = HashMap::new();
        map.insert("image".to_string(), "registry/app:42".to_string());
        StageContext::new(
            Uuid::new_v4(),
            "build",
            Variables::from(map),
            "/tmp/ws",
            CancelToken::new(),
            Arc::new(NoOpEventSink),
        )
    }

    #[test]
    fn test_context_variables() {
        let ctx = context();

        assert_eq!(ctx.stage_name(), "build");
        assert_eq!(ctx.var("image"), Some("registry/app:42"));
        assert_eq!(ctx.require_var("image").unwrap(), "registry/app:42");

        let err = ctx.require_var("absent").unwrap_err();
        assert_eq!(err.kind(), "action_failed");
    }

    #[test]
    fn test_context_without_credential() {
        let ctx = context();

        assert!(ctx.credential().is_none());
        let err = ctx.require_credential().unwrap_err();
        assert_eq!(err.kind(), "credential_unavailable");
    }
}
