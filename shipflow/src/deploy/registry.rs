//! Artifact registry authentication and push.

use super::ArtifactRef;
use crate::credentials::CredentialHandle;
use crate::errors::StageError;
use crate::stage::{StageAction, StageContext, StageDef};
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Receives built artifacts after a scoped authentication.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// Authenticates with the stage's leased credential.
    async fn authenticate(&self, credential: &CredentialHandle) -> Result<(), StageError>;

    /// Pushes an artifact.
    async fn push(&self, artifact: &ArtifactRef) -> Result<(), StageError>;
}

/// Action that authenticates and pushes the image named by a variable.
///
/// The runner acquires the credential lease before this action runs; if
/// resolution fails, no push is ever attempted.
pub struct PushAction {
    registry: Arc<dyn ArtifactRegistry>,
    image_var: String,
}

impl PushAction {
    /// Creates a push action reading the `image` variable.
    #[must_use]
    pub fn new(registry: Arc<dyn ArtifactRegistry>) -> Self {
        Self {
            registry,
            image_var: "image".to_string(),
        }
    }

    /// Overrides the variable holding the image reference.
    #[must_use]
    pub fn with_image_var(mut self, key: impl Into<String>) -> Self {
        self.image_var = key.into();
        self
    }
}

#[async_trait]
impl StageAction for PushAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        let credential = ctx.require_credential()?;
        self.registry.authenticate(credential).await?;

        let artifact = ArtifactRef::new(ctx.require_var(&self.image_var)?);
        self.registry.push(&artifact).await?;
        Ok(serde_json::json!({ "pushed": artifact.reference() }))
    }
}

/// Builds the canonical push stage bound to a credential scope.
#[must_use]
pub fn push_stage(registry: Arc<dyn ArtifactRegistry>, credential_scope: &str) -> StageDef {
    StageDef::new("push-image", Arc::new(PushAction::new(registry)))
        .with_credential_scope(credential_scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelToken;
    use crate::credentials::{CredentialLease, StaticCredentialStore};
    use crate::events::NoOpEventSink;
    use crate::pipeline::Variables;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn context() -> StageContext {
        let mut map = HashMap::new();
        map.insert("image".to_string(), "registry/backend:42".to_string());
        StageContext::new(
            Uuid::new_v4(),
            "push-image",
            Variables::from(map),
            "/tmp/ws",
            CancelToken::new(),
            Arc::new(NoOpEventSink),
        )
    }

    async fn lease() -> CredentialLease {
        let store =
            Arc::new(StaticCredentialStore::new().with_secret("registry-push", "token-abc"));
        CredentialLease::acquire(store, "registry-push").await.unwrap()
    }

    #[tokio::test]
    async fn test_push_authenticates_then_pushes() {
        let mut mock = MockArtifactRegistry::new();
        mock.expect_authenticate()
            .withf(|credential| credential.reveal().as_deref() == Ok("token-abc"))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_push()
            .withf(|artifact| artifact.reference() == "registry/backend:42")
            .times(1)
            .returning(|_| Ok(()));

        let action = PushAction::new(Arc::new(mock));
        let lease = lease().await;
        let ctx = context().with_credential(lease.handle());

        let detail = action.execute(&ctx).await.unwrap();
        assert_eq!(detail["pushed"], "registry/backend:42");
    }

    #[tokio::test]
    async fn test_push_without_credential_never_calls_registry() {
        let mut mock = MockArtifactRegistry::new();
        mock.expect_authenticate().times(0);
        mock.expect_push().times(0);

        let action = PushAction::new(Arc::new(mock));
        let err = action.execute(&context()).await.unwrap_err();
        assert_eq!(err.kind(), "credential_unavailable");
    }

    #[tokio::test]
    async fn test_failed_authentication_skips_push() {
        let mut mock = MockArtifactRegistry::new();
        mock.expect_authenticate()
            .returning(|_| Err(StageError::action("login denied")));
        mock.expect_push().times(0);

        let action = PushAction::new(Arc::new(mock));
        let lease = lease().await;
        let ctx = context().with_credential(lease.handle());

        let err = action.execute(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), "action_failed");
    }

    #[test]
    fn test_push_stage_declares_scope() {
        let mock = MockArtifactRegistry::new();
        let stage = push_stage(Arc::new(mock), "registry-push");

        assert_eq!(stage.name(), "push-image");
        assert_eq!(stage.credential_scope(), Some("registry-push"));
    }
}
