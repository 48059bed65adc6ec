//! Cluster deployment and rollout waiting.

use super::manifest;
use crate::errors::StageError;
use crate::stage::{StageAction, StageContext, StageDef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Opaque handle to an in-progress rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutHandle {
    id: String,
}

impl RolloutHandle {
    /// Creates a handle from the deployer's rollout id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns the rollout id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Applies manifests to a cluster and waits for rollouts.
///
/// Implementations return [`StageError::Timeout`] when a rollout exceeds
/// the given bound.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterDeployer: Send + Sync {
    /// Applies a rendered manifest, starting a rollout.
    async fn apply(&self, manifest: &Path) -> Result<RolloutHandle, StageError>;

    /// Waits until the rollout completes or the bound elapses.
    async fn wait_for_rollout(
        &self,
        handle: &RolloutHandle,
        timeout: Duration,
    ) -> Result<(), StageError>;
}

/// Action that renders the manifest, applies it, and waits for rollout.
pub struct DeployAction {
    deployer: Arc<dyn ClusterDeployer>,
    manifest: PathBuf,
    rollout_timeout: Duration,
}

impl DeployAction {
    /// Creates a deploy action for a manifest file.
    #[must_use]
    pub fn new(
        deployer: Arc<dyn ClusterDeployer>,
        manifest: impl Into<PathBuf>,
        rollout_timeout: Duration,
    ) -> Self {
        Self {
            deployer,
            manifest: manifest.into(),
            rollout_timeout,
        }
    }
}

#[async_trait]
impl StageAction for DeployAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        // The descriptor is externally owned; substitution happens once
        // per run, immediately before the apply call.
        manifest::render_file(&self.manifest, ctx.variables()).await?;

        let handle = self.deployer.apply(&self.manifest).await?;
        self.deployer
            .wait_for_rollout(&handle, self.rollout_timeout)
            .await?;
        Ok(serde_json::json!({ "rollout": handle.id() }))
    }
}

/// Builds the canonical deploy stage.
#[must_use]
pub fn deploy_stage(
    deployer: Arc<dyn ClusterDeployer>,
    manifest: impl Into<PathBuf>,
    rollout_timeout: Duration,
) -> StageDef {
    StageDef::new(
        "deploy",
        Arc::new(DeployAction::new(deployer, manifest, rollout_timeout)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelToken;
    use crate::events::NoOpEventSink;
    use crate::pipeline::Variables;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn context() -> StageContext {
        let mut map = HashMap::new();
        map.insert("IMAGE".to_string(), "registry/backend:42".to_string());
        StageContext::new(
            Uuid::new_v4(),
            "deploy",
            Variables::from(map),
            "/tmp/ws",
            CancelToken::new(),
            Arc::new(NoOpEventSink),
        )
    }

    fn manifest_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("deployment.yaml");
        std::fs::write(&path, "image: ${IMAGE}\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_deploy_renders_then_applies_then_waits() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir);

        let mut mock = MockClusterDeployer::new();
        let expected = path.clone();
        mock.expect_apply()
            .withf(move |manifest| manifest == expected)
            .times(1)
            .returning(|_| Ok(RolloutHandle::new("backend-rollout")));
        mock.expect_wait_for_rollout()
            .withf(|handle, timeout| {
                handle.id() == "backend-rollout" && *timeout == Duration::from_secs(120)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let action = DeployAction::new(Arc::new(mock), &path, Duration::from_secs(120));
        let detail = action.execute(&context()).await.unwrap();

        assert_eq!(detail["rollout"], "backend-rollout");
        let rendered = std::fs::read_to_string(&path).unwrap();
        assert_eq!(rendered, "image: registry/backend:42\n");
    }

    #[tokio::test]
    async fn test_deploy_unresolved_placeholder_never_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.yaml");
        std::fs::write(&path, "image: ${NOT_A_VARIABLE}\n").unwrap();

        let mut mock = MockClusterDeployer::new();
        mock.expect_apply().times(0);
        mock.expect_wait_for_rollout().times(0);

        let action = DeployAction::new(Arc::new(mock), &path, Duration::from_secs(120));
        let err = action.execute(&context()).await.unwrap_err();
        assert_eq!(err.kind(), "action_failed");
    }

    #[tokio::test]
    async fn test_rollout_timeout_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir);

        let mut mock = MockClusterDeployer::new();
        mock.expect_apply()
            .returning(|_| Ok(RolloutHandle::new("backend-rollout")));
        mock.expect_wait_for_rollout()
            .returning(|_, timeout| Err(StageError::timeout_after(timeout)));

        let action = DeployAction::new(Arc::new(mock), &path, Duration::from_secs(1));
        let err = action.execute(&context()).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }
}
