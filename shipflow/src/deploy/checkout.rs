//! Source checkout collaborator and stage.

use crate::errors::StageError;
use crate::stage::{StageAction, StageContext, StageDef};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Materializes a source revision into the run's workspace.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceCheckout: Send + Sync {
    /// Fetches a revision into the workspace.
    async fn fetch(&self, revision: &str, workspace: &Path) -> Result<(), StageError>;
}

/// Action that checks out the revision named by a run variable.
pub struct CheckoutAction {
    checkout: Arc<dyn SourceCheckout>,
    revision_var: String,
}

impl CheckoutAction {
    /// Creates a checkout action reading the `revision` variable.
    #[must_use]
    pub fn new(checkout: Arc<dyn SourceCheckout>) -> Self {
        Self {
            checkout,
            revision_var: "revision".to_string(),
        }
    }

    /// Overrides the variable holding the revision.
    #[must_use]
    pub fn with_revision_var(mut self, key: impl Into<String>) -> Self {
        self.revision_var = key.into();
        self
    }
}

#[async_trait]
impl StageAction for CheckoutAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        let revision = ctx.require_var(&self.revision_var)?;
        self.checkout.fetch(revision, ctx.workspace()).await?;
        Ok(serde_json::json!({ "revision": revision }))
    }
}

/// Builds the canonical checkout stage.
#[must_use]
pub fn checkout_stage(checkout: Arc<dyn SourceCheckout>) -> StageDef {
    StageDef::new("checkout", Arc::new(CheckoutAction::new(checkout)))
}
