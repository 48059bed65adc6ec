//! Image building.

use crate::errors::StageError;
use crate::stage::{StageAction, StageContext, StageDef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// A reference to a built artifact, e.g. `registry.example.com/backend:42`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    reference: String,
}

impl ArtifactRef {
    /// Creates an artifact reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// Returns the full reference.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns the tag portion, when the reference carries one.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        let after_slash = self.reference.rfind('/').map_or(0, |i| i + 1);
        self.reference[after_slash..]
            .rfind(':')
            .map(|i| &self.reference[after_slash + i + 1..])
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference)
    }
}

/// Builds a container image from a source directory.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Builds an image and tags it with the given reference.
    async fn build(&self, source_dir: &Path, reference: &str)
        -> Result<ArtifactRef, StageError>;
}

/// Action that builds the image named by a run variable.
pub struct BuildAction {
    builder: Arc<dyn ImageBuilder>,
    image_var: String,
}

impl BuildAction {
    /// Creates a build action reading the `image` variable.
    #[must_use]
    pub fn new(builder: Arc<dyn ImageBuilder>) -> Self {
        Self {
            builder,
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
impl StageAction for BuildAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        let reference = ctx.require_var(&self.image_var)?;
        let artifact = self.builder.build(ctx.workspace(), reference).await?;
        Ok(serde_json::json!({ "artifact": artifact.reference() }))
    }
}

/// Builds the canonical image-build stage.
#[must_use]
pub fn build_stage(builder: Arc<dyn ImageBuilder>) -> StageDef {
    StageDef::new("build-image", Arc::new(BuildAction::new(builder)))
}
