//! Run workspace lifecycle.
//!
//! The workspace is exclusive to one run at a time; the finalizer
//! reclaims it so the next run starts clean.

use crate::pipeline::Finalizer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A run's working directory on local disk.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a workspace rooted at a directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensures the workspace directory exists.
    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Removes everything inside the workspace, keeping the root.
    pub async fn reclaim(&self) -> std::io::Result<()> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        debug!(root = %self.root.display(), "workspace reclaimed");
        Ok(())
    }
}

/// A finalizer that reclaims the run's workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceFinalizer {
    workspace: Workspace,
}

impl WorkspaceFinalizer {
    /// Creates a finalizer for a workspace.
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Finalizer for WorkspaceFinalizer {
    async fn finalize(&self) -> anyhow::Result<()> {
        self.workspace.reclaim().await?;
        Ok(())
    }
}
