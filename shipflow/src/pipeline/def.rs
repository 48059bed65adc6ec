//! Pipeline definitions and stage toggles.

use super::{Finalizer, ResolveVariables};
use crate::stage::StageDef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Explicit stage inclusion flags.
///
/// Replaces commented-out stages: whether a stage runs is a testable
/// configuration input, not a source edit. Stages not mentioned are
/// included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageToggles(HashMap<String, bool>);

impl StageToggles {
    /// Creates toggles that include every stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a stage is included.
    pub fn set(&mut self, stage: impl Into<String>, included: bool) {
        self.0.insert(stage.into(), included);
    }

    /// Returns whether a stage is included.
    #[must_use]
    pub fn included(&self, stage: &str) -> bool {
        self.0.get(stage).copied().unwrap_or(true)
    }

    /// Iterates over the explicitly toggled stage names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<HashMap<String, bool>> for StageToggles {
    fn from(map: HashMap<String, bool>) -> Self {
        Self(map)
    }
}

/// A validated, ready-to-run pipeline definition.
///
/// Built through [`super::PipelineBuilder`]; stage order is declaration
/// order and is never changed by the runner.
pub struct PipelineDef {
    pub(super) name: String,
    pub(super) stages: Vec<StageDef>,
    pub(super) resolver: ResolveVariables,
    pub(super) toggles: StageToggles,
    pub(super) finalizer: Option<Arc<dyn Finalizer>>,
}

impl PipelineDef {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage definitions in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }

    /// Returns the stage toggles.
    #[must_use]
    pub fn toggles(&self) -> &StageToggles {
        &self.toggles
    }
}

impl std::fmt::Debug for PipelineDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDef")
            .field("name", &self.name)
            .field(
                "stages",
                &self.stages.iter().map(StageDef::name).collect::<Vec<_>>(),
            )
            .field("toggles", &self.toggles)
            .field("has_finalizer", &self.finalizer.is_some())
            .finish()
    }
}
