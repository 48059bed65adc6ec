//! Pipeline builder with validation.

use super::{Finalizer, PipelineDef, ResolveVariables, StageToggles};
use crate::config::PipelineConfig;
use crate::errors::{DefinitionError, VariableError};
use crate::stage::StageDef;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builder for [`PipelineDef`].
///
/// Stages run in the order they are added; there is no reordering and no
/// parallelism.
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageDef>,
    resolver: Option<ResolveVariables>,
    toggles: StageToggles,
    finalizer: Option<Arc<dyn Finalizer>>,
}

impl PipelineBuilder {
    /// Creates a builder for a named pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            resolver: None,
            toggles: StageToggles::new(),
            finalizer: None,
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: StageDef) -> Self {
        self.stages.push(stage);
        self
    }

    /// Uses a static variable map.
    #[must_use]
    pub fn variables(mut self, map: HashMap<String, String>) -> Self {
        self.resolver = Some(Box::new(move || Ok(map.clone())));
        self
    }

    /// Uses a resolver function, invoked once at run start.
    #[must_use]
    pub fn variables_with<F>(mut self, resolver: F) -> Self
    where
        F: Fn() -> Result<HashMap<String, String>, VariableError> + Send + Sync + 'static,
    {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Sets whether a stage is included.
    #[must_use]
    pub fn toggle(mut self, stage: impl Into<String>, included: bool) -> Self {
        self.toggles.set(stage, included);
        self
    }

    /// Replaces all stage toggles.
    #[must_use]
    pub fn toggles(mut self, toggles: StageToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Sets the always-run finalizer.
    #[must_use]
    pub fn finalizer(mut self, finalizer: Arc<dyn Finalizer>) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    /// Applies declarative run configuration: static variables, stage
    /// toggles, and per-stage timeout overrides.
    ///
    /// Call after all stages have been added so timeout overrides find
    /// their stages.
    #[must_use]
    pub fn configured(mut self, config: &PipelineConfig) -> Self {
        if !config.variables.is_empty() {
            let map = config.variables.clone();
            self.resolver = Some(Box::new(move || Ok(map.clone())));
        }
        for (name, included) in &config.stages {
            self.toggles.set(name.clone(), *included);
        }
        self.stages = self
            .stages
            .into_iter()
            .map(|stage| match config.timeout_for(stage.name()) {
                Some(timeout) => stage.with_timeout(timeout),
                None => stage,
            })
            .collect();
        self
    }

    /// Validates and builds the pipeline definition.
    pub fn build(self) -> Result<PipelineDef, DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyPipelineName);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            stage.validate()?;
            if !seen.insert(stage.name().to_string()) {
                return Err(DefinitionError::DuplicateStage {
                    name: stage.name().to_string(),
                });
            }
        }

        for name in self.toggles.names() {
            if !seen.contains(name) {
                return Err(DefinitionError::UnknownToggle {
                    name: name.to_string(),
                });
            }
        }

        Ok(PipelineDef {
            name: self.name,
            stages: self.stages,
            resolver: self.resolver.unwrap_or_else(|| Box::new(|| Ok(HashMap::new()))),
            toggles: self.toggles,
            finalizer: self.finalizer,
        })
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field(
                "stages",
                &self.stages.iter().map(StageDef::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
