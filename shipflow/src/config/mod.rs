//! Declarative run configuration.
//!
//! Stage inclusion is an explicit, testable configuration input here,
//! not a source edit; the same document carries static variables and
//! per-stage timeout overrides.

use crate::deploy::Severity;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

fn default_gate_wait_secs() -> u64 {
    300
}

fn default_severity_floor() -> Severity {
    Severity::High
}

/// Declarative configuration for one pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// The pipeline name.
    pub name: String,

    /// Static variables, resolved once at run start.
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Stage inclusion flags; stages not mentioned are included.
    #[serde(default)]
    pub stages: HashMap<String, bool>,

    /// Per-stage timeout overrides, in seconds.
    #[serde(default)]
    pub timeouts: HashMap<String, u64>,

    /// Severity floor for vulnerability scan reporting.
    #[serde(default = "default_severity_floor")]
    pub severity_floor: Severity,

    /// Bounded wait for the quality-gate verdict, in seconds.
    #[serde(default = "default_gate_wait_secs")]
    pub gate_wait_secs: u64,
}

impl PipelineConfig {
    /// Parses a configuration document from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration document from a file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    /// Returns the timeout override for a stage, if configured.
    #[must_use]
    pub fn timeout_for(&self, stage: &str) -> Option<Duration> {
        self.timeouts.get(stage).map(|secs| Duration::from_secs(*secs))
    }

    /// Returns the bounded quality-gate wait.
    #[must_use]
    pub fn gate_wait(&self) -> Duration {
        Duration::from_secs(self.gate_wait_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_config() {
        let config = PipelineConfig::from_json(r#"{"name": "backend-deploy"}"#).unwrap();

        assert_eq!(config.name, "backend-deploy");
        assert!(config.variables.is_empty());
        assert!(config.stages.is_empty());
        assert_eq!(config.severity_floor, Severity::High);
        assert_eq!(config.gate_wait(), Duration::from_secs(300));
    }

    #[test]
    fn test_full_config() {
        let config = PipelineConfig::from_json(
            r#"{
                "name": "backend-deploy",
                "variables": {"image": "registry/backend:42", "revision": "abc123"},
                "stages": {"vulnerability-scan": false},
                "timeouts": {"deploy": 600},
                "severity_floor": "critical",
                "gate_wait_secs": 120
            }"#,
        )
        .unwrap();

        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.stages.get("vulnerability-scan"), Some(&false));
        assert_eq!(config.timeout_for("deploy"), Some(Duration::from_secs(600)));
        assert_eq!(config.timeout_for("build"), None);
        assert_eq!(config.severity_floor, Severity::Critical);
        assert_eq!(config.gate_wait(), Duration::from_secs(120));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(PipelineConfig::from_json("{not json").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"name": "from-file"}"#).unwrap();

        let config = PipelineConfig::load(&path).await.unwrap();
        assert_eq!(config.name, "from-file");

        assert!(PipelineConfig::load(dir.path().join("missing.json"))
            .await
            .is_err());
    }
}
