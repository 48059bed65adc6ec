//! Stage definitions and failure policies.

use super::{Gate, StageAction};
use crate::errors::DefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What the runner does when a stage reaches a non-success outcome.
///
/// The policy is an explicit field on every stage definition; it is never
/// inferred from which tool the stage invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the pipeline and mark the run failed (default).
    #[default]
    Abort,
    /// Record the failure as a warning and proceed to the next stage.
    ContinueWithWarning,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::ContinueWithWarning => write!(f, "continue_with_warning"),
        }
    }
}

/// Definition of a single pipeline stage.
pub struct StageDef {
    name: String,
    action: Arc<dyn StageAction>,
    timeout: Option<Duration>,
    gate: Option<Gate>,
    credential_scope: Option<String>,
    on_failure: FailurePolicy,
}

impl StageDef {
    /// Creates a stage definition with the abort failure policy.
    #[must_use]
    pub fn new(name: impl Into<String>, action: Arc<dyn StageAction>) -> Self {
        Self {
            name: name.into(),
            action,
            timeout: None,
            gate: None,
            credential_scope: None,
            on_failure: FailurePolicy::Abort,
        }
    }

    /// Sets the stage's maximum duration.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the gate evaluated before the action runs.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Declares the credential scope the action needs.
    #[must_use]
    pub fn with_credential_scope(mut self, scope: impl Into<String>) -> Self {
        self.credential_scope = Some(scope.into());
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Marks the stage advisory: failures are warnings, not aborts.
    #[must_use]
    pub fn continue_with_warning(self) -> Self {
        self.on_failure(FailurePolicy::ContinueWithWarning)
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage's action.
    #[must_use]
    pub fn action(&self) -> &Arc<dyn StageAction> {
        &self.action
    }

    /// Returns the stage's timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the stage's gate, if any.
    #[must_use]
    pub fn gate(&self) -> Option<&Gate> {
        self.gate.as_ref()
    }

    /// Returns the stage's credential scope, if any.
    #[must_use]
    pub fn credential_scope(&self) -> Option<&str> {
        self.credential_scope.as_deref()
    }

    /// Returns the stage's failure policy.
    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure
    }

    /// Validates the stage definition.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyStageName);
        }
        Ok(())
    }
}

impl fmt::Debug for StageDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDef")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("gate", &self.gate.as_ref().map(Gate::description))
            .field("credential_scope", &self.credential_scope)
            .field("on_failure", &self.on_failure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::FnAction;

    fn noop() -> Arc<dyn StageAction> {
        Arc::new(FnAction::new(|_ctx| Ok(serde_json::json!({}))))
    }

    #[test]
    fn test_stage_def_defaults() {
        let def = StageDef::new("build", noop());

        assert_eq!(def.name(), "build");
        assert_eq!(def.failure_policy(), FailurePolicy::Abort);
        assert!(def.timeout().is_none());
        assert!(def.gate().is_none());
        assert!(def.credential_scope().is_none());
    }

    #[test]
    fn test_stage_def_builders() {
        let def = StageDef::new("push", noop())
            .with_timeout(Duration::from_secs(300))
            .with_credential_scope("registry-push")
            .continue_with_warning();

        assert_eq!(def.timeout(), Some(Duration::from_secs(300)));
        assert_eq!(def.credential_scope(), Some("registry-push"));
        assert_eq!(def.failure_policy(), FailurePolicy::ContinueWithWarning);
    }

    #[test]
    fn test_stage_def_empty_name_invalid() {
        assert!(StageDef::new("  ", noop()).validate().is_err());
        assert!(StageDef::new("ok", noop()).validate().is_ok());
    }

    #[test]
    fn test_failure_policy_serialize() {
        let json = serde_json::to_string(&FailurePolicy::ContinueWithWarning).unwrap();
        assert_eq!(json, r#""continue_with_warning""#);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }
}
