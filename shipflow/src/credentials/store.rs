//! Credential stores and the secret value type.

use crate::errors::StageError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// An opaque secret value.
///
/// The wrapped string is never printed by `Debug` and the type carries no
/// serde derives, so secrets cannot leak into results or event payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(****)")
    }
}

/// Trait for backends that resolve named credential scopes.
///
/// The runner acquires a [`crate::credentials::CredentialLease`] through a
/// store immediately before a stage's action runs; the acquire/release
/// bookkeeping hooks let stores track that scopes never overlap their
/// owning stage's execution window.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolves a credential scope to its secret.
    async fn resolve(&self, scope: &str) -> Result<Secret, StageError>;

    /// Called when a lease on `scope` is acquired.
    fn note_acquired(&self, _scope: &str) {}

    /// Called when a lease on `scope` is released.
    fn note_released(&self, _scope: &str) {}
}

/// An in-memory credential store.
///
/// Tracks active scopes so tests can assert that a credential is only
/// resolvable inside its owning stage's execution window.
#[derive(Default)]
pub struct StaticCredentialStore {
    secrets: HashMap<String, Secret>,
    active: Mutex<HashSet<String>>,
}

impl StaticCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret for a scope.
    #[must_use]
    pub fn with_secret(mut self, scope: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(scope.into(), Secret::new(value));
        self
    }

    /// Returns true if a lease on the scope is currently active.
    #[must_use]
    pub fn is_active(&self, scope: &str) -> bool {
        self.active.lock().contains(scope)
    }

    /// Returns the currently active scopes.
    #[must_use]
    pub fn active_scopes(&self) -> Vec<String> {
        self.active.lock().iter().cloned().collect()
    }
}

impl std::fmt::Debug for StaticCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialStore")
            .field("scopes", &self.secrets.keys().collect::<Vec<_>>())
            .field("active", &self.active_scopes())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn resolve(&self, scope: &str) -> Result<Secret, StageError> {
        self.secrets
            .get(scope)
            .cloned()
            .ok_or_else(|| StageError::credential(scope, "unknown scope"))
    }

    fn note_acquired(&self, scope: &str) {
        self.active.lock().insert(scope.to_string());
    }

    fn note_released(&self, scope: &str) {
        self.active.lock().remove(scope);
    }
}

/// A credential store backed by process environment variables.
///
/// A scope like `registry-push` resolves from `<PREFIX>REGISTRY_PUSH`.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    prefix: String,
}

impl EnvCredentialStore {
    /// Creates a store reading variables with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, scope: &str) -> String {
        let suffix: String = scope
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{suffix}", self.prefix)
    }
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn resolve(&self, scope: &str) -> Result<Secret, StageError> {
        let name = self.var_name(scope);
        std::env::var(&name)
            .map(Secret::new)
            .map_err(|_| StageError::credential(scope, format!("environment variable {name} not set")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(****)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[tokio::test]
    async fn test_static_store_resolve() {
        let store = StaticCredentialStore::new().with_secret("registry-push", "token-abc");

        let secret = store.resolve("registry-push").await.unwrap();
        assert_eq!(secret.expose(), "token-abc");
    }

    #[tokio::test]
    async fn test_static_store_unknown_scope() {
        let store = StaticCredentialStore::new();

        let err = store.resolve("missing").await.unwrap_err();
        assert_eq!(err.kind(), "credential_unavailable");
    }

    #[test]
    fn test_static_store_active_tracking() {
        let store = StaticCredentialStore::new().with_secret("deploy", "x");

        assert!(!store.is_active("deploy"));
        store.note_acquired("deploy");
        assert!(store.is_active("deploy"));
        store.note_released("deploy");
        assert!(!store.is_active("deploy"));
    }

    #[test]
    fn test_env_store_var_name() {
        let store = EnvCredentialStore::new("SHIPFLOW_CRED_");
        assert_eq!(
            store.var_name("registry-push"),
            "SHIPFLOW_CRED_REGISTRY_PUSH"
        );
    }

    #[tokio::test]
    async fn test_env_store_resolve() {
        std::env::set_var("SHIPFLOW_TEST_CRED_KUBE_DEPLOY", "kubeconfig-data");
        let store = EnvCredentialStore::new("SHIPFLOW_TEST_CRED_");

        let secret = store.resolve("kube-deploy").await.unwrap();
        assert_eq!(secret.expose(), "kubeconfig-data");

        let err = store.resolve("absent-scope").await.unwrap_err();
        assert_eq!(err.kind(), "credential_unavailable");
        std::env::remove_var("SHIPFLOW_TEST_CRED_KUBE_DEPLOY");
    }
}
