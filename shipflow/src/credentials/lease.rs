//! Credential leases with guaranteed release.

use super::{CredentialStore, Secret};
use crate::errors::StageError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle to a leased credential, given to the stage's action.
///
/// Handles are cheap to clone, but every clone goes dead the moment the
/// owning lease is released: `reveal` then returns
/// [`StageError::CredentialUnavailable`].
#[derive(Clone)]
pub struct CredentialHandle {
    scope: String,
    secret: Secret,
    revoked: Arc<AtomicBool>,
}

impl CredentialHandle {
    /// Returns the scope this handle was leased for.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the secret value, if the lease is still active.
    pub fn reveal(&self) -> Result<String, StageError> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(StageError::credential(
                &self.scope,
                "execution window closed",
            ));
        }
        Ok(self.secret.expose().to_string())
    }
}

impl std::fmt::Debug for CredentialHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHandle")
            .field("scope", &self.scope)
            .field("secret", &self.secret)
            .finish()
    }
}

/// A scoped credential binding, alive for exactly one stage execution.
///
/// Dropping the lease revokes every outstanding handle and notifies the
/// store, so release is guaranteed on success, failure, timeout, and
/// cancellation alike.
pub struct CredentialLease {
    scope: String,
    handle: CredentialHandle,
    store: Arc<dyn CredentialStore>,
}

impl CredentialLease {
    /// Acquires a lease for a scope from a store.
    pub async fn acquire(
        store: Arc<dyn CredentialStore>,
        scope: &str,
    ) -> Result<Self, StageError> {
        let secret = store.resolve(scope).await?;
        store.note_acquired(scope);
        Ok(Self {
            scope: scope.to_string(),
            handle: CredentialHandle {
                scope: scope.to_string(),
                secret,
                revoked: Arc::new(AtomicBool::new(false)),
            },
            store,
        })
    }

    /// Returns the leased scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns a handle for the stage's action.
    #[must_use]
    pub fn handle(&self) -> CredentialHandle {
        self.handle.clone()
    }

    /// Releases the lease explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for CredentialLease {
    fn drop(&mut self) {
        self.handle.revoked.store(true, Ordering::SeqCst);
        self.store.note_released(&self.scope);
    }
}

impl std::fmt::Debug for CredentialLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialLease")
            .field("scope", &self.scope)
            .finish()
    }
}
