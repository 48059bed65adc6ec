//! Scoped credential bindings.
//!
//! Credentials are resolved just-in-time for the stage that declares a
//! scope and are revoked unconditionally when that stage's execution
//! window ends - success, failure, timeout, or cancellation.

mod lease;
mod store;

pub use lease::{CredentialHandle, CredentialLease};
pub use store::{CredentialStore, EnvCredentialStore, Secret, StaticCredentialStore};
