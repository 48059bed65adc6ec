//! Cancellation token for cooperative run abort.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

/// A token the runner races against every in-flight stage action.
///
/// Cancellation is idempotent - only the first cancellation reason is kept.
/// The runner observes the token between stages and while an action is
/// executing, so an external abort terminates the current stage rather
/// than waiting for it to finish.
pub struct CancelToken {
    flag: watch::Sender<bool>,
    reason: RwLock<Option<String>>,
}

impl CancelToken {
    /// Creates a new, un-cancelled token.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept. The reason is
    /// stored before waiters are woken so they always observe it.
    pub fn cancel(&self, reason: impl Into<String>) {
        {
            let mut guard = self.reason.write();
            if guard.is_some() {
                return;
            }
            *guard = Some(reason.into());
        }
        self.flag.send_replace(true);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Resolves once cancellation has been requested.
    ///
    /// Returns immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives inside self, so wait_for cannot observe a
        // closed channel while this borrow is alive.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag,
            reason: RwLock::new(None),
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
