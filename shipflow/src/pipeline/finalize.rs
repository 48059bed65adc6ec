//! Always-run finalization.

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Cleanup step guaranteed to run exactly once per pipeline run.
///
/// The runner invokes the finalizer after the last stage reaches a
/// terminal state - success, abort, timeout, or cancellation. Finalizer
/// failures are logged but never override the run's already-determined
/// status.
#[async_trait]
pub trait Finalizer: Send + Sync {
    /// Performs the cleanup.
    async fn finalize(&self) -> anyhow::Result<()>;
}

/// A finalizer built from an async closure.
pub struct FnFinalizer {
    func: Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>,
}

impl FnFinalizer {
    /// Creates a finalizer from an async closure.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let boxed: Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync> =
            Box::new(move || Box::pin(func()));
        Self { func: boxed }
    }
}

impl std::fmt::Debug for FnFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFinalizer").finish()
    }
}

#[async_trait]
impl Finalizer for FnFinalizer {
    async fn finalize(&self) -> anyhow::Result<()> {
        (self.func)().await
    }
}
