//! Process-level logging setup.

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes human-readable structured logging for a runner process.
///
/// Respects `RUST_LOG`; repeated calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init();
}

/// Initializes JSON logging for a runner process, for log shippers.
///
/// Respects `RUST_LOG`; repeated calls are no-ops.
pub fn init_json_logging() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .try_init();
}
