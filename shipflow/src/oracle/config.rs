//! HTTP oracle configuration.

use std::time::Duration;

/// Connection settings for the analysis server.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Base URL of the analysis server.
    pub base_url: String,
    /// Bearer token, when the server requires authentication.
    pub token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl OracleConfig {
    /// Creates a config for a server base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
