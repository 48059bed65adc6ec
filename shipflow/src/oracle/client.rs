//! Reqwest-backed analysis engine and quality-gate oracle.

use super::models::{GateStatusResponse, SubmitAnalysisRequest, SubmitAnalysisResponse};
use super::OracleConfig;
use crate::core::Verdict;
use crate::deploy::{AnalysisConfig, AnalysisEngine, AnalysisHandle, QualityGateOracle};
use crate::errors::StageError;
use async_trait::async_trait;
use std::path::Path;

/// HTTP client for an external analysis server.
///
/// Transport and non-2xx failures classify as action failures; the
/// verdict itself is reported through [`Verdict`], never through errors.
#[derive(Debug, Clone)]
pub struct HttpOracleClient {
    http: reqwest::Client,
    config: OracleConfig,
}

impl HttpOracleClient {
    /// Creates a client from a config.
    pub fn new(config: OracleConfig) -> Result<Self, StageError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StageError::action(format!("failed to build http client: {e}")))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn transport_error(err: reqwest::Error) -> StageError {
    StageError::action(format!("analysis server request failed: {err}"))
}

#[async_trait]
impl AnalysisEngine for HttpOracleClient {
    async fn submit(
        &self,
        sources: &Path,
        config: &AnalysisConfig,
    ) -> Result<AnalysisHandle, StageError> {
        let body = SubmitAnalysisRequest {
            project_key: config.project_key.clone(),
            branch: config.branch.clone(),
            sources: sources.display().to_string(),
        };

        let response = self
            .authorize(self.http.post(self.url("api/analyses")))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;

        let submitted: SubmitAnalysisResponse =
            response.json().await.map_err(transport_error)?;
        Ok(AnalysisHandle::new(submitted.analysis_id))
    }
}

#[async_trait]
impl QualityGateOracle for HttpOracleClient {
    async fn poll(&self, handle: &AnalysisHandle) -> Result<Option<Verdict>, StageError> {
        let path = format!("api/analyses/{}/gate", handle.id());
        let response = self
            .authorize(self.http.get(self.url(&path)))
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;

        let status: GateStatusResponse = response.json().await.map_err(transport_error)?;
        Ok(status.status.into_verdict())
    }
}
