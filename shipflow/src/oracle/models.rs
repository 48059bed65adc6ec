//! Wire models for the analysis server.

use crate::core::Verdict;
use serde::{Deserialize, Serialize};

/// Request body for submitting an analysis.
#[derive(Debug, Clone, Serialize)]
pub(super) struct SubmitAnalysisRequest {
    pub project_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub sources: String,
}

/// Response to an analysis submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnalysisResponse {
    /// The server-assigned analysis id.
    pub analysis_id: String,
}

/// The gate state the server reports for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    /// No verdict yet.
    Pending,
    /// Gate conditions met.
    Pass,
    /// Gate conditions violated.
    Fail,
    /// The server could not compute a verdict.
    Error,
}

impl GateStatus {
    /// Maps the wire state onto a verdict; `Pending` maps to `None`.
    #[must_use]
    pub fn into_verdict(self) -> Option<Verdict> {
        match self {
            Self::Pending => None,
            Self::Pass => Some(Verdict::Pass),
            Self::Fail => Some(Verdict::Fail),
            Self::Error => Some(Verdict::Error),
        }
    }
}

/// Response to a gate status poll.
#[derive(Debug, Clone, Deserialize)]
pub struct GateStatusResponse {
    /// The current gate state.
    pub status: GateStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_response_deserialize() {
        let body: SubmitAnalysisResponse =
            serde_json::from_str(r#"{"analysis_id": "task-17"}"#).unwrap();
        assert_eq!(body.analysis_id, "task-17");
    }

    #[test]
    fn test_gate_status_deserialize() {
        let body: GateStatusResponse = serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert_eq!(body.status, GateStatus::Pending);

        let body: GateStatusResponse = serde_json::from_str(r#"{"status": "fail"}"#).unwrap();
        assert_eq!(body.status, GateStatus::Fail);
    }

    #[test]
    fn test_gate_status_verdict_mapping() {
        assert_eq!(GateStatus::Pending.into_verdict(), None);
        assert_eq!(GateStatus::Pass.into_verdict(), Some(Verdict::Pass));
        assert_eq!(GateStatus::Fail.into_verdict(), Some(Verdict::Fail));
        assert_eq!(GateStatus::Error.into_verdict(), Some(Verdict::Error));
    }

    #[test]
    fn test_submit_request_skips_absent_branch() {
        let request = SubmitAnalysisRequest {
            project_key: "backend".to_string(),
            branch: None,
            sources: "/workspace".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("branch").is_none());
    }
}
