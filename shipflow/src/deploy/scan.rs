//! Vulnerability scanning: advisory by policy.
//!
//! The scan stage reports findings at or above a severity floor but never
//! aborts the pipeline on its own - only the quality gate does. This is a
//! deliberate policy choice the runner preserves; findings are logged and
//! flagged for operator review instead of gating.

use crate::errors::StageError;
use crate::stage::{StageAction, StageContext, StageDef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

/// Finding severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational or low-impact finding.
    Low,
    /// Moderate-impact finding.
    Medium,
    /// High-impact finding.
    High,
    /// Critical finding.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One vulnerability finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Advisory identifier (e.g. a CVE id).
    pub id: String,
    /// Finding severity.
    pub severity: Severity,
    /// Short human-readable title.
    pub title: String,
}

/// The scanner's report for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// What was scanned (an image reference).
    pub target: String,
    /// All findings the scanner reported.
    pub findings: Vec<Finding>,
}

impl ScanReport {
    /// Returns the findings at or above a severity floor.
    #[must_use]
    pub fn at_or_above(&self, floor: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity >= floor)
            .collect()
    }
}

/// Scans a built artifact for known vulnerabilities.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VulnerabilityScanner: Send + Sync {
    /// Scans a target, reporting findings at or above the floor.
    async fn scan(&self, target: &str, floor: Severity) -> Result<ScanReport, StageError>;
}

/// Action that runs the scanner and logs findings without gating.
pub struct ScanAction {
    scanner: Arc<dyn VulnerabilityScanner>,
    image_var: String,
    floor: Severity,
}

impl ScanAction {
    /// Creates a scan action reading the `image` variable.
    #[must_use]
    pub fn new(scanner: Arc<dyn VulnerabilityScanner>, floor: Severity) -> Self {
        Self {
            scanner,
            image_var: "image".to_string(),
            floor,
        }
    }

    /// Overrides the variable holding the scan target.
    #[must_use]
    pub fn with_image_var(mut self, key: impl Into<String>) -> Self {
        self.image_var = key.into();
        self
    }
}

#[async_trait]
impl StageAction for ScanAction {
    async fn execute(&self, ctx: &StageContext) -> Result<serde_json::Value, StageError> {
        let target = ctx.require_var(&self.image_var)?;
        let report = self.scanner.scan(target, self.floor).await?;

        let flagged = report.at_or_above(self.floor);
        if !flagged.is_empty() {
            // Advisory by policy: surfaced for operator review, never gating.
            warn!(
                target,
                floor = %self.floor,
                count = flagged.len(),
                "vulnerability findings at or above severity floor; scan is advisory, review required"
            );
        }

        let report_value = serde_json::to_value(&report)
            .map_err(|e| StageError::action(format!("malformed scan report: {e}")))?;
        Ok(serde_json::json!({
            "findings_at_or_above_floor": flagged.len(),
            "report": report_value,
        }))
    }
}

/// Builds the canonical advisory scan stage.
///
/// Carries the continue-with-warning policy so even a scanner invocation
/// failure cannot abort the pipeline.
#[must_use]
pub fn scan_stage(scanner: Arc<dyn VulnerabilityScanner>, floor: Severity) -> StageDef {
    StageDef::new(
        "vulnerability-scan",
        Arc::new(ScanAction::new(scanner, floor)),
    )
    .continue_with_warning()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelToken;
    use crate::events::NoOpEventSink;
    use crate::pipeline::Variables;
    use crate::stage::FailurePolicy;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn context() -> StageContext {
        let mut map = HashMap::new();
        map.insert("image".to_string(), "registry/backend:42".to_string());
        StageContext::new(
            Uuid::new_v4(),
            "vulnerability-scan",
            Variables::from(map),
            "/tmp/ws",
            CancelToken::new(),
            Arc::new(NoOpEventSink),
        )
    }

    fn finding(id: &str, severity: Severity) -> Finding {
        Finding {
            id: id.to_string(),
            severity,
            title: format!("{id} title"),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_report_at_or_above() {
        let report = ScanReport {
            target: "registry/backend:42".to_string(),
            findings: vec![
                finding("CVE-2025-0001", Severity::Low),
                finding("CVE-2025-0002", Severity::High),
                finding("CVE-2025-0003", Severity::Critical),
            ],
        };

        assert_eq!(report.at_or_above(Severity::High).len(), 2);
        assert_eq!(report.at_or_above(Severity::Low).len(), 3);
        assert_eq!(report.at_or_above(Severity::Critical).len(), 1);
    }

    #[tokio::test]
    async fn test_scan_with_findings_still_succeeds() {
        let mut mock = MockVulnerabilityScanner::new();
        mock.expect_scan()
            .withf(|target, floor| target == "registry/backend:42" && *floor == Severity::High)
            .returning(|target, _| {
                Ok(ScanReport {
                    target: target.to_string(),
                    findings: vec![finding("CVE-2025-0002", Severity::Critical)],
                })
            });

        let action = ScanAction::new(Arc::new(mock), Severity::High);
        let detail = action.execute(&context()).await.unwrap();
        assert_eq!(detail["findings_at_or_above_floor"], 1);
    }

    #[tokio::test]
    async fn test_scanner_invocation_failure_propagates() {
        let mut mock = MockVulnerabilityScanner::new();
        mock.expect_scan()
            .returning(|_, _| Err(StageError::action("scanner crashed")));

        let action = ScanAction::new(Arc::new(mock), Severity::High);
        let err = action.execute(&context()).await.unwrap_err();
        assert_eq!(err.kind(), "action_failed");
    }

    #[test]
    fn test_scan_stage_is_advisory() {
        let mock = MockVulnerabilityScanner::new();
        let stage = scan_stage(Arc::new(mock), Severity::High);

        assert_eq!(stage.name(), "vulnerability-scan");
        assert_eq!(
            stage.failure_policy(),
            FailurePolicy::ContinueWithWarning
        );
    }

    #[test]
    fn test_severity_serialize() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            r#""critical""#
        );
    }
}
