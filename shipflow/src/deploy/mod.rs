//! External collaborator contracts and the canonical deployment stages.
//!
//! Each collaborator - checkout, analysis engine, quality-gate oracle,
//! scanner, image builder, artifact registry, cluster deployer - is an
//! opaque black box behind a trait; the stage adapters here wire them
//! into [`crate::stage::StageDef`]s with the right failure policies.

mod analysis;
mod checkout;
mod cluster;
mod image;
pub mod manifest;
mod registry;
mod scan;

pub use analysis::{
    quality_gate_stage, AnalysisConfig, AnalysisEngine, AnalysisHandle, QualityGateAction,
    QualityGateOracle,
};
pub use checkout::{checkout_stage, CheckoutAction, SourceCheckout};
pub use cluster::{deploy_stage, ClusterDeployer, DeployAction, RolloutHandle};
pub use image::{build_stage, ArtifactRef, BuildAction, ImageBuilder};
pub use registry::{push_stage, ArtifactRegistry, PushAction};
pub use scan::{scan_stage, Finding, ScanAction, ScanReport, Severity, VulnerabilityScanner};

#[cfg(test)]
pub(crate) use analysis::{MockAnalysisEngine, MockQualityGateOracle};
#[cfg(test)]
pub(crate) use checkout::MockSourceCheckout;
#[cfg(test)]
pub(crate) use cluster::MockClusterDeployer;
#[cfg(test)]
pub(crate) use image::MockImageBuilder;
#[cfg(test)]
pub(crate) use registry::MockArtifactRegistry;
#[cfg(test)]
pub(crate) use scan::MockVulnerabilityScanner;
