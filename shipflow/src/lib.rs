//! # Shipflow
//!
//! A sequential deployment-pipeline runner.
//!
//! Shipflow executes an ordered sequence of named stages (checkout, quality
//! gate, vulnerability scan, image build, registry push, cluster deploy)
//! with support for:
//!
//! - **Strictly sequential execution**: stages run in declaration order,
//!   one at a time, with at most one attempt per stage per run
//! - **Gated stages**: optional predicates over the resolved variables that
//!   skip (not fail) a stage
//! - **Scoped credentials**: secret bindings resolved just-in-time and
//!   revoked when the owning stage's execution window ends
//! - **Timeout enforcement**: in-flight external calls are terminated when
//!   a stage's timeout fires
//! - **Cooperative cancellation**: an operator abort terminates the
//!   in-flight stage and still runs the finalizer
//! - **Always-run finalization**: workspace reclamation runs exactly once
//!   regardless of outcome
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shipflow::prelude::*;
//!
//! // Define a pipeline
//! let def = PipelineBuilder::new("backend-deploy")
//!     .variables(variables)
//!     .stage(checkout_stage(checkout))
//!     .stage(quality_gate_stage(engine, oracle, analysis, wait))
//!     .stage(scan_stage(scanner, Severity::High))
//!     .stage(build_stage(builder))
//!     .stage(push_stage(registry, "registry-push"))
//!     .build()?;
//!
//! // Execute the pipeline
//! let result = Runner::new().run(def).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod credentials;
pub mod deploy;
pub mod errors;
pub mod events;
pub mod exec;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod testing;
pub mod workspace;

#[cfg(feature = "http-oracle")]
pub mod oracle;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancelToken;
    pub use crate::config::PipelineConfig;
    pub use crate::core::{RunStatus, StageOutcome, StageStatus, Verdict};
    pub use crate::credentials::{
        CredentialHandle, CredentialLease, CredentialStore, EnvCredentialStore, Secret,
        StaticCredentialStore,
    };
    pub use crate::deploy::{
        build_stage, checkout_stage, deploy_stage, push_stage, quality_gate_stage, scan_stage,
        AnalysisConfig, AnalysisEngine, AnalysisHandle, ArtifactRef, ArtifactRegistry,
        ClusterDeployer, Finding, ImageBuilder, QualityGateOracle, RolloutHandle, ScanReport,
        Severity, SourceCheckout, VulnerabilityScanner,
    };
    pub use crate::errors::{
        ConfigError, DefinitionError, RunFailure, StageError, VariableError,
    };
    pub use crate::events::{
        CollectingEventSink, EventKind, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::exec::{run_command, CommandOutcome, CommandSpec};
    pub use crate::pipeline::{
        Finalizer, FnFinalizer, PipelineBuilder, PipelineDef, PipelineResult, Runner,
        StageReport, StageToggles, StageWarning, Variables,
    };
    pub use crate::report::{CollectingReporter, LoggingReporter, StatusReporter};
    pub use crate::stage::{
        CommandAction, FailurePolicy, FnAction, Gate, StageAction, StageContext, StageDef,
    };
    pub use crate::workspace::{Workspace, WorkspaceFinalizer};
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
