//! HTTP quality-gate oracle (optional).
//!
//! Implements [`crate::deploy::AnalysisEngine`] and
//! [`crate::deploy::QualityGateOracle`] against an analysis server's
//! task endpoints. Enabled with the `http-oracle` feature.

mod client;
mod config;
mod models;

pub use client::HttpOracleClient;
pub use config::OracleConfig;
pub use models::{GateStatus, GateStatusResponse, SubmitAnalysisResponse};
