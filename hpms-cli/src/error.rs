//! Error types emitted by the HPMS CLI.

use std::sync::Arc;

use hpms_core::RegionError;
use hpms_data::{PipelineError, RunLogError, TransportError};
use thiserror::Error;

/// Errors emitted by the HPMS CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The download endpoint is not a valid absolute URL.
    #[error("invalid --{field} {url:?}: {source}")]
    InvalidBaseUrl {
        field: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// A `--region` value names no known region.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] TransportError),
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Opening the run log failed.
    #[error(transparent)]
    RunLog(#[from] RunLogError),
    /// A pipeline stage failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Serialising the run summary failed.
    #[error("failed to serialise run summary: {0}")]
    SerialiseSummary(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
