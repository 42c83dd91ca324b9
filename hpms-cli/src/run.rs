//! Run command: execute the whole pipeline and report what it did.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use hpms_core::{DEFAULT_WORKSPACE, RegionCatalog, RunSettings, Workspace};
use hpms_data::{
    DEFAULT_USER_AGENT, HttpRegionSource, PipelineReport, RegionSource, RunLog, ShapefileEngine,
    run_pipeline,
};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BASE_URL, ARG_OVERWRITE, ARG_REGION, ARG_RUN_LOG, ARG_USER_AGENT, ARG_WORKSPACE, ARG_YEAR,
    CliError, resolve_base_url, resolve_catalog,
};

/// CLI arguments for the `run` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Download every region archive that is not already in the \
                 workspace, keep the line shapefiles, merge them into a \
                 GeoPackage and zip the data store. Values can come from CLI \
                 flags, configuration files, or HPMS_ environment variables.",
    about = "Build the national HPMS dataset"
)]
#[ortho_config(prefix = "HPMS")]
pub(crate) struct RunArgs {
    /// Workspace directory holding region extracts and the data store.
    #[arg(long = ARG_WORKSPACE, value_name = "dir")]
    #[serde(default)]
    pub(crate) workspace: Option<Utf8PathBuf>,
    /// Publication year to download.
    #[arg(long = ARG_YEAR, value_name = "year")]
    #[serde(default)]
    pub(crate) year: Option<u16>,
    /// Base URL of the shapefile download endpoint.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// `User-Agent` header sent with every download.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Restrict the run to this region; repeat for several.
    #[arg(long = ARG_REGION, value_name = "name")]
    #[serde(default)]
    pub(crate) regions: Vec<String>,
    /// Record every download in this SQLite database.
    #[arg(long = ARG_RUN_LOG, value_name = "path")]
    #[serde(default)]
    pub(crate) run_log: Option<Utf8PathBuf>,
    /// Replace an existing merged dataset.
    #[arg(long = ARG_OVERWRITE)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) overwrite: bool,
}

impl RunArgs {
    pub(crate) fn into_config(self) -> Result<RunConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RunConfig::try_from(merged)
    }
}

/// Resolved `run` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunConfig {
    pub(crate) catalog: RegionCatalog,
    pub(crate) settings: RunSettings,
    pub(crate) user_agent: String,
    pub(crate) run_log: Option<Utf8PathBuf>,
}

impl TryFrom<RunArgs> for RunConfig {
    type Error = CliError;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let workspace = args
            .workspace
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORKSPACE));
        let mut settings = RunSettings::new(Workspace::new(workspace))
            .with_base_url(resolve_base_url(args.base_url)?)
            .with_overwrite(args.overwrite);
        if let Some(year) = args.year {
            settings = settings.with_year(year);
        }
        Ok(Self {
            catalog: resolve_catalog(&args.regions)?,
            settings,
            user_agent: args
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            run_log: args.run_log,
        })
    }
}

/// Builds the region source for the current run.
pub(crate) trait SourceBuilder {
    fn build(&self, config: &RunConfig) -> Result<Box<dyn RegionSource>, CliError>;
}

pub(crate) struct HttpSourceBuilder;

impl SourceBuilder for HttpSourceBuilder {
    fn build(&self, config: &RunConfig) -> Result<Box<dyn RegionSource>, CliError> {
        let source = HttpRegionSource::new()
            .map_err(CliError::HttpClient)?
            .with_user_agent(config.user_agent.clone());
        Ok(Box::new(source))
    }
}

pub(crate) fn run_pipeline_with(
    args: RunArgs,
    builder: &dyn SourceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let summary = execute_run(&config, builder)?;
    write_summary(writer, &summary)
}

pub(crate) fn execute_run(
    config: &RunConfig,
    builder: &dyn SourceBuilder,
) -> Result<RunSummary, CliError> {
    let source = builder.build(config)?;
    let log = config
        .run_log
        .as_deref()
        .map(RunLog::initialise)
        .transpose()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(run_pipeline(
        source.as_ref(),
        &ShapefileEngine::new(),
        &config.catalog,
        &config.settings,
        log.as_ref(),
    ))?;
    info!("Wrote {}", report.archive.archive_path);
    Ok(RunSummary::from(&report))
}

/// Machine-readable account of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) dataset: Utf8PathBuf,
    pub(crate) layer: String,
    pub(crate) features: usize,
    pub(crate) archive: Utf8PathBuf,
    pub(crate) regions: Vec<RegionSummary>,
    pub(crate) rejected: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RegionSummary {
    pub(crate) archive: String,
    pub(crate) outcome: &'static str,
    pub(crate) bytes: u64,
}

impl From<&PipelineReport> for RunSummary {
    fn from(report: &PipelineReport) -> Self {
        Self {
            dataset: report.merge.output_path.clone(),
            layer: report.merge.layer.clone(),
            features: report.merge.feature_count,
            archive: report.archive.archive_path.clone(),
            regions: report
                .fetch
                .outcomes
                .iter()
                .map(|outcome| RegionSummary {
                    archive: outcome.archive_stem.clone(),
                    outcome: outcome.status.label(),
                    bytes: outcome.status.bytes(),
                })
                .collect(),
            rejected: report
                .qc
                .rejected
                .iter()
                .map(|entry| entry.path.clone())
                .collect(),
        }
    }
}

fn write_summary(writer: &mut dyn Write, summary: &RunSummary) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(summary).map_err(CliError::SerialiseSummary)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}
