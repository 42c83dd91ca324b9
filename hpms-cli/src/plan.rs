//! Plan command: list the download jobs a run would perform.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use hpms_core::{
    DEFAULT_WORKSPACE, DownloadJob, RegionCatalog, RunSettings, Workspace, build_jobs,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BASE_URL, ARG_REGION, ARG_WORKSPACE, ARG_YEAR, CliError, resolve_base_url,
    resolve_catalog,
};

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Print one line per region with its download URL and the \
                 shapefile path it is expected to produce. Nothing is \
                 downloaded and nothing is written.",
    about = "List the region download jobs"
)]
#[ortho_config(prefix = "HPMS")]
pub(crate) struct PlanArgs {
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
    /// Restrict the run to this region; repeat for several.
    #[arg(long = ARG_REGION, value_name = "name")]
    #[serde(default)]
    pub(crate) regions: Vec<String>,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlanConfig {
    pub(crate) catalog: RegionCatalog,
    pub(crate) settings: RunSettings,
}

impl PlanConfig {
    pub(crate) fn jobs(&self) -> Vec<DownloadJob> {
        build_jobs(
            &self.catalog,
            &self.settings.base_url,
            self.settings.year,
            &self.settings.workspace,
        )
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let workspace = args
            .workspace
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORKSPACE));
        let mut settings =
            RunSettings::new(Workspace::new(workspace)).with_base_url(resolve_base_url(args.base_url)?);
        if let Some(year) = args.year {
            settings = settings.with_year(year);
        }
        Ok(Self {
            catalog: resolve_catalog(&args.regions)?,
            settings,
        })
    }
}

pub(crate) fn run_plan_with(args: PlanArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    write_plan(writer, &config.jobs())
}

/// One tab-separated line per job: region, URL, expected shapefile.
pub(crate) fn write_plan(writer: &mut dyn Write, jobs: &[DownloadJob]) -> Result<(), CliError> {
    for job in jobs {
        writeln!(writer, "{}\t{}\t{}", job.region, job.url, job.shapefile_path)
            .map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
