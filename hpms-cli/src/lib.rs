//! Command-line interface for the HPMS national merge.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use hpms_core::{BaseUrl, RegionCatalog};

mod error;
mod plan;
mod run;

pub use error::CliError;

use plan::PlanArgs;
use run::RunArgs;

const ARG_WORKSPACE: &str = "workspace";
const ARG_YEAR: &str = "year";
const ARG_BASE_URL: &str = "base-url";
const ARG_USER_AGENT: &str = "user-agent";
const ARG_REGION: &str = "region";
const ARG_RUN_LOG: &str = "run-log";
const ARG_OVERWRITE: &str = "overwrite";

/// Run the HPMS CLI with the current process arguments and environment.
///
/// `--help` and `--version` print and exit the process directly.
pub fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(CliError::ArgumentParsing(err)),
    };
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Plan(args) => plan::run_plan_with(args, &mut stdout),
        Command::Run(args) => run::run_pipeline_with(args, &run::HttpSourceBuilder, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "hpms",
    about = "Download HPMS region shapefiles and merge them into one national dataset",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the download jobs without touching the network or disk.
    Plan(PlanArgs),
    /// Download, filter, merge and package every region.
    Run(RunArgs),
}

/// Validate the configured endpoint, falling back to the HPMS portal.
fn resolve_base_url(raw: Option<String>) -> Result<BaseUrl, CliError> {
    let Some(raw) = raw else {
        return Ok(BaseUrl::default());
    };
    url::Url::parse(&raw).map_err(|source| CliError::InvalidBaseUrl {
        field: ARG_BASE_URL,
        url: raw.clone(),
        source,
    })?;
    Ok(BaseUrl::new(raw))
}

/// The full portal catalog, narrowed to `regions` when any are given.
fn resolve_catalog(regions: &[String]) -> Result<RegionCatalog, CliError> {
    Ok(RegionCatalog::united_states().restrict(regions)?)
}

#[cfg(test)]
mod tests;
