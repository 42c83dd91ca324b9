//! End-to-end driver: jobs, fetch, quality control, merge and package.

use hpms_core::{
    DownloadJob, GeometryEngine, MergeReport, QcOutcome, RegionCatalog, RunSettings, build_jobs,
    filter_line_geometries,
};
use log::info;

use crate::{
    FetchReport, PackageReport, PipelineError, RegionSource, RunLog, fetch_regions,
    package_data_store,
};

/// Results of every stage of one run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Jobs built from the region catalog.
    pub jobs: Vec<DownloadJob>,
    /// Per-job fetch outcomes and the shapefile candidates.
    pub fetch: FetchReport,
    /// Files kept and rejected by quality control.
    pub qc: QcOutcome,
    /// Summary of the merged dataset.
    pub merge: MergeReport,
    /// Summary of the packaged archive.
    pub archive: PackageReport,
}

/// Run the four stages for `catalog` in order, stopping at the first error.
///
/// Nothing is rolled back on failure; extracted regions stay in the
/// workspace so a rerun only downloads what is still missing.
pub async fn run_pipeline<S, E>(
    source: &S,
    engine: &E,
    catalog: &RegionCatalog,
    settings: &RunSettings,
    log: Option<&RunLog>,
) -> Result<PipelineReport, PipelineError>
where
    S: RegionSource + ?Sized,
    E: GeometryEngine + ?Sized,
{
    let workspace = &settings.workspace;
    hpms_fs::create_dir_all(workspace.root()).map_err(|source| PipelineError::Workspace {
        path: workspace.root().to_path_buf(),
        source,
    })?;

    let jobs = build_jobs(catalog, &settings.base_url, settings.year, workspace);
    info!("Planned {} region downloads for {}", jobs.len(), settings.year);

    let fetch = fetch_regions(source, &jobs, log).await?;
    info!(
        "Fetched {} regions ({} downloaded)",
        fetch.outcomes.len(),
        fetch.downloaded()
    );

    let qc = filter_line_geometries(engine, &fetch.shapefiles).map_err(PipelineError::Qc)?;

    let data_store = workspace.data_store_dir();
    hpms_fs::create_dir_all(&data_store).map_err(|source| PipelineError::Workspace {
        path: data_store.clone(),
        source,
    })?;
    info!("Merging shapefiles into {}", settings.dataset_path());
    let merge = engine
        .merge(&qc.kept, &settings.merge_target())
        .map_err(PipelineError::Merge)?;

    info!("Creating {}", settings.archive_path());
    let archive = package_data_store(&data_store, &settings.archive_path())?;

    Ok(PipelineReport {
        jobs,
        fetch,
        qc,
        merge,
        archive,
    })
}
