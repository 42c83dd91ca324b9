//! Facade crate for the HPMS national merge.
//!
//! This crate re-exports the core domain types and, behind the `data` feature,
//! the network, archive and geometry adapters that drive a full run.

#![forbid(unsafe_code)]

pub use hpms_core::{
    BaseUrl, DownloadJob, GeometryDescription, GeometryEngine, GeometryError, GeometryKind,
    MergeReport, MergeTarget, QcOutcome, Region, RegionCatalog, RegionError, RunSettings,
    Workspace, build_jobs, filter_line_geometries,
};

#[cfg(feature = "data")]
pub use hpms_data::{
    FetchError, FetchReport, HttpRegionSource, PackageError, PipelineError, PipelineReport,
    RegionSource, RunLog, ShapefileEngine, fetch_regions, package_data_store, run_pipeline,
};
