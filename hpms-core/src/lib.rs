//! Core domain types for the HPMS national merge.
//!
//! Responsibilities:
//! - Enumerate the regions published on the HPMS portal and the naming
//!   corrections the portal needs.
//! - Turn the region list into explicit download jobs.
//! - Describe the geometry engine seam used by the quality-control and merge
//!   stages, and implement the quality-control filter on top of it.
//!
//! Boundaries:
//! - No network, archive or database access (those live in `hpms-data`).
//! - No global mutable state; every stage receives its inputs explicitly.

#![forbid(unsafe_code)]

pub mod geometry;
pub mod job;
pub mod qc;
pub mod region;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use geometry::{
    BoxedError, GeometryDescription, GeometryEngine, GeometryError, GeometryKind, MergeReport,
    MergeTarget,
};
pub use job::{BaseUrl, DownloadJob, build_jobs, capitalise};
pub use qc::{QcOutcome, filter_line_geometries};
pub use region::{FileException, Region, RegionCatalog, RegionError, UNITED_STATES};
pub use settings::{
    DATA_STORE_DIR, DEFAULT_BASE_URL, DEFAULT_WORKSPACE, DEFAULT_YEAR, RunSettings, Workspace,
};
