//! Network, archive and geometry adapters for the HPMS national merge.
//!
//! Responsibilities:
//! - Download region archives over HTTP and unpack them into the workspace.
//! - Read shapefiles and merge line layers into a GeoPackage data store.
//! - Compress the data store and keep an optional SQLite run log.
//! - Drive the whole pipeline from region catalog to archive.
//!
//! Boundaries:
//! - Naming rules, job construction and the quality-control filter live in
//!   `hpms-core`; this crate only performs I/O on their behalf.
//!
//! Invariants:
//! - Jobs are processed strictly one after another.
//! - No global mutable state.
#![forbid(unsafe_code)]

mod engine;
mod error;
mod fetch;
mod package;
mod pipeline;
mod run_log;
mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use engine::ShapefileEngine;
pub use error::{FetchError, PackageError, PipelineError, RunLogError, TransportError};
pub use fetch::{FetchReport, FetchStatus, JobOutcome, extract_archive, fetch_regions};
pub use package::{PackageReport, package_data_store};
pub use pipeline::{PipelineReport, run_pipeline};
pub use run_log::RunLog;
pub use source::{DEFAULT_USER_AGENT, HttpRegionSource, RegionSource};
