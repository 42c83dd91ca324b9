//! Fetch and extract stage: turn download jobs into shapefiles on disk.

use std::io::Cursor;

use camino::{Utf8Path, Utf8PathBuf};
use hpms_core::DownloadJob;
use log::{debug, info};
use zip::ZipArchive;

use crate::{FetchError, RegionSource, RunLog};

/// What happened to a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The shapefile was already present; no request was made.
    Skipped,
    /// The archive was downloaded and extracted.
    Downloaded {
        /// Size of the archive body.
        bytes: u64,
    },
}

impl FetchStatus {
    /// Archive bytes transferred for this job.
    #[must_use]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Skipped => 0,
            Self::Downloaded { bytes } => bytes,
        }
    }

    /// Label stored in the run log.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Downloaded { .. } => "downloaded",
        }
    }
}

/// Outcome of one job, in job order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Archive stem identifying the job.
    pub archive_stem: String,
    /// Whether the job downloaded or skipped.
    pub status: FetchStatus,
}

/// Result of the fetch and extract stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Expected shapefile of every job, in job order.
    pub shapefiles: Vec<Utf8PathBuf>,
    /// Per-job outcomes, in job order.
    pub outcomes: Vec<JobOutcome>,
}

impl FetchReport {
    /// Number of jobs that issued a download.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, FetchStatus::Downloaded { .. }))
            .count()
    }
}

/// Download and extract every job whose shapefile is not already present.
///
/// Jobs run one after another. The expected shapefile path of every job is
/// recorded, whether or not the archive actually contained it. Supply a
/// [`RunLog`] to persist each outcome.
///
/// # Examples
/// ```
/// # use std::io::Write;
/// # use async_trait::async_trait;
/// # use camino::Utf8PathBuf;
/// # use hpms_core::{BaseUrl, RegionCatalog, Workspace, build_jobs};
/// # use hpms_data::{FetchStatus, RegionSource, TransportError, fetch_regions};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// struct Offline;
///
/// #[async_trait(?Send)]
/// impl RegionSource for Offline {
///     async fn fetch_archive(
///         &self,
///         url: &str,
///         _sink: &mut dyn Write,
///     ) -> Result<u64, TransportError> {
///         Err(TransportError::Http {
///             url: url.to_owned(),
///             status: 503,
///             message: "offline".to_owned(),
///         })
///     }
/// }
///
/// let temp = tempfile::tempdir()?;
/// let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 path");
/// let jobs = build_jobs(
///     &RegionCatalog::new(["ohio"]),
///     &BaseUrl::new("https://example.org"),
///     2015,
///     &Workspace::new(root),
/// );
/// let ohio = &jobs[0];
/// std::fs::create_dir_all(&ohio.region_dir)?;
/// std::fs::write(&ohio.shapefile_path, b"")?;
///
/// let runtime = tokio::runtime::Builder::new_current_thread().build()?;
/// let report = runtime.block_on(fetch_regions(&Offline, &jobs, None))?;
/// assert_eq!(report.outcomes[0].status, FetchStatus::Skipped);
/// assert_eq!(report.shapefiles, [ohio.shapefile_path.clone()]);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_regions<S: RegionSource + ?Sized>(
    source: &S,
    jobs: &[DownloadJob],
    log: Option<&RunLog>,
) -> Result<FetchReport, FetchError> {
    let mut report = FetchReport::default();
    for job in jobs {
        let status = fetch_job(source, job).await?;
        if let Some(log) = log {
            log.record(job, status)?;
        }
        report.shapefiles.push(job.shapefile_path.clone());
        report.outcomes.push(JobOutcome {
            archive_stem: job.archive_stem.clone(),
            status,
        });
    }
    Ok(report)
}

async fn fetch_job<S: RegionSource + ?Sized>(
    source: &S,
    job: &DownloadJob,
) -> Result<FetchStatus, FetchError> {
    let present =
        hpms_fs::is_existing_file(&job.shapefile_path).map_err(|source| FetchError::Inspect {
            path: job.shapefile_path.clone(),
            source,
        })?;
    if present {
        info!("Shapefile for {} already exists. Skipping...", job.archive_stem);
        return Ok(FetchStatus::Skipped);
    }

    info!("Downloading {}...", job.archive_stem);
    let mut body = Vec::new();
    let bytes = source
        .fetch_archive(&job.url, &mut body)
        .await
        .map_err(|source| FetchError::Download {
            stem: job.archive_stem.clone(),
            source,
        })?;
    debug!("received {bytes} bytes from {}", job.url);
    extract_archive(body, &job.url, &job.region_dir)?;
    Ok(FetchStatus::Downloaded { bytes })
}

/// Unpack the zip archive held in `body` into `target`, creating it first.
///
/// `origin` names where the body came from and only appears in errors.
/// Entries whose names would escape `target` are rejected.
pub fn extract_archive(body: Vec<u8>, origin: &str, target: &Utf8Path) -> Result<(), FetchError> {
    let mut archive =
        ZipArchive::new(Cursor::new(body)).map_err(|source| FetchError::OpenArchive {
            url: origin.to_owned(),
            source,
        })?;
    hpms_fs::create_dir_all(target).map_err(|source| FetchError::CreateDir {
        path: target.to_path_buf(),
        source,
    })?;
    archive
        .extract(target)
        .map_err(|source| FetchError::Extract {
            path: target.to_path_buf(),
            source,
        })?;
    debug!("extracted {} entries into {target}", archive.len());
    Ok(())
}
