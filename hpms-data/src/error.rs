//! Error types produced by the download, packaging and pipeline stages.

use std::{error::Error as StdError, io};

use camino::Utf8PathBuf;
use hpms_core::GeometryError;
use thiserror::Error;

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Builder error reported by `reqwest`.
        source: reqwest::Error,
    },
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
}

/// Errors produced while fetching and extracting region archives.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// Checking for an existing shapefile failed.
    #[error("failed to inspect {path:?}: {source}")]
    Inspect {
        /// Shapefile being checked.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The region archive could not be downloaded.
    #[error("failed to download {stem}: {source}")]
    Download {
        /// Archive stem of the failing job.
        stem: String,
        /// Transport failure.
        source: TransportError,
    },
    /// The response body was not a readable zip archive.
    #[error("response from {url} is not a zip archive: {source}")]
    OpenArchive {
        /// URL the body was fetched from.
        url: String,
        /// Zip decoding error.
        source: zip::result::ZipError,
    },
    /// Creating the region directory failed.
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        /// Directory being created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Unpacking the archive failed.
    #[error("failed to extract archive into {path:?}: {source}")]
    Extract {
        /// Target directory.
        path: Utf8PathBuf,
        /// Zip extraction error.
        source: zip::result::ZipError,
    },
    /// Recording the outcome in the run log failed.
    #[error(transparent)]
    Log(#[from] RunLogError),
}

/// Errors produced by the SQLite run log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunLogError {
    /// Opening the database or creating its table failed.
    #[error("failed to initialise run log at {path:?}: {source}")]
    Initialise {
        /// Database location.
        path: Utf8PathBuf,
        /// SQLite error.
        source: rusqlite::Error,
    },
    /// Inserting a row failed.
    #[error("failed to record download outcome: {source}")]
    Record {
        /// SQLite error.
        source: rusqlite::Error,
    },
    /// A value could not be converted for storage.
    #[error("failed to prepare run log value ({what}): {source}")]
    Value {
        /// Description of the value that failed to convert.
        what: &'static str,
        /// Underlying conversion error.
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Errors produced while compressing the data store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackageError {
    /// Walking the data store failed.
    #[error("failed to list data store {path:?}: {source}")]
    Walk {
        /// Data store directory.
        path: Utf8PathBuf,
        /// Directory traversal error.
        source: walkdir::Error,
    },
    /// A data store entry has a non UTF-8 name.
    #[error("data store entry {path:?} is not valid UTF-8")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// Reading a data store file failed.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Creating or writing the archive failed.
    #[error("failed to write archive {path:?}: {source}")]
    Write {
        /// Archive being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The zip encoder reported an error.
    #[error("failed to encode archive {path:?}: {source}")]
    Encode {
        /// Archive being written.
        path: Utf8PathBuf,
        /// Zip encoding error.
        source: zip::result::ZipError,
    },
}

/// Errors that terminate a pipeline run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Creating a workspace directory failed.
    #[error("failed to prepare workspace directory {path:?}: {source}")]
    Workspace {
        /// Directory being created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The fetch and extract stage failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The quality-control stage could not read a shapefile.
    #[error("quality control failed: {0}")]
    Qc(#[source] GeometryError),
    /// Merging the shapefiles failed.
    #[error("merge failed: {0}")]
    Merge(#[source] GeometryError),
    /// Packaging the data store failed.
    #[error(transparent)]
    Package(#[from] PackageError),
}
