use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use hpms_core::DownloadJob;
use rusqlite::{Connection, params};

use crate::{FetchStatus, RunLogError};

/// Persisted audit trail of per-region fetch outcomes.
#[derive(Debug)]
pub struct RunLog {
    connection: Connection,
    location: Utf8PathBuf,
}

impl RunLog {
    /// Open (or create) the run log at the supplied path.
    pub fn initialise(path: &Utf8Path) -> Result<Self, RunLogError> {
        let connection = Connection::open(path).map_err(|source| RunLogError::Initialise {
            path: path.to_path_buf(),
            source,
        })?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS region_downloads (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    region TEXT NOT NULL,
                    url TEXT NOT NULL,
                    archive_stem TEXT NOT NULL,
                    shapefile_path TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    bytes INTEGER NOT NULL,
                    recorded_at INTEGER NOT NULL
                )",
                [],
            )
            .map_err(|source| RunLogError::Initialise {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            connection,
            location: path.to_path_buf(),
        })
    }

    /// Record the outcome of one job.
    pub fn record(&self, job: &DownloadJob, status: FetchStatus) -> Result<(), RunLogError> {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| RunLogError::Value {
                what: "timestamp",
                source: Box::new(err),
            })?;
        let timestamp = i64::try_from(duration.as_secs()).map_err(|err| RunLogError::Value {
            what: "timestamp",
            source: Box::new(err),
        })?;
        let bytes = i64::try_from(status.bytes()).map_err(|err| RunLogError::Value {
            what: "byte count",
            source: Box::new(err),
        })?;
        self.connection
            .execute(
                "INSERT INTO region_downloads (
                    region,
                    url,
                    archive_stem,
                    shapefile_path,
                    outcome,
                    bytes,
                    recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    job.region.as_str(),
                    &job.url,
                    &job.archive_stem,
                    job.shapefile_path.as_str(),
                    status.label(),
                    bytes,
                    timestamp
                ],
            )
            .map_err(|source| RunLogError::Record { source })?;
        Ok(())
    }

    /// Location of the underlying SQLite database.
    pub fn path(&self) -> &Utf8Path {
        &self.location
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }
}
