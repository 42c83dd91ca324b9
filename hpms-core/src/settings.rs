//! Run settings and the on-disk workspace layout.

use camino::{Utf8Path, Utf8PathBuf};

use crate::{BaseUrl, MergeTarget};

/// Publication year downloaded when none is configured.
pub const DEFAULT_YEAR: u16 = 2015;
/// HPMS shapefile download endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.fhwa.dot.gov/policyinformation/hpms/shapefiles";
/// Workspace directory used when none is configured.
pub const DEFAULT_WORKSPACE: &str = "hpms-work";
/// Directory name of the data store inside the workspace.
pub const DATA_STORE_DIR: &str = "hpms_workspace";

const NATIONAL_PREFIX: &str = "HPMS_National";

/// Root directory holding per-region extracts, the data store and the archive.
///
/// # Examples
/// ```
/// use hpms_core::Workspace;
///
/// let workspace = Workspace::new("/data/hpms");
/// assert_eq!(workspace.region_dir("ohio2015"), "/data/hpms/ohio2015");
/// assert_eq!(workspace.data_store_dir(), "/data/hpms/hpms_workspace");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    /// Lay out a workspace below `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory a region archive is extracted into.
    pub fn region_dir(&self, archive_stem: &str) -> Utf8PathBuf {
        self.root.join(archive_stem)
    }

    /// Directory holding the merged dataset.
    pub fn data_store_dir(&self) -> Utf8PathBuf {
        self.root.join(DATA_STORE_DIR)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(DEFAULT_WORKSPACE)
    }
}

/// Resolved parameters for one pipeline run.
///
/// # Examples
/// ```
/// use hpms_core::{RunSettings, Workspace};
///
/// let settings = RunSettings::new(Workspace::new("work")).with_year(2016);
/// assert_eq!(settings.dataset_name(), "HPMS_National_2016");
/// assert_eq!(settings.archive_path(), "work/HPMS_National_2016.zip");
/// assert_eq!(
///     settings.dataset_path(),
///     "work/hpms_workspace/HPMS_National_2016.gpkg"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Workspace layout.
    pub workspace: Workspace,
    /// Publication year to download.
    pub year: u16,
    /// Download endpoint.
    pub base_url: BaseUrl,
    /// Replace an existing merged dataset instead of failing.
    pub overwrite: bool,
}

impl RunSettings {
    /// Settings for `workspace` using the default year and endpoint.
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            year: DEFAULT_YEAR,
            base_url: BaseUrl::default(),
            overwrite: false,
        }
    }

    /// Override the publication year.
    #[must_use]
    pub fn with_year(mut self, year: u16) -> Self {
        self.year = year;
        self
    }

    /// Override the download endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: BaseUrl) -> Self {
        self.base_url = base_url;
        self
    }

    /// Toggle replacement of an existing merged dataset.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Run label shared by the merged layer and the archive.
    pub fn dataset_name(&self) -> String {
        format!("{NATIONAL_PREFIX}_{}", self.year)
    }

    /// Location of the merged GeoPackage inside the data store.
    pub fn dataset_path(&self) -> Utf8PathBuf {
        self.workspace
            .data_store_dir()
            .join(format!("{}.gpkg", self.dataset_name()))
    }

    /// Location of the packaged archive.
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.workspace
            .root()
            .join(format!("{}.zip", self.dataset_name()))
    }

    /// Merge destination derived from these settings.
    pub fn merge_target(&self) -> MergeTarget {
        MergeTarget {
            path: self.dataset_path(),
            layer: self.dataset_name(),
            overwrite: self.overwrite,
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::new(Workspace::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_reproduce_portal_constants() {
        let settings = RunSettings::default();
        assert_eq!(settings.year, 2015);
        assert_eq!(settings.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(settings.workspace.root(), DEFAULT_WORKSPACE);
        assert!(!settings.overwrite);
    }

    #[rstest]
    fn merge_target_follows_settings() {
        let settings = RunSettings::new(Workspace::new("w")).with_overwrite(true);
        let target = settings.merge_target();
        assert_eq!(target.layer, "HPMS_National_2015");
        assert_eq!(target.path, "w/hpms_workspace/HPMS_National_2015.gpkg");
        assert!(target.overwrite);
    }
}
