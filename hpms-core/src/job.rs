//! Download jobs derived from the region catalog.

use std::fmt;

use camino::Utf8PathBuf;

use crate::{DEFAULT_BASE_URL, Region, RegionCatalog, Workspace};

const SHAPEFILE_SUFFIX: &str = "_Sections.shp";

/// Download endpoint with trailing slashes removed.
///
/// # Examples
/// ```
/// use hpms_core::BaseUrl;
///
/// let url = BaseUrl::new("https://example.org/shapefiles/");
/// assert_eq!(url.as_str(), "https://example.org/shapefiles");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Trim trailing slashes, falling back to the HPMS endpoint when empty.
    pub fn new(value: impl Into<String>) -> Self {
        let raw = value.into();
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            Self(DEFAULT_BASE_URL.to_owned())
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// Borrow the URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self(DEFAULT_BASE_URL.to_owned())
    }
}

impl From<&str> for BaseUrl {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One region's download: where to fetch it and where its shapefile lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Catalog region.
    pub region: Region,
    /// Name used by the portal, after the crosswalk.
    pub download_name: String,
    /// Archive file stem, e.g. `ohio2015`.
    pub archive_stem: String,
    /// Absolute archive URL.
    pub url: String,
    /// Directory the archive is extracted into.
    pub region_dir: Utf8PathBuf,
    /// Shapefile expected after extraction.
    pub shapefile_path: Utf8PathBuf,
}

impl DownloadJob {
    fn plan(
        catalog: &RegionCatalog,
        region: &Region,
        base_url: &BaseUrl,
        year: u16,
        workspace: &Workspace,
    ) -> Self {
        let download_name = catalog.download_name(region).to_owned();
        let exception = catalog.exception(&download_name, year);
        let archive_stem = exception.map_or_else(
            || format!("{download_name}{year}"),
            |entry| entry.archive_stem.clone(),
        );
        let shapefile_name = exception.map_or_else(
            || format!("{}{SHAPEFILE_SUFFIX}", capitalise(&download_name)),
            |entry| entry.shapefile_name.clone(),
        );
        let region_dir = workspace.region_dir(&archive_stem);
        let shapefile_path = region_dir.join(shapefile_name);
        let url = format!("{}/{archive_stem}.zip", base_url.as_str());
        Self {
            region: region.clone(),
            download_name,
            archive_stem,
            url,
            region_dir,
            shapefile_path,
        }
    }
}

/// Build one job per catalog region, in catalog order.
///
/// # Examples
/// ```
/// use hpms_core::{BaseUrl, RegionCatalog, Workspace, build_jobs};
///
/// let catalog = RegionCatalog::new(["wyoming", "districtofcolumbia"])
///     .with_crosswalk("districtofcolumbia", "district");
/// let base = BaseUrl::new("https://example.org/shapefiles");
/// let jobs = build_jobs(&catalog, &base, 2015, &Workspace::new("work"));
/// let urls: Vec<&str> = jobs.iter().map(|job| job.url.as_str()).collect();
/// assert_eq!(
///     urls,
///     [
///         "https://example.org/shapefiles/wyoming2015.zip",
///         "https://example.org/shapefiles/district2015.zip",
///     ]
/// );
/// ```
pub fn build_jobs(
    catalog: &RegionCatalog,
    base_url: &BaseUrl,
    year: u16,
    workspace: &Workspace,
) -> Vec<DownloadJob> {
    catalog
        .regions()
        .iter()
        .map(|region| DownloadJob::plan(catalog, region, base_url, year, workspace))
        .collect()
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalise(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}
