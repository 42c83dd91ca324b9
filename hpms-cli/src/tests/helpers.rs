//! Test helpers: scratch workspaces and an in-memory source builder.

use super::*;
use crate::run::{RunConfig, SourceBuilder};
use camino::{Utf8Path, Utf8PathBuf};
use hpms_data::RegionSource;
use hpms_data::test_support::{StubSource, region_archive};
use std::fs;
use tempfile::TempDir;

pub(super) const PORTAL: &str = "https://portal.test/shapefiles";

#[derive(Debug)]
pub(super) struct Scratch {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Scratch {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn workspace(&self) -> Utf8PathBuf {
        self.root.join("work")
    }

    /// Zipped line shapefile named `shapefile_name`, as the portal serves it.
    pub(super) fn archive(&self, shapefile_name: &str, features: usize) -> Vec<u8> {
        let build = self.root.join(format!("build-{shapefile_name}"));
        fs::create_dir_all(&build).expect("create build directory");
        region_archive(&build, shapefile_name, features).expect("build region archive")
    }

    /// A portal serving Ohio (2 sections) and Utah (3 sections) for 2015.
    pub(super) fn portal(&self) -> StubBuilder {
        StubBuilder::default()
            .with_archive(
                format!("{PORTAL}/ohio2015.zip"),
                self.archive("Ohio_Sections.shp", 2),
            )
            .with_archive(
                format!("{PORTAL}/utah2015.zip"),
                self.archive("Utah_Sections.shp", 3),
            )
    }
}

/// Builds a fresh [`StubSource`] serving the registered archives.
#[derive(Debug, Clone, Default)]
pub(super) struct StubBuilder {
    archives: Vec<(String, Vec<u8>)>,
}

impl StubBuilder {
    pub(super) fn with_archive(mut self, url: String, bytes: Vec<u8>) -> Self {
        self.archives.push((url, bytes));
        self
    }
}

impl SourceBuilder for StubBuilder {
    fn build(&self, _config: &RunConfig) -> Result<Box<dyn RegionSource>, CliError> {
        let source = self
            .archives
            .iter()
            .fold(StubSource::new(), |source, (url, bytes)| {
                source.with_archive(url.clone(), bytes.clone())
            });
        Ok(Box::new(source))
    }
}

/// `run` arguments pointed at the scratch workspace and the stub portal.
pub(super) fn run_args(scratch: &Scratch, regions: &[&str]) -> RunArgs {
    RunArgs {
        workspace: Some(scratch.workspace()),
        base_url: Some(PORTAL.to_owned()),
        regions: regions.iter().map(|name| (*name).to_owned()).collect(),
        ..RunArgs::default()
    }
}
