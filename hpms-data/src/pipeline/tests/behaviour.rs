//! Behavioural coverage for a full pipeline run.

use crate::test_support::{StubSource, block_on_for_tests, region_archive};
use crate::{PipelineError, PipelineReport, ShapefileEngine, run_pipeline};
use camino::Utf8PathBuf;
use hpms_core::{BaseUrl, RegionCatalog, RunSettings, Workspace};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs};
use tempfile::TempDir;

const BASE: &str = "https://portal.test/shapefiles";

type PipelineResultCell = RefCell<Option<Result<PipelineReport, PipelineError>>>;

#[fixture]
fn working_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temporary directory: {err}"),
    }
}

#[derive(Debug, Default)]
struct PipelineScenarioContext {
    source: RefCell<Option<StubSource>>,
    result: PipelineResultCell,
}

#[fixture]
fn pipeline_context() -> PipelineScenarioContext {
    PipelineScenarioContext::default()
}

fn root_of(dir: &TempDir) -> Utf8PathBuf {
    match Utf8PathBuf::from_path_buf(dir.path().to_path_buf()) {
        Ok(root) => root,
        Err(path) => panic!("temporary directory {path:?} is not UTF-8"),
    }
}

fn settings_for(dir: &TempDir) -> RunSettings {
    RunSettings::new(Workspace::new(root_of(dir).join("work"))).with_base_url(BaseUrl::new(BASE))
}

fn archive_for(dir: &TempDir, shapefile_name: &str, features: usize) -> Vec<u8> {
    let build = root_of(dir).join(format!("build-{shapefile_name}"));
    if let Err(err) = fs::create_dir_all(&build) {
        panic!("failed to create build directory: {err}");
    }
    match region_archive(&build, shapefile_name, features) {
        Ok(bytes) => bytes,
        Err(err) => panic!("failed to build {shapefile_name} archive: {err}"),
    }
}

fn run_with(ctx: &PipelineScenarioContext, settings: &RunSettings) {
    let source_borrow = ctx.source.borrow();
    let source = source_borrow
        .as_ref()
        .unwrap_or_else(|| panic!("stub source must be initialised"));
    let outcome = block_on_for_tests(run_pipeline(
        source,
        &ShapefileEngine::new(),
        &RegionCatalog::new(["ohio", "utah"]),
        settings,
        None,
    ));
    *ctx.result.borrow_mut() = Some(outcome);
}

fn with_report(ctx: &PipelineScenarioContext, check: impl FnOnce(&PipelineReport)) {
    let borrow = ctx.result.borrow();
    match borrow.as_ref() {
        Some(Ok(report)) => check(report),
        Some(Err(err)) => panic!("pipeline should succeed: {err}"),
        None => panic!("pipeline result must be captured"),
    }
}

#[given("a portal serving the Ohio and Utah archives")]
fn portal_serving_two_regions(
    #[from(working_dir)] dir: &TempDir,
    #[from(pipeline_context)] ctx: &PipelineScenarioContext,
) {
    let source = StubSource::new()
        .with_archive(
            format!("{BASE}/ohio2015.zip"),
            archive_for(dir, "Ohio_Sections.shp", 2),
        )
        .with_archive(
            format!("{BASE}/utah2015.zip"),
            archive_for(dir, "Utah_Sections.shp", 3),
        );
    *ctx.source.borrow_mut() = Some(source);
}

#[given("a previous run has completed")]
fn previous_run(#[from(working_dir)] dir: &TempDir) {
    let warm_up = StubSource::new()
        .with_archive(
            format!("{BASE}/ohio2015.zip"),
            archive_for(dir, "Ohio_Sections.shp", 2),
        )
        .with_archive(
            format!("{BASE}/utah2015.zip"),
            archive_for(dir, "Utah_Sections.shp", 3),
        );
    let outcome = block_on_for_tests(run_pipeline(
        &warm_up,
        &ShapefileEngine::new(),
        &RegionCatalog::new(["ohio", "utah"]),
        &settings_for(dir),
        None,
    ));
    if let Err(err) = outcome {
        panic!("previous run should succeed: {err}");
    }
}

#[when("I run the pipeline")]
fn run_default(
    #[from(working_dir)] dir: &TempDir,
    #[from(pipeline_context)] ctx: &PipelineScenarioContext,
) {
    run_with(ctx, &settings_for(dir));
}

#[when("I run the pipeline with overwrite enabled")]
fn run_overwriting(
    #[from(working_dir)] dir: &TempDir,
    #[from(pipeline_context)] ctx: &PipelineScenarioContext,
) {
    run_with(ctx, &settings_for(dir).with_overwrite(true));
}

#[then("the merged layer holds {count} features")]
fn merged_feature_count(count: usize, #[from(pipeline_context)] ctx: &PipelineScenarioContext) {
    with_report(ctx, |report| assert_eq!(report.merge.feature_count, count));
}

#[then("the archive contains the merged dataset")]
fn archive_contains_dataset(
    #[from(working_dir)] dir: &TempDir,
    #[from(pipeline_context)] ctx: &PipelineScenarioContext,
) {
    let settings = settings_for(dir);
    with_report(ctx, |report| {
        assert_eq!(report.archive.entries, ["HPMS_National_2015.gpkg"]);
    });
    assert!(settings.archive_path().is_file());
}

#[then("no region was downloaded again")]
fn nothing_downloaded(#[from(pipeline_context)] ctx: &PipelineScenarioContext) {
    let borrow = ctx.source.borrow();
    let source = borrow
        .as_ref()
        .unwrap_or_else(|| panic!("stub source must be initialised"));
    assert!(source.requests().is_empty());
    with_report(ctx, |report| assert_eq!(report.fetch.downloaded(), 0));
}

macro_rules! register_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/run_pipeline.feature", index = $index)]
        fn $name(#[from(pipeline_context)] context: PipelineScenarioContext, working_dir: TempDir) {
            let _ = (context, working_dir);
        }
    };
}

register_scenario!(merging_every_region_into_one_archive, 0);
register_scenario!(rerunning_over_a_populated_workspace, 1);
