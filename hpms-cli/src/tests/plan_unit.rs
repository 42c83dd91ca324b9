//! Focused unit tests covering argument parsing and plan configuration.

use super::*;
use crate::plan::{PlanConfig, write_plan};
use hpms_core::{DEFAULT_BASE_URL, DEFAULT_YEAR, RegionError, UNITED_STATES};
use rstest::rstest;

fn region_names(config: &PlanConfig) -> Vec<&str> {
    config
        .catalog
        .regions()
        .iter()
        .map(hpms_core::Region::as_str)
        .collect()
}

#[rstest]
fn plan_defaults_reproduce_portal_constants() {
    let config = PlanConfig::try_from(PlanArgs::default()).expect("defaults resolve");
    assert_eq!(config.settings.workspace.root(), "hpms-work");
    assert_eq!(config.settings.year, DEFAULT_YEAR);
    assert_eq!(config.settings.base_url.as_str(), DEFAULT_BASE_URL);
    assert!(!config.settings.overwrite);
    assert_eq!(config.catalog.regions().len(), UNITED_STATES.len());
}

#[rstest]
fn regions_narrow_the_catalog_in_catalog_order() {
    let args = PlanArgs {
        regions: vec!["ohio".to_owned(), "District of Columbia".to_owned()],
        ..PlanArgs::default()
    };
    let config = PlanConfig::try_from(args).expect("known regions");
    assert_eq!(region_names(&config), ["districtofcolumbia", "ohio"]);
}

#[rstest]
fn unknown_regions_are_rejected() {
    let args = PlanArgs {
        regions: vec!["ohio".to_owned(), "atlantis".to_owned()],
        ..PlanArgs::default()
    };
    let err = PlanConfig::try_from(args).expect_err("unknown region");
    match err {
        CliError::Region(RegionError::Unknown { name }) => assert_eq!(name, "atlantis"),
        other => panic!("expected Region error, found {other:?}"),
    }
}

#[rstest]
#[case("not a url")]
#[case("portal.test/shapefiles")]
fn invalid_base_urls_are_rejected(#[case] raw: &str) {
    let args = PlanArgs {
        base_url: Some(raw.to_owned()),
        ..PlanArgs::default()
    };
    let err = PlanConfig::try_from(args).expect_err("invalid url");
    match err {
        CliError::InvalidBaseUrl { field, url, .. } => {
            assert_eq!(field, ARG_BASE_URL);
            assert_eq!(url, raw);
        }
        other => panic!("expected InvalidBaseUrl, found {other:?}"),
    }
}

#[rstest]
fn base_url_trailing_slashes_are_trimmed() {
    let args = PlanArgs {
        base_url: Some("https://mirror.test/hpms/".to_owned()),
        ..PlanArgs::default()
    };
    let config = PlanConfig::try_from(args).expect("valid url");
    assert_eq!(config.settings.base_url.as_str(), "https://mirror.test/hpms");
}

#[rstest]
fn plan_lines_name_region_url_and_shapefile() {
    let args = PlanArgs {
        workspace: Some("work".into()),
        year: Some(2016),
        regions: vec!["ohio".to_owned(), "District of Columbia".to_owned()],
        ..PlanArgs::default()
    };
    let config = PlanConfig::try_from(args).expect("config resolves");
    let mut output = Vec::new();
    write_plan(&mut output, &config.jobs()).expect("write plan");

    let text = String::from_utf8(output).expect("utf-8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            format!(
                "districtofcolumbia\t{DEFAULT_BASE_URL}/district2016.zip\twork/district2016/District_Sections.shp"
            ),
            format!("ohio\t{DEFAULT_BASE_URL}/ohio2016.zip\twork/ohio2016/Ohio_Sections.shp"),
        ]
    );
}

#[rstest]
fn missouri_2015_uses_its_irregular_names() {
    let args = PlanArgs {
        workspace: Some("work".into()),
        regions: vec!["missouri".to_owned()],
        ..PlanArgs::default()
    };
    let config = PlanConfig::try_from(args).expect("config resolves");
    let jobs = config.jobs();
    let job = jobs.first().expect("one job");
    assert_eq!(job.url, format!("{DEFAULT_BASE_URL}/missouri2015t.zip"));
    assert_eq!(job.shapefile_path, "work/missouri2015t/Missouri_Sectionst.shp");
}

#[rstest]
fn plan_flags_are_parsed() {
    let cli = Cli::try_parse_from([
        "hpms", "plan", "--region", "ohio", "--region", "utah", "--year", "2016",
    ])
    .expect("valid invocation");
    match cli.command {
        Command::Plan(args) => {
            assert_eq!(args.regions, ["ohio", "utah"]);
            assert_eq!(args.year, Some(2016));
            assert_eq!(args.workspace, None);
        }
        other => panic!("expected plan command, found {other:?}"),
    }
}

#[rstest]
#[case(&["hpms"])]
#[case(&["hpms", "plan", "--year", "twenty-fifteen"])]
#[case(&["hpms", "fetch"])]
fn malformed_invocations_fail_to_parse(#[case] invocation: &[&str]) {
    assert!(Cli::try_parse_from(invocation.iter().copied()).is_err());
}
