//! Behavioural coverage for location-based format inference.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};
use wharf_core::{DataSourceError, FormatInference, FormatType, infer_format};

type InferenceCell = RefCell<Option<Result<FormatInference, DataSourceError>>>;

#[fixture]
fn location() -> RefCell<Option<String>> {
    RefCell::new(None)
}

#[fixture]
fn inference() -> InferenceCell {
    RefCell::new(None)
}

fn captured(cell: &InferenceCell) -> std::cell::Ref<'_, Result<FormatInference, DataSourceError>> {
    std::cell::Ref::map(cell.borrow(), |slot| {
        slot.as_ref()
            .unwrap_or_else(|| panic!("inference must be captured"))
    })
}

#[given("the location {path}")]
fn given_location(#[from(location)] location: &RefCell<Option<String>>, path: String) {
    *location.borrow_mut() = Some(path.trim_matches('"').to_owned());
}

#[when("I infer its format")]
fn infer(
    #[from(location)] location: &RefCell<Option<String>>,
    #[from(inference)] inference: &InferenceCell,
) {
    let path = location
        .borrow()
        .clone()
        .unwrap_or_else(|| panic!("location must be set"));
    *inference.borrow_mut() = Some(infer_format(&path));
}

fn assert_format(inference: &InferenceCell, extension: &str, fallback: bool) {
    let expected: FormatType = match extension.trim_matches('"').parse() {
        Ok(format) => format,
        Err(err) => panic!("feature names an unknown format: {err}"),
    };
    match &*captured(inference) {
        Ok(inferred) => {
            assert_eq!(inferred.format, expected);
            assert_eq!(inferred.fallback, fallback);
        }
        Err(err) => panic!("inference should succeed: {err}"),
    }
}

#[then("the format is {extension} without fallback")]
fn format_matched(#[from(inference)] inference: &InferenceCell, extension: String) {
    assert_format(inference, &extension, false);
}

#[then("the format is {extension} with fallback")]
fn format_fallback(#[from(inference)] inference: &InferenceCell, extension: String) {
    assert_format(inference, &extension, true);
}

#[then("an invalid format error names {suffix}")]
fn invalid_format(#[from(inference)] inference: &InferenceCell, suffix: String) {
    match &*captured(inference) {
        Err(DataSourceError::InvalidFormat { suffix: actual }) => {
            assert_eq!(actual, suffix.trim_matches('"'));
        }
        other => panic!("expected InvalidFormat, got {other:?}"),
    }
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/format_inference.feature");
    let contents = match fs::read_to_string(&feature_path) {
        Ok(data) => data,
        Err(err) => panic!("failed to read feature file {feature_path:?}: {err}"),
    };
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "recognising a line-delimited records file",
            "falling back for an archive",
            "rejecting an unknown suffix",
        ]
    );
}

macro_rules! register_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/format_inference.feature", index = $index)]
        fn $name(location: RefCell<Option<String>>, inference: InferenceCell) {
            let _ = (location, inference);
        }
    };
}

register_scenario!(recognising_a_line_delimited_records_file, 0);
register_scenario!(falling_back_for_an_archive, 1);
register_scenario!(rejecting_an_unknown_suffix, 2);
