use super::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::input::items::{Item, ItemSet};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!(
        "portrait_score_stage1_{}_{}",
        std::process::id(),
        id
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

fn item(portrait_id: u32, option_id: u32) -> Item {
    serde_json::from_value(serde_json::json!({
        "portrait_id": portrait_id,
        "option_id": option_id,
        "content": format!("portrait {portrait_id} option {option_id}"),
        "prompt": "How much is this person like you?",
    }))
    .unwrap()
}

fn two_item_set() -> ItemSet {
    ItemSet::from_items(vec![item(1, 1), item(2, 1)])
}

fn scale_1_5() -> ResponseScale {
    ResponseScale { min: 1.0, max: 5.0 }
}

fn stage1(
    dir: &Path,
    items: &ItemSet,
    scale: ResponseScale,
    floor: f64,
) -> Result<Stage1Output, AverageError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    run_stage1(&Stage1Inputs {
        model: "m1_base",
        files: &files,
        items,
        scale,
        coverage_floor: floor,
    })
}

#[test]
fn test_average_across_runs_and_omit_never_run_items() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[{"portrait_id": 1, "option_id": 1, "numeric_response": 4}]"#,
    );
    write_file(
        &dir.join("m1_base_v2.json"),
        r#"[{"portrait_id": 1, "option_id": 1, "numeric_response": 5}]"#,
    );

    let items = two_item_set();
    let output = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();

    assert_eq!(output.averaged.len(), 1);
    let avg = &output.averaged[0];
    assert_eq!(avg.portrait_id, 1);
    assert_eq!(avg.numeric_response, 4.5);
    assert_eq!(avg.run_count, 2);

    assert_eq!(output.coverage.items_expected, 2);
    assert_eq!(output.coverage.items_averaged, 1);
    assert_eq!(output.coverage.coverage, 0.5);
    assert_eq!(output.coverage.total_runs, 2);
}

#[test]
fn test_version_responses_tracked_per_file() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[{"portrait_id": 1, "option_id": 1, "numeric_response": 3}]"#,
    );
    write_file(
        &dir.join("m1_base_v2_reversed.json"),
        r#"[{"portrait_id": 1, "option_id": 1, "numeric_response": 5}]"#,
    );

    let items = two_item_set();
    let output = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();
    let avg = &output.averaged[0];
    assert_eq!(avg.version_responses["v1"], 3.0);
    assert_eq!(avg.version_responses["v2_reversed"], 5.0);
    assert_eq!(avg.numeric_response, 4.0);
}

#[test]
fn test_errors_recorded_but_never_averaged() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[
            {"portrait_id": 1, "option_id": 1, "numeric_response": 4},
            {"portrait_id": 2, "option_id": 1, "error": "rate limited"}
        ]"#,
    );
    write_file(
        &dir.join("m1_base_v2.json"),
        r#"[
            {"portrait_id": 1, "option_id": 1, "error": "timeout"},
            {"portrait_id": 2, "option_id": 1, "error": "rate limited"}
        ]"#,
    );

    let items = two_item_set();
    let output = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();

    // Item 2 failed in every version: omitted, not defaulted.
    assert_eq!(output.averaged.len(), 1);
    let avg = &output.averaged[0];
    assert_eq!(avg.numeric_response, 4.0);
    assert_eq!(avg.run_count, 1);
    assert_eq!(avg.version_errors["v2"], "timeout");

    assert_eq!(output.coverage.total_errors, 3);
    assert_eq!(output.coverage.errors_by_version["v1"], 1);
    assert_eq!(output.coverage.errors_by_version["v2"], 2);
}

#[test]
fn test_coverage_error_below_floor() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[{"portrait_id": 1, "option_id": 1, "numeric_response": 4}]"#,
    );

    let items = two_item_set();
    let err = stage1(&dir, &items, scale_1_5(), 0.75).unwrap_err();
    match err {
        AverageError::Coverage(c) => {
            assert_eq!(c.items_expected, 2);
            assert_eq!(c.items_averaged, 1);
            assert_eq!(c.floor, 0.75);
        }
        other => panic!("expected coverage error, got {other:?}"),
    }
}

#[test]
fn test_out_of_scale_responses_excluded() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[
            {"portrait_id": 1, "option_id": 1, "numeric_response": 9},
            {"portrait_id": 1, "option_id": 1, "numeric_response": 4}
        ]"#,
    );

    let items = two_item_set();
    let output = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();
    let avg = &output.averaged[0];
    assert_eq!(avg.numeric_response, 4.0);
    assert_eq!(avg.run_count, 1);
    assert_eq!(output.coverage.out_of_scale, 1);
}

#[test]
fn test_unknown_item_records_skipped() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[
            {"portrait_id": 777, "option_id": 1, "numeric_response": 3},
            {"portrait_id": 1, "option_id": 1, "numeric_response": 4}
        ]"#,
    );

    let items = two_item_set();
    let output = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();
    assert_eq!(output.averaged.len(), 1);
    assert_eq!(output.averaged[0].portrait_id, 1);
}

#[test]
fn test_averaged_set_sorted_by_item_key() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[
            {"portrait_id": 2, "option_id": 1, "numeric_response": 2},
            {"portrait_id": 1, "option_id": 1, "numeric_response": 3}
        ]"#,
    );

    let items = two_item_set();
    let output = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();
    let keys: Vec<u32> = output.averaged.iter().map(|a| a.portrait_id).collect();
    assert_eq!(keys, vec![1, 2]);
}

#[test]
fn test_determinism() {
    let dir = make_temp_dir();
    write_file(
        &dir.join("m1_base_v1.json"),
        r#"[
            {"portrait_id": 1, "option_id": 1, "numeric_response": 4.3},
            {"portrait_id": 2, "option_id": 1, "numeric_response": 1.7}
        ]"#,
    );
    write_file(
        &dir.join("m1_base_v2.json"),
        r#"[{"portrait_id": 1, "option_id": 1, "numeric_response": 2.9}]"#,
    );

    let items = two_item_set();
    let a = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();
    let b = stage1(&dir, &items, scale_1_5(), 0.0).unwrap();
    assert_eq!(a.averaged, b.averaged);
    assert_eq!(a.coverage, b.coverage);
}
