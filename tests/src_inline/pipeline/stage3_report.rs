use super::*;
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{CenterMode, ResponseScale};
use crate::input::weights::WeightTable;
use crate::model::response::{AveragedResponse, ItemKey};
use crate::model::scores::Category;
use crate::pipeline::stage2_score::{Stage2Inputs, run_stage2};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!(
        "portrait_score_stage3_{}_{}",
        std::process::id(),
        id
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn averaged(portrait_id: u32, value: f64) -> AveragedResponse {
    AveragedResponse {
        portrait_id,
        option_id: 1,
        content: format!("portrait {portrait_id}"),
        prompt: "How much is this person like you?".to_string(),
        numeric_response: value,
        run_count: 1,
        version_responses: BTreeMap::from([("v1".to_string(), value)]),
        version_errors: BTreeMap::new(),
    }
}

fn coverage(model: &str, averaged: usize) -> ModelCoverage {
    ModelCoverage {
        model: model.to_string(),
        items_expected: 2,
        items_averaged: averaged,
        coverage: averaged as f64 / 2.0,
        total_runs: averaged as u32,
        total_errors: 0,
        out_of_scale: 0,
        errors_by_version: BTreeMap::new(),
    }
}

fn fixture_scores(config: &ScoreConfig) -> crate::pipeline::stage2_score::Stage2Output {
    let responses = vec![averaged(1, 4.0), averaged(2, 2.0)];
    let weights = WeightTable::from_entries(vec![
        (
            Category::Pvq,
            "Achievement",
            ItemKey {
                portrait_id: 1,
                option_id: 1,
            },
            0.8,
        ),
        (
            Category::Pvq,
            "Hedonism",
            ItemKey {
                portrait_id: 2,
                option_id: 1,
            },
            0.1,
        ),
    ]);
    run_stage2(&Stage2Inputs {
        model: "m1_base",
        averaged: &responses,
        weights: &weights,
        config,
    })
}

#[test]
fn test_write_averaged_emits_results_and_metadata() {
    let dir = make_temp_dir();
    let set = vec![averaged(1, 4.5)];
    let cov = coverage("m1_base", 1);
    write_averaged(
        &Stage3Input {
            model: "m1_base",
            averaged: &set,
            coverage: &cov,
        },
        &dir,
    )
    .unwrap();

    let results: Vec<AveragedResponse> = serde_json::from_str(
        &fs::read_to_string(dir.join("m1_base_averaged_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(results, set);

    let metadata: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.join("m1_base_metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["model"], "m1_base");
    assert_eq!(metadata["items_averaged"], 1);
    assert_eq!(metadata["coverage"], 0.5);
}

#[test]
fn test_score_output_path_embeds_config_label() {
    let config = ScoreConfig::default();
    let path = score_output_path(Path::new("out"), "m1_base", &config);
    assert_eq!(
        path,
        Path::new("out").join("m1_base_0.3_pos_centered_scores.json")
    );

    let raw = ScoreConfig {
        threshold: 0.4,
        center_mode: CenterMode::Raw,
        scale: ResponseScale::likert_6(),
        coverage_floor: 0.5,
    };
    let path = score_output_path(Path::new("out"), "m1_base", &raw);
    assert_eq!(path, Path::new("out").join("m1_base_0.4_raw_scores.json"));
}

#[test]
fn test_write_scores_document_shape() {
    let dir = make_temp_dir();
    let config = ScoreConfig::default();
    let output = fixture_scores(&config);
    let path = write_scores("m1_base", &output, &config, &dir).unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["meta"]["model"], "m1_base");
    assert_eq!(doc["meta"]["config"], "0.3_pos_centered");
    assert_eq!(doc["meta"]["threshold"], 0.3);

    let achievement = &doc["scores"]["pvq"]["Achievement"];
    assert_eq!(achievement["status"], "scored");
    assert_eq!(achievement["n"], 1);

    // Hedonism's only weight sits below threshold: explicit unscored
    // marker, no fabricated numeric score.
    let hedonism = &doc["scores"]["pvq"]["Hedonism"];
    assert_eq!(hedonism["status"], "unscored");
    assert_eq!(hedonism["n"], 0);
    assert!(hedonism.get("score").is_none());
}

#[test]
fn test_rewriting_identical_inputs_is_byte_identical() {
    let dir_a = make_temp_dir();
    let dir_b = make_temp_dir();
    let config = ScoreConfig::default();
    let output = fixture_scores(&config);

    let path_a = write_scores("m1_base", &output, &config, &dir_a).unwrap();
    let path_b = write_scores("m1_base", &output, &config, &dir_b).unwrap();

    let bytes_a = fs::read(path_a).unwrap();
    let bytes_b = fs::read(path_b).unwrap();
    assert_eq!(bytes_a, bytes_b);
}
