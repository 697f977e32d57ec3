use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ScoreConfig;
use crate::input::InputError;
use crate::model::response::{AveragedResponse, ModelCoverage};
use crate::pipeline::stage2_score::Stage2Output;
use crate::report::json::write_json_pretty;
use crate::report::{ScoreDocument, ScoreMeta};

#[derive(Debug, Clone)]
pub struct Stage3Input<'a> {
    pub model: &'a str,
    pub averaged: &'a [AveragedResponse],
    pub coverage: &'a ModelCoverage,
}

/// Persist the averaged set and coverage metadata for one model:
/// `{model}_averaged_results.json` and `{model}_metadata.json`.
pub fn write_averaged(input: &Stage3Input<'_>, out_dir: &Path) -> Result<(), InputError> {
    fs::create_dir_all(out_dir)?;

    let results_path = out_dir.join(format!("{}_averaged_results.json", input.model));
    write_json_pretty(&results_path, &input.averaged)?;

    let metadata_path = out_dir.join(format!("{}_metadata.json", input.model));
    write_json_pretty(&metadata_path, input.coverage)?;

    tracing::info!(
        "model {}: wrote {} averaged item(s) to {}",
        input.model,
        input.averaged.len(),
        results_path.display()
    );
    Ok(())
}

/// Persist one model's score set under the configuration label, so runs
/// with different thresholds or centering modes never collide on disk.
pub fn write_scores(
    model: &str,
    output: &Stage2Output,
    config: &ScoreConfig,
    out_dir: &Path,
) -> Result<PathBuf, InputError> {
    fs::create_dir_all(out_dir)?;

    let document = ScoreDocument {
        meta: ScoreMeta {
            model: model.to_string(),
            config: config.label(),
            threshold: config.threshold,
            center_mode: config.center_mode.label(),
            scale_min: config.scale.min,
            scale_max: config.scale.max,
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
        scores: &output.scores,
    };

    let path = score_output_path(out_dir, model, config);
    write_json_pretty(&path, &document)?;

    tracing::info!("model {model}: wrote scores to {}", path.display());
    Ok(path)
}

pub fn score_output_path(out_dir: &Path, model: &str, config: &ScoreConfig) -> PathBuf {
    out_dir.join(format!("{}_{}_scores.json", model, config.label()))
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_report.rs"]
mod tests;
