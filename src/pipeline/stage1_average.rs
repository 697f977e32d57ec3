use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ResponseScale;
use crate::input::InputError;
use crate::input::items::ItemSet;
use crate::input::responses::load_run_file;
use crate::model::response::{AveragedResponse, ItemKey, ModelCoverage, RunOutcome, RunRecord};

#[derive(Debug, Clone)]
pub struct Stage1Inputs<'a> {
    pub model: &'a str,
    pub files: &'a [PathBuf],
    pub items: &'a ItemSet,
    pub scale: ResponseScale,
    pub coverage_floor: f64,
}

#[derive(Debug)]
pub struct Stage1Output {
    pub averaged: Vec<AveragedResponse>,
    pub coverage: ModelCoverage,
}

#[derive(Debug, Error)]
#[error(
    "model {model}: coverage {coverage:.3} below floor {floor:.3} \
     ({items_averaged}/{items_expected} items with at least one run)"
)]
pub struct CoverageError {
    pub model: String,
    pub items_expected: usize,
    pub items_averaged: usize,
    pub coverage: f64,
    pub floor: f64,
}

#[derive(Debug, Error)]
pub enum AverageError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Coverage(#[from] CoverageError),
}

pub fn run_stage1(inputs: &Stage1Inputs<'_>) -> Result<Stage1Output, AverageError> {
    let mut records = Vec::new();
    for path in inputs.files {
        records.extend(load_run_file(path)?);
    }

    let output = average_records(inputs.model, &records, inputs.items, inputs.scale);

    if output.coverage.coverage < inputs.coverage_floor {
        return Err(CoverageError {
            model: inputs.model.to_string(),
            items_expected: output.coverage.items_expected,
            items_averaged: output.coverage.items_averaged,
            coverage: output.coverage.coverage,
            floor: inputs.coverage_floor,
        }
        .into());
    }

    Ok(output)
}

#[derive(Debug, Default)]
struct ItemRuns {
    responses: Vec<f64>,
    version_responses: BTreeMap<String, f64>,
    version_errors: BTreeMap<String, String>,
}

/// Merge all run records for one model into one averaged response per item
/// with at least one successful in-scale run. Items with zero successful
/// runs are omitted, never emitted with a default value.
pub fn average_records(
    model: &str,
    records: &[RunRecord],
    items: &ItemSet,
    scale: ResponseScale,
) -> Stage1Output {
    let mut groups: BTreeMap<ItemKey, ItemRuns> = BTreeMap::new();
    let mut total_errors = 0u32;
    let mut out_of_scale = 0u32;
    let mut errors_by_version: BTreeMap<String, u32> = BTreeMap::new();

    for record in records {
        if !items.contains(record.key) {
            tracing::warn!(
                "model {model}: run record for unknown item {}; skipping",
                record.key
            );
            continue;
        }
        let group = groups.entry(record.key).or_default();
        match &record.outcome {
            RunOutcome::Success(value) => {
                if !scale.contains(*value) {
                    tracing::warn!(
                        "model {model}: response {value} for item {} outside scale \
                         [{}, {}]; excluding from average",
                        record.key,
                        scale.min,
                        scale.max
                    );
                    out_of_scale += 1;
                    continue;
                }
                group.responses.push(*value);
                group.version_responses.insert(record.version.clone(), *value);
            }
            RunOutcome::Error(reason) => {
                group
                    .version_errors
                    .insert(record.version.clone(), reason.clone());
                total_errors += 1;
                *errors_by_version.entry(record.version.clone()).or_insert(0) += 1;
            }
            RunOutcome::Missing => {}
        }
    }

    let mut averaged = Vec::new();
    let mut total_runs = 0u32;
    for (key, group) in groups {
        if group.responses.is_empty() {
            continue;
        }
        let Some(item) = items.get(key) else {
            continue;
        };
        let sum: f64 = group.responses.iter().sum();
        let run_count = group.responses.len() as u32;
        total_runs += run_count;
        averaged.push(AveragedResponse {
            portrait_id: key.portrait_id,
            option_id: key.option_id,
            content: item.content.clone(),
            prompt: item.prompt.clone(),
            numeric_response: sum / run_count as f64,
            run_count,
            version_responses: group.version_responses,
            version_errors: group.version_errors,
        });
    }

    let items_expected = items.len();
    let items_averaged = averaged.len();
    let coverage = if items.is_empty() {
        0.0
    } else {
        items_averaged as f64 / items_expected as f64
    };

    let coverage = ModelCoverage {
        model: model.to_string(),
        items_expected,
        items_averaged,
        coverage,
        total_runs,
        total_errors,
        out_of_scale,
        errors_by_version,
    };

    Stage1Output { averaged, coverage }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_average.rs"]
mod tests;
