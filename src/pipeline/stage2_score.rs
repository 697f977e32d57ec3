use std::collections::BTreeMap;

use crate::config::{CenterMode, ScoreConfig};
use crate::input::weights::{CorrelationWeight, WeightTable};
use crate::model::response::{AveragedResponse, ItemKey};
use crate::model::scores::{DimensionScore, ScoreMap};
use crate::report::std_dev;

#[derive(Debug, Clone)]
pub struct Stage2Inputs<'a> {
    pub model: &'a str,
    pub averaged: &'a [AveragedResponse],
    pub weights: &'a WeightTable,
    pub config: &'a ScoreConfig,
}

#[derive(Debug)]
pub struct Stage2Output {
    pub scores: ScoreMap,
}

pub fn run_stage2(inputs: &Stage2Inputs<'_>) -> Stage2Output {
    let responses: BTreeMap<ItemKey, f64> = inputs
        .averaged
        .iter()
        .map(|a| (a.key(), a.numeric_response))
        .collect();

    let mut scores: ScoreMap = BTreeMap::new();
    for (category, per_dimension) in &inputs.weights.dimensions {
        let out = scores.entry(*category).or_default();
        for (dimension, weights) in per_dimension {
            let score = score_dimension(weights, &responses, inputs.config);
            tracing::debug!(
                "model {}: {category}/{dimension} -> {:?}",
                inputs.model,
                score
            );
            out.insert(dimension.clone(), score);
        }
    }

    Stage2Output { scores }
}

/// Correlation-weighted average over the items that pass the weight
/// threshold and have an averaged response. Normalized by the sum of
/// absolute weights, so rescaling all weights by a positive constant
/// leaves the score unchanged.
pub fn score_dimension(
    weights: &[CorrelationWeight],
    responses: &BTreeMap<ItemKey, f64>,
    config: &ScoreConfig,
) -> DimensionScore {
    let mid = config.scale.midpoint();

    let mut numerator = 0f64;
    let mut denominator = 0f64;
    let mut oriented = Vec::new();

    for w in weights {
        if w.weight.abs() <= config.threshold {
            continue;
        }
        let Some(&response) = responses.get(&w.key) else {
            continue;
        };
        let value = match config.center_mode {
            CenterMode::PosCentered => response - mid,
            CenterMode::Raw => response,
        };
        numerator += w.weight * value;
        denominator += w.weight.abs();
        oriented.push(if w.weight > 0.0 { value } else { -value });
    }

    if oriented.is_empty() {
        return DimensionScore::Unscored { n: 0 };
    }

    DimensionScore::Scored {
        score: numerator / denominator,
        std_dev: std_dev(&oriented),
        n: oriented.len() as u32,
    }
}
