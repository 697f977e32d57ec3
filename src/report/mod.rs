pub mod json;

use serde::Serialize;

use crate::model::scores::ScoreMap;

/// Provenance block embedded in every score file. The config label is the
/// part that keeps differently parameterized runs apart.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreMeta {
    pub model: String,
    pub config: String,
    pub threshold: f64,
    pub center_mode: &'static str,
    pub scale_min: f64,
    pub scale_max: f64,
    pub tool: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ScoreDocument<'a> {
    pub meta: ScoreMeta,
    pub scores: &'a ScoreMap,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, matching the reference survey statistics.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let squared_diff_sum: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (squared_diff_sum / values.len() as f64).sqrt()
}
