use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key of one survey item: a portrait plus one of its answer options.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ItemKey {
    pub portrait_id: u32,
    pub option_id: u32,
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.portrait_id, self.option_id)
    }
}

/// Outcome of a single model run against a single item. The invocation
/// layer either produced a numeric judgment, produced nothing, or failed
/// with a recorded error; there is no sentinel value for any of these.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(f64),
    Missing,
    Error(String),
}

/// One parsed record from a run file, tagged with the version token of the
/// file it came from (`v1`, `v2_reversed`, ...).
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub key: ItemKey,
    pub version: String,
    pub outcome: RunOutcome,
}

/// Mean judgment for one (model, item) across all successful runs.
/// `run_count >= 1` always holds; items without a single successful run
/// are omitted from the averaged set rather than emitted with a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedResponse {
    pub portrait_id: u32,
    pub option_id: u32,
    pub content: String,
    pub prompt: String,
    pub numeric_response: f64,
    pub run_count: u32,
    pub version_responses: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub version_errors: BTreeMap<String, String>,
}

impl AveragedResponse {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            portrait_id: self.portrait_id,
            option_id: self.option_id,
        }
    }
}

/// Per-model averaging metadata: how much of the item battery the model
/// actually covered, and where runs were lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCoverage {
    pub model: String,
    pub items_expected: usize,
    pub items_averaged: usize,
    pub coverage: f64,
    pub total_runs: u32,
    pub total_errors: u32,
    pub out_of_scale: u32,
    pub errors_by_version: BTreeMap<String, u32>,
}
