use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::input::items::{ItemSet, default_option_id};
use crate::input::{InputError, read_json_file};
use crate::model::response::ItemKey;
use crate::model::scores::Category;

#[derive(Debug, Clone, Deserialize)]
struct RawWeight {
    category: Category,
    dimension: String,
    portrait_id: u32,
    #[serde(default = "default_option_id")]
    option_id: u32,
    weight: f64,
    /// Marks a record the weight derivation flagged as miskeyed; excluded
    /// records are dropped at load time and never reach the scorer.
    #[serde(default)]
    excluded: bool,
}

/// Signed correlation of one item with one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationWeight {
    pub key: ItemKey,
    pub weight: f64,
}

#[derive(Debug, Error)]
pub enum WeightTableError {
    #[error("weight table references unknown item {key} for {category}/{dimension}")]
    UnknownItem {
        category: Category,
        dimension: String,
        key: ItemKey,
    },
    #[error("malformed weight {weight} for {category}/{dimension} item {key}")]
    MalformedWeight {
        category: Category,
        dimension: String,
        key: ItemKey,
        weight: f64,
    },
    #[error(transparent)]
    Input(#[from] InputError),
}

/// The static correlation table: per category, per dimension, the signed
/// item weights in item-key order. Loaded once, validated against the item
/// dataset, read-only for the lifetime of a scoring run.
#[derive(Debug, Clone)]
pub struct WeightTable {
    pub dimensions: BTreeMap<Category, BTreeMap<String, Vec<CorrelationWeight>>>,
}

impl WeightTable {
    pub fn load(path: &Path, items: &ItemSet) -> Result<Self, WeightTableError> {
        let raw: Vec<RawWeight> = read_json_file(path).map_err(WeightTableError::from)?;

        let mut dimensions: BTreeMap<Category, BTreeMap<String, Vec<CorrelationWeight>>> =
            BTreeMap::new();
        let mut excluded = 0usize;

        for record in raw {
            let key = ItemKey {
                portrait_id: record.portrait_id,
                option_id: record.option_id,
            };
            if record.excluded {
                excluded += 1;
                tracing::debug!(
                    "dropping excluded weight {}/{} for item {key}",
                    record.category,
                    record.dimension
                );
                continue;
            }
            if !record.weight.is_finite() || record.weight.abs() > 1.0 {
                return Err(WeightTableError::MalformedWeight {
                    category: record.category,
                    dimension: record.dimension,
                    key,
                    weight: record.weight,
                });
            }
            if !items.contains(key) {
                return Err(WeightTableError::UnknownItem {
                    category: record.category,
                    dimension: record.dimension,
                    key,
                });
            }

            let weights = dimensions
                .entry(record.category)
                .or_default()
                .entry(record.dimension.clone())
                .or_default();
            if weights.iter().any(|w| w.key == key) {
                tracing::warn!(
                    "duplicate weight for {}/{} item {key}; keeping first entry",
                    record.category,
                    record.dimension
                );
                continue;
            }
            weights.push(CorrelationWeight {
                key,
                weight: record.weight,
            });
        }

        for per_dimension in dimensions.values_mut() {
            for weights in per_dimension.values_mut() {
                weights.sort_by_key(|w| w.key);
            }
        }

        let table = Self { dimensions };
        tracing::info!(
            "loaded weight table from {}: {} dimension(s), {} excluded record(s)",
            path.display(),
            table.dimension_count(),
            excluded
        );
        Ok(table)
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.values().map(BTreeMap::len).sum()
    }

    #[cfg(test)]
    pub fn from_entries(
        entries: Vec<(Category, &str, ItemKey, f64)>,
    ) -> Self {
        let mut dimensions: BTreeMap<Category, BTreeMap<String, Vec<CorrelationWeight>>> =
            BTreeMap::new();
        for (category, dimension, key, weight) in entries {
            dimensions
                .entry(category)
                .or_default()
                .entry(dimension.to_string())
                .or_default()
                .push(CorrelationWeight { key, weight });
        }
        for per_dimension in dimensions.values_mut() {
            for weights in per_dimension.values_mut() {
                weights.sort_by_key(|w| w.key);
            }
        }
        Self { dimensions }
    }
}
