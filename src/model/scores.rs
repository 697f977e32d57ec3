use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dimension family a correlation weight belongs to: the ten Schwartz
/// values (PVQ), the five personality traits (BFI), or the four
/// higher-order Schwartz values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pvq,
    Bfi,
    HigherPvq,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pvq => "pvq",
            Category::Bfi => "bfi",
            Category::HigherPvq => "higher_pvq",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for one (model, category, dimension). `Unscored` is a
/// first-class state meaning "could not compute", distinct from any
/// numeric score; it is produced when no item passes the weight
/// threshold with a present averaged response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DimensionScore {
    Scored { score: f64, std_dev: f64, n: u32 },
    Unscored { n: u32 },
}

impl DimensionScore {
    pub fn is_scored(&self) -> bool {
        matches!(self, DimensionScore::Scored { .. })
    }
}

/// All dimension scores for one model, keyed by category then dimension
/// name. BTreeMap-backed so iteration and serialization order are stable.
pub type ScoreMap = BTreeMap<Category, BTreeMap<String, DimensionScore>>;
