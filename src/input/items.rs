use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::input::{InputError, read_json_file};
use crate::model::response::ItemKey;

/// One unit of the portrait battery: a portrait option with the query and
/// response text the invocation layer presents to the model.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub portrait_id: u32,
    #[serde(default = "default_option_id")]
    pub option_id: u32,
    pub content: String,
    pub prompt: String,
}

pub(crate) fn default_option_id() -> u32 {
    1
}

impl Item {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            portrait_id: self.portrait_id,
            option_id: self.option_id,
        }
    }
}

/// The static item dataset, loaded once per process and read-only after.
#[derive(Debug, Clone)]
pub struct ItemSet {
    by_key: BTreeMap<ItemKey, Item>,
}

impl ItemSet {
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let items: Vec<Item> = read_json_file(path)?;
        if items.is_empty() {
            return Err(InputError::InvalidInput(format!(
                "item dataset {} is empty",
                path.display()
            )));
        }

        let mut by_key = BTreeMap::new();
        for item in items {
            let key = item.key();
            if by_key.contains_key(&key) {
                tracing::warn!("duplicate item {key} in dataset; keeping first entry");
                continue;
            }
            by_key.insert(key, item);
        }

        tracing::info!("loaded {} item(s) from {}", by_key.len(), path.display());
        Ok(Self { by_key })
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn contains(&self, key: ItemKey) -> bool {
        self.by_key.contains_key(&key)
    }

    pub fn get(&self, key: ItemKey) -> Option<&Item> {
        self.by_key.get(&key)
    }

    #[cfg(test)]
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut by_key = BTreeMap::new();
        for item in items {
            by_key.insert(item.key(), item);
        }
        Self { by_key }
    }
}
