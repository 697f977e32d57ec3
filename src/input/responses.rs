use std::path::Path;

use serde::Deserialize;

use crate::input::items::default_option_id;
use crate::input::{InputError, read_json_file};
use crate::model::response::{ItemKey, RunOutcome, RunRecord};

#[derive(Debug, Clone, Deserialize)]
struct RawRunEntry {
    portrait_id: u32,
    #[serde(default = "default_option_id")]
    option_id: u32,
    #[serde(default)]
    numeric_response: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl RawRunEntry {
    fn outcome(&self) -> RunOutcome {
        if let Some(error) = &self.error {
            let reason = match error.as_str() {
                Some(s) => s.to_string(),
                None => error.to_string(),
            };
            return RunOutcome::Error(reason);
        }
        match &self.numeric_response {
            Some(value) => match numeric_value(value) {
                Some(v) => RunOutcome::Success(v),
                None => RunOutcome::Missing,
            },
            None => RunOutcome::Missing,
        }
    }
}

// Run files carry the judgment either as a JSON number or as a numeric
// string, depending on the provider client that wrote them.
fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse one run file into records tagged with the file's version token.
pub fn load_run_file(path: &Path) -> Result<Vec<RunRecord>, InputError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            InputError::InvalidInput(format!("unreadable file name: {}", path.display()))
        })?;
    let version = version_token(name);

    let entries: Vec<RawRunEntry> = read_json_file(path)?;
    let records = entries
        .iter()
        .map(|entry| RunRecord {
            key: ItemKey {
                portrait_id: entry.portrait_id,
                option_id: entry.option_id,
            },
            version: version.clone(),
            outcome: entry.outcome(),
        })
        .collect();
    Ok(records)
}

/// Everything in the file stem before the version token. Files that carry
/// no version token belong to no model label and are skipped by discovery.
pub fn model_label(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
    let parts: Vec<&str> = stem.split('_').collect();
    let mut label_parts: Vec<&str> = Vec::new();
    let mut saw_version = false;
    for part in &parts {
        if is_version_token(part) {
            saw_version = true;
            break;
        }
        label_parts.push(part);
    }
    if !saw_version || label_parts.is_empty() {
        return None;
    }
    Some(label_parts.join("_"))
}

/// The version token of a run file: `vN`, or `vN_reversed` for the
/// reversed-prompt variant of the same version.
pub fn version_token(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
    let parts: Vec<&str> = stem.split('_').collect();
    for (i, part) in parts.iter().enumerate() {
        if is_version_token(part) {
            if parts.get(i + 1) == Some(&"reversed") {
                return format!("{}_{}", part, parts[i + 1]);
            }
            return (*part).to_string();
        }
    }
    "unknown".to_string()
}

fn is_version_token(part: &str) -> bool {
    let Some(rest) = part.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}
