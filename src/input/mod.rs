use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod items;
pub mod responses;
pub mod weights;

use responses::model_label;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Raw run files produced by the invocation layer, grouped by model label.
/// A model label is everything in the file stem before the version token,
/// i.e. model name plus prompt variant; all versions of one label are
/// averaged together.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    pub model_files: BTreeMap<String, Vec<PathBuf>>,
}

impl ResponseStore {
    pub fn discover(base_dir: &Path) -> Result<Self, InputError> {
        if !base_dir.is_dir() {
            return Err(InputError::MissingInput(format!(
                "response directory {} does not exist",
                base_dir.display()
            )));
        }

        let mut model_files: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        collect_json_files(base_dir, &mut |path| {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                return;
            };
            match model_label(name) {
                Some(label) => model_files.entry(label).or_default().push(path),
                None => {
                    tracing::warn!(
                        "skipping {}: file name carries no version token",
                        path.display()
                    );
                }
            }
        })?;

        for files in model_files.values_mut() {
            files.sort();
        }

        tracing::info!(
            "discovered {} run file(s) across {} model label(s) under {}",
            model_files.values().map(Vec::len).sum::<usize>(),
            model_files.len(),
            base_dir.display()
        );

        Ok(Self { model_files })
    }

    pub fn is_empty(&self) -> bool {
        self.model_files.is_empty()
    }
}

pub const AVERAGED_SUFFIX: &str = "_averaged_results.json";

/// Read previously written averaged sets back from an output directory,
/// one `(model label, averaged set)` pair per `*_averaged_results.json`
/// file, in sorted model order.
pub fn load_averaged_sets(
    dir: &Path,
) -> Result<Vec<(String, Vec<crate::model::response::AveragedResponse>)>, InputError> {
    if !dir.is_dir() {
        return Err(InputError::MissingInput(format!(
            "averaged directory {} does not exist",
            dir.display()
        )));
    }

    let mut found: Vec<(String, PathBuf)> = Vec::new();
    collect_json_files(dir, &mut |path| {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        if let Some(model) = name.strip_suffix(AVERAGED_SUFFIX) {
            found.push((model.to_string(), path));
        }
    })?;
    found.sort();

    let mut sets = Vec::with_capacity(found.len());
    for (model, path) in found {
        let averaged = read_json_file(&path)?;
        sets.push((model, averaged));
    }
    Ok(sets)
}

fn collect_json_files(
    dir: &Path,
    visit: &mut impl FnMut(PathBuf),
) -> Result<(), InputError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_json_files(&path, visit)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            visit(path);
        }
    }
    Ok(())
}

pub(crate) fn read_json_file<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, InputError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| InputError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
