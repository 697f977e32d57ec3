use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::input::InputError;

/// Pretty-printed JSON with a trailing newline. All map-typed fields in
/// the serialized documents are BTreeMap-backed, so the byte output is a
/// pure function of the value.
pub fn render_pretty<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), InputError> {
    let body = render_pretty(value).map_err(|source| InputError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(body.as_bytes())?;
    writer.flush()?;
    Ok(())
}
