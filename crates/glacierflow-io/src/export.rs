//! CSV artifacts as JSON record arrays for the serving layer.

use std::path::Path;

use serde_json::{Map, Number, Value};
use tracing::{debug, instrument};

use crate::artifact::Artifact;
use crate::schema::{csv_error, header, is_missing, open_csv};
use crate::IoError;

/// Convert one CSV cell to JSON: missing → `null`, numeric → number,
/// anything else → string.
fn cell_value(raw: &str) -> Value {
    if is_missing(raw) {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Number::from_f64(f).map_or(Value::Null, Value::Number);
    }
    Value::String(raw.to_string())
}

/// Read a tabular artifact as an array of JSON objects keyed by column.
///
/// An artifact that has not been produced exports as `[]`. Explorer rows
/// without both coordinates are left out.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::NotTabular`] | `artifact` is the model |
/// | [`IoError::CsvParse`] | the file is malformed |
#[instrument(skip_all, fields(artifact = %artifact))]
pub fn export_json(output_dir: &Path, artifact: Artifact) -> Result<Value, IoError> {
    if !artifact.is_tabular() {
        return Err(IoError::NotTabular {
            artifact: artifact.name(),
        });
    }
    let path = artifact.path_in(output_dir);
    if !path.is_file() {
        debug!(path = %path.display(), "artifact absent, exporting empty array");
        return Ok(Value::Array(Vec::new()));
    }

    let mut rdr = open_csv(&path)?;
    let header = header(&path, &mut rdr)?;
    let needs_coordinates = artifact == Artifact::Explorer;

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(&path, e))?;
        let object: Map<String, Value> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), cell_value(record.get(i).unwrap_or(""))))
            .collect();
        if needs_coordinates && ["lat", "lon"].iter().any(|c| object.get(*c).is_none_or(Value::is_null)) {
            continue;
        }
        records.push(Value::Object(object));
    }
    debug!(n_records = records.len(), "artifact exported");
    Ok(Value::Array(records))
}
