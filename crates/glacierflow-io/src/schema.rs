//! Header validation and cell parsing shared by the CSV readers.

use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::IoError;

/// Open a headed CSV file.
///
/// `flexible(true)` lets short rows through so they surface as missing cells
/// rather than a low-level record-length error.
pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<File>, IoError> {
    let file = File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

pub(crate) fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

/// Read the header row of an open reader.
pub(crate) fn header(path: &Path, rdr: &mut csv::Reader<File>) -> Result<StringRecord, IoError> {
    rdr.headers().cloned().map_err(|e| csv_error(path, e))
}

/// Resolve each required column to its position in `header`.
///
/// Matching is exact. Every absent column is reported at once.
pub(crate) fn require_columns(
    path: &Path,
    header: &StringRecord,
    required: &[&str],
) -> Result<Vec<usize>, IoError> {
    let mut indices = Vec::with_capacity(required.len());
    let mut missing = Vec::new();
    for name in required {
        match header.iter().position(|h| h == *name) {
            Some(i) => indices.push(i),
            None => missing.push((*name).to_string()),
        }
    }
    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(IoError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        })
    }
}

/// Whether a cell spells a missing value.
pub(crate) fn is_missing(raw: &str) -> bool {
    raw.is_empty()
        || ["nan", "na", "n/a", "null", "none"]
            .iter()
            .any(|m| raw.eq_ignore_ascii_case(m))
}

/// Parse a numeric cell. Missing and non-finite values become `None`.
///
/// # Errors
///
/// Returns [`IoError::InvalidValue`] for text that is not a number.
pub(crate) fn optional_f64(
    path: &Path,
    row_index: usize,
    column: &str,
    raw: &str,
) -> Result<Option<f64>, IoError> {
    if is_missing(raw) {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| IoError::InvalidValue {
        path: path.to_path_buf(),
        row_index,
        column: column.to_string(),
        raw: raw.to_string(),
    })?;
    Ok(value.is_finite().then_some(value))
}

/// Parse an integral year cell; accepts a trailing `.0` as written by
/// spreadsheet exports.
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_missing_column_is_reported() {
        let header = StringRecord::from(vec!["glacier_id", "lat"]);
        let err = require_columns(
            Path::new("g.csv"),
            &header,
            &["glacier_id", "lat", "lon", "area_km2"],
        )
        .unwrap_err();
        match err {
            IoError::MissingColumns { columns, .. } => assert_eq!(columns, ["lon", "area_km2"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numeric_cells() {
        let p = Path::new("x.csv");
        assert_eq!(optional_f64(p, 0, "a", "1.5").unwrap(), Some(1.5));
        assert_eq!(optional_f64(p, 0, "a", "").unwrap(), None);
        assert_eq!(optional_f64(p, 0, "a", "NaN").unwrap(), None);
        assert_eq!(optional_f64(p, 0, "a", "inf").unwrap(), None);
        assert!(matches!(
            optional_f64(p, 3, "a", "abc"),
            Err(IoError::InvalidValue { row_index: 3, .. })
        ));
    }

    #[test]
    fn year_headers() {
        assert_eq!(parse_year("2004"), Some(2004));
        assert_eq!(parse_year("2004.0"), Some(2004));
        assert_eq!(parse_year("rgiid"), None);
    }
}
