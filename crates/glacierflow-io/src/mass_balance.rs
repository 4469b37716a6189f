//! Mass-balance survey ingestion in wide or long layout.

use std::path::{Path, PathBuf};

use glacierflow_core::constants::{HISTORY_END_YEAR, HISTORY_START_YEAR};
use glacierflow_core::{MassBalanceObservation, normalize_key};
use tracing::{debug, info, instrument, warn};

use crate::schema::{csv_error, header, open_csv, optional_f64, parse_year, require_columns};
use crate::IoError;

/// Columns of the long layout.
const LONG_COLUMNS: [&str; 3] = ["glacier_key", "year", "mass_change"];

/// Accepted names of the ID column in the wide layout, compared
/// case-insensitively.
const WIDE_ID_COLUMNS: [&str; 2] = ["rgiid", "rgid"];

/// Reads annual mass-balance observations from one survey file.
///
/// Two layouts are accepted:
/// - long: `glacier_key,year,mass_change`, one observation per row;
/// - wide: an `rgiid`/`rgid` column plus one column per year, one glacier
///   per row.
///
/// Wide files keep only year columns 2000–2024; other columns are ignored.
/// Empty cells are dropped. Rows whose ID carries no recognizable key are
/// dropped and counted.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumns`] | Neither layout's key column is present |
/// | [`IoError::InvalidValue`] | A value or long-layout year is not numeric |
pub struct MassBalanceReader {
    path: PathBuf,
}

impl MassBalanceReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and normalize every observation in the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<MassBalanceObservation>, IoError> {
        let mut rdr = open_csv(&self.path)?;
        let header = header(&self.path, &mut rdr)?;

        let mut observations = Vec::new();
        let mut unparseable = 0usize;

        if header.iter().any(|h| h == LONG_COLUMNS[0]) {
            let idx = require_columns(&self.path, &header, &LONG_COLUMNS)?;
            debug!("long layout");
            for (row_index, result) in rdr.records().enumerate() {
                let record = result.map_err(|e| csv_error(&self.path, e))?;
                let cell = |i: usize| record.get(idx[i]).unwrap_or("");
                let Some(glacier_key) = normalize_key(cell(0)) else {
                    unparseable += 1;
                    continue;
                };
                let Some(mass_change) = optional_f64(&self.path, row_index, LONG_COLUMNS[2], cell(2))?
                else {
                    continue;
                };
                let year = parse_year(cell(1)).ok_or_else(|| IoError::InvalidValue {
                    path: self.path.clone(),
                    row_index,
                    column: LONG_COLUMNS[1].to_string(),
                    raw: cell(1).to_string(),
                })?;
                if (HISTORY_START_YEAR..=HISTORY_END_YEAR).contains(&year) {
                    observations.push(MassBalanceObservation {
                        glacier_key,
                        year,
                        mass_change,
                    });
                }
            }
        } else {
            let id_index = header
                .iter()
                .position(|h| WIDE_ID_COLUMNS.iter().any(|c| h.eq_ignore_ascii_case(c)))
                .ok_or_else(|| IoError::MissingColumns {
                    path: self.path.clone(),
                    columns: vec![format!("{} or {}", WIDE_ID_COLUMNS[0], WIDE_ID_COLUMNS[1])],
                })?;
            let year_columns: Vec<(usize, i32, &str)> = header
                .iter()
                .enumerate()
                .filter_map(|(i, h)| parse_year(h).map(|y| (i, y, h)))
                .filter(|(_, y, _)| (HISTORY_START_YEAR..=HISTORY_END_YEAR).contains(y))
                .collect();
            debug!(n_year_columns = year_columns.len(), "wide layout");

            for (row_index, result) in rdr.records().enumerate() {
                let record = result.map_err(|e| csv_error(&self.path, e))?;
                let Some(glacier_key) = normalize_key(record.get(id_index).unwrap_or("")) else {
                    unparseable += 1;
                    continue;
                };
                for &(col, year, name) in &year_columns {
                    let raw = record.get(col).unwrap_or("");
                    if let Some(mass_change) = optional_f64(&self.path, row_index, name, raw)? {
                        observations.push(MassBalanceObservation {
                            glacier_key: glacier_key.clone(),
                            year,
                            mass_change,
                        });
                    }
                }
            }
        }

        if unparseable > 0 {
            warn!(unparseable, "survey rows without a recognizable glacier key dropped");
        }
        info!(n_observations = observations.len(), "mass balance loaded");
        Ok(observations)
    }
}

/// Read every `*.csv` survey in `dir`, in file-name order, and concatenate.
///
/// # Errors
///
/// Returns [`IoError::ReadDir`] if the directory cannot be listed,
/// [`IoError::NoMassBalanceFiles`] if it holds no CSV file, or any error
/// from [`MassBalanceReader::read`].
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn read_mass_balance_dir(dir: &Path) -> Result<Vec<MassBalanceObservation>, IoError> {
    let read_dir_err = |e| IoError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(IoError::NoMassBalanceFiles {
            path: dir.to_path_buf(),
        });
    }
    files.sort();

    let mut all = Vec::new();
    for path in &files {
        all.extend(MassBalanceReader::new(path).read()?);
    }
    info!(n_files = files.len(), n_observations = all.len(), "mass-balance surveys combined");
    Ok(all)
}
