//! Readers for the tabular inputs and for previously published artifacts.

use std::path::{Path, PathBuf};

use glacierflow_core::constants::UNKNOWN;
use glacierflow_core::{ClimateFeature, GlacierId, GlacierRecord, InventoryArea};
use glacierflow_rf::RandomForest;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::artifact::Artifact;
use crate::schema::{csv_error, header, open_csv, optional_f64, require_columns};
use crate::IoError;

/// Reads one of the pipeline's input tables.
///
/// Each method checks the header for its required columns (extra columns are
/// ignored), then parses rows. Rows with an empty ID are skipped; numeric
/// cells that are empty or non-finite become missing values.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumns`] | A required column is absent |
/// | [`IoError::InvalidValue`] | A numeric cell holds non-numeric text |
pub struct InputReader {
    path: PathBuf,
}

impl InputReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Visit every data row with the cells of `required`, in that order.
    fn rows<T>(
        &self,
        required: &[&str],
        mut parse: impl FnMut(usize, &[&str]) -> Result<Option<T>, IoError>,
    ) -> Result<Vec<T>, IoError> {
        let mut rdr = open_csv(&self.path)?;
        let header = header(&self.path, &mut rdr)?;
        let indices = require_columns(&self.path, &header, required)?;
        debug!(n_columns = header.len(), "read CSV header");

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&self.path, e))?;
            let cells: Vec<&str> = indices.iter().map(|&i| record.get(i).unwrap_or("")).collect();
            match parse(row_index, &cells)? {
                Some(row) => out.push(row),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "rows without an identifier skipped");
        }
        Ok(out)
    }

    /// Read the glacier master table
    /// (`glacier_id, lat, lon, area_km2, region`).
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn glaciers(&self) -> Result<Vec<GlacierRecord>, IoError> {
        const COLUMNS: [&str; 5] = ["glacier_id", "lat", "lon", "area_km2", "region"];
        let path = &self.path;
        let rows = self.rows(&COLUMNS, |row, c| {
            if c[0].is_empty() {
                return Ok(None);
            }
            Ok(Some(GlacierRecord {
                glacier_id: GlacierId::new(c[0]),
                lat: optional_f64(path, row, COLUMNS[1], c[1])?,
                lon: optional_f64(path, row, COLUMNS[2], c[2])?,
                area_km2: optional_f64(path, row, COLUMNS[3], c[3])?,
                region: if c[4].is_empty() { UNKNOWN.to_string() } else { c[4].to_string() },
            }))
        })?;
        info!(n_glaciers = rows.len(), "glacier master loaded");
        Ok(rows)
    }

    /// Read per-glacier climate averages
    /// (`glacier_id, prec_mean, temp_mean, srad_mean`).
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn climate(&self) -> Result<Vec<ClimateFeature>, IoError> {
        const COLUMNS: [&str; 4] = ["glacier_id", "prec_mean", "temp_mean", "srad_mean"];
        let path = &self.path;
        let rows = self.rows(&COLUMNS, |row, c| {
            if c[0].is_empty() {
                return Ok(None);
            }
            Ok(Some(ClimateFeature {
                glacier_id: GlacierId::new(c[0]),
                prec_mean: optional_f64(path, row, COLUMNS[1], c[1])?,
                temp_mean: optional_f64(path, row, COLUMNS[2], c[2])?,
                srad_mean: optional_f64(path, row, COLUMNS[3], c[3])?,
            }))
        })?;
        info!(n_rows = rows.len(), "climate features loaded");
        Ok(rows)
    }

    /// Read inventory outline areas (`rgi_id, area_km2`).
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn inventory_areas(&self) -> Result<Vec<InventoryArea>, IoError> {
        const COLUMNS: [&str; 2] = ["rgi_id", "area_km2"];
        let path = &self.path;
        let rows = self.rows(&COLUMNS, |row, c| {
            if c[0].is_empty() {
                return Ok(None);
            }
            Ok(Some(InventoryArea {
                rgi_id: c[0].to_string(),
                area_km2: optional_f64(path, row, COLUMNS[1], c[1])?,
            }))
        })?;
        info!(n_rows = rows.len(), "inventory areas loaded");
        Ok(rows)
    }
}

/// Reads artifacts back from an output directory for single-stage runs.
pub struct ArtifactReader {
    output_dir: PathBuf,
}

impl ArtifactReader {
    /// Create a reader over `output_dir`.
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn existing_path(&self, artifact: Artifact) -> Result<PathBuf, IoError> {
        let path = artifact.path_in(&self.output_dir);
        if path.is_file() {
            Ok(path)
        } else {
            Err(IoError::MissingArtifact {
                artifact: artifact.name(),
                path,
            })
        }
    }

    /// Deserialize every row of a tabular artifact.
    ///
    /// The header must carry every column the catalogue lists for it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::NotTabular`] | `artifact` is the model |
    /// | [`IoError::MissingArtifact`] | the file has not been produced |
    /// | [`IoError::MissingColumns`] | the header lacks catalogue columns |
    /// | [`IoError::CsvParse`] | a row does not match the row type |
    #[instrument(skip_all, fields(artifact = %artifact))]
    pub fn table<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Vec<T>, IoError> {
        if !artifact.is_tabular() {
            return Err(IoError::NotTabular {
                artifact: artifact.name(),
            });
        }
        let path = self.existing_path(artifact)?;
        let mut rdr = open_csv(&path)?;
        let header = header(&path, &mut rdr)?;
        require_columns(&path, &header, artifact.columns())?;

        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| csv_error(&path, e))?;
        debug!(n_rows = rows.len(), "artifact loaded");
        Ok(rows)
    }

    /// Load the persisted melt model.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingArtifact`] if no model has been saved, or
    /// [`IoError::Model`] if it cannot be decoded.
    pub fn model(&self) -> Result<RandomForest, IoError> {
        let path = self.existing_path(Artifact::MeltModel)?;
        Ok(RandomForest::load(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn glaciers_with_missing_coordinates() {
        let f = write_csv(
            "glacier_id,lat,lon,area_km2,region,extra\n\
             RGI60-15.00001,28.1,86.9,3.2,15,x\n\
             RGI60-15.00002,,86.8,1.0,15,y\n\
             ,27.0,86.0,1.0,15,z\n",
        );
        let rows = InputReader::new(f.path()).glaciers().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].glacier_id.as_str(), "RGI60-15.00001");
        assert_eq!(rows[0].area_km2, Some(3.2));
        assert_eq!(rows[1].lat, None);
    }

    #[test]
    fn climate_columns_in_any_order() {
        let f = write_csv("srad_mean,glacier_id,temp_mean,prec_mean\n150,G1,-2.5,900\n");
        let rows = InputReader::new(f.path()).climate().unwrap();
        assert_eq!(rows[0].temp_mean, Some(-2.5));
        assert_eq!(rows[0].prec_mean, Some(900.0));
        assert_eq!(rows[0].srad_mean, Some(150.0));
    }

    #[test]
    fn missing_columns_are_named() {
        let f = write_csv("glacier_id,temp_mean\nG1,-1\n");
        match InputReader::new(f.path()).climate() {
            Err(IoError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, ["prec_mean", "srad_mean"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unparseable_number_is_an_error() {
        let f = write_csv("rgi_id,area_km2\nRGI60-15.00001,big\n");
        assert!(matches!(
            InputReader::new(f.path()).inventory_areas(),
            Err(IoError::InvalidValue { row_index: 0, .. })
        ));
    }

    #[test]
    fn file_not_found() {
        let result = InputReader::new(Path::new("/nonexistent/glaciers.csv")).glaciers();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn missing_artifact_is_reported_by_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ArtifactReader::new(dir.path())
            .table::<GlacierRecord>(Artifact::GlacierMaster)
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::MissingArtifact { artifact: "glacier_master_with_area", .. }
        ));
    }
}
