//! Atomic CSV and model artifact publishing.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use glacierflow_core::YearMean;
use glacierflow_rf::RandomForest;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::artifact::Artifact;
use crate::IoError;

/// Float spellings produced by the CSV serializer for non-finite values.
const NON_FINITE: [&str; 3] = ["NaN", "inf", "-inf"];

/// Publishes artifacts into an output directory.
///
/// Every artifact is staged in a temporary file next to its destination and
/// renamed into place, so readers never observe a partially written file and
/// a failed write leaves the previous version untouched.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// Create a writer, creating `output_dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Return the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `rows` as the CSV artifact `artifact`.
    ///
    /// The header is the catalogue's column list; each row's fields must
    /// serialize in that order. `None` and non-finite floats are written as
    /// empty fields.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::NotTabular`] | `artifact` is the model |
    /// | [`IoError::CsvWrite`] | a row cannot be encoded |
    /// | [`IoError::WriteFile`] | staging fails |
    /// | [`IoError::Publish`] | the rename into place fails |
    #[instrument(skip_all, fields(artifact = %artifact, n_rows = rows.len()))]
    pub fn write_table<T: Serialize>(
        &self,
        artifact: Artifact,
        rows: &[T],
    ) -> Result<PathBuf, IoError> {
        if !artifact.is_tabular() {
            return Err(IoError::NotTabular {
                artifact: artifact.name(),
            });
        }
        let path = artifact.path_in(&self.output_dir);
        let csv_err = |e| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        };

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.write_record(artifact.columns()).map_err(csv_err)?;
        for row in rows {
            wtr.serialize(row).map_err(csv_err)?;
        }
        let encoded = wtr.into_inner().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e.into_error(),
        })?;
        let bytes = blank_non_finite(&encoded).map_err(csv_err)?;

        self.publish(&path, &bytes)?;
        info!(path = %path.display(), n_rows = rows.len(), "artifact written");
        Ok(path)
    }

    /// Write a per-year summary; the value column is named by the catalogue.
    ///
    /// # Errors
    ///
    /// As [`ArtifactWriter::write_table`].
    pub fn write_year_means(
        &self,
        artifact: Artifact,
        rows: &[YearMean],
    ) -> Result<PathBuf, IoError> {
        let pairs: Vec<(i32, f64)> = rows.iter().map(|r| (r.year, r.value)).collect();
        self.write_table(artifact, &pairs)
    }

    /// Persist the melt model as `melt_model.bin`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Model`] if encoding fails, or a staging/publish error.
    #[instrument(skip_all)]
    pub fn write_model(&self, forest: &RandomForest) -> Result<PathBuf, IoError> {
        let path = Artifact::MeltModel.path_in(&self.output_dir);
        let bytes = forest.to_bytes()?;
        self.publish(&path, &bytes)?;
        info!(path = %path.display(), n_trees = forest.n_trees(), "model saved");
        Ok(path)
    }

    /// Stage `bytes` beside `path`, then atomically rename over it.
    fn publish(&self, path: &Path, bytes: &[u8]) -> Result<(), IoError> {
        let parent = path.parent().unwrap_or(&self.output_dir);
        let write_err = |e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        };
        fs::create_dir_all(parent).map_err(write_err)?;
        let mut staged = NamedTempFile::new_in(parent).map_err(write_err)?;
        staged.write_all(bytes).map_err(write_err)?;
        staged.flush().map_err(write_err)?;
        staged.persist(path).map_err(|e| IoError::Publish {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

/// Re-encode CSV bytes with every non-finite float spelling emptied.
fn blank_non_finite(encoded: &[u8]) -> Result<Vec<u8>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(encoded);
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::with_capacity(encoded.len()));
    for record in rdr.records() {
        let record = record?;
        wtr.write_record(
            record
                .iter()
                .map(|field| if NON_FINITE.contains(&field) { "" } else { field }),
        )?;
    }
    wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glacierflow_core::{FeatureImportanceRow, GlacierId, GlacierRecord};
    use tempfile::TempDir;

    #[test]
    fn header_follows_catalogue_and_none_is_empty() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let rows = vec![GlacierRecord {
            glacier_id: GlacierId::new("RGI60-15.00001"),
            lat: Some(28.5),
            lon: None,
            area_km2: Some(f64::NAN),
            region: "15".into(),
        }];
        let path = writer.write_table(Artifact::GlacierMaster, &rows).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "glacier_id,lat,lon,area_km2,region\nRGI60-15.00001,28.5,,,15\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let path = writer
            .write_table::<FeatureImportanceRow>(Artifact::FeatureImportance, &[])
            .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "feature,importance\n");
    }

    #[test]
    fn nested_artifacts_create_their_directory() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let rows = vec![YearMean { year: 2025, value: -0.25 }];
        let path = writer
            .write_year_means(Artifact::FutureMeltSummary, &rows)
            .unwrap();
        assert_eq!(path, dir.path().join("visuals/future_melt_summary.csv"));
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "year,predicted_melt\n2025,-0.25\n"
        );
    }

    #[test]
    fn rewrite_replaces_previous_version() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        let row = |f: &str| FeatureImportanceRow {
            feature: f.into(),
            importance: 1.0,
        };
        writer.write_table(Artifact::FeatureImportance, &[row("a")]).unwrap();
        let path = writer.write_table(Artifact::FeatureImportance, &[row("b")]).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("b,1.0"));
        assert!(!content.contains("a,1.0"));
        // No staging files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn model_is_not_a_table() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        assert!(matches!(
            writer.write_table::<FeatureImportanceRow>(Artifact::MeltModel, &[]),
            Err(IoError::NotTabular { .. })
        ));
    }
}
