//! I/O error types for glacierflow-io.

use std::path::PathBuf;

use glacierflow_rf::RfError;

/// Errors from input ingestion, artifact publishing and export.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when an input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a directory that must hold input files cannot be listed.
    #[error("cannot list directory {path}")]
    ReadDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the mass-balance directory holds no CSV files.
    #[error("no mass-balance CSV files in {path}")]
    NoMassBalanceFiles {
        /// Directory that was searched.
        path: PathBuf,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when required columns are absent from a header row.
    #[error("{path} is missing required column(s): {}", columns.join(", "))]
    MissingColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Every absent column, in schema order.
        columns: Vec<String>,
    },

    /// Returned when a cell cannot be parsed as the column's type.
    #[error("invalid value in {path}: row {row_index}, column {column}, raw value \"{raw}\"")]
    InvalidValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Column name.
        column: String,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when a stage input artifact has not been produced yet.
    #[error("artifact {artifact} not found at {path}; run the producing stage first")]
    MissingArtifact {
        /// Catalogue name of the artifact.
        artifact: &'static str,
        /// Expected location.
        path: PathBuf,
    },

    /// Returned when an artifact name is not in the catalogue.
    #[error("unknown artifact \"{name}\"")]
    UnknownArtifact {
        /// The name that was looked up.
        name: String,
    },

    /// Returned when a binary artifact is requested as a table.
    #[error("artifact {artifact} is not tabular")]
    NotTabular {
        /// Catalogue name of the artifact.
        artifact: &'static str,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a staged artifact cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when rows cannot be encoded as CSV.
    #[error("cannot encode rows for {path}")]
    CsvWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a staged artifact cannot be renamed into place.
    #[error("cannot publish {path}")]
    Publish {
        /// Destination path.
        path: PathBuf,
        /// Underlying persist error.
        source: tempfile::PersistError,
    },

    /// Returned when the melt model cannot be encoded or decoded.
    #[error("melt model I/O failed")]
    Model(#[from] RfError),
}
