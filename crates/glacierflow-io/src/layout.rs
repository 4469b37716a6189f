//! Input directory layout.

use std::path::{Path, PathBuf};

/// Glacier master table (`glacier_id, lat, lon, area_km2, region`).
pub const GLACIER_MASTER_FILE: &str = "glacier_master.csv";

/// Per-glacier climate averages.
pub const CLIMATE_FEATURES_FILE: &str = "climate_features.csv";

/// Directory of mass-balance survey CSVs.
pub const MASS_BALANCE_DIR: &str = "mass_balance";

/// Optional inventory attribute table used for area reconciliation.
pub const GLACIER_ATTRIBUTES_FILE: &str = "glacier_attributes.csv";

/// Where the pipeline finds its inputs under a data directory.
#[derive(Debug, Clone)]
pub struct InputLayout {
    data_dir: PathBuf,
}

impl InputLayout {
    /// Describe the inputs under `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Return the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn glacier_master(&self) -> PathBuf {
        self.data_dir.join(GLACIER_MASTER_FILE)
    }

    #[must_use]
    pub fn climate_features(&self) -> PathBuf {
        self.data_dir.join(CLIMATE_FEATURES_FILE)
    }

    #[must_use]
    pub fn mass_balance_dir(&self) -> PathBuf {
        self.data_dir.join(MASS_BALANCE_DIR)
    }

    /// The inventory attribute table, when present.
    #[must_use]
    pub fn glacier_attributes(&self) -> Option<PathBuf> {
        let path = self.data_dir.join(GLACIER_ATTRIBUTES_FILE);
        path.is_file().then_some(path)
    }
}
