//! Record types flowing between the pipeline stages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::FEATURE_NAMES;
use crate::keys::GlacierKey;

/// Inventory glacier identifier as it appears in the geometry extract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlacierId(String);

impl GlacierId {
    /// Wrap a raw inventory identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlacierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One glacier outline from the inventory.
///
/// Coordinates and area are optional: extracts can lack centroids, and area
/// reconciliation leaves unmatched glaciers without an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlacierRecord {
    pub glacier_id: GlacierId,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub area_km2: Option<f64>,
    pub region: String,
}

/// Long-run climate averages sampled at a glacier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateFeature {
    pub glacier_id: GlacierId,
    pub prec_mean: Option<f64>,
    pub temp_mean: Option<f64>,
    pub srad_mean: Option<f64>,
}

/// Inventory attribute row carrying the authoritative outline area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryArea {
    pub rgi_id: String,
    pub area_km2: Option<f64>,
}

/// One annual mass-balance value (m w.e.) keyed by normalized inventory key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceObservation {
    pub glacier_key: GlacierKey,
    pub year: i32,
    pub mass_change: f64,
}

/// Canonical glacier-year row used for hydrology and model training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlacierYearFeature {
    pub glacier_id: GlacierId,
    pub year: i32,
    pub area_km2: f64,
    pub temp_mean: f64,
    pub prec_mean: f64,
    pub srad_mean: f64,
    pub mass_change: f64,
}

impl GlacierYearFeature {
    /// Model inputs ordered as [`FEATURE_NAMES`].
    #[must_use]
    pub fn feature_vector(&self) -> Vec<f64> {
        vec![self.area_km2, self.temp_mean, self.prec_mean, self.srad_mean]
    }
}

/// Owned copies of [`FEATURE_NAMES`] for the regressor API.
#[must_use]
pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
}
