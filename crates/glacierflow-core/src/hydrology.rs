//! Mass balance to meltwater runoff conversion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::constants::{M2_PER_KM2, MM_PER_M, UNKNOWN};
use crate::domain::{GlacierId, GlacierRecord, GlacierYearFeature};

/// Melt depth, runoff volume and runoff depth for one glacier-year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunoffConversion {
    /// Melt depth in metres water equivalent, never negative.
    pub melt_m: f64,
    /// Meltwater volume in cubic metres.
    pub glacier_runoff_m3: f64,
    /// Melt depth in millimetres.
    pub runoff_mm: f64,
}

/// Convert an annual mass change (m w.e.) over `area_km2` into runoff.
///
/// Only net loss contributes: accumulation and zero change give zero melt.
#[must_use]
pub fn convert(mass_change: f64, area_km2: f64) -> RunoffConversion {
    let melt_m = if mass_change < 0.0 { -mass_change } else { 0.0 };
    RunoffConversion {
        melt_m,
        glacier_runoff_m3: melt_m * area_km2 * M2_PER_KM2,
        runoff_mm: melt_m * MM_PER_M,
    }
}

/// How glaciers are grouped into basins.
#[derive(Debug, Clone)]
pub enum BasinAssignment {
    /// Every glacier belongs to the same basin.
    Constant(String),
    /// Basin looked up per glacier; unlisted glaciers fall into "Unknown".
    PerGlacier(HashMap<GlacierId, String>),
}

impl BasinAssignment {
    /// Use each glacier's inventory region as its basin.
    #[must_use]
    pub fn from_regions(glaciers: &[GlacierRecord]) -> Self {
        Self::PerGlacier(
            glaciers
                .iter()
                .map(|g| (g.glacier_id.clone(), g.region.clone()))
                .collect(),
        )
    }

    /// Basin label for a glacier.
    #[must_use]
    pub fn basin_for(&self, glacier_id: &GlacierId) -> &str {
        match self {
            Self::Constant(basin) => basin,
            Self::PerGlacier(map) => map.get(glacier_id).map_or(UNKNOWN, String::as_str),
        }
    }
}

/// A glacier-year with its basin and runoff contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrologyRecord {
    pub glacier_id: GlacierId,
    pub basin: String,
    pub year: i32,
    pub area_km2: f64,
    pub temp_mean: f64,
    pub prec_mean: f64,
    pub srad_mean: f64,
    pub mass_change: f64,
    pub melt_m: f64,
    pub glacier_runoff_m3: f64,
    pub runoff_mm: f64,
}

/// Attach runoff and basin labels to every glacier-year.
#[instrument(skip_all, fields(n_rows = features.len()))]
pub fn link_hydrology(
    features: &[GlacierYearFeature],
    basins: &BasinAssignment,
) -> Vec<HydrologyRecord> {
    let records: Vec<HydrologyRecord> = features
        .iter()
        .map(|f| {
            let runoff = convert(f.mass_change, f.area_km2);
            HydrologyRecord {
                glacier_id: f.glacier_id.clone(),
                basin: basins.basin_for(&f.glacier_id).to_string(),
                year: f.year,
                area_km2: f.area_km2,
                temp_mean: f.temp_mean,
                prec_mean: f.prec_mean,
                srad_mean: f.srad_mean,
                mass_change: f.mass_change,
                melt_m: runoff.melt_m,
                glacier_runoff_m3: runoff.glacier_runoff_m3,
                runoff_mm: runoff.runoff_mm,
            }
        })
        .collect();

    info!(
        n_records = records.len(),
        total_runoff_m3 = records.iter().map(|r| r.glacier_runoff_m3).sum::<f64>(),
        "hydrology linked"
    );
    records
}
