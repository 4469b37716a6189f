//! Per-glacier explorer table and heuristic risk grade.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::anomaly::{MeltCategory, MeltYearClassification};
use crate::constants::{
    RISK_GRADE_HIGH, RISK_GRADE_MEDIUM, RISK_MELT_MODERATE, RISK_MELT_SEVERE, RISK_POINTS_MAJOR,
    RISK_POINTS_MINOR, RISK_SMALL_AREA_KM2, RISK_TEMP_MILD, RISK_TEMP_WARM, UNKNOWN,
};
use crate::dataset::distinct_glaciers;
use crate::domain::{ClimateFeature, GlacierId, GlacierRecord};
use crate::flood::{FloodRiskLevel, FloodRiskRecord};
use crate::forecast::FutureProjection;
use crate::hydrology::BasinAssignment;

/// Binned glacier risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskGrade {
    Low,
    Medium,
    High,
}

impl RiskGrade {
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        if score >= RISK_GRADE_HIGH {
            Self::High
        } else if score >= RISK_GRADE_MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

/// Inputs to the glacier risk heuristic; `None` contributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskFactors {
    pub temp_mean: Option<f64>,
    pub predicted_melt: Option<f64>,
    pub area_km2: Option<f64>,
    pub melt_category: Option<MeltCategory>,
    pub flood_risk_level: Option<FloodRiskLevel>,
}

/// Additive risk score before binning.
#[must_use]
pub fn risk_score(f: &RiskFactors) -> u32 {
    let mut score = 0;
    if let Some(t) = f.temp_mean {
        if t > RISK_TEMP_WARM {
            score += RISK_POINTS_MAJOR;
        } else if t > RISK_TEMP_MILD {
            score += RISK_POINTS_MINOR;
        }
    }
    if let Some(m) = f.predicted_melt {
        if m < RISK_MELT_SEVERE {
            score += RISK_POINTS_MAJOR;
        } else if m < RISK_MELT_MODERATE {
            score += RISK_POINTS_MINOR;
        }
    }
    if let Some(a) = f.area_km2
        && a < RISK_SMALL_AREA_KM2
    {
        score += RISK_POINTS_MINOR;
    }
    if f.melt_category == Some(MeltCategory::Extreme) {
        score += RISK_POINTS_MAJOR;
    }
    if f.flood_risk_level == Some(FloodRiskLevel::High) {
        score += RISK_POINTS_MAJOR;
    }
    score
}

/// One glacier as served to the map explorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerRecord {
    pub glacier_id: GlacierId,
    pub lat: f64,
    pub lon: f64,
    pub area_km2: Option<f64>,
    pub temp_mean: Option<f64>,
    pub melt_category: String,
    pub flood_risk_level: String,
    pub predicted_melt: Option<f64>,
    pub risk_level: RiskGrade,
}

/// Keep the value with the greatest year per key; later input wins ties.
fn latest_by<'a, K, T>(
    rows: &'a [T],
    key: impl Fn(&'a T) -> K,
    year: impl Fn(&T) -> i32,
) -> HashMap<K, &'a T>
where
    K: std::hash::Hash + Eq,
{
    let mut latest: HashMap<K, &'a T> = HashMap::new();
    for row in rows {
        let slot = latest.entry(key(row)).or_insert(row);
        if year(row) >= year(slot) {
            *slot = row;
        }
    }
    latest
}

/// Everything the explorer joins onto the glacier list.
#[derive(Debug, Clone, Copy)]
pub struct ExplorerSources<'a> {
    pub glaciers: &'a [GlacierRecord],
    pub climate: &'a [ClimateFeature],
    pub projections: &'a [FutureProjection],
    pub melt_years: &'a [MeltYearClassification],
    pub flood_risk: &'a [FloodRiskRecord],
    pub basins: &'a BasinAssignment,
}

/// Join per-glacier and per-basin artifacts and grade every glacier.
///
/// Left joins from the glacier list: climate by glacier (duplicates
/// averaged), the latest projection by glacier, and the latest melt
/// category and flood level by basin. Unmatched categories become
/// "Unknown". Duplicate glacier rows keep their first occurrence and
/// glaciers without finite coordinates are dropped.
#[instrument(skip_all, fields(n_glaciers = sources.glaciers.len()))]
pub fn merge_explorer(sources: &ExplorerSources<'_>) -> Vec<ExplorerRecord> {
    let mut temps: HashMap<&GlacierId, (f64, usize)> = HashMap::new();
    for c in sources.climate {
        if let Some(t) = c.temp_mean.filter(|t| t.is_finite()) {
            let e = temps.entry(&c.glacier_id).or_insert((0.0, 0));
            e.0 += t;
            e.1 += 1;
        }
    }

    let projections = latest_by(sources.projections, |p| &p.glacier_id, |p| p.year);
    let melt = latest_by(sources.melt_years, |m| m.basin.as_str(), |m| m.year);
    let flood = latest_by(sources.flood_risk, |f| f.basin.as_str(), |f| f.year);

    let mut dropped = 0usize;
    let mut out = Vec::with_capacity(sources.glaciers.len());
    for g in distinct_glaciers(sources.glaciers) {
        let (Some(lat), Some(lon)) = (
            g.lat.filter(|v| v.is_finite()),
            g.lon.filter(|v| v.is_finite()),
        ) else {
            dropped += 1;
            continue;
        };
        let basin = sources.basins.basin_for(&g.glacier_id);
        let factors = RiskFactors {
            temp_mean: temps.get(&g.glacier_id).map(|&(s, n)| s / n as f64),
            predicted_melt: projections.get(&g.glacier_id).map(|p| p.predicted_melt),
            area_km2: g.area_km2,
            melt_category: melt.get(basin).map(|m| m.melt_category),
            flood_risk_level: flood.get(basin).map(|f| f.flood_risk_level),
        };
        out.push(ExplorerRecord {
            glacier_id: g.glacier_id.clone(),
            lat,
            lon,
            area_km2: factors.area_km2,
            temp_mean: factors.temp_mean,
            melt_category: factors
                .melt_category
                .map_or_else(|| UNKNOWN.to_string(), |c| c.to_string()),
            flood_risk_level: factors
                .flood_risk_level
                .map_or_else(|| UNKNOWN.to_string(), |l| l.to_string()),
            predicted_melt: factors.predicted_melt,
            risk_level: RiskGrade::from_score(risk_score(&factors)),
        });
    }

    if dropped > 0 {
        warn!(dropped, "glaciers without coordinates excluded from explorer");
    }
    info!(
        n_records = out.len(),
        n_high = out.iter().filter(|r| r.risk_level == RiskGrade::High).count(),
        "explorer table merged"
    );
    out
}
