//! Composite flood-risk index from runoff anomaly and melt category.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::anomaly::{MeltCategory, MeltYearClassification};
use crate::constants::{
    DEGENERATE_RUNOFF_NORM, FLOOD_HIGH_THRESHOLD, FLOOD_MELT_WEIGHT, FLOOD_MODERATE_THRESHOLD,
    FLOOD_RUNOFF_WEIGHT, MELT_SCORE_EXTREME, MELT_SCORE_HIGH, MELT_SCORE_LOW, MELT_SCORE_NORMAL,
};
use crate::error::CoreError;

/// Discrete flood-risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloodRiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl FloodRiskLevel {
    /// Bin a flood-risk index.
    #[must_use]
    pub fn from_index(index: f64) -> Self {
        if index >= FLOOD_HIGH_THRESHOLD {
            Self::High
        } else if index >= FLOOD_MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Label used in artifacts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        }
    }
}

impl fmt::Display for FloodRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal score of a melt category.
#[must_use]
pub fn melt_score(category: MeltCategory) -> f64 {
    match category {
        MeltCategory::Low => MELT_SCORE_LOW,
        MeltCategory::Normal => MELT_SCORE_NORMAL,
        MeltCategory::High => MELT_SCORE_HIGH,
        MeltCategory::Extreme => MELT_SCORE_EXTREME,
    }
}

/// Weighted flood-risk index in `[0, 1]` for inputs in `[0, 1]`.
#[must_use]
pub fn flood_risk_index(runoff_norm: f64, melt_score: f64) -> f64 {
    FLOOD_RUNOFF_WEIGHT * runoff_norm + FLOOD_MELT_WEIGHT * melt_score
}

/// Flood risk of one basin-year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodRiskRecord {
    pub basin: String,
    pub year: i32,
    pub melt_category: MeltCategory,
    pub z_score: f64,
    pub flood_risk_index: f64,
    pub flood_risk_level: FloodRiskLevel,
}

/// Score every basin-year; z-scores are min-max scaled within each basin.
///
/// When all z-scores of a basin are equal the scaled runoff is
/// [`DEGENERATE_RUNOFF_NORM`]. Output preserves input order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CoreError::EmptyInput`] | `rows` is empty |
/// | [`CoreError::NonFiniteInput`] | a `z_score` is NaN or infinite |
#[instrument(skip_all, fields(n_rows = rows.len()))]
pub fn score_flood_risk(rows: &[MeltYearClassification]) -> Result<Vec<FloodRiskRecord>, CoreError> {
    if rows.is_empty() {
        return Err(CoreError::EmptyInput { stage: "flood" });
    }

    let mut ranges: HashMap<&str, (f64, f64)> = HashMap::new();
    for r in rows {
        if !r.z_score.is_finite() {
            return Err(CoreError::NonFiniteInput {
                stage: "flood",
                field: "z_score",
                context: format!("basin {} year {}", r.basin, r.year),
            });
        }
        let range = ranges
            .entry(r.basin.as_str())
            .or_insert((f64::INFINITY, f64::NEG_INFINITY));
        range.0 = range.0.min(r.z_score);
        range.1 = range.1.max(r.z_score);
    }
    for (basin, (lo, hi)) in &ranges {
        if lo == hi {
            warn!(basin, "constant z-score series, runoff norm fixed at midpoint");
        }
    }

    let out: Vec<FloodRiskRecord> = rows
        .iter()
        .map(|r| {
            let (lo, hi) = ranges[r.basin.as_str()];
            let runoff_norm = if hi > lo {
                (r.z_score - lo) / (hi - lo)
            } else {
                DEGENERATE_RUNOFF_NORM
            };
            let index = flood_risk_index(runoff_norm, melt_score(r.melt_category));
            FloodRiskRecord {
                basin: r.basin.clone(),
                year: r.year,
                melt_category: r.melt_category,
                z_score: r.z_score,
                flood_risk_index: index,
                flood_risk_level: FloodRiskLevel::from_index(index),
            }
        })
        .collect();

    info!(
        n_high = out.iter().filter(|r| r.flood_risk_level == FloodRiskLevel::High).count(),
        n_moderate = out.iter().filter(|r| r.flood_risk_level == FloodRiskLevel::Moderate).count(),
        "flood risk scored"
    );
    Ok(out)
}
