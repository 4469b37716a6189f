//! Whole-series runoff anomaly classification per basin.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::basin::BasinYearSummary;
use crate::constants::{Z_EXTREME, Z_HIGH, Z_LOW};
use crate::error::CoreError;
use crate::stats::{mean, sample_std};

/// Melt severity of a basin-year relative to its own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeltCategory {
    #[serde(rename = "Extreme Melt")]
    Extreme,
    #[serde(rename = "High Melt")]
    High,
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Low Melt")]
    Low,
}

impl MeltCategory {
    /// Classify a z-score. Thresholds are checked top-down and are inclusive.
    #[must_use]
    pub fn from_z(z: f64) -> Self {
        if z >= Z_EXTREME {
            Self::Extreme
        } else if z >= Z_HIGH {
            Self::High
        } else if z <= Z_LOW {
            Self::Low
        } else {
            Self::Normal
        }
    }

    /// Label used in artifacts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extreme => "Extreme Melt",
            Self::High => "High Melt",
            Self::Normal => "Normal",
            Self::Low => "Low Melt",
        }
    }
}

impl fmt::Display for MeltCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A basin-year summary with its anomaly and melt category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeltYearClassification {
    pub basin: String,
    pub year: i32,
    pub total_glacier_runoff_m3: f64,
    pub mean_runoff_mm: f64,
    pub glacier_count: usize,
    pub total_glacier_area_km2: f64,
    pub basin_runoff_mm: f64,
    pub runoff_anomaly_mm: f64,
    pub z_score: f64,
    pub melt_category: MeltCategory,
}

/// Classify every basin-year against its basin's full series.
///
/// A series with fewer than two years, or with zero or non-finite sample
/// standard deviation, has no defined z-score: every year gets `z = 0` and
/// is "Normal". Rows come back grouped by basin, each basin sorted by
/// z-score descending.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CoreError::EmptyInput`] | `summaries` is empty |
/// | [`CoreError::NonFiniteInput`] | a `basin_runoff_mm` is NaN or infinite |
#[instrument(skip_all, fields(n_rows = summaries.len()))]
pub fn classify_anomalies(
    summaries: &[BasinYearSummary],
) -> Result<Vec<MeltYearClassification>, CoreError> {
    if summaries.is_empty() {
        return Err(CoreError::EmptyInput { stage: "anomaly" });
    }
    if let Some(bad) = summaries.iter().find(|s| !s.basin_runoff_mm.is_finite()) {
        return Err(CoreError::NonFiniteInput {
            stage: "anomaly",
            field: "basin_runoff_mm",
            context: format!("basin {} year {}", bad.basin, bad.year),
        });
    }

    let mut by_basin: BTreeMap<&str, Vec<&BasinYearSummary>> = BTreeMap::new();
    for s in summaries {
        by_basin.entry(s.basin.as_str()).or_default().push(s);
    }

    let mut out = Vec::with_capacity(summaries.len());
    for (basin, rows) in by_basin {
        let values: Vec<f64> = rows.iter().map(|r| r.basin_runoff_mm).collect();
        let series_mean = mean(&values).unwrap_or(0.0);
        let std = sample_std(&values).filter(|s| s.is_finite() && *s > 0.0);
        if std.is_none() {
            warn!(basin, n_years = values.len(), "degenerate runoff series, all years Normal");
        }
        debug!(basin, series_mean, std, "basin runoff statistics");

        let mut classified: Vec<MeltYearClassification> = rows
            .iter()
            .map(|r| {
                let anomaly = r.basin_runoff_mm - series_mean;
                let z = std.map_or(0.0, |s| anomaly / s);
                MeltYearClassification {
                    basin: r.basin.clone(),
                    year: r.year,
                    total_glacier_runoff_m3: r.total_glacier_runoff_m3,
                    mean_runoff_mm: r.mean_runoff_mm,
                    glacier_count: r.glacier_count,
                    total_glacier_area_km2: r.total_glacier_area_km2,
                    basin_runoff_mm: r.basin_runoff_mm,
                    runoff_anomaly_mm: anomaly,
                    z_score: z,
                    melt_category: MeltCategory::from_z(z),
                }
            })
            .collect();
        classified.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));
        out.extend(classified);
    }

    info!(
        n_extreme = out.iter().filter(|r| r.melt_category == MeltCategory::Extreme).count(),
        n_high = out.iter().filter(|r| r.melt_category == MeltCategory::High).count(),
        n_low = out.iter().filter(|r| r.melt_category == MeltCategory::Low).count(),
        "melt anomalies classified"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(basin: &str, year: i32, runoff: f64) -> BasinYearSummary {
        BasinYearSummary {
            basin: basin.to_string(),
            year,
            total_glacier_runoff_m3: runoff * 1e6,
            mean_runoff_mm: runoff,
            glacier_count: 1,
            total_glacier_area_km2: 1.0,
            basin_runoff_mm: runoff,
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(MeltCategory::from_z(2.0), MeltCategory::Extreme);
        assert_eq!(MeltCategory::from_z(1.999), MeltCategory::High);
        assert_eq!(MeltCategory::from_z(1.0), MeltCategory::High);
        assert_eq!(MeltCategory::from_z(0.0), MeltCategory::Normal);
        assert_eq!(MeltCategory::from_z(-0.999), MeltCategory::Normal);
        assert_eq!(MeltCategory::from_z(-1.0), MeltCategory::Low);
    }

    #[test]
    fn z_uses_sample_std_and_sorts_descending() {
        // mean 2, sample std 1
        let rows = vec![summary("A", 2000, 1.0), summary("A", 2001, 3.0), summary("A", 2002, 2.0)];
        let out = classify_anomalies(&rows).unwrap();
        let years: Vec<i32> = out.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2001, 2002, 2000]);
        assert!((out[0].z_score - 1.0).abs() < 1e-12);
        assert_eq!(out[0].melt_category, MeltCategory::High);
        assert_eq!(out[1].melt_category, MeltCategory::Normal);
        assert!((out[2].z_score + 1.0).abs() < 1e-12);
        assert_eq!(out[2].melt_category, MeltCategory::Low);
        assert!((out[2].runoff_anomaly_mm + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_series_is_normal() {
        let rows = vec![summary("A", 2000, 0.4), summary("A", 2001, 0.4)];
        let out = classify_anomalies(&rows).unwrap();
        assert!(out.iter().all(|r| r.z_score == 0.0 && r.melt_category == MeltCategory::Normal));
    }

    #[test]
    fn single_year_series_is_normal() {
        let out = classify_anomalies(&[summary("A", 2000, 0.4)]).unwrap();
        assert_eq!(out[0].z_score, 0.0);
        assert_eq!(out[0].melt_category, MeltCategory::Normal);
    }

    #[test]
    fn basins_use_their_own_statistics() {
        let rows = vec![
            summary("B", 2000, 100.0),
            summary("B", 2001, 102.0),
            summary("A", 2000, 1.0),
            summary("A", 2001, 3.0),
        ];
        let out = classify_anomalies(&rows).unwrap();
        assert_eq!(out[0].basin, "A");
        assert_eq!(out[2].basin, "B");
        assert!((out[0].z_score - out[2].z_score).abs() < 1e-12);
    }

    #[test]
    fn category_labels() {
        assert_eq!(MeltCategory::Extreme.to_string(), "Extreme Melt");
        assert_eq!(MeltCategory::Low.as_str(), "Low Melt");
    }

    #[test]
    fn non_finite_runoff_rejected() {
        let err = classify_anomalies(&[summary("A", 2000, f64::NAN)]).unwrap_err();
        assert!(matches!(err, CoreError::NonFiniteInput { .. }));
    }
}
