//! Linear runoff trend per basin.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::basin::BasinYearSummary;
use crate::error::CoreError;
use crate::stats::linear_fit;

/// Direction of a runoff trend. A flat trend counts as decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendType {
    Increasing,
    Decreasing,
}

impl TrendType {
    #[must_use]
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Self::Increasing
        } else {
            Self::Decreasing
        }
    }
}

impl fmt::Display for TrendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increasing => "Increasing",
            Self::Decreasing => "Decreasing",
        })
    }
}

/// Least-squares runoff trend over a basin's whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub basin: String,
    pub start_year: i32,
    pub end_year: i32,
    pub runoff_trend_mm_per_year: f64,
    pub trend_type: TrendType,
}

/// Fit `basin_runoff_mm ~ year` for each basin, one row per basin.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CoreError::EmptyInput`] | `summaries` is empty |
/// | [`CoreError::DegenerateTrend`] | a basin has fewer than two distinct years |
#[instrument(skip_all, fields(n_rows = summaries.len()))]
pub fn estimate_trends(summaries: &[BasinYearSummary]) -> Result<Vec<TrendResult>, CoreError> {
    if summaries.is_empty() {
        return Err(CoreError::EmptyInput { stage: "trend" });
    }

    let mut by_basin: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for s in summaries {
        let (years, runoff) = by_basin.entry(s.basin.as_str()).or_default();
        years.push(f64::from(s.year));
        runoff.push(s.basin_runoff_mm);
    }

    let mut out = Vec::with_capacity(by_basin.len());
    for (basin, (years, runoff)) in by_basin {
        let distinct: BTreeSet<i64> = years.iter().map(|&y| y as i64).collect();
        let (Some(&first), Some(&last)) = (distinct.first(), distinct.last()) else {
            continue;
        };
        let fit = (distinct.len() >= 2)
            .then(|| linear_fit(&years, &runoff))
            .flatten();
        let Some((slope, _intercept)) = fit else {
            return Err(CoreError::DegenerateTrend {
                basin: basin.to_string(),
                distinct_years: distinct.len(),
            });
        };
        info!(basin, slope, "runoff trend fitted");
        out.push(TrendResult {
            basin: basin.to_string(),
            start_year: first as i32,
            end_year: last as i32,
            runoff_trend_mm_per_year: slope,
            trend_type: TrendType::from_slope(slope),
        });
    }
    Ok(out)
}
