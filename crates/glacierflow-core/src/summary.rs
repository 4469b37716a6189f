//! Per-year means behind the dashboard charts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::GlacierYearFeature;
use crate::forecast::FutureProjection;

/// Mean of one quantity across glaciers for a single year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearMean {
    pub year: i32,
    pub value: f64,
}

fn year_means(pairs: impl Iterator<Item = (i32, f64)>) -> Vec<YearMean> {
    let mut acc: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (year, v) in pairs {
        let e = acc.entry(year).or_insert((0.0, 0));
        e.0 += v;
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(year, (sum, n))| YearMean {
            year,
            value: sum / n as f64,
        })
        .collect()
}

/// Mean observed `mass_change` per historical year.
#[must_use]
pub fn historical_melt_summary(rows: &[GlacierYearFeature]) -> Vec<YearMean> {
    year_means(rows.iter().map(|r| (r.year, r.mass_change)))
}

/// Mean `predicted_melt` per projected year.
#[must_use]
pub fn future_melt_summary(rows: &[FutureProjection]) -> Vec<YearMean> {
    year_means(rows.iter().map(|r| (r.year, r.predicted_melt)))
}
