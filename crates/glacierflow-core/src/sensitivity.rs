//! Cross-glacier climate sensitivity of mean melt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::{GlacierId, GlacierYearFeature};
use crate::error::CoreError;
use crate::stats::{least_squares, mean, pearson};

/// Correlation between one climate driver and per-glacier mean melt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateCorrelationRow {
    pub variable: String,
    /// `None` when either series has zero variance.
    pub pearson_r: Option<f64>,
    pub n: usize,
}

/// One coefficient of the multiple regression, with the model's R².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTermRow {
    pub term: String,
    pub coefficient: f64,
    /// `None` when mean melt is identical for every glacier.
    pub r_squared: Option<f64>,
}

/// Output of [`climate_sensitivity`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateSensitivity {
    pub correlations: Vec<ClimateCorrelationRow>,
    pub regression: Vec<RegressionTermRow>,
}

/// Drivers in report order.
const DRIVERS: [&str; 4] = ["temp_mean", "prec_mean", "srad_mean", "area_km2"];

/// Glacier-level row: drivers in [`DRIVERS`] order and mean melt.
struct GlacierAggregate {
    drivers: [f64; 4],
    mean_melt: f64,
}

/// Collapse the glacier-year table to one row per glacier.
///
/// Drivers take the first row seen for the glacier; they are constant per
/// glacier in the ML dataset.
fn aggregate(rows: &[GlacierYearFeature]) -> Vec<GlacierAggregate> {
    let mut by_glacier: BTreeMap<&GlacierId, ([f64; 4], Vec<f64>)> = BTreeMap::new();
    for r in rows {
        by_glacier
            .entry(&r.glacier_id)
            .or_insert_with(|| ([r.temp_mean, r.prec_mean, r.srad_mean, r.area_km2], Vec::new()))
            .1
            .push(r.mass_change);
    }
    by_glacier
        .into_values()
        .filter_map(|(drivers, melt)| {
            mean(&melt).map(|mean_melt| GlacierAggregate { drivers, mean_melt })
        })
        .collect()
}

/// Correlate and regress per-glacier mean melt against climate and area.
///
/// The regression is `mean_melt ~ 1 + temp + prec + srad + area`. With
/// fewer glaciers than terms, or collinear drivers, the coefficients are the
/// minimum-norm least-squares solution.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CoreError::EmptyInput`] | no rows |
/// | [`CoreError::RegressionFailed`] | non-finite drivers or the solver did not converge |
#[instrument(skip_all, fields(n_rows = rows.len()))]
pub fn climate_sensitivity(rows: &[GlacierYearFeature]) -> Result<ClimateSensitivity, CoreError> {
    let glaciers = aggregate(rows);
    if glaciers.is_empty() {
        return Err(CoreError::EmptyInput { stage: "sensitivity" });
    }
    let melt: Vec<f64> = glaciers.iter().map(|g| g.mean_melt).collect();

    let correlations: Vec<ClimateCorrelationRow> = DRIVERS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let x: Vec<f64> = glaciers.iter().map(|g| g.drivers[i]).collect();
            ClimateCorrelationRow {
                variable: (*name).to_string(),
                pearson_r: pearson(&x, &melt),
                n: x.len(),
            }
        })
        .collect();

    let design: Vec<Vec<f64>> = glaciers
        .iter()
        .map(|g| std::iter::once(1.0).chain(g.drivers).collect())
        .collect();
    let n_terms = DRIVERS.len() + 1;
    let fit = least_squares(&design, &melt).ok_or(CoreError::RegressionFailed {
        n_glaciers: glaciers.len(),
        n_terms,
    })?;
    if fit.rank < n_terms {
        warn!(
            rank = fit.rank,
            n_terms,
            n_glaciers = glaciers.len(),
            "rank-deficient climate regression, reporting minimum-norm coefficients"
        );
    }
    let beta = fit.coefficients;

    let ss_res: f64 = design
        .iter()
        .zip(&melt)
        .map(|(row, y)| {
            let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            (y - fitted).powi(2)
        })
        .sum();
    let melt_mean = mean(&melt).unwrap_or(0.0);
    let ss_tot: f64 = melt.iter().map(|y| (y - melt_mean).powi(2)).sum();
    let r_squared = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);
    debug!(ss_res, ss_tot, "regression residuals");

    let regression = std::iter::once("intercept")
        .chain(DRIVERS)
        .zip(beta)
        .map(|(term, coefficient)| RegressionTermRow {
            term: term.to_string(),
            coefficient,
            r_squared,
        })
        .collect();

    info!(n_glaciers = glaciers.len(), r_squared, "climate sensitivity estimated");
    Ok(ClimateSensitivity {
        correlations,
        regression,
    })
}
