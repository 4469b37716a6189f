//! Melt regressor training and scenario projection.

use std::collections::BTreeMap;

use glacierflow_rf::{OobScore, RandomForest, RandomForestConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::constants::{
    FEATURE_NAMES, FORECAST_END_YEAR, FORECAST_START_YEAR, HISTORY_END_YEAR, HISTORY_START_YEAR,
    PREC_DRIFT_PER_YEAR, SRAD_DRIFT_PER_YEAR, TEMP_DRIFT_PER_YEAR,
};
use crate::domain::{GlacierId, GlacierYearFeature, feature_names};
use crate::error::CoreError;

/// Settings for training the melt regressor and projecting it forward.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `horizon_start` | 2025    |
/// | `horizon_end`   | 2040    |
/// | `baseline_year` | 2024    |
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    forest: RandomForestConfig,
    horizon_start: i32,
    horizon_end: i32,
    baseline_year: i32,
}

impl ForecastConfig {
    /// Wrap a forest configuration with the default horizon.
    #[must_use]
    pub fn new(forest: RandomForestConfig) -> Self {
        Self {
            forest,
            horizon_start: FORECAST_START_YEAR,
            horizon_end: FORECAST_END_YEAR,
            baseline_year: HISTORY_END_YEAR,
        }
    }

    /// Set the inclusive projection horizon.
    #[must_use]
    pub fn with_horizon(mut self, start: i32, end: i32) -> Self {
        self.horizon_start = start;
        self.horizon_end = end;
        self
    }

    /// Set the year from which climate drift is counted.
    #[must_use]
    pub fn with_baseline_year(mut self, baseline_year: i32) -> Self {
        self.baseline_year = baseline_year;
        self
    }

    /// Return the forest configuration.
    #[must_use]
    pub fn forest(&self) -> &RandomForestConfig {
        &self.forest
    }

    /// Return the inclusive projection horizon.
    #[must_use]
    pub fn horizon(&self) -> (i32, i32) {
        (self.horizon_start, self.horizon_end)
    }

    /// Return the drift baseline year.
    #[must_use]
    pub fn baseline_year(&self) -> i32 {
        self.baseline_year
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.horizon_start > self.horizon_end || self.horizon_start <= self.baseline_year {
            return Err(CoreError::InvalidHorizon {
                start: self.horizon_start,
                end: self.horizon_end,
                baseline: self.baseline_year,
            });
        }
        Ok(())
    }
}

/// Projected melt for one glacier in one future year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureProjection {
    pub glacier_id: GlacierId,
    pub year: i32,
    pub area_km2: f64,
    pub temp_mean: f64,
    pub prec_mean: f64,
    pub srad_mean: f64,
    pub predicted_melt: f64,
}

/// Per-glacier climate baseline: first area and mean climate over history.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateBaseline {
    pub glacier_id: GlacierId,
    pub area_km2: f64,
    pub temp_mean: f64,
    pub prec_mean: f64,
    pub srad_mean: f64,
}

impl ClimateBaseline {
    /// Apply the linear drift for `years_ahead` years past the baseline.
    #[must_use]
    pub fn drifted(&self, years_ahead: i32) -> [f64; 4] {
        let dy = f64::from(years_ahead);
        [
            self.area_km2,
            self.temp_mean + TEMP_DRIFT_PER_YEAR * dy,
            self.prec_mean * (1.0 + PREC_DRIFT_PER_YEAR * dy),
            self.srad_mean * (1.0 + SRAD_DRIFT_PER_YEAR * dy),
        ]
    }
}

/// Build one baseline per glacier, in glacier-ID order.
#[must_use]
pub fn climate_baselines(rows: &[GlacierYearFeature]) -> Vec<ClimateBaseline> {
    struct Acc {
        area: f64,
        sums: [f64; 3],
        n: usize,
    }
    let mut acc: BTreeMap<&GlacierId, Acc> = BTreeMap::new();
    for r in rows {
        let a = acc.entry(&r.glacier_id).or_insert(Acc {
            area: r.area_km2,
            sums: [0.0; 3],
            n: 0,
        });
        a.sums[0] += r.temp_mean;
        a.sums[1] += r.prec_mean;
        a.sums[2] += r.srad_mean;
        a.n += 1;
    }
    acc.into_iter()
        .map(|(id, a)| {
            let n = a.n as f64;
            ClimateBaseline {
                glacier_id: id.clone(),
                area_km2: a.area,
                temp_mean: a.sums[0] / n,
                prec_mean: a.sums[1] / n,
                srad_mean: a.sums[2] / n,
            }
        })
        .collect()
}

/// Historical rows as a row-major training matrix with mass-change targets.
#[must_use]
pub fn training_matrix(rows: &[GlacierYearFeature]) -> (Vec<Vec<f64>>, Vec<f64>) {
    rows.iter()
        .filter(|r| (HISTORY_START_YEAR..=HISTORY_END_YEAR).contains(&r.year))
        .map(|r| (r.feature_vector(), r.mass_change))
        .unzip()
}

/// A trained melt regressor over [`FEATURE_NAMES`].
#[derive(Debug, Clone)]
pub struct MeltForecaster {
    forest: RandomForest,
    oob: Option<OobScore>,
}

impl MeltForecaster {
    /// Fit the regressor on every historical glacier-year, pooled.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CoreError::EmptyInput`] | no historical rows |
    /// | [`CoreError::InvalidHorizon`] | horizon empty or not after the baseline |
    /// | [`CoreError::Model`] | forest training failed |
    #[instrument(skip_all, fields(n_rows = rows.len(), n_trees = config.forest().n_trees()))]
    pub fn train(rows: &[GlacierYearFeature], config: &ForecastConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let (features, targets) = training_matrix(rows);
        if features.is_empty() {
            return Err(CoreError::EmptyInput { stage: "forecast" });
        }
        let result = config.forest().fit(&features, &targets, &feature_names())?;
        let oob = result.oob_score().cloned();
        info!(
            n_samples = features.len(),
            oob_r_squared = result.oob_r_squared(),
            "melt model trained"
        );
        Ok(Self {
            forest: result.into_forest(),
            oob,
        })
    }

    /// Wrap a previously saved forest, checking its feature layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFeature`] when the forest was not trained on
    /// [`FEATURE_NAMES`] in order.
    pub fn from_forest(forest: RandomForest) -> Result<Self, CoreError> {
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            if forest.feature_index(name) != Some(i) {
                return Err(CoreError::MissingFeature {
                    feature: (*name).to_string(),
                });
            }
        }
        Ok(Self { forest, oob: None })
    }

    /// Borrow the underlying forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// OOB diagnostics, if computed during training.
    #[must_use]
    pub fn oob(&self) -> Option<&OobScore> {
        self.oob.as_ref()
    }

    /// Predict melt for every glacier baseline and every horizon year.
    ///
    /// Rows are ordered by year, then glacier ID.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CoreError::EmptyInput`] | `rows` is empty |
    /// | [`CoreError::InvalidHorizon`] | horizon empty or not after the baseline |
    /// | [`CoreError::Model`] | prediction failed |
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub fn project(
        &self,
        rows: &[GlacierYearFeature],
        config: &ForecastConfig,
    ) -> Result<Vec<FutureProjection>, CoreError> {
        config.validate()?;
        let baselines = climate_baselines(rows);
        if baselines.is_empty() {
            return Err(CoreError::EmptyInput { stage: "forecast" });
        }
        let (start, end) = config.horizon();

        let mut scenario: Vec<(i32, &ClimateBaseline, [f64; 4])> = Vec::new();
        for year in start..=end {
            for b in &baselines {
                scenario.push((year, b, b.drifted(year - config.baseline_year())));
            }
        }
        let inputs: Vec<Vec<f64>> = scenario.iter().map(|(_, _, x)| x.to_vec()).collect();
        let predictions = self.forest.predict_batch(&inputs)?;

        let out: Vec<FutureProjection> = scenario
            .into_iter()
            .zip(predictions)
            .map(|((year, b, x), predicted_melt)| FutureProjection {
                glacier_id: b.glacier_id.clone(),
                year,
                area_km2: x[0],
                temp_mean: x[1],
                prec_mean: x[2],
                srad_mean: x[3],
                predicted_melt,
            })
            .collect();

        info!(
            n_glaciers = baselines.len(),
            n_years = end - start + 1,
            n_rows = out.len(),
            "melt projection complete"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, year: i32, temp: f64, mass_change: f64) -> GlacierYearFeature {
        GlacierYearFeature {
            glacier_id: GlacierId::new(id),
            year,
            area_km2: 3.0,
            temp_mean: temp,
            prec_mean: 1000.0,
            srad_mean: 150.0,
            mass_change,
        }
    }

    fn history() -> Vec<GlacierYearFeature> {
        let mut rows = Vec::new();
        for (i, id) in ["g1", "g2", "g3"].iter().enumerate() {
            for year in 2000..2010 {
                let temp = -6.0 + i as f64 * 2.0 + (year - 2000) as f64 * 0.1;
                rows.push(row(id, year, temp, -0.05 * (temp + 8.0)));
            }
        }
        rows
    }

    fn config(n_trees: usize) -> ForecastConfig {
        ForecastConfig::new(RandomForestConfig::new(n_trees).unwrap().with_seed(42))
    }

    #[test]
    fn baseline_averages_climate_and_keeps_first_area() {
        let mut rows = vec![row("g", 2000, -2.0, 0.0), row("g", 2001, -4.0, 0.0)];
        rows[1].area_km2 = 9.0;
        rows[1].prec_mean = 2000.0;
        let b = &climate_baselines(&rows)[0];
        assert_eq!(b.area_km2, 3.0);
        assert_eq!(b.temp_mean, -3.0);
        assert_eq!(b.prec_mean, 1500.0);
    }

    #[test]
    fn drift_is_linear_in_years_ahead() {
        let b = ClimateBaseline {
            glacier_id: GlacierId::new("g"),
            area_km2: 2.0,
            temp_mean: -5.0,
            prec_mean: 1000.0,
            srad_mean: 200.0,
        };
        let x = b.drifted(16);
        assert_eq!(x[0], 2.0);
        assert!((x[1] - (-5.0 + 0.64)).abs() < 1e-12);
        assert!((x[2] - 1032.0).abs() < 1e-9);
        assert!((x[3] - 203.2).abs() < 1e-9);
        assert_eq!(b.drifted(0), [2.0, -5.0, 1000.0, 200.0]);
    }

    #[test]
    fn projection_covers_every_glacier_and_year() {
        let rows = history();
        let cfg = config(20);
        let model = MeltForecaster::train(&rows, &cfg).unwrap();
        let out = model.project(&rows, &cfg).unwrap();
        assert_eq!(out.len(), 3 * 16);
        assert_eq!(out[0].year, 2025);
        assert_eq!(out.last().unwrap().year, 2040);
        assert!(out.iter().all(|p| p.predicted_melt.is_finite()));
        assert!(out.iter().all(|p| p.area_km2 == 3.0));
    }

    #[test]
    fn projection_is_reproducible() {
        let rows = history();
        let cfg = config(15);
        let a = MeltForecaster::train(&rows, &cfg).unwrap().project(&rows, &cfg).unwrap();
        let b = MeltForecaster::train(&rows, &cfg).unwrap().project(&rows, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_horizon_rejected() {
        let rows = history();
        let cfg = config(5).with_horizon(2030, 2026);
        let err = MeltForecaster::train(&rows, &cfg).unwrap_err();
        assert!(matches!(err, CoreError::InvalidHorizon { .. }));
    }

    #[test]
    fn foreign_forest_rejected() {
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit(&[vec![1.0], vec![2.0]], &[0.0, 1.0], &["x".to_string()])
            .unwrap()
            .into_forest();
        let err = MeltForecaster::from_forest(forest).unwrap_err();
        assert!(matches!(err, CoreError::MissingFeature { .. }));
    }
}
