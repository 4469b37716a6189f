//! Partial dependence of the forest's prediction on one feature.

use tracing::{debug, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Quantile of `values` with linear interpolation between order statistics.
///
/// Matches the common "linear" definition: position `q * (n - 1)` in the
/// sorted sample. Returns `None` for an empty slice or `q` outside `[0, 1]`.
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// `n` evenly spaced values from `start` to `end`, both inclusive.
///
/// The last element is exactly `end`. `n == 1` yields `[start]`.
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

/// Grid settings for a partial dependence sweep.
///
/// # Defaults
///
/// | Parameter        | Default |
/// |------------------|---------|
/// | `grid_points`    | 20      |
/// | `lower_quantile` | 0.05    |
/// | `upper_quantile` | 0.95    |
#[derive(Debug, Clone)]
pub struct PartialDependenceConfig {
    grid_points: usize,
    lower_quantile: f64,
    upper_quantile: f64,
}

impl PartialDependenceConfig {
    /// Create a config with the default 20-point 5%..95% grid.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grid_points: 20,
            lower_quantile: 0.05,
            upper_quantile: 0.95,
        }
    }

    /// Set the number of grid points.
    #[must_use]
    pub fn with_grid_points(mut self, grid_points: usize) -> Self {
        self.grid_points = grid_points;
        self
    }

    /// Set the quantile range the grid spans.
    #[must_use]
    pub fn with_quantile_range(mut self, lower: f64, upper: f64) -> Self {
        self.lower_quantile = lower;
        self.upper_quantile = upper;
        self
    }

    /// Return the number of grid points.
    #[must_use]
    pub fn grid_points(&self) -> usize {
        self.grid_points
    }

    fn validate(&self) -> Result<(), RfError> {
        if self.grid_points < 2 {
            return Err(RfError::InvalidGrid {
                reason: format!("need at least 2 grid points, got {}", self.grid_points),
            });
        }
        let in_unit = |q: f64| (0.0..=1.0).contains(&q);
        if !in_unit(self.lower_quantile)
            || !in_unit(self.upper_quantile)
            || self.lower_quantile > self.upper_quantile
        {
            return Err(RfError::InvalidGrid {
                reason: format!(
                    "quantile range [{}, {}] is not an ordered sub-range of [0, 1]",
                    self.lower_quantile, self.upper_quantile
                ),
            });
        }
        Ok(())
    }
}

impl Default for PartialDependenceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Predicted response along a grid of one feature's values.
#[derive(Debug, Clone)]
pub struct PartialDependence {
    /// Name of the swept feature.
    pub feature: String,
    /// Grid values, ascending.
    pub grid: Vec<f64>,
    /// Forest prediction at each grid value.
    pub predictions: Vec<f64>,
}

impl RandomForest {
    /// Sweep one feature across a quantile grid of `features`, holding every
    /// other feature at its column mean.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                      |
    /// |-----------------------------------|-------------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `features` is empty                       |
    /// | [`RfError::FeatureOutOfRange`]    | `feature_index >= n_features`             |
    /// | [`RfError::FeatureCountMismatch`] | a row has the wrong width                 |
    /// | [`RfError::NonFiniteValue`]       | a reference value is NaN or infinite      |
    /// | [`RfError::InvalidGrid`]          | fewer than 2 points or bad quantile range |
    #[instrument(skip(self, features, config), fields(n_rows = features.len()))]
    pub fn partial_dependence(
        &self,
        features: &[Vec<f64>],
        feature_index: usize,
        config: &PartialDependenceConfig,
    ) -> Result<PartialDependence, RfError> {
        config.validate()?;
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if feature_index >= self.n_features {
            return Err(RfError::FeatureOutOfRange {
                feature_index,
                n_features: self.n_features,
            });
        }

        let mut means = vec![0.0f64; self.n_features];
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != self.n_features {
                return Err(RfError::FeatureCountMismatch {
                    expected: self.n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(RfError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        let n = features.len() as f64;
        means.iter_mut().for_each(|m| *m /= n);

        let column: Vec<f64> = features.iter().map(|row| row[feature_index]).collect();
        let invalid_range = || RfError::InvalidGrid {
            reason: "quantile range outside [0, 1]".to_string(),
        };
        let lo = quantile(&column, config.lower_quantile).ok_or_else(invalid_range)?;
        let hi = quantile(&column, config.upper_quantile).ok_or_else(invalid_range)?;
        let grid = linspace(lo, hi, config.grid_points);

        let mut probe = means;
        let predictions = grid
            .iter()
            .map(|&value| {
                probe[feature_index] = value;
                self.predict(&probe)
            })
            .collect::<Result<Vec<f64>, RfError>>()?;

        debug!(feature_index, lo, hi, "partial dependence computed");

        Ok(PartialDependence {
            feature: self.feature_names[feature_index].clone(),
            grid,
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PartialDependenceConfig, linspace, quantile};
    use crate::config::RandomForestConfig;

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(5.0));
        assert_eq!(quantile(&values, 0.5), Some(3.0));
        // 0.05 * 4 = 0.2 -> 1.0 + 0.2 * (2.0 - 1.0)
        assert!((quantile(&values, 0.05).unwrap() - 1.2).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&values, 1.5), None);
    }

    #[test]
    fn linspace_has_exact_endpoints() {
        let grid = linspace(0.1, 0.7, 20);
        assert_eq!(grid.len(), 20);
        assert_eq!(grid[0], 0.1);
        assert_eq!(grid[19], 0.7);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert!(linspace(3.0, 9.0, 0).is_empty());
    }

    #[test]
    fn constant_column_gives_flat_grid() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![2.0, i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let names = vec!["flat".to_string(), "x".to_string()];
        let forest = RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &targets, &names)
            .unwrap()
            .into_forest();
        let pd = forest
            .partial_dependence(&features, 0, &PartialDependenceConfig::new())
            .unwrap();
        assert_eq!(pd.feature, "flat");
        assert_eq!(pd.grid.len(), 20);
        assert!(pd.grid.iter().all(|&g| g == 2.0));
        assert!(pd.predictions.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn monotone_signal_produces_rising_curve() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, 1.0]).collect();
        let targets: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let names = vec!["temp".to_string(), "c".to_string()];
        let forest = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features, &targets, &names)
            .unwrap()
            .into_forest();
        let pd = forest
            .partial_dependence(&features, 0, &PartialDependenceConfig::new())
            .unwrap();
        assert!(pd.predictions[19] > pd.predictions[0]);
    }

    #[test]
    fn out_of_range_feature_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit(&features, &[0.0, 1.0], &["a".to_string()])
            .unwrap()
            .into_forest();
        let err = forest
            .partial_dependence(&features, 3, &PartialDependenceConfig::new())
            .unwrap_err();
        assert!(matches!(err, crate::RfError::FeatureOutOfRange { .. }));
    }

    #[test]
    fn single_point_grid_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit(&features, &[0.0, 1.0], &["a".to_string()])
            .unwrap()
            .into_forest();
        let err = forest
            .partial_dependence(
                &features,
                0,
                &PartialDependenceConfig::new().with_grid_points(1),
            )
            .unwrap_err();
        assert!(matches!(err, crate::RfError::InvalidGrid { .. }));
    }
}
