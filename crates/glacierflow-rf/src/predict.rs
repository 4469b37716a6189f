//! Prediction methods for the regression forest.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;

impl RandomForest {
    /// Predict the response for a single sample as the mean over all trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut total = 0.0f64;
        for tree in &self.trees {
            total += tree.predict(sample)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    /// Predict a batch of samples in parallel; output order matches input order.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Look up a feature column by name.
    #[must_use]
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RandomForestConfig;

    #[test]
    fn batch_matches_individual() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let targets: Vec<f64> = (0..20).map(|i| -(i as f64) * 0.1).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        let forest = RandomForestConfig::new(8)
            .unwrap()
            .fit(&features, &targets, &names)
            .unwrap()
            .into_forest();

        let batch = forest.predict_batch(&features).unwrap();
        for (sample, &b) in features.iter().zip(&batch) {
            assert_eq!(forest.predict(sample).unwrap(), b);
        }
        assert_eq!(forest.feature_index("b"), Some(1));
        assert_eq!(forest.feature_index("zzz"), None);
    }
}
