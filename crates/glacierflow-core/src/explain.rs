//! Global importance and one-feature-at-a-time partial dependence.
//!
//! Partial dependence here sweeps a single feature while every other feature
//! sits at its dataset mean. It does not average over the joint distribution
//! and so cannot show interactions between features.

use glacierflow_rf::PartialDependenceConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::constants::{FEATURE_NAMES, PD_GRID_POINTS, PD_LOWER_QUANTILE, PD_UPPER_QUANTILE};
use crate::domain::GlacierYearFeature;
use crate::error::CoreError;
use crate::forecast::{MeltForecaster, training_matrix};

/// One feature's share of the forest's impurity reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceRow {
    pub feature: String,
    pub importance: f64,
}

/// Model prediction at one swept feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialEffectRow {
    pub feature: String,
    pub feature_value: f64,
    pub predicted_melt: f64,
}

/// Both explainability tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    /// Sorted by importance, descending; sums to 1 unless the forest never split.
    pub importances: Vec<FeatureImportanceRow>,
    /// [`PD_GRID_POINTS`] rows per feature, features in model order.
    pub partial_effects: Vec<PartialEffectRow>,
}

/// Explain a trained melt model against the table it was trained on.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CoreError::EmptyInput`] | no historical rows |
/// | [`CoreError::Model`] | the sweep could not be evaluated |
#[instrument(skip_all, fields(n_rows = rows.len()))]
pub fn explain(model: &MeltForecaster, rows: &[GlacierYearFeature]) -> Result<Explanation, CoreError> {
    let (features, _) = training_matrix(rows);
    if features.is_empty() {
        return Err(CoreError::EmptyInput { stage: "explain" });
    }
    let forest = model.forest();

    let importances: Vec<FeatureImportanceRow> = forest
        .feature_importances()
        .into_iter()
        .map(|f| FeatureImportanceRow {
            feature: f.name,
            importance: f.importance,
        })
        .collect();

    let sweep = PartialDependenceConfig::new()
        .with_grid_points(PD_GRID_POINTS)
        .with_quantile_range(PD_LOWER_QUANTILE, PD_UPPER_QUANTILE);

    let mut partial_effects = Vec::with_capacity(FEATURE_NAMES.len() * PD_GRID_POINTS);
    for (feature_index, _) in FEATURE_NAMES.iter().enumerate() {
        let pd = forest.partial_dependence(&features, feature_index, &sweep)?;
        partial_effects.extend(pd.grid.iter().zip(&pd.predictions).map(|(&v, &p)| {
            PartialEffectRow {
                feature: pd.feature.clone(),
                feature_value: v,
                predicted_melt: p,
            }
        }));
    }

    info!(
        top_feature = importances.first().map(|f| f.feature.as_str()),
        n_partial_rows = partial_effects.len(),
        "model explained"
    );
    Ok(Explanation {
        importances,
        partial_effects,
    })
}
