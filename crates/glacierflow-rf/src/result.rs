//! What a call to [`RandomForestConfig::fit`](crate::RandomForestConfig::fit) hands back.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;

/// Shape of the fitted problem.
#[derive(Debug, Clone, Copy)]
pub struct TrainingMetadata {
    pub n_trees: usize,
    pub n_features: usize,
    pub n_samples: usize,
    /// Candidate features drawn at each split after resolving `max_features`.
    pub max_features_resolved: usize,
}

/// Fitted regressor plus the diagnostics computed while fitting it.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    oob_score: Option<OobScore>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        oob_score: Option<OobScore>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            oob_score,
            metadata,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Drop the diagnostics and keep only the model.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Impurity importances, rank 1 first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// OOB error, present only when fitted with [`OobMode::Enabled`](crate::OobMode::Enabled).
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// OOB coefficient of determination, when both computed and defined.
    #[must_use]
    pub fn oob_r_squared(&self) -> Option<f64> {
        self.oob_score.as_ref().and_then(|s| s.r_squared)
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
