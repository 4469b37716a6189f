//! Out-of-bag (OOB) evaluation for the regression forest.

use crate::error::RfError;
use crate::tree::RegressionTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// Mean squared error of OOB predictions.
    pub mse: f64,
    /// Coefficient of determination; `None` when the evaluated targets are constant.
    pub r_squared: Option<f64>,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Compute OOB predictions and regression metrics.
///
/// Each sample is predicted by the mean of the trees whose bootstrap did not
/// contain it. Samples that were in every bootstrap are skipped.
pub(crate) fn compute_oob(
    trees: &[RegressionTree],
    features: &[Vec<f64>],
    targets: &[f64],
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, RfError> {
    let n_samples = features.len();

    let mut sums = vec![0.0f64; n_samples];
    let mut counts = vec![0usize; n_samples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &sample_idx in oob_indices {
            sums[sample_idx] += tree.predict(&features[sample_idx])?;
            counts[sample_idx] += 1;
        }
    }

    let evaluated: Vec<(f64, f64)> = (0..n_samples)
        .filter(|&i| counts[i] > 0)
        .map(|i| (sums[i] / counts[i] as f64, targets[i]))
        .collect();

    let n_oob_samples = evaluated.len();
    if n_oob_samples == 0 {
        return Err(RfError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    let n = n_oob_samples as f64;
    let sse: f64 = evaluated.iter().map(|(p, t)| (p - t).powi(2)).sum();
    let mean_target = evaluated.iter().map(|(_, t)| t).sum::<f64>() / n;
    let sst: f64 = evaluated.iter().map(|(_, t)| (t - mean_target).powi(2)).sum();

    Ok(OobScore {
        mse: sse / n,
        r_squared: (sst > 0.0).then(|| 1.0 - sse / sst),
        n_oob_samples,
    })
}
