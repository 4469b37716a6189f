use rand::Rng;

use crate::node::{FeatureIndex, Variance};

/// Mean and variance of the targets selected by `indices`.
///
/// Two-pass so that a node whose targets are all identical reports an
/// exact zero variance. Returns `(0.0, 0)` variance for an empty selection.
pub(crate) fn node_stats(targets: &[f64], indices: &[usize]) -> (f64, Variance) {
    if indices.is_empty() {
        return (0.0, Variance::new(0.0));
    }
    let n = indices.len() as f64;
    let mean = indices.iter().map(|&i| targets[i]).sum::<f64>() / n;
    let variance = indices
        .iter()
        .map(|&i| {
            let d = targets[i] - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, Variance::new(variance))
}

/// Summed squared error from running sums, clamped at zero against
/// cancellation error.
fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Parent SSE minus the children's SSE (MDI contribution).
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best variance-reducing split among a random subset of features.
///
/// Features are drawn without replacement until `max_features` of them vary
/// over the node; features that are constant over the node do not count
/// towards that budget, so drawing continues past them. Each scanned feature
/// sorts the samples by value and walks left-to-right keeping running target
/// sums, so each candidate boundary is scored in O(1). The candidate with the
/// largest decrease in summed squared error wins; ties keep the first seen.
///
/// Returns `None` when no valid split exists (every feature is constant over
/// the node, or every boundary violates `min_samples_leaf`).
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    sample_indices: &[usize],
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let total_sum: f64 = sample_indices.iter().map(|&si| targets[si]).sum();
    let total_sq: f64 = sample_indices.iter().map(|&si| targets[si] * targets[si]).sum();
    let parent_sse = sse(total_sum, total_sq, n_samples);

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    // Lazy Fisher-Yates: position `pos` is drawn only when it is visited.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let mut n_varying = 0usize;
    for pos in 0..n_features {
        if n_varying >= max_features {
            break;
        }
        let j = rng.gen_range(pos..n_features);
        feature_order.swap(pos, j);
        let feat_idx = feature_order[pos];
        let feat_col = &features[feat_idx];

        let first = feat_col[sample_indices[0]];
        if sample_indices.iter().all(|&si| feat_col[si] == first) {
            continue;
        }
        n_varying += 1;

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let y = targets[si];
            left_sum += y;
            left_sq += y * y;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let decrease = parent_sse
                - sse(left_sum, left_sq, n_left)
                - sse(total_sum - left_sum, total_sq - left_sq, n_right);

            if decrease > best_decrease {
                best_decrease = decrease;
                let mut threshold = (val_i + val_next) / 2.0;
                // Adjacent floats can round the midpoint up onto val_next.
                if threshold >= val_next {
                    threshold = val_i;
                }
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}
