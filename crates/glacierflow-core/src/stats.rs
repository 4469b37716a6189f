//! Small numeric helpers for whole-series statistics.

use nalgebra::{DMatrix, DVector};

/// Arithmetic mean; `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Pearson correlation; `None` when either series has zero variance or
/// the lengths differ or fewer than two points exist.
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Slope and intercept of the least-squares line `y = slope * x + intercept`.
///
/// `None` when `x` has zero spread.
#[must_use]
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Iteration cap for the SVD; real designs converge in far fewer.
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Least-squares fit returned by [`least_squares`].
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    pub coefficients: Vec<f64>,
    /// Number of singular values above the cutoff.
    pub rank: usize,
}

/// Minimum-norm solution of `design * beta ≈ y` via the SVD.
///
/// `design` is row-major. Rank-deficient designs (fewer rows than columns,
/// collinear columns) still get a solution: singular values at or below
/// `max(rows, cols) * f64::EPSILON * s_max` are treated as zero.
///
/// `None` when the shapes disagree, an input is non-finite, or the SVD does
/// not converge.
#[must_use]
pub fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Option<LeastSquares> {
    let n_terms = design.first()?.len();
    if n_terms == 0 || design.len() != y.len() || design.iter().any(|r| r.len() != n_terms) {
        return None;
    }
    if design.iter().flatten().chain(y).any(|v| !v.is_finite()) {
        return None;
    }

    let x = DMatrix::from_row_slice(design.len(), n_terms, &design.concat());
    let b = DVector::from_column_slice(y);
    let svd = x.try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)?;

    let s_max = svd.singular_values.iter().fold(0.0f64, |m, &s| m.max(s));
    let cutoff = s_max * f64::EPSILON * design.len().max(n_terms) as f64;
    let rank = svd.singular_values.iter().filter(|&&s| s > cutoff).count();
    let beta = svd.solve(&b, cutoff).ok()?;

    Some(LeastSquares {
        coefficients: beta.iter().copied().collect(),
        rank,
    })
}
