//! Stage contract violations for glacierflow-core.

use glacierflow_rf::RfError;

/// Errors raised by the analytics stages.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Returned when a stage receives no rows it can work with.
    #[error("{stage}: input has no usable rows")]
    EmptyInput {
        /// Name of the stage that rejected the input.
        stage: &'static str,
    },

    /// Returned when a numeric input that must be finite is NaN or infinite.
    #[error("{stage}: non-finite {field} for {context}")]
    NonFiniteInput {
        /// Name of the stage.
        stage: &'static str,
        /// Column holding the bad value.
        field: &'static str,
        /// Identifies the offending row (glacier ID, basin/year, ...).
        context: String,
    },

    /// Returned when a basin series has fewer than two distinct years.
    #[error("trend for basin {basin} needs at least 2 distinct years, got {distinct_years}")]
    DegenerateTrend {
        /// Basin label.
        basin: String,
        /// Number of distinct years available.
        distinct_years: usize,
    },

    /// Returned when the climate regression has non-finite inputs or its SVD does not converge.
    #[error("climate regression failed: {n_glaciers} glaciers for {n_terms} terms")]
    RegressionFailed {
        /// Number of glacier-level rows.
        n_glaciers: usize,
        /// Number of regression terms including the intercept.
        n_terms: usize,
    },

    /// Returned when the forecast horizon is empty or starts before the baseline.
    #[error("invalid forecast horizon {start}..={end} for baseline year {baseline}")]
    InvalidHorizon {
        /// First projected year.
        start: i32,
        /// Last projected year.
        end: i32,
        /// Drift baseline year.
        baseline: i32,
    },

    /// Returned when a model does not expose a required feature.
    #[error("model is missing feature {feature}")]
    MissingFeature {
        /// Feature name that was looked up.
        feature: String,
    },

    /// Wraps failures from the regression forest.
    #[error("melt model failure")]
    Model(#[from] RfError),
}
