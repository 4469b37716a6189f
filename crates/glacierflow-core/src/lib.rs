//! Glacier analytics stages as pure transforms over typed records.
//!
//! Inputs are normalized and joined into a glacier-year table
//! ([`build_ml_dataset`]), converted to meltwater runoff
//! ([`link_hydrology`]), aggregated per basin and year
//! ([`aggregate_basins`]), classified against each basin's own history
//! ([`classify_anomalies`]) and scored for flood risk
//! ([`score_flood_risk`]). A regression forest trained on the same table
//! projects melt under a fixed climate drift ([`MeltForecaster`]) and is
//! explained through importances and partial dependence ([`explain`]).
//! Every stage works on fully materialized slices and returns new rows.

pub mod constants;

mod anomaly;
mod basin;
mod dataset;
mod domain;
mod error;
mod explain;
mod flood;
mod forecast;
mod hydrology;
mod keys;
mod merge;
mod sensitivity;
mod stats;
mod summary;
mod trend;

pub use anomaly::{MeltCategory, MeltYearClassification, classify_anomalies};
pub use basin::{BasinYearSummary, aggregate_basins};
pub use dataset::{build_ml_dataset, reconcile_area};
pub use domain::{
    ClimateFeature, GlacierId, GlacierRecord, GlacierYearFeature, InventoryArea,
    MassBalanceObservation, feature_names,
};
pub use error::CoreError;
pub use explain::{Explanation, FeatureImportanceRow, PartialEffectRow, explain};
pub use flood::{FloodRiskLevel, FloodRiskRecord, flood_risk_index, melt_score, score_flood_risk};
pub use forecast::{
    ClimateBaseline, ForecastConfig, FutureProjection, MeltForecaster, climate_baselines,
    training_matrix,
};
pub use hydrology::{BasinAssignment, HydrologyRecord, RunoffConversion, convert, link_hydrology};
pub use keys::{GlacierKey, KeyParseError, normalize_key};
pub use merge::{ExplorerRecord, ExplorerSources, RiskFactors, RiskGrade, merge_explorer, risk_score};
pub use sensitivity::{
    ClimateCorrelationRow, ClimateSensitivity, RegressionTermRow, climate_sensitivity,
};
pub use stats::{LeastSquares, least_squares, linear_fit, mean, pearson, sample_std};
pub use summary::{YearMean, future_melt_summary, historical_melt_summary};
pub use trend::{TrendResult, TrendType, estimate_trends};
