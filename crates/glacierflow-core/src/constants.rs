//! Fixed scientific constants shared by every stage.
//!
//! None of these are configurable at run time.

/// Square metres per square kilometre.
pub const M2_PER_KM2: f64 = 1e6;

/// Millimetres per metre.
pub const MM_PER_M: f64 = 1000.0;

/// First historical year (inclusive).
pub const HISTORY_START_YEAR: i32 = 2000;

/// Last historical year (inclusive); also the drift baseline year.
pub const HISTORY_END_YEAR: i32 = 2024;

/// First projected year (inclusive).
pub const FORECAST_START_YEAR: i32 = 2025;

/// Last projected year (inclusive).
pub const FORECAST_END_YEAR: i32 = 2040;

/// z-score at or above which a basin-year is "Extreme Melt".
pub const Z_EXTREME: f64 = 2.0;

/// z-score at or above which a basin-year is "High Melt".
pub const Z_HIGH: f64 = 1.0;

/// z-score at or below which a basin-year is "Low Melt".
pub const Z_LOW: f64 = -1.0;

/// Weight of the normalized runoff anomaly in the flood-risk index.
pub const FLOOD_RUNOFF_WEIGHT: f64 = 0.6;

/// Weight of the melt-category score in the flood-risk index.
pub const FLOOD_MELT_WEIGHT: f64 = 0.4;

/// Flood-risk index at or above which the level is "High Risk".
pub const FLOOD_HIGH_THRESHOLD: f64 = 0.75;

/// Flood-risk index at or above which the level is "Moderate Risk".
pub const FLOOD_MODERATE_THRESHOLD: f64 = 0.45;

/// Normalized runoff used when every z-score in a basin series is equal.
pub const DEGENERATE_RUNOFF_NORM: f64 = 0.5;

/// Melt-category scores used by the flood-risk index.
pub const MELT_SCORE_LOW: f64 = 0.2;
pub const MELT_SCORE_NORMAL: f64 = 0.4;
pub const MELT_SCORE_HIGH: f64 = 0.7;
pub const MELT_SCORE_EXTREME: f64 = 1.0;

/// Temperature drift per year after the baseline (°C).
pub const TEMP_DRIFT_PER_YEAR: f64 = 0.04;

/// Relative precipitation drift per year after the baseline.
pub const PREC_DRIFT_PER_YEAR: f64 = 0.002;

/// Relative shortwave radiation drift per year after the baseline.
pub const SRAD_DRIFT_PER_YEAR: f64 = 0.001;

/// Default number of trees in the melt regressor.
pub const DEFAULT_N_TREES: usize = 200;

/// Default master seed for the melt regressor.
pub const DEFAULT_SEED: u64 = 42;

/// Model input columns, in the order the regressor sees them.
pub const FEATURE_NAMES: [&str; 4] = ["area_km2", "temp_mean", "prec_mean", "srad_mean"];

/// Points per partial dependence sweep.
pub const PD_GRID_POINTS: usize = 20;

/// Lower percentile of a partial dependence sweep.
pub const PD_LOWER_QUANTILE: f64 = 0.05;

/// Upper percentile of a partial dependence sweep.
pub const PD_UPPER_QUANTILE: f64 = 0.95;

/// Label for categorical joins that found no match.
pub const UNKNOWN: &str = "Unknown";

// Glacier risk grading.

/// Mean temperature above which a glacier scores [`RISK_POINTS_MAJOR`] (°C).
pub const RISK_TEMP_WARM: f64 = 0.0;

/// Mean temperature above which a glacier scores [`RISK_POINTS_MINOR`] (°C).
pub const RISK_TEMP_MILD: f64 = -1.0;

/// Predicted melt below which a glacier scores [`RISK_POINTS_MAJOR`].
pub const RISK_MELT_SEVERE: f64 = -0.6;

/// Predicted melt below which a glacier scores [`RISK_POINTS_MINOR`].
pub const RISK_MELT_MODERATE: f64 = -0.3;

/// Area below which a glacier counts as small (km²).
pub const RISK_SMALL_AREA_KM2: f64 = 5.0;

pub const RISK_POINTS_MAJOR: u32 = 2;
pub const RISK_POINTS_MINOR: u32 = 1;

/// Score at or above which the grade is "High".
pub const RISK_GRADE_HIGH: u32 = 5;

/// Score at or above which the grade is "Medium".
pub const RISK_GRADE_MEDIUM: u32 = 3;
