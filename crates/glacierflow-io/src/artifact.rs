//! Catalogue of every artifact the pipeline publishes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::IoError;

/// One published output, identified by its file location under the output
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    GlacierMaster,
    MlDataset,
    Hydrology,
    BasinRunoff,
    ExtremeMeltYears,
    FloodRisk,
    RunoffTrend,
    FutureMelt,
    FeatureImportance,
    PartialEffects,
    Explorer,
    ClimateCorrelation,
    ClimateRegression,
    HistoricalMeltSummary,
    FutureMeltSummary,
    FloodRiskSummary,
    MeltModel,
}

impl Artifact {
    /// Every artifact, in production order.
    pub const ALL: [Artifact; 17] = [
        Artifact::GlacierMaster,
        Artifact::MlDataset,
        Artifact::Hydrology,
        Artifact::BasinRunoff,
        Artifact::ExtremeMeltYears,
        Artifact::FloodRisk,
        Artifact::RunoffTrend,
        Artifact::FutureMelt,
        Artifact::MeltModel,
        Artifact::FeatureImportance,
        Artifact::PartialEffects,
        Artifact::ClimateCorrelation,
        Artifact::ClimateRegression,
        Artifact::HistoricalMeltSummary,
        Artifact::FutureMeltSummary,
        Artifact::FloodRiskSummary,
        Artifact::Explorer,
    ];

    /// Location relative to the output directory.
    #[must_use]
    pub fn relative_path(self) -> &'static str {
        match self {
            Self::GlacierMaster => "glacier_master_with_area.csv",
            Self::MlDataset => "glacier_ml_dataset.csv",
            Self::Hydrology => "glacier_hydrology.csv",
            Self::BasinRunoff => "basin_runoff_timeseries.csv",
            Self::ExtremeMeltYears => "extreme_melt_years.csv",
            Self::FloodRisk => "flood_risk_index.csv",
            Self::RunoffTrend => "glacier_runoff_trend.csv",
            Self::FutureMelt => "future_melt_projection.csv",
            Self::FeatureImportance => "feature_importance.csv",
            Self::PartialEffects => "partial_effects.csv",
            Self::Explorer => "glacier_explorer_merged.csv",
            Self::ClimateCorrelation => "spatial_climate_correlation.csv",
            Self::ClimateRegression => "spatial_climate_regression.csv",
            Self::HistoricalMeltSummary => "visuals/historical_melt_summary.csv",
            Self::FutureMeltSummary => "visuals/future_melt_summary.csv",
            Self::FloodRiskSummary => "visuals/flood_risk_summary.csv",
            Self::MeltModel => "melt_model.bin",
        }
    }

    /// Short name used on the command line: the file stem.
    #[must_use]
    pub fn name(self) -> &'static str {
        let file = self.relative_path().rsplit('/').next().unwrap_or_default();
        file.split('.').next().unwrap_or(file)
    }

    /// Absolute location under `output_dir`.
    #[must_use]
    pub fn path_in(self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.relative_path())
    }

    /// Whether the artifact is a CSV table.
    #[must_use]
    pub fn is_tabular(self) -> bool {
        self != Self::MeltModel
    }

    /// Header of a tabular artifact; empty for the model.
    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::GlacierMaster => &["glacier_id", "lat", "lon", "area_km2", "region"],
            Self::MlDataset => &[
                "glacier_id", "year", "area_km2", "temp_mean", "prec_mean", "srad_mean",
                "mass_change",
            ],
            Self::Hydrology => &[
                "glacier_id", "basin", "year", "area_km2", "temp_mean", "prec_mean",
                "srad_mean", "mass_change", "melt_m", "glacier_runoff_m3", "runoff_mm",
            ],
            Self::BasinRunoff => &[
                "basin", "year", "total_glacier_runoff_m3", "mean_runoff_mm", "glacier_count",
                "total_glacier_area_km2", "basin_runoff_mm",
            ],
            Self::ExtremeMeltYears => &[
                "basin", "year", "total_glacier_runoff_m3", "mean_runoff_mm", "glacier_count",
                "total_glacier_area_km2", "basin_runoff_mm", "runoff_anomaly_mm", "z_score",
                "melt_category",
            ],
            Self::FloodRisk | Self::FloodRiskSummary => &[
                "basin", "year", "melt_category", "z_score", "flood_risk_index",
                "flood_risk_level",
            ],
            Self::RunoffTrend => &[
                "basin", "start_year", "end_year", "runoff_trend_mm_per_year", "trend_type",
            ],
            Self::FutureMelt => &[
                "glacier_id", "year", "area_km2", "temp_mean", "prec_mean", "srad_mean",
                "predicted_melt",
            ],
            Self::FeatureImportance => &["feature", "importance"],
            Self::PartialEffects => &["feature", "feature_value", "predicted_melt"],
            Self::Explorer => &[
                "glacier_id", "lat", "lon", "area_km2", "temp_mean", "melt_category",
                "flood_risk_level", "predicted_melt", "risk_level",
            ],
            Self::ClimateCorrelation => &["variable", "pearson_r", "n"],
            Self::ClimateRegression => &["term", "coefficient", "r_squared"],
            Self::HistoricalMeltSummary => &["year", "mass_change"],
            Self::FutureMeltSummary => &["year", "predicted_melt"],
            Self::MeltModel => &[],
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Artifact {
    type Err = IoError;

    /// Accepts the short name, the file name or the relative path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| {
                s == a.name()
                    || s == a.relative_path()
                    || Some(s) == a.relative_path().rsplit('/').next()
            })
            .ok_or_else(|| IoError::UnknownArtifact { name: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_file_stems() {
        let names: std::collections::HashSet<_> = Artifact::ALL.iter().map(|a| a.name()).collect();
        assert_eq!(names.len(), Artifact::ALL.len());
        assert_eq!(Artifact::FloodRisk.name(), "flood_risk_index");
        assert_eq!(Artifact::FutureMeltSummary.name(), "future_melt_summary");
        assert_eq!(Artifact::MeltModel.name(), "melt_model");
    }

    #[test]
    fn parse_accepts_name_file_and_path() {
        assert_eq!("glacier_explorer_merged".parse::<Artifact>().unwrap(), Artifact::Explorer);
        assert_eq!("glacier_explorer_merged.csv".parse::<Artifact>().unwrap(), Artifact::Explorer);
        assert_eq!(
            "visuals/flood_risk_summary.csv".parse::<Artifact>().unwrap(),
            Artifact::FloodRiskSummary
        );
        assert!(matches!(
            "nope".parse::<Artifact>(),
            Err(IoError::UnknownArtifact { .. })
        ));
    }

    #[test]
    fn only_the_model_is_binary() {
        for a in Artifact::ALL {
            assert_eq!(a.is_tabular(), !a.columns().is_empty(), "{a}");
        }
    }
}
