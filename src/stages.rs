//! Stage execution against the artifact store.
//!
//! Every stage reads its declared inputs from the output directory (or the
//! input directory for ingestion) and publishes only its own artifacts, so a
//! full run is just each stage in dependency order.

use anyhow::{Context, Result};
use clap::ValueEnum;
use glacierflow_core::{
    BasinAssignment, BasinYearSummary, ExplorerSources, FloodRiskRecord, ForecastConfig,
    FutureProjection, GlacierRecord, GlacierYearFeature, HydrologyRecord, MeltForecaster,
    MeltYearClassification, aggregate_basins, build_ml_dataset, classify_anomalies,
    climate_sensitivity, estimate_trends, explain, future_melt_summary, historical_melt_summary,
    link_hydrology, merge_explorer, reconcile_area, score_flood_risk,
};
use glacierflow_io::{
    Artifact, ArtifactReader, ArtifactWriter, InputLayout, InputReader, read_mass_balance_dir,
};
use serde::Serialize;
use tracing::{info, instrument};

/// Pipeline stages in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageName {
    /// Area reconciliation and the glacier-year ML dataset
    Dataset,
    /// Per-glacier runoff conversion
    Hydrology,
    /// Basin-year runoff aggregation
    Basin,
    /// Extreme melt year classification
    Anomaly,
    /// Flood-risk index
    Flood,
    /// Basin runoff trend
    Trend,
    /// Melt model training and 2025-2040 projection
    Forecast,
    /// Feature importance and partial effects
    Explain,
    /// Cross-glacier climate sensitivity
    Sensitivity,
    /// Dashboard summaries
    Summaries,
    /// Per-glacier explorer table with risk grade
    Explorer,
}

impl StageName {
    pub const ALL: [StageName; 11] = [
        StageName::Dataset,
        StageName::Hydrology,
        StageName::Basin,
        StageName::Anomaly,
        StageName::Flood,
        StageName::Trend,
        StageName::Forecast,
        StageName::Explain,
        StageName::Sensitivity,
        StageName::Summaries,
        StageName::Explorer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Hydrology => "hydrology",
            Self::Basin => "basin",
            Self::Anomaly => "anomaly",
            Self::Flood => "flood",
            Self::Trend => "trend",
            Self::Forecast => "forecast",
            Self::Explain => "explain",
            Self::Sensitivity => "sensitivity",
            Self::Summaries => "summaries",
            Self::Explorer => "explorer",
        }
    }
}

/// What a stage published, for the stdout run summary.
#[derive(Debug, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub artifacts: Vec<&'static str>,
    pub n_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oob_r_squared: Option<f64>,
}

impl StageReport {
    fn new(stage: StageName, artifacts: &[Artifact], n_rows: usize) -> Self {
        Self {
            stage: stage.as_str(),
            artifacts: artifacts.iter().map(|a| a.name()).collect(),
            n_rows,
            oob_r_squared: None,
        }
    }
}

/// Everything a stage needs besides its input artifacts.
pub struct StageContext {
    pub inputs: InputLayout,
    pub reader: ArtifactReader,
    pub writer: ArtifactWriter,
    pub forecast: ForecastConfig,
    /// Single basin label for every glacier; `None` groups by region.
    pub basin: Option<String>,
}

impl StageContext {
    fn basins(&self, glaciers: &[GlacierRecord]) -> BasinAssignment {
        match &self.basin {
            Some(label) => BasinAssignment::Constant(label.clone()),
            None => BasinAssignment::from_regions(glaciers),
        }
    }

    fn glaciers(&self) -> Result<Vec<GlacierRecord>> {
        Ok(self.reader.table(Artifact::GlacierMaster)?)
    }

    fn ml_dataset(&self) -> Result<Vec<GlacierYearFeature>> {
        Ok(self.reader.table(Artifact::MlDataset)?)
    }

    fn basin_runoff(&self) -> Result<Vec<BasinYearSummary>> {
        Ok(self.reader.table(Artifact::BasinRunoff)?)
    }

    fn melt_years(&self) -> Result<Vec<MeltYearClassification>> {
        Ok(self.reader.table(Artifact::ExtremeMeltYears)?)
    }

    fn flood_risk(&self) -> Result<Vec<FloodRiskRecord>> {
        Ok(self.reader.table(Artifact::FloodRisk)?)
    }

    fn projections(&self) -> Result<Vec<FutureProjection>> {
        Ok(self.reader.table(Artifact::FutureMelt)?)
    }
}

/// Execute one stage.
#[instrument(skip_all, fields(stage = stage.as_str()))]
pub fn run_stage(stage: StageName, ctx: &StageContext) -> Result<StageReport> {
    let report = match stage {
        StageName::Dataset => {
            let inputs = &ctx.inputs;
            let mut glaciers = InputReader::new(&inputs.glacier_master())
                .glaciers()
                .context("failed to read glacier master")?;
            let climate = InputReader::new(&inputs.climate_features())
                .climate()
                .context("failed to read climate features")?;
            let observations = read_mass_balance_dir(&inputs.mass_balance_dir())
                .context("failed to read mass-balance surveys")?;
            if let Some(path) = inputs.glacier_attributes() {
                let inventory = InputReader::new(&path)
                    .inventory_areas()
                    .context("failed to read glacier attributes")?;
                glaciers = reconcile_area(&glaciers, &inventory);
            } else {
                info!("no inventory attribute table, keeping master areas");
            }
            let rows = build_ml_dataset(&glaciers, &climate, &observations)
                .context("failed to build ML dataset")?;
            ctx.writer.write_table(Artifact::GlacierMaster, &glaciers)?;
            ctx.writer.write_table(Artifact::MlDataset, &rows)?;
            StageReport::new(stage, &[Artifact::GlacierMaster, Artifact::MlDataset], rows.len())
        }
        StageName::Hydrology => {
            let basins = ctx.basins(&ctx.glaciers()?);
            let records = link_hydrology(&ctx.ml_dataset()?, &basins);
            ctx.writer.write_table(Artifact::Hydrology, &records)?;
            StageReport::new(stage, &[Artifact::Hydrology], records.len())
        }
        StageName::Basin => {
            let records: Vec<HydrologyRecord> = ctx.reader.table(Artifact::Hydrology)?;
            let summaries = aggregate_basins(&records);
            ctx.writer.write_table(Artifact::BasinRunoff, &summaries)?;
            StageReport::new(stage, &[Artifact::BasinRunoff], summaries.len())
        }
        StageName::Anomaly => {
            let melt = classify_anomalies(&ctx.basin_runoff()?)
                .context("failed to classify melt years")?;
            ctx.writer.write_table(Artifact::ExtremeMeltYears, &melt)?;
            StageReport::new(stage, &[Artifact::ExtremeMeltYears], melt.len())
        }
        StageName::Flood => {
            let flood = score_flood_risk(&ctx.melt_years()?).context("failed to score flood risk")?;
            ctx.writer.write_table(Artifact::FloodRisk, &flood)?;
            StageReport::new(stage, &[Artifact::FloodRisk], flood.len())
        }
        StageName::Trend => {
            let trends = estimate_trends(&ctx.basin_runoff()?).context("failed to estimate trends")?;
            ctx.writer.write_table(Artifact::RunoffTrend, &trends)?;
            StageReport::new(stage, &[Artifact::RunoffTrend], trends.len())
        }
        StageName::Forecast => {
            let rows = ctx.ml_dataset()?;
            let model = MeltForecaster::train(&rows, &ctx.forecast)
                .context("melt model training failed")?;
            let projections = model
                .project(&rows, &ctx.forecast)
                .context("melt projection failed")?;
            ctx.writer.write_model(model.forest())?;
            ctx.writer.write_table(Artifact::FutureMelt, &projections)?;
            let mut report = StageReport::new(
                stage,
                &[Artifact::MeltModel, Artifact::FutureMelt],
                projections.len(),
            );
            report.oob_r_squared = model.oob().and_then(|s| s.r_squared);
            report
        }
        StageName::Explain => {
            let rows = ctx.ml_dataset()?;
            let forest = ctx.reader.model().context("failed to load melt model")?;
            let model = MeltForecaster::from_forest(forest)?;
            let explanation = explain(&model, &rows).context("failed to explain melt model")?;
            ctx.writer
                .write_table(Artifact::FeatureImportance, &explanation.importances)?;
            ctx.writer
                .write_table(Artifact::PartialEffects, &explanation.partial_effects)?;
            StageReport::new(
                stage,
                &[Artifact::FeatureImportance, Artifact::PartialEffects],
                explanation.partial_effects.len(),
            )
        }
        StageName::Sensitivity => {
            let sensitivity = climate_sensitivity(&ctx.ml_dataset()?)
                .context("failed to estimate climate sensitivity")?;
            ctx.writer
                .write_table(Artifact::ClimateCorrelation, &sensitivity.correlations)?;
            ctx.writer
                .write_table(Artifact::ClimateRegression, &sensitivity.regression)?;
            StageReport::new(
                stage,
                &[Artifact::ClimateCorrelation, Artifact::ClimateRegression],
                sensitivity.regression.len(),
            )
        }
        StageName::Summaries => {
            let historical = historical_melt_summary(&ctx.ml_dataset()?);
            let future = future_melt_summary(&ctx.projections()?);
            let flood = ctx.flood_risk()?;
            ctx.writer
                .write_year_means(Artifact::HistoricalMeltSummary, &historical)?;
            ctx.writer.write_year_means(Artifact::FutureMeltSummary, &future)?;
            ctx.writer.write_table(Artifact::FloodRiskSummary, &flood)?;
            StageReport::new(
                stage,
                &[
                    Artifact::HistoricalMeltSummary,
                    Artifact::FutureMeltSummary,
                    Artifact::FloodRiskSummary,
                ],
                historical.len() + future.len() + flood.len(),
            )
        }
        StageName::Explorer => {
            let glaciers = ctx.glaciers()?;
            let climate = InputReader::new(&ctx.inputs.climate_features())
                .climate()
                .context("failed to read climate features")?;
            let projections = ctx.projections()?;
            let melt_years = ctx.melt_years()?;
            let flood_risk = ctx.flood_risk()?;
            let basins = ctx.basins(&glaciers);
            let explorer = merge_explorer(&ExplorerSources {
                glaciers: &glaciers,
                climate: &climate,
                projections: &projections,
                melt_years: &melt_years,
                flood_risk: &flood_risk,
                basins: &basins,
            });
            ctx.writer.write_table(Artifact::Explorer, &explorer)?;
            StageReport::new(stage, &[Artifact::Explorer], explorer.len())
        }
    };
    info!(n_rows = report.n_rows, "stage complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use glacierflow_rf::{OobMode, RandomForestConfig};
    use tempfile::TempDir;

    use super::*;

    fn write_inputs(data_dir: &Path, master: &str, climate: &str, mass_balance: &str) {
        fs::write(data_dir.join("glacier_master.csv"), master).unwrap();
        fs::write(data_dir.join("climate_features.csv"), climate).unwrap();
        let mb_dir = data_dir.join("mass_balance");
        fs::create_dir_all(&mb_dir).unwrap();
        fs::write(mb_dir.join("region_15.csv"), mass_balance).unwrap();
    }

    fn context(data_dir: &Path, output_dir: &Path) -> StageContext {
        let forest = RandomForestConfig::new(10)
            .unwrap()
            .with_oob_mode(OobMode::Enabled);
        StageContext {
            inputs: InputLayout::new(data_dir),
            reader: ArtifactReader::new(output_dir),
            writer: ArtifactWriter::new(output_dir).unwrap(),
            forecast: ForecastConfig::new(forest),
            basin: None,
        }
    }

    fn run_all(ctx: &StageContext) {
        for stage in StageName::ALL {
            run_stage(stage, ctx).unwrap_or_else(|e| panic!("{} failed: {e:#}", stage.as_str()));
        }
    }

    #[test]
    fn two_glacier_basin_runs_every_stage() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_inputs(
            data.path(),
            "glacier_id,lat,lon,area_km2,region\n\
             RGI60-15.00001,28.1,86.9,10.0,15\n\
             RGI60-15.00002,28.2,87.0,2.0,15\n",
            "glacier_id,prec_mean,temp_mean,srad_mean\n\
             RGI60-15.00001,900.0,-3.5,180.0\n\
             RGI60-15.00002,750.0,-1.2,195.0\n",
            "RGIId,2000,2001,2002\n\
             RGI60-15.00001,-0.5,-0.6,-0.4\n\
             RGI60-15.00002,-0.1,-0.2,-0.1\n",
        );
        let ctx = context(data.path(), out.path());

        run_all(&ctx);

        for artifact in Artifact::ALL {
            assert!(
                artifact.path_in(out.path()).is_file(),
                "{} missing",
                artifact.name()
            );
        }
        assert!(out.path().join("glacier_explorer_merged.csv").is_file());

        let basins = ctx.basin_runoff().unwrap();
        let y2000 = basins.iter().find(|b| b.year == 2000).unwrap();
        assert_eq!(y2000.basin, "15");
        assert_eq!(y2000.glacier_count, 2);
        assert!((y2000.total_glacier_runoff_m3 - 5.2e6).abs() < 1e-6);
        assert!((y2000.basin_runoff_mm - 5.2e6 / 12e6).abs() < 1e-10);
    }

    #[test]
    fn zero_area_basin_does_not_block_later_stages() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_inputs(
            data.path(),
            "glacier_id,lat,lon,area_km2,region\n\
             RGI60-15.00001,28.1,86.9,10.0,15\n\
             RGI60-15.00002,28.2,87.0,2.0,15\n\
             RGI60-16.00001,30.0,80.0,0.0,16\n",
            "glacier_id,prec_mean,temp_mean,srad_mean\n\
             RGI60-15.00001,900.0,-3.5,180.0\n\
             RGI60-15.00002,750.0,-1.2,195.0\n\
             RGI60-16.00001,600.0,-2.0,200.0\n",
            "RGIId,2000,2001,2002\n\
             RGI60-15.00001,-0.5,-0.6,-0.4\n\
             RGI60-15.00002,-0.1,-0.2,-0.1\n\
             RGI60-16.00001,-0.3,-0.3,-0.2\n",
        );
        let ctx = context(data.path(), out.path());

        run_all(&ctx);

        let basins = ctx.basin_runoff().unwrap();
        let dry: Vec<_> = basins.iter().filter(|b| b.basin == "16").collect();
        assert_eq!(dry.len(), 3);
        assert!(dry.iter().all(|b| b.basin_runoff_mm == 0.0));
        assert_eq!(ctx.melt_years().unwrap().len(), basins.len());
        assert!(Artifact::Explorer.path_in(out.path()).is_file());
    }
}
