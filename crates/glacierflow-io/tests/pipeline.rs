//! End-to-end: input CSVs -> every stage -> published artifacts -> JSON.

use std::fs;
use std::path::{Path, PathBuf};

use glacierflow_core::{
    BasinAssignment, ExplorerSources, ForecastConfig, GlacierYearFeature, HydrologyRecord,
    MeltForecaster, aggregate_basins, build_ml_dataset, classify_anomalies, climate_sensitivity,
    estimate_trends, explain, future_melt_summary, historical_melt_summary, link_hydrology,
    merge_explorer, reconcile_area, score_flood_risk,
};
use glacierflow_io::{
    Artifact, ArtifactReader, ArtifactWriter, InputLayout, InputReader, export_json,
    read_mass_balance_dir,
};
use glacierflow_rf::{OobMode, RandomForestConfig};
use tempfile::TempDir;

/// Path to the fixture input directory.
fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("data")
}

/// Run every stage over the fixture inputs and publish into `out`.
fn run_all(out: &Path) -> (Vec<GlacierYearFeature>, Vec<HydrologyRecord>) {
    let layout = InputLayout::new(&data_dir());
    let glaciers = InputReader::new(&layout.glacier_master()).glaciers().unwrap();
    let climate = InputReader::new(&layout.climate_features()).climate().unwrap();
    let inventory = InputReader::new(&layout.glacier_attributes().unwrap())
        .inventory_areas()
        .unwrap();
    let observations = read_mass_balance_dir(&layout.mass_balance_dir()).unwrap();

    let writer = ArtifactWriter::new(out).unwrap();

    let glaciers = reconcile_area(&glaciers, &inventory);
    writer.write_table(Artifact::GlacierMaster, &glaciers).unwrap();

    let rows = build_ml_dataset(&glaciers, &climate, &observations).unwrap();
    writer.write_table(Artifact::MlDataset, &rows).unwrap();

    let basins = BasinAssignment::from_regions(&glaciers);
    let hydro = link_hydrology(&rows, &basins);
    writer.write_table(Artifact::Hydrology, &hydro).unwrap();
    let summaries = aggregate_basins(&hydro);
    writer.write_table(Artifact::BasinRunoff, &summaries).unwrap();
    let melt = classify_anomalies(&summaries).unwrap();
    writer.write_table(Artifact::ExtremeMeltYears, &melt).unwrap();
    let flood = score_flood_risk(&melt).unwrap();
    writer.write_table(Artifact::FloodRisk, &flood).unwrap();
    writer.write_table(Artifact::RunoffTrend, &estimate_trends(&summaries).unwrap()).unwrap();

    let config = ForecastConfig::new(
        RandomForestConfig::new(25)
            .unwrap()
            .with_seed(42)
            .with_oob_mode(OobMode::Enabled),
    );
    let model = MeltForecaster::train(&rows, &config).unwrap();
    writer.write_model(model.forest()).unwrap();
    let projections = model.project(&rows, &config).unwrap();
    writer.write_table(Artifact::FutureMelt, &projections).unwrap();

    let explanation = explain(&model, &rows).unwrap();
    writer.write_table(Artifact::FeatureImportance, &explanation.importances).unwrap();
    writer.write_table(Artifact::PartialEffects, &explanation.partial_effects).unwrap();

    let sensitivity = climate_sensitivity(&rows).unwrap();
    writer.write_table(Artifact::ClimateCorrelation, &sensitivity.correlations).unwrap();
    writer.write_table(Artifact::ClimateRegression, &sensitivity.regression).unwrap();

    writer
        .write_year_means(Artifact::HistoricalMeltSummary, &historical_melt_summary(&rows))
        .unwrap();
    writer
        .write_year_means(Artifact::FutureMeltSummary, &future_melt_summary(&projections))
        .unwrap();
    writer.write_table(Artifact::FloodRiskSummary, &flood).unwrap();

    let explorer = merge_explorer(&ExplorerSources {
        glaciers: &glaciers,
        climate: &climate,
        projections: &projections,
        melt_years: &melt,
        flood_risk: &flood,
        basins: &basins,
    });
    writer.write_table(Artifact::Explorer, &explorer).unwrap();

    (rows, hydro)
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

#[test]
fn full_run_publishes_every_artifact() {
    let dir = TempDir::new().unwrap();
    let (rows, _) = run_all(dir.path());

    for artifact in Artifact::ALL {
        assert!(artifact.path_in(dir.path()).is_file(), "missing {artifact}");
    }

    // 8 surveyed glaciers x 11 years, one empty survey cell.
    assert_eq!(rows.len(), 87);
    assert_eq!(line_count(&Artifact::MlDataset.path_in(dir.path())), 88);
    // 8 glaciers x 2025..=2040.
    assert_eq!(line_count(&Artifact::FutureMelt.path_in(dir.path())), 1 + 8 * 16);
    // 4 features x 20 grid points.
    assert_eq!(line_count(&Artifact::PartialEffects.path_in(dir.path())), 1 + 80);
    assert_eq!(line_count(&Artifact::BasinRunoff.path_in(dir.path())), 1 + 11);

    let melt = fs::read_to_string(Artifact::ExtremeMeltYears.path_in(dir.path())).unwrap();
    let first = melt.lines().nth(1).unwrap();
    assert!(first.starts_with("15,2010,"), "{first}");
    assert!(first.ends_with("Extreme Melt"), "{first}");

    let trend = fs::read_to_string(Artifact::RunoffTrend.path_in(dir.path())).unwrap();
    assert!(trend.lines().nth(1).unwrap().ends_with(",Increasing"));
}

#[test]
fn explorer_export_skips_glaciers_without_coordinates() {
    let dir = TempDir::new().unwrap();
    run_all(dir.path());

    // 10 master rows, one without latitude.
    assert_eq!(line_count(&Artifact::Explorer.path_in(dir.path())), 1 + 9);
    let json = export_json(dir.path(), Artifact::Explorer).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 9);
    for r in records {
        assert!(r["lat"].is_number() && r["lon"].is_number());
        assert!(["Low", "Medium", "High"].contains(&r["risk_level"].as_str().unwrap()));
    }
    let unmapped = records
        .iter()
        .find(|r| r["glacier_id"] == "GLIMS-unmapped")
        .unwrap();
    assert!(unmapped["area_km2"].is_null());
    assert!(unmapped["predicted_melt"].is_null());
}

#[test]
fn rerun_with_same_seed_is_byte_identical() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    run_all(a.path());
    run_all(b.path());
    for artifact in [
        Artifact::FutureMelt,
        Artifact::FeatureImportance,
        Artifact::PartialEffects,
        Artifact::MeltModel,
    ] {
        assert_eq!(
            fs::read(artifact.path_in(a.path())).unwrap(),
            fs::read(artifact.path_in(b.path())).unwrap(),
            "{artifact} differs between runs"
        );
    }
}

#[test]
fn published_tables_read_back_unchanged() {
    let dir = TempDir::new().unwrap();
    let (rows, hydro) = run_all(dir.path());
    let reader = ArtifactReader::new(dir.path());

    let rows_back: Vec<GlacierYearFeature> = reader.table(Artifact::MlDataset).unwrap();
    assert_eq!(rows_back, rows);
    let hydro_back: Vec<HydrologyRecord> = reader.table(Artifact::Hydrology).unwrap();
    assert_eq!(hydro_back, hydro);

    let forest = reader.model().unwrap();
    let model = MeltForecaster::from_forest(forest).unwrap();
    assert_eq!(model.forest().n_trees(), 25);
}
