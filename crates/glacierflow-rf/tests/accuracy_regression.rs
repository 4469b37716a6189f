//! Accuracy regression tests for glacierflow-rf.
//!
//! These tests guard the regressor's fit quality and determinism on a
//! deterministic synthetic melt dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use glacierflow_rf::{OobMode, PartialDependenceConfig, RandomForest, RandomForestConfig};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic regression dataset
// ---------------------------------------------------------------------------

/// 300 samples, 4 features. Melt rises with temperature (feature 1) and falls
/// with precipitation (feature 2); area (feature 0) and radiation (feature 3)
/// carry no signal.
fn make_melt_regression() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(300);
    let mut targets = Vec::with_capacity(300);
    for _ in 0..300 {
        let area = rng.gen_range(0.5..20.0);
        let temp = rng.gen_range(-10.0..2.0);
        let prec = rng.gen_range(300.0..2000.0);
        let srad = rng.gen_range(100.0..200.0);
        let melt = 0.1 * (temp + 10.0) - 0.0003 * prec + rng.r#gen::<f64>() * 0.02;
        features.push(vec![area, temp, prec, srad]);
        targets.push(melt);
    }
    let names = ["area_km2", "temp_mean", "prec_mean", "srad_mean"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    (features, targets, names)
}

// ---------------------------------------------------------------------------
// a) oob_r_squared_above_threshold
// ---------------------------------------------------------------------------

/// OOB R² with 100 trees must exceed 0.85.
#[test]
fn oob_r_squared_above_threshold() {
    let (features, targets, names) = make_melt_regression();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled)
        .fit(&features, &targets, &names)
        .unwrap();

    let oob = result.oob_score().unwrap();
    let r2 = oob.r_squared.unwrap();
    assert!(r2 > 0.85, "oob r2 {r2} <= 0.85");
    assert_eq!(oob.n_oob_samples, 300);
}

// ---------------------------------------------------------------------------
// b) temperature_ranks_first
// ---------------------------------------------------------------------------

/// The dominant driver must top the importance ranking.
#[test]
fn temperature_ranks_first() {
    let (features, targets, names) = make_melt_regression();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(&features, &targets, &names)
        .unwrap();

    let top = &result.importances()[0];
    assert_eq!(top.name, "temp_mean");
    assert_eq!(top.rank, 1);
    let ranks: Vec<usize> = result.importances().iter().map(|f| f.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

// ---------------------------------------------------------------------------
// c) partial_dependence_follows_driver
// ---------------------------------------------------------------------------

/// Sweeping temperature must raise predicted melt; sweeping precipitation must lower it.
#[test]
fn partial_dependence_follows_driver() {
    let (features, targets, names) = make_melt_regression();
    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(&features, &targets, &names)
        .unwrap()
        .into_forest();
    let cfg = PartialDependenceConfig::new();

    let temp = forest.partial_dependence(&features, 1, &cfg).unwrap();
    assert!(temp.predictions[19] - temp.predictions[0] > 0.5);

    let prec = forest.partial_dependence(&features, 2, &cfg).unwrap();
    assert!(prec.predictions[19] < prec.predictions[0]);
}

// ---------------------------------------------------------------------------
// d) saved_model_reproduces_predictions
// ---------------------------------------------------------------------------

#[test]
fn saved_model_reproduces_predictions() {
    let (features, targets, names) = make_melt_regression();
    let forest = RandomForestConfig::new(25)
        .unwrap()
        .with_seed(7)
        .fit(&features, &targets, &names)
        .unwrap()
        .into_forest();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("melt_model.bin");
    forest.save(&path).unwrap();
    let loaded = RandomForest::load(&path).unwrap();

    assert_eq!(
        forest.predict_batch(&features).unwrap(),
        loaded.predict_batch(&features).unwrap()
    );
}

// ---------------------------------------------------------------------------
// e) identical_seed_identical_forest
// ---------------------------------------------------------------------------

#[test]
fn identical_seed_identical_forest() {
    let (features, targets, names) = make_melt_regression();
    let bytes = |seed| {
        RandomForestConfig::new(20)
            .unwrap()
            .with_seed(seed)
            .fit(&features, &targets, &names)
            .unwrap()
            .forest()
            .to_bytes()
            .unwrap()
    };
    assert_eq!(bytes(42), bytes(42));
    assert_ne!(bytes(42), bytes(43));
}
