use approx::assert_relative_eq;
use forecast_pipeline::evaluation::{evaluate, EvaluationParams};
use forecast_pipeline::models::NaiveLag;
use forecast_pipeline::{
    build_features, ArtifactStore, FeatureParams, FileStore, ForecastError, InMemoryStore,
    ModelArtifact, Period, Stage, TimeSeriesTable,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashMap;

fn artifact(horizon: usize) -> ModelArtifact {
    let start = Period::new(2020, 1).unwrap();
    let price: Vec<f64> = (1..=24).map(|i| i as f64).collect();
    let production: Vec<f64> = price.iter().map(|p| 2.0 * p).collect();
    let table = TimeSeriesTable::monthly(start, 24)
        .with_column("price", price)
        .unwrap()
        .with_column("production", production)
        .unwrap();
    let params = FeatureParams {
        target_column: "production".to_string(),
        raw_columns: vec!["price".to_string()],
        lags: vec![1],
        windows: vec![],
        horizons: vec![horizon],
        calendar: false,
    };
    let (features, targets) = build_features(&table, &params).unwrap();
    let set = features.training_set(&targets, horizon).unwrap();
    let eval_params = EvaluationParams {
        folds: 2,
        ..EvaluationParams::default()
    };
    evaluate(&set, &eval_params, NaiveLag::default)
        .unwrap()
        .artifact
}

fn feature_row(price: f64) -> HashMap<String, f64> {
    HashMap::from([
        ("price".to_string(), price),
        ("production".to_string(), 2.0 * price),
        ("price_lag_1".to_string(), price - 1.0),
    ])
}

#[rstest]
#[case("staging", Stage::Staging)]
#[case("Production", Stage::Production)]
#[case(" archived ", Stage::Archived)]
fn test_stage_parse(#[case] raw: &str, #[case] expected: Stage) {
    assert_eq!(raw.parse::<Stage>().unwrap(), expected);
}

#[test]
fn test_stage_display_round_trips() {
    for stage in [Stage::Staging, Stage::Production, Stage::Archived] {
        assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
    }
    assert!(matches!(
        "none".parse::<Stage>(),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_score_row_aligns_to_schema() {
    let artifact = artifact(1);
    assert_eq!(
        artifact.feature_names,
        vec!["price", "production", "price_lag_1"]
    );

    // target[t] = production[t + 1] = 2 * price_lag_1 + 4
    let mut row = feature_row(11.0);
    row.insert("unrelated".to_string(), 1e9);
    assert_relative_eq!(artifact.score_row(&row).unwrap(), 24.0, epsilon = 1e-8);

    let aligned = artifact.predict(&[vec![11.0, 22.0, 10.0]]).unwrap();
    assert_relative_eq!(aligned[0], 24.0, epsilon = 1e-8);
}

#[test]
fn test_score_row_missing_feature() {
    let artifact = artifact(1);
    let mut row = feature_row(5.0);
    row.remove("production");

    match artifact.score_row(&row) {
        Err(ForecastError::SchemaError { column }) => assert_eq!(column, "production"),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn test_registered_name() {
    let artifact = artifact(3);
    assert_eq!(
        artifact.registered_name("gcc_oil_forecast"),
        "gcc_oil_forecast_h3_naive_lag"
    );
}

#[test]
fn test_in_memory_store_versions() {
    let mut store = InMemoryStore::new();
    let h1 = artifact(1);
    let h3 = artifact(3);

    assert_eq!(store.store(Stage::Staging, &h1).unwrap(), 1);
    assert_eq!(store.store(Stage::Staging, &h1).unwrap(), 2);
    assert_eq!(store.store(Stage::Production, &h3).unwrap(), 1);

    assert_eq!(store.versions(1, Stage::Staging).unwrap(), vec![1, 2]);
    assert!(store.versions(1, Stage::Production).unwrap().is_empty());
    assert_eq!(store.latest(3, Stage::Production).unwrap(), Some(h3));
    assert_eq!(store.latest(3, Stage::Archived).unwrap(), None);
    assert_eq!(store.load(1, Stage::Staging, 0).unwrap(), None);
}

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    let first = artifact(1);
    let mut second = artifact(1);
    second.training_rows = 99;

    assert_eq!(store.store(Stage::Production, &first).unwrap(), 1);
    assert_eq!(store.store(Stage::Production, &second).unwrap(), 2);
    assert!(dir.path().join("h1/production/v0001.json").is_file());
    assert!(dir.path().join("h1/production/v0002.json").is_file());
    assert_eq!(store.versions(1, Stage::Production).unwrap(), vec![1, 2]);

    let latest = store.latest(1, Stage::Production).unwrap().unwrap();
    assert_eq!(latest.training_rows, 99);
    assert_eq!(latest.model_name, "naive_lag");
    assert_eq!(latest.feature_names, first.feature_names);
    assert_eq!(latest.trained_at, second.trained_at);
    assert_relative_eq!(
        latest.score_row(&feature_row(7.0)).unwrap(),
        first.score_row(&feature_row(7.0)).unwrap(),
        epsilon = 1e-8
    );

    assert!(store.latest(1, Stage::Staging).unwrap().is_none());
    assert!(store.load(1, Stage::Production, 3).unwrap().is_none());
}

#[test]
fn test_file_store_ignores_stray_files() {
    let dir = tempfile::tempdir().unwrap();
    let stage_dir = dir.path().join("h6").join("staging");
    std::fs::create_dir_all(&stage_dir).unwrap();
    std::fs::write(stage_dir.join("notes.txt"), "hello").unwrap();
    std::fs::write(stage_dir.join(".v0001.json.tmp"), "{").unwrap();

    let store = FileStore::new(dir.path());
    assert!(store.versions(6, Stage::Staging).unwrap().is_empty());
}

#[test]
fn test_artifact_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.json");
    let artifact = artifact(1);

    artifact.save(&path).unwrap();
    let loaded = ModelArtifact::load(&path).unwrap();
    assert_eq!(loaded.horizon, 1);
    assert_eq!(loaded.train_start, artifact.train_start);
    assert_eq!(loaded.train_end, artifact.train_end);
    assert_eq!(loaded.metrics.folds, 2);

    assert!(matches!(
        ModelArtifact::from_json("{\"horizon\": 1}"),
        Err(ForecastError::SerializationError(_))
    ));
}
