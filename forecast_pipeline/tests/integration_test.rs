use forecast_pipeline::evaluation::EvaluationParams;
use forecast_pipeline::models::{ElasticNet, Linear, ModelSpec, NaiveLag};
use forecast_pipeline::{
    ArtifactStore, DataLoader, FeatureParams, FileStore, ForecastError, ForecastPipeline,
    InMemoryStore, PipelineConfig, RegistryConfig, Stage,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

// Helper function to create a monthly production and price dataset
fn create_sample_data(months: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    writeln!(file, "date,brent_price,saudi_production").unwrap();
    for i in 0..months {
        let year = 2015 + i / 12;
        let month = i % 12 + 1;
        let brent = 50.0 + (i % 7) as f64;
        let production = 9_000.0 + 10.0 * brent + i as f64;
        writeln!(file, "{}-{:02}-01,{},{}", year, month, brent, production).unwrap();
    }
    file.flush().unwrap();

    file
}

fn config() -> PipelineConfig {
    PipelineConfig {
        features: FeatureParams {
            target_column: "saudi_production".to_string(),
            raw_columns: Vec::new(),
            lags: vec![1, 2],
            windows: vec![3],
            horizons: vec![1, 2],
            calendar: true,
        },
        evaluation: EvaluationParams {
            folds: 3,
            ..EvaluationParams::default()
        },
        models: vec![
            ModelSpec::Linear(Linear::default()),
            ModelSpec::ElasticNet(ElasticNet::default()),
            ModelSpec::NaiveLag(NaiveLag::on_feature("saudi_production_lag_1")),
        ],
        registry: RegistryConfig::default(),
    }
}

#[test]
fn test_full_training_workflow() {
    // 1. Load data
    let data_file = create_sample_data(40);
    let table = DataLoader::from_csv(data_file.path()).unwrap();
    assert_eq!(table.len(), 40);
    assert!(table.is_contiguous());

    // 2. Run the pipeline over both horizons
    let pipeline = ForecastPipeline::new(config()).unwrap();
    let report = pipeline.run(&table).unwrap();
    assert_eq!(report.selections.len(), 2);
    assert_eq!(
        report.selections.iter().map(|s| s.horizon).collect::<Vec<_>>(),
        vec![1, 2]
    );

    for selection in &report.selections {
        assert_eq!(selection.leaderboard.len(), 3);
        let best = &selection.leaderboard[0];
        assert_eq!(best.model_name, selection.winner.model_name);
        assert!(selection
            .leaderboard
            .windows(2)
            .all(|w| w[0].metrics.rmse <= w[1].metrics.rmse));
        assert_eq!(selection.winner.folds.len(), 3);
        assert_eq!(selection.winner.artifact.horizon, selection.horizon);
        assert_eq!(
            selection.winner.artifact.feature_names,
            report.features.feature_names()
        );
    }

    // 3. Score the most recent row with the one-month model
    let h1 = report.selection(1).unwrap();
    let last = report.features.len() - 1;
    let row = report.features.feature_row(last).unwrap();
    let named: HashMap<String, f64> = report
        .features
        .feature_names()
        .iter()
        .cloned()
        .zip(row.values.iter().map(|v| v.unwrap()))
        .collect();
    let forecast = h1.winner.artifact.score_row(&named).unwrap();
    assert!(forecast.is_finite());

    // 4. Register winners
    let mut store = InMemoryStore::new();
    let registered = pipeline
        .register(&report, &mut store, Stage::Staging)
        .unwrap();
    assert_eq!(registered.len(), 2);
    assert_eq!(registered[0].version, 1);
    assert_eq!(
        registered[0].name,
        format!("gcc_oil_forecast_h1_{}", h1.winner.model_name)
    );
    assert!(store.latest(2, Stage::Staging).unwrap().is_some());
    assert!(store.latest(2, Stage::Production).unwrap().is_none());
}

#[test]
fn test_file_store_and_feature_export() {
    let data_file = create_sample_data(36);
    let table = DataLoader::from_csv(data_file.path()).unwrap();
    let pipeline = ForecastPipeline::new(config()).unwrap();
    let report = pipeline.run(&table).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let features_path = dir.path().join("features.csv");
    report
        .features
        .write_csv(&features_path, &report.targets)
        .unwrap();
    let contents = fs::read_to_string(&features_path).unwrap();
    assert_eq!(contents.lines().count(), 37);
    assert!(contents.starts_with("date,brent_price,saudi_production,"));
    assert!(contents.lines().next().unwrap().ends_with("target_h1,target_h2"));

    let mut store = FileStore::new(dir.path().join("models"));
    pipeline
        .register(&report, &mut store, Stage::Production)
        .unwrap();
    pipeline
        .register(&report, &mut store, Stage::Production)
        .unwrap();

    assert_eq!(store.versions(1, Stage::Production).unwrap(), vec![1, 2]);
    assert!(dir.path().join("models/h2/production/v0002.json").is_file());
    let latest = store.latest(2, Stage::Production).unwrap().unwrap();
    assert_eq!(latest.horizon, 2);
}

#[test]
fn test_pipeline_surfaces_insufficient_history() {
    let data_file = create_sample_data(6);
    let table = DataLoader::from_csv(data_file.path()).unwrap();
    let pipeline = ForecastPipeline::new(PipelineConfig::default()).unwrap();

    match pipeline.run(&table) {
        Err(ForecastError::InsufficientHistory {
            available,
            required,
        }) => {
            assert_eq!(available, 6);
            assert_eq!(required, 13);
        }
        other => panic!("expected insufficient history, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_horizon_without_training_rows_is_insufficient_history() {
    // Default lags reach back 12 months, so six months ahead needs 19
    let data_file = create_sample_data(18);
    let table = DataLoader::from_csv(data_file.path()).unwrap();
    let pipeline = ForecastPipeline::new(PipelineConfig::default()).unwrap();

    match pipeline.run(&table) {
        Err(ForecastError::InsufficientHistory {
            available,
            required,
        }) => {
            assert_eq!(available, 18);
            assert_eq!(required, 19);
        }
        other => panic!("expected insufficient history, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_pipeline_surfaces_insufficient_folds() {
    let data_file = create_sample_data(8);
    let table = DataLoader::from_csv(data_file.path()).unwrap();
    let mut config = config();
    config.evaluation.folds = 10;
    let pipeline = ForecastPipeline::new(config).unwrap();

    assert!(matches!(
        pipeline.run(&table),
        Err(ForecastError::InsufficientFolds { requested: 10, .. })
    ));
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let mut config = config();
    config.features.horizons.clear();
    assert!(matches!(
        ForecastPipeline::new(config),
        Err(ForecastError::InvalidParameter(_))
    ));
}
