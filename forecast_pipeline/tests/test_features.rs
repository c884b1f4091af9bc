use approx::assert_relative_eq;
use forecast_pipeline::{build_features, FeatureParams, ForecastError, Period, TimeSeriesTable};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;

fn start() -> Period {
    Period::new(2020, 1).unwrap()
}

fn table_of(len: usize) -> TimeSeriesTable {
    let price: Vec<f64> = (1..=len).map(|i| i as f64).collect();
    let production: Vec<f64> = price.iter().map(|p| 2.0 * p).collect();
    TimeSeriesTable::monthly(start(), len)
        .with_column("price", price)
        .unwrap()
        .with_column("production", production)
        .unwrap()
}

fn params(lags: Vec<usize>, windows: Vec<usize>, horizons: Vec<usize>) -> FeatureParams {
    FeatureParams {
        target_column: "production".to_string(),
        raw_columns: vec!["price".to_string()],
        lags,
        windows,
        horizons,
        calendar: false,
    }
}

#[test]
fn test_feature_names_are_ordered() {
    let table = table_of(12);
    let params = FeatureParams {
        calendar: true,
        ..params(vec![1, 2], vec![3], vec![1])
    };
    let (features, _) = build_features(&table, &params).unwrap();

    assert_eq!(
        features.feature_names(),
        &[
            "price",
            "production",
            "price_lag_1",
            "price_lag_2",
            "price_roll_mean_3",
            "price_roll_std_3",
            "month",
            "quarter",
            "summer_peak",
        ]
        .map(String::from)
    );
}

#[test]
fn test_thirteen_months_leave_one_valid_row() {
    let table = table_of(13);
    let (features, _) = build_features(&table, &params(vec![12], vec![12], vec![1])).unwrap();

    assert_eq!(features.valid_rows(), vec![12]);
    let row = features.feature_row(12).unwrap();
    assert_eq!(row.period, start().offset(12));
    assert!(row.is_complete());
}

#[test]
fn test_short_history_is_rejected() {
    let table = table_of(5);
    let result = build_features(&table, &params(vec![12], vec![3], vec![1]));

    match result {
        Err(ForecastError::InsufficientHistory {
            available,
            required,
        }) => {
            assert_eq!(available, 5);
            assert_eq!(required, 13);
        }
        other => panic!("expected insufficient history, got {:?}", other),
    }
}

#[test]
fn test_gapped_short_history_is_rejected() {
    // Five observed months spread over twenty calendar months
    let periods = vec![
        start(),
        start().offset(1),
        start().offset(2),
        start().offset(3),
        start().offset(19),
    ];
    let mut table = TimeSeriesTable::new(periods).unwrap();
    table
        .add_column("price", (1..=5).map(|i| Some(i as f64)).collect())
        .unwrap();
    table
        .add_column("production", (1..=5).map(|i| Some(2.0 * i as f64)).collect())
        .unwrap();

    match build_features(&table, &params(vec![12], vec![], vec![1])) {
        Err(ForecastError::InsufficientHistory {
            available,
            required,
        }) => {
            assert_eq!(available, 5);
            assert_eq!(required, 13);
        }
        other => panic!("expected insufficient history, got {:?}", other),
    }
}

#[test]
fn test_no_complete_row_is_insufficient_history() {
    // Enough periods, but the gaps leave no month with its lag 12 observed
    let periods: Vec<Period> = (0..13).map(|i| start().offset(i * 5)).collect();
    let mut table = TimeSeriesTable::new(periods).unwrap();
    table
        .add_column("price", (1..=13).map(|i| Some(i as f64)).collect())
        .unwrap();
    table
        .add_column("production", (1..=13).map(|i| Some(2.0 * i as f64)).collect())
        .unwrap();

    assert!(matches!(
        build_features(&table, &params(vec![12], vec![], vec![1])),
        Err(ForecastError::InsufficientHistory {
            available: 13,
            required: 13
        })
    ));
}

#[test]
fn test_missing_columns_are_schema_errors() {
    let table = table_of(24);

    let mut missing_target = params(vec![1], vec![], vec![1]);
    missing_target.target_column = "saudi_production".to_string();
    assert!(matches!(
        build_features(&table, &missing_target),
        Err(ForecastError::SchemaError { column }) if column == "saudi_production"
    ));

    let mut missing_raw = params(vec![1], vec![], vec![1]);
    missing_raw.raw_columns = vec!["brent_price".to_string()];
    assert!(matches!(
        build_features(&table, &missing_raw),
        Err(ForecastError::SchemaError { column }) if column == "brent_price"
    ));
}

#[rstest]
#[case(vec![0], vec![3], vec![1])]
#[case(vec![1], vec![1], vec![1])]
#[case(vec![1], vec![3], vec![])]
#[case(vec![1], vec![3], vec![0])]
#[case(vec![1, 1], vec![3], vec![1])]
#[case(vec![1], vec![3, 3], vec![1])]
#[case(vec![1], vec![3], vec![1, 1])]
fn test_invalid_parameters(
    #[case] lags: Vec<usize>,
    #[case] windows: Vec<usize>,
    #[case] horizons: Vec<usize>,
) {
    let result = build_features(&table_of(24), &params(lags, windows, horizons));
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_duplicate_feature_names_are_rejected() {
    let duplicated = FeatureParams {
        raw_columns: vec!["price".to_string(), "price".to_string()],
        ..params(vec![1], vec![], vec![1])
    };
    assert!(matches!(
        build_features(&table_of(24), &duplicated),
        Err(ForecastError::InvalidParameter(_))
    ));

    // A raw column already named like a derived feature
    let table = table_of(24)
        .with_column("price_lag_1", vec![0.0; 24])
        .unwrap();
    assert!(matches!(
        build_features(&table, &params(vec![1], vec![], vec![1])),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_lag_and_rolling_values() {
    let table = table_of(8);
    let (features, _) = build_features(&table, &params(vec![2], vec![3], vec![1])).unwrap();

    let lag = features.column("price_lag_2").unwrap();
    assert_eq!(&lag[..4], &[None, None, Some(1.0), Some(2.0)]);

    let mean = features.column("price_roll_mean_3").unwrap();
    assert_eq!(mean[1], None);
    assert_relative_eq!(mean[2].unwrap(), 2.0);
    assert_relative_eq!(mean[7].unwrap(), 7.0);

    // Sample standard deviation of three consecutive integers
    let std = features.column("price_roll_std_3").unwrap();
    assert_eq!(std[1], None);
    assert_relative_eq!(std[5].unwrap(), 1.0);
}

#[test]
fn test_missing_input_only_poisons_its_windows() {
    let mut table = TimeSeriesTable::monthly(start(), 8);
    table
        .add_column(
            "production",
            vec![
                Some(1.0),
                Some(2.0),
                Some(3.0),
                None,
                Some(5.0),
                Some(6.0),
                Some(7.0),
                Some(8.0),
            ],
        )
        .unwrap();
    let params = FeatureParams {
        target_column: "production".to_string(),
        raw_columns: Vec::new(),
        lags: vec![1],
        windows: vec![2],
        horizons: vec![1],
        calendar: false,
    };
    let (features, _) = build_features(&table, &params).unwrap();

    let mean = features.column("production_roll_mean_2").unwrap();
    assert_eq!(mean[3], None);
    assert_eq!(mean[4], None);
    assert_relative_eq!(mean[5].unwrap(), 5.5);
    assert_eq!(features.valid_rows(), vec![1, 2, 5, 6, 7]);
}

#[test]
fn test_calendar_features() {
    let table = table_of(12);
    let params = FeatureParams {
        calendar: true,
        ..params(vec![1], vec![], vec![1])
    };
    let (features, _) = build_features(&table, &params).unwrap();

    let month = features.column("month").unwrap();
    let quarter = features.column("quarter").unwrap();
    let summer = features.column("summer_peak").unwrap();
    assert_eq!(month[6], Some(7.0));
    assert_eq!(quarter[6], Some(3.0));
    assert_eq!(summer[4], Some(0.0));
    assert_eq!(summer[5], Some(1.0));
    assert_eq!(summer[8], Some(1.0));
    assert_eq!(summer[9], Some(0.0));
}

#[test]
fn test_targets_shift_forward() {
    let table = table_of(6);
    let (_, targets) = build_features(&table, &params(vec![1], vec![], vec![1, 3])).unwrap();

    assert_eq!(targets.horizons(), vec![1, 3]);
    assert_eq!(targets.target_column(), "production");
    let h3 = targets.get(3).unwrap();
    assert_eq!(h3, &[Some(8.0), Some(10.0), Some(12.0), None, None, None]);
    assert!(targets.get(2).is_none());
}

#[test]
fn test_training_set_drops_undefined_rows() {
    let table = table_of(24);
    let (features, targets) = build_features(&table, &params(vec![1], vec![], vec![1])).unwrap();
    let set = features.training_set(&targets, 1).unwrap();

    // Row 0 lacks its lag, row 23 lacks its target
    assert_eq!(set.len(), 22);
    assert_eq!(set.periods[0], start().offset(1));
    assert_eq!(set.rows[0], vec![2.0, 4.0, 1.0]);
    assert_relative_eq!(set.target[0], 6.0);
    assert!(features.training_set(&targets, 6).is_err());
}

#[test]
fn test_no_look_ahead() {
    let base = table_of(30);
    let cutoff = 17;

    let mut price: Vec<f64> = (1..=30).map(|i| i as f64).collect();
    let mut production: Vec<f64> = price.iter().map(|p| 2.0 * p).collect();
    for i in (cutoff + 1)..30 {
        price[i] = -1000.0 * i as f64;
        production[i] = 7.0;
    }
    let perturbed = TimeSeriesTable::monthly(start(), 30)
        .with_column("price", price)
        .unwrap()
        .with_column("production", production)
        .unwrap();

    let params = FeatureParams {
        calendar: true,
        ..params(vec![1, 3], vec![3, 6], vec![1])
    };
    let (a, _) = build_features(&base, &params).unwrap();
    let (b, _) = build_features(&perturbed, &params).unwrap();

    for t in 0..=cutoff {
        assert_eq!(a.feature_row(t), b.feature_row(t), "row {} changed", t);
    }
    assert_ne!(a.feature_row(cutoff + 1), b.feature_row(cutoff + 1));
}

#[test]
fn test_build_is_deterministic() {
    let table = table_of(30);
    let params = FeatureParams {
        calendar: true,
        ..params(vec![1, 2, 3], vec![3, 6], vec![1, 3])
    };

    let first = build_features(&table, &params).unwrap();
    let second = build_features(&table, &params).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_gaps_become_missing_rows() {
    let periods = vec![
        start(),
        start().offset(1),
        start().offset(2),
        start().offset(4),
        start().offset(5),
    ];
    let mut table = TimeSeriesTable::new(periods).unwrap();
    table
        .add_column(
            "production",
            vec![Some(1.0), Some(2.0), Some(3.0), Some(5.0), Some(6.0)],
        )
        .unwrap();
    let params = FeatureParams {
        target_column: "production".to_string(),
        raw_columns: Vec::new(),
        lags: vec![1],
        windows: vec![],
        horizons: vec![1],
        calendar: false,
    };

    let (features, targets) = build_features(&table, &params).unwrap();
    assert_eq!(features.len(), 6);
    assert_eq!(features.valid_rows(), vec![1, 2, 5]);

    let set = features.training_set(&targets, 1).unwrap();
    assert_eq!(set.periods, vec![start().offset(1)]);
}

#[test]
fn test_write_csv() {
    let table = table_of(4);
    let (features, targets) = build_features(&table, &params(vec![1], vec![], vec![1])).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("features.csv");
    features.write_csv(&path, &targets).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "date,price,production,price_lag_1,target_h1");
    assert_eq!(lines[1], "2020-01-01,1,2,,4");
    assert_eq!(lines[4], "2020-04-01,4,8,3,");
}
