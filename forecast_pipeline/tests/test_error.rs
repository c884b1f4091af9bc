use forecast_math::MathError;
use forecast_pipeline::error::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    // IO errors
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::IoError(_)));

    // Numerical kernel errors
    let math_error = MathError::InvalidInput("window must be positive".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert!(matches!(forecast_error, ForecastError::MathError(_)));

    // JSON errors
    let json_error = serde_json::from_str::<f64>("not json").unwrap_err();
    let forecast_error = ForecastError::from(json_error);
    assert!(matches!(forecast_error, ForecastError::SerializationError(_)));

    // TOML errors become configuration errors
    let toml_error = toml::from_str::<toml::Table>("= broken").unwrap_err();
    let forecast_error = ForecastError::from(toml_error);
    assert!(matches!(forecast_error, ForecastError::ConfigError(_)));
}

#[test]
fn test_error_display() {
    let error = ForecastError::SchemaError {
        column: "brent_price".to_string(),
    };
    assert_eq!(error.to_string(), "Schema error: column 'brent_price' not found");

    let error = ForecastError::InsufficientHistory {
        available: 5,
        required: 13,
    };
    assert_eq!(
        error.to_string(),
        "Insufficient history: 5 periods available, at least 13 required"
    );

    let error = ForecastError::InsufficientFolds {
        requested: 5,
        available: 2,
        horizon: 6,
    };
    let message = error.to_string();
    assert!(message.contains("horizon 6"));
    assert!(message.contains("requested 5"));
    assert!(message.contains("only 2"));

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let message = ForecastError::from(io_error).to_string();
    assert!(message.contains("IO error"));
    assert!(message.contains("permission denied"));
}

#[test]
fn test_error_messages_are_kept() {
    let leakage = ForecastError::LeakageGuard("fold 0 overlaps".to_string());
    let registry = ForecastError::RegistryError("version exists".to_string());

    if let ForecastError::LeakageGuard(msg) = &leakage {
        assert_eq!(msg, "fold 0 overlaps");
    }
    assert!(leakage.to_string().starts_with("Leakage guard"));
    assert!(registry.to_string().contains("version exists"));
}
