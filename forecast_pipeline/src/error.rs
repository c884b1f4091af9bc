//! Error types for the forecast_pipeline crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the forecast_pipeline crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A requested column is absent from the input table
    #[error("Schema error: column '{column}' not found")]
    SchemaError { column: String },

    /// The table is too short for the requested lags, windows or horizons
    #[error("Insufficient history: {available} periods available, at least {required} required")]
    InsufficientHistory { available: usize, required: usize },

    /// Not enough valid rows to carve the requested number of folds
    #[error(
        "Insufficient folds for horizon {horizon}: requested {requested}, only {available} can be carved"
    )]
    InsufficientFolds {
        requested: usize,
        available: usize,
        horizon: usize,
    },

    /// A computed split would expose a test target to its own training window
    #[error("Leakage guard: {0}")]
    LeakageGuard(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised while fitting or applying a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error while reading or validating configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from the artifact store
    #[error("Registry error: {0}")]
    RegistryError(String),

    /// Error from numerical kernels
    #[error("Math error: {0}")]
    MathError(#[from] forecast_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error while encoding or decoding JSON, CSV or TOML
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
