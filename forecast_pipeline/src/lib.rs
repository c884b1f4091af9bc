//! # Forecast Pipeline
//!
//! Monthly multi-horizon forecasting of GCC oil production from tabular,
//! date-indexed data.
//!
//! ## Features
//!
//! - Date-indexed tables with monthly resampling, joins and explicit forward fill
//! - Feature construction: lags, trailing rolling mean/std, calendar encodings
//! - Rolling-origin cross-validation with a leakage guard
//! - Candidate models (naive lag, linear, elastic net, gradient boosting)
//! - Per-horizon model selection, run in parallel across horizons
//! - Versioned artifact storage by horizon and stage
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_pipeline::{DataLoader, FileStore, ForecastPipeline, PipelineConfig, Stage};
//!
//! # fn main() -> forecast_pipeline::error::Result<()> {
//! let table = DataLoader::from_csv("data/gcc_monthly.csv")?;
//!
//! let pipeline = ForecastPipeline::new(PipelineConfig::default())?;
//! let report = pipeline.run(&table)?;
//!
//! let mut store = FileStore::new("models");
//! pipeline.register(&report, &mut store, Stage::Production)?;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod table;

// Re-export commonly used types
pub use crate::artifact::ModelArtifact;
pub use crate::config::{PipelineConfig, RegistryConfig};
pub use crate::error::ForecastError;
pub use crate::evaluation::{evaluate, rolling_origin_splits, EvaluationParams};
pub use crate::features::{build_features, FeatureMatrix, FeatureParams, TrainingSet};
pub use crate::models::{FittedRegressor, ModelSpec, Regressor};
pub use crate::pipeline::{ForecastPipeline, PipelineReport};
pub use crate::registry::{ArtifactStore, FileStore, InMemoryStore, Stage};
pub use crate::selection::select_best;
pub use crate::table::{DataLoader, Period, Resample, TimeSeriesTable};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
