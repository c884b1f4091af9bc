//! Fitted model artifacts: the trained model plus everything needed to score
//! and audit it

use crate::error::{ForecastError, Result};
use crate::evaluation::AggregateMetrics;
use crate::models::{FittedModel, FittedRegressor, Interval};
use crate::table::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Prefix of registered model names
pub const DEFAULT_NAME_PREFIX: &str = "gcc_oil_forecast";

/// A fitted model with its schema and evaluation metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Model family name
    pub model_name: String,
    /// Forecast horizon in months
    pub horizon: usize,
    /// Ordered feature schema the model expects
    pub feature_names: Vec<String>,
    /// Cross-validated metrics
    pub metrics: AggregateMetrics,
    /// Rows used for the final fit
    pub training_rows: usize,
    /// First and last training period
    pub train_start: Period,
    pub train_end: Period,
    pub trained_at: DateTime<Utc>,
    pub model: FittedModel,
}

impl ModelArtifact {
    /// Name under which the artifact is registered, `{prefix}_h{h}_{model}`
    pub fn registered_name(&self, prefix: &str) -> String {
        format!("{}_h{}_{}", prefix, self.horizon, self.model_name)
    }

    /// Score pre-aligned rows
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.model.predict(rows)
    }

    /// Prediction intervals for pre-aligned rows
    pub fn predict_interval(&self, rows: &[Vec<f64>], level: f64) -> Option<Result<Vec<Interval>>> {
        self.model.predict_interval(rows, level)
    }

    /// Align a named feature row to the schema and score it.
    ///
    /// Extra names are ignored; a missing schema feature is a
    /// [`ForecastError::SchemaError`].
    pub fn score_row(&self, row: &HashMap<String, f64>) -> Result<f64> {
        let aligned = self
            .feature_names
            .iter()
            .map(|name| {
                row.get(name).copied().ok_or_else(|| ForecastError::SchemaError {
                    column: name.clone(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let predictions = self.model.predict(&[aligned])?;
        predictions.first().copied().ok_or_else(|| {
            ForecastError::ModelError("Model returned no prediction for one row".to_string())
        })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the artifact as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read an artifact written by [`ModelArtifact::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
