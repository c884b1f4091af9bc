//! Regression models for per-horizon forecasting
//!
//! Every model is split into an unfitted configuration implementing
//! [`Regressor`] and a fitted state implementing [`FittedRegressor`]. Fitted
//! states convert into the serializable [`FittedModel`] enum so they can be
//! stored in a model artifact.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;

pub mod elastic_net;
pub mod gradient_boosting;
pub mod linear;
pub mod naive;

pub use elastic_net::{ElasticNet, FittedElasticNet};
pub use gradient_boosting::{FittedGradientBoosting, GradientBoosting};
pub use linear::{FittedLinear, Linear};
pub use naive::{FittedNaiveLag, NaiveLag};

/// Central prediction interval for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Whether `value` lies inside the closed interval
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// A fitted model that can score feature rows
pub trait FittedRegressor: Debug {
    /// Point predictions for each row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Central prediction intervals at `level`, if the model supports them
    fn predict_interval(&self, _rows: &[Vec<f64>], _level: f64) -> Option<Result<Vec<Interval>>> {
        None
    }

    /// Name of the model family
    fn name(&self) -> &str;
}

/// A model configuration that can be fitted on a training set
pub trait Regressor: Debug + Clone {
    /// The fitted state produced by [`Regressor::fit`]
    type Fitted: FittedRegressor + Into<FittedModel>;

    /// Name of the model family
    fn name(&self) -> &str;

    /// Fit on dense rows, `feature_names` giving the column schema
    fn fit(&self, rows: &[Vec<f64>], target: &[f64], feature_names: &[String])
        -> Result<Self::Fitted>;
}

/// Serializable union of every fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    NaiveLag(FittedNaiveLag),
    Linear(FittedLinear),
    ElasticNet(FittedElasticNet),
    GradientBoosting(FittedGradientBoosting),
}

impl FittedModel {
    fn inner(&self) -> &dyn FittedRegressor {
        match self {
            FittedModel::NaiveLag(m) => m,
            FittedModel::Linear(m) => m,
            FittedModel::ElasticNet(m) => m,
            FittedModel::GradientBoosting(m) => m,
        }
    }
}

impl FittedRegressor for FittedModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.inner().predict(rows)
    }

    fn predict_interval(&self, rows: &[Vec<f64>], level: f64) -> Option<Result<Vec<Interval>>> {
        self.inner().predict_interval(rows, level)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

impl From<FittedNaiveLag> for FittedModel {
    fn from(model: FittedNaiveLag) -> Self {
        FittedModel::NaiveLag(model)
    }
}

impl From<FittedLinear> for FittedModel {
    fn from(model: FittedLinear) -> Self {
        FittedModel::Linear(model)
    }
}

impl From<FittedElasticNet> for FittedModel {
    fn from(model: FittedElasticNet) -> Self {
        FittedModel::ElasticNet(model)
    }
}

impl From<FittedGradientBoosting> for FittedModel {
    fn from(model: FittedGradientBoosting) -> Self {
        FittedModel::GradientBoosting(model)
    }
}

/// Configurable candidate model, as read from pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelSpec {
    NaiveLag(NaiveLag),
    Linear(Linear),
    ElasticNet(ElasticNet),
    GradientBoosting(GradientBoosting),
}

impl ModelSpec {
    /// The default candidate line-up, in ranking tie-break order
    pub fn default_candidates() -> Vec<ModelSpec> {
        vec![
            ModelSpec::GradientBoosting(GradientBoosting::default()),
            ModelSpec::ElasticNet(ElasticNet::default()),
            ModelSpec::Linear(Linear::default()),
            ModelSpec::NaiveLag(NaiveLag::default()),
        ]
    }

    /// Check hyperparameters without fitting
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelSpec::NaiveLag(_) => Ok(()),
            ModelSpec::Linear(m) => m.validate(),
            ModelSpec::ElasticNet(m) => m.validate(),
            ModelSpec::GradientBoosting(m) => m.validate(),
        }
    }
}

impl Regressor for ModelSpec {
    type Fitted = FittedModel;

    fn name(&self) -> &str {
        match self {
            ModelSpec::NaiveLag(m) => m.name(),
            ModelSpec::Linear(m) => m.name(),
            ModelSpec::ElasticNet(m) => m.name(),
            ModelSpec::GradientBoosting(m) => m.name(),
        }
    }

    fn fit(&self, rows: &[Vec<f64>], target: &[f64], feature_names: &[String]) -> Result<FittedModel> {
        Ok(match self {
            ModelSpec::NaiveLag(m) => m.fit(rows, target, feature_names)?.into(),
            ModelSpec::Linear(m) => m.fit(rows, target, feature_names)?.into(),
            ModelSpec::ElasticNet(m) => m.fit(rows, target, feature_names)?.into(),
            ModelSpec::GradientBoosting(m) => m.fit(rows, target, feature_names)?.into(),
        })
    }
}

/// Validate a training matrix and return its width
pub(crate) fn check_training_data(
    rows: &[Vec<f64>],
    target: &[f64],
    feature_names: &[String],
) -> Result<usize> {
    if rows.is_empty() {
        return Err(ForecastError::ModelError(
            "Cannot fit a model on zero rows".to_string(),
        ));
    }
    if rows.len() != target.len() {
        return Err(ForecastError::ModelError(format!(
            "Got {} rows but {} target values",
            rows.len(),
            target.len()
        )));
    }
    let width = feature_names.len();
    if let Some(bad) = rows.iter().position(|r| r.len() != width) {
        return Err(ForecastError::ModelError(format!(
            "Row {} has {} values, schema has {} features",
            bad,
            rows[bad].len(),
            width
        )));
    }
    if rows.iter().flatten().chain(target).any(|v| !v.is_finite()) {
        return Err(ForecastError::ModelError(
            "Training data contains non-finite values".to_string(),
        ));
    }
    Ok(width)
}

/// Check prediction rows match the fitted width
pub(crate) fn check_rows(rows: &[Vec<f64>], width: usize) -> Result<()> {
    match rows.iter().position(|r| r.len() != width) {
        Some(bad) => Err(ForecastError::ModelError(format!(
            "Row {} has {} values, model was fitted on {}",
            bad,
            rows[bad].len(),
            width
        ))),
        None => Ok(()),
    }
}

/// Sample standard deviation of in-sample residuals
pub(crate) fn residual_std(target: &[f64], fitted: &[f64]) -> f64 {
    let residuals: Vec<f64> = target.iter().zip(fitted).map(|(y, f)| y - f).collect();
    forecast_math::metrics::sample_std(&residuals)
}

/// Symmetric Gaussian intervals around `predictions`
pub(crate) fn gaussian_intervals(
    predictions: &[f64],
    residual_std: f64,
    level: f64,
) -> Result<Vec<Interval>> {
    if level.is_nan() || level <= 0.0 || level >= 1.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "Interval level must lie in (0, 1), got {}",
            level
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ModelError(format!("Normal distribution: {}", e)))?;
    let margin = normal.inverse_cdf(0.5 + level / 2.0) * residual_std;

    Ok(predictions
        .iter()
        .map(|p| Interval {
            lower: p - margin,
            upper: p + margin,
        })
        .collect())
}
