//! Naive lag baseline: a univariate least-squares fit on one lag feature

use crate::error::{ForecastError, Result};
use crate::models::{
    check_rows, check_training_data, gaussian_intervals, residual_std, FittedRegressor, Interval,
    Regressor,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Naive lag baseline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveLag {
    /// Feature to regress on; the first `*_lag_1` feature when unset
    pub feature: Option<String>,
}

/// Fitted naive lag baseline, `y = intercept + slope * x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNaiveLag {
    feature: String,
    feature_index: usize,
    width: usize,
    intercept: f64,
    slope: f64,
    residual_std: f64,
}

impl NaiveLag {
    /// Baseline on an explicit feature
    pub fn on_feature(feature: impl Into<String>) -> Self {
        Self {
            feature: Some(feature.into()),
        }
    }

    fn resolve_feature(&self, feature_names: &[String]) -> Result<(usize, String)> {
        let found = match &self.feature {
            Some(name) => feature_names.iter().position(|f| f == name),
            None => feature_names.iter().position(|f| f.ends_with("_lag_1")),
        };

        found
            .map(|i| (i, feature_names[i].clone()))
            .ok_or_else(|| ForecastError::SchemaError {
                column: self
                    .feature
                    .clone()
                    .unwrap_or_else(|| "*_lag_1".to_string()),
            })
    }
}

impl Regressor for NaiveLag {
    type Fitted = FittedNaiveLag;

    fn name(&self) -> &str {
        "naive_lag"
    }

    fn fit(&self, rows: &[Vec<f64>], target: &[f64], feature_names: &[String]) -> Result<FittedNaiveLag> {
        let width = check_training_data(rows, target, feature_names)?;
        let (feature_index, feature) = self.resolve_feature(feature_names)?;

        let x: Vec<f64> = rows.iter().map(|r| r[feature_index]).collect();
        let n = x.len() as f64;
        let x_mean = x.iter().sum::<f64>() / n;
        let y_mean = target.iter().sum::<f64>() / n;

        let sxy: f64 = x.iter().zip(target).map(|(a, b)| (a - x_mean) * (b - y_mean)).sum();
        let sxx: f64 = x.iter().map(|a| (a - x_mean).powi(2)).sum();

        let slope = if sxx > 1e-12 {
            sxy / sxx
        } else {
            warn!(feature = %feature, "lag feature is constant, falling back to the target mean");
            0.0
        };
        let intercept = y_mean - slope * x_mean;

        let fitted: Vec<f64> = x.iter().map(|v| intercept + slope * v).collect();

        Ok(FittedNaiveLag {
            feature,
            feature_index,
            width,
            intercept,
            slope,
            residual_std: residual_std(target, &fitted),
        })
    }
}

impl FittedNaiveLag {
    /// The feature this baseline regresses on
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Intercept and slope
    pub fn coefficients(&self) -> (f64, f64) {
        (self.intercept, self.slope)
    }
}

impl FittedRegressor for FittedNaiveLag {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_rows(rows, self.width)?;
        Ok(rows
            .iter()
            .map(|r| self.intercept + self.slope * r[self.feature_index])
            .collect())
    }

    fn predict_interval(&self, rows: &[Vec<f64>], level: f64) -> Option<Result<Vec<Interval>>> {
        Some(
            self.predict(rows)
                .and_then(|p| gaussian_intervals(&p, self.residual_std, level)),
        )
    }

    fn name(&self) -> &str {
        "naive_lag"
    }
}
