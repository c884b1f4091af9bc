//! Least-squares linear regression on standardised features

use crate::error::{ForecastError, Result};
use crate::models::{
    check_rows, check_training_data, gaussian_intervals, residual_std, FittedRegressor, Interval,
    Regressor,
};
use forecast_math::linalg::{dot, ridge_solve, Standardizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Linear regression with a small ridge term to keep the normal equations solvable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Linear {
    /// Ridge penalty added to the Gram matrix diagonal
    pub alpha: f64,
}

impl Default for Linear {
    fn default() -> Self {
        Self { alpha: 1e-6 }
    }
}

/// Fitted linear regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedLinear {
    standardizer: Standardizer,
    intercept: f64,
    coefficients: Vec<f64>,
    residual_std: f64,
}

impl Linear {
    /// Create a linear model with the given ridge penalty
    pub fn new(alpha: f64) -> Result<Self> {
        let model = Self { alpha };
        model.validate()?;
        Ok(model)
    }

    /// Check the penalty is finite and non-negative
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Linear alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

impl Regressor for Linear {
    type Fitted = FittedLinear;

    fn name(&self) -> &str {
        "linear"
    }

    fn fit(&self, rows: &[Vec<f64>], target: &[f64], feature_names: &[String]) -> Result<FittedLinear> {
        self.validate()?;
        check_training_data(rows, target, feature_names)?;

        let standardizer = Standardizer::fit(rows)?;
        let constant = standardizer.constant_columns();
        if !constant.is_empty() {
            let names: Vec<&str> = constant.iter().map(|&i| feature_names[i].as_str()).collect();
            warn!(features = ?names, "constant features carry no signal");
        }
        let scaled = standardizer.transform(rows)?;

        let y_mean = target.iter().sum::<f64>() / target.len() as f64;
        let centred: Vec<f64> = target.iter().map(|y| y - y_mean).collect();

        let coefficients = ridge_solve(&scaled, &centred, self.alpha)
            .map_err(|e| ForecastError::ModelError(format!("Linear fit failed: {}", e)))?;
        debug!(features = coefficients.len(), rows = rows.len(), "fitted linear model");

        let fitted: Vec<f64> = scaled.iter().map(|r| y_mean + dot(r, &coefficients)).collect();

        Ok(FittedLinear {
            standardizer,
            intercept: y_mean,
            coefficients,
            residual_std: residual_std(target, &fitted),
        })
    }
}

impl FittedLinear {
    /// Coefficients on the standardised features
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Intercept, equal to the training target mean
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl FittedRegressor for FittedLinear {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_rows(rows, self.coefficients.len())?;
        rows.iter()
            .map(|r| -> Result<f64> {
                let scaled = self.standardizer.transform_row(r)?;
                Ok(self.intercept + dot(&scaled, &self.coefficients))
            })
            .collect()
    }

    fn predict_interval(&self, rows: &[Vec<f64>], level: f64) -> Option<Result<Vec<Interval>>> {
        Some(
            self.predict(rows)
                .and_then(|p| gaussian_intervals(&p, self.residual_std, level)),
        )
    }

    fn name(&self) -> &str {
        "linear"
    }
}
