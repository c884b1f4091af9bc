//! Elastic net regression fitted by cyclic coordinate descent
//!
//! Minimises
//!
//! ```text
//! 1/(2n) ||y - Xw||² + alpha * l1_ratio * ||w||₁ + alpha * (1 - l1_ratio) / 2 * ||w||²
//! ```
//!
//! over standardised features with an unpenalised intercept.

use crate::error::{ForecastError, Result};
use crate::models::{
    check_rows, check_training_data, gaussian_intervals, residual_std, FittedRegressor, Interval,
    Regressor,
};
use forecast_math::linalg::{dot, soft_threshold, Standardizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Elastic net configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticNet {
    /// Overall penalty strength
    pub alpha: f64,
    /// Share of the penalty given to the L1 term
    pub l1_ratio: f64,
    /// Maximum number of full passes over the coefficients
    pub max_iter: usize,
    /// Stop once no coefficient moves by more than this
    pub tol: f64,
}

impl Default for ElasticNet {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// Fitted elastic net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedElasticNet {
    standardizer: Standardizer,
    intercept: f64,
    coefficients: Vec<f64>,
    iterations: usize,
    residual_std: f64,
}

impl ElasticNet {
    /// Create an elastic net with the given penalty and mixing ratio
    pub fn new(alpha: f64, l1_ratio: f64) -> Result<Self> {
        let model = Self {
            alpha,
            l1_ratio,
            ..Self::default()
        };
        model.validate()?;
        Ok(model)
    }

    /// Check hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Elastic net alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ForecastError::InvalidParameter(format!(
                "Elastic net l1_ratio must be between 0 and 1, got {}",
                self.l1_ratio
            )));
        }
        if self.max_iter == 0 {
            return Err(ForecastError::InvalidParameter(
                "Elastic net max_iter must be at least 1".to_string(),
            ));
        }
        if self.tol.is_nan() || self.tol <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Elastic net tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Regressor for ElasticNet {
    type Fitted = FittedElasticNet;

    fn name(&self) -> &str {
        "elastic_net"
    }

    fn fit(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        feature_names: &[String],
    ) -> Result<FittedElasticNet> {
        self.validate()?;
        let width = check_training_data(rows, target, feature_names)?;

        let standardizer = Standardizer::fit(rows)?;
        let x = standardizer.transform(rows)?;
        let n = x.len() as f64;

        let y_mean = target.iter().sum::<f64>() / n;
        let mut residual: Vec<f64> = target.iter().map(|y| y - y_mean).collect();

        // Per-column (1/n) Σ x²; zero for constant columns
        let norms: Vec<f64> = (0..width)
            .map(|j| x.iter().map(|r| r[j] * r[j]).sum::<f64>() / n)
            .collect();

        let l1 = self.alpha * self.l1_ratio;
        let l2 = self.alpha * (1.0 - self.l1_ratio);
        let mut w = vec![0.0; width];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            iterations += 1;
            let mut max_step: f64 = 0.0;

            for j in 0..width {
                if norms[j] == 0.0 {
                    continue;
                }
                let old = w[j];
                let rho = x.iter().zip(&residual).map(|(r, e)| r[j] * e).sum::<f64>() / n
                    + norms[j] * old;
                let new = soft_threshold(rho, l1) / (norms[j] + l2);

                let step = new - old;
                if step != 0.0 {
                    for (r, e) in x.iter().zip(residual.iter_mut()) {
                        *e -= r[j] * step;
                    }
                    w[j] = new;
                }
                max_step = max_step.max(step.abs());
            }

            if max_step < self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                max_iter = self.max_iter,
                "elastic net did not converge; consider raising max_iter"
            );
        }
        debug!(
            iterations,
            non_zero = w.iter().filter(|c| **c != 0.0).count(),
            "fitted elastic net"
        );

        let fitted: Vec<f64> = x.iter().map(|r| y_mean + dot(r, &w)).collect();

        Ok(FittedElasticNet {
            standardizer,
            intercept: y_mean,
            coefficients: w,
            iterations,
            residual_std: residual_std(target, &fitted),
        })
    }
}

impl FittedElasticNet {
    /// Coefficients on the standardised features
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Coordinate descent passes used
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl FittedRegressor for FittedElasticNet {
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
        "elastic_net"
    }
}
