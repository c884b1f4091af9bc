//! Gradient boosted regression trees with squared-error loss
//!
//! Each round fits a [`RegressionTree`] to the current residuals on a random
//! subsample of rows and columns, then adds it to the ensemble scaled by the
//! learning rate. The random generator is seeded, so a given configuration
//! always produces the same ensemble.

use crate::error::{ForecastError, Result};
use crate::models::{
    check_rows, check_training_data, gaussian_intervals, residual_std, FittedRegressor, Interval,
    Regressor,
};
use forecast_math::tree::{RegressionTree, TreeParams};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gradient boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Maximum leaves per tree; trees grow leaf-wise up to this count
    pub num_leaves: usize,
    /// Minimum rows on each side of a split
    pub min_child_samples: usize,
    /// Share of rows drawn for each tree
    pub subsample: f64,
    /// Share of columns drawn for each tree
    pub colsample_bytree: f64,
    pub seed: u64,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.05,
            max_depth: 6,
            num_leaves: 31,
            min_child_samples: 20,
            subsample: 0.8,
            colsample_bytree: 0.8,
            seed: 42,
        }
    }
}

/// Fitted boosted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedGradientBoosting {
    base_score: f64,
    learning_rate: f64,
    width: usize,
    trees: Vec<RegressionTree>,
    residual_std: f64,
}

impl GradientBoosting {
    /// Check hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "num_leaves must be at least 2, got {}",
                self.num_leaves
            )));
        }
        if self.min_child_samples == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_child_samples must be at least 1".to_string(),
            ));
        }
        for (name, share) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(share > 0.0 && share <= 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    name, share
                )));
            }
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            max_leaves: self.num_leaves,
            min_samples_leaf: self.min_child_samples,
        }
    }
}

/// Number of items kept when drawing `share` of `total`, at least one
fn draw_size(total: usize, share: f64) -> usize {
    ((total as f64 * share).round() as usize).clamp(1, total)
}

impl Regressor for GradientBoosting {
    type Fitted = FittedGradientBoosting;

    fn name(&self) -> &str {
        "gradient_boosting"
    }

    fn fit(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        feature_names: &[String],
    ) -> Result<FittedGradientBoosting> {
        self.validate()?;
        let width = check_training_data(rows, target, feature_names)?;
        if width == 0 {
            return Err(ForecastError::ModelError(
                "Gradient boosting needs at least one feature".to_string(),
            ));
        }

        let n = rows.len();
        let base_score = target.iter().sum::<f64>() / n as f64;
        let mut fitted = vec![base_score; n];
        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = self.tree_params();
        let row_draw = draw_size(n, self.subsample);
        let col_draw = draw_size(width, self.colsample_bytree);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let residuals: Vec<f64> = target.iter().zip(&fitted).map(|(y, f)| y - f).collect();

            let mut row_idx = sample(&mut rng, n, row_draw).into_vec();
            row_idx.sort_unstable();
            let mut col_idx = sample(&mut rng, width, col_draw).into_vec();
            col_idx.sort_unstable();

            let tree = RegressionTree::fit(rows, &residuals, &row_idx, &col_idx, params)?;
            for (f, row) in fitted.iter_mut().zip(rows) {
                *f += self.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        debug!(
            trees = trees.len(),
            splits = trees.iter().map(RegressionTree::num_splits).sum::<usize>(),
            "fitted gradient boosting"
        );

        Ok(FittedGradientBoosting {
            base_score,
            learning_rate: self.learning_rate,
            width,
            residual_std: residual_std(target, &fitted),
            trees,
        })
    }
}

impl FittedGradientBoosting {
    /// Number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Leaf count of the largest tree
    pub fn max_leaves(&self) -> usize {
        self.trees
            .iter()
            .map(RegressionTree::num_leaves)
            .max()
            .unwrap_or(0)
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>()
    }
}

impl FittedRegressor for FittedGradientBoosting {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_rows(rows, self.width)?;
        Ok(rows.iter().map(|r| self.predict_row(r)).collect())
    }

    fn predict_interval(&self, rows: &[Vec<f64>], level: f64) -> Option<Result<Vec<Interval>>> {
        Some(
            self.predict(rows)
                .and_then(|p| gaussian_intervals(&p, self.residual_std, level)),
        )
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}
