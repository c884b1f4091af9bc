//! Rolling-origin cross-validation
//!
//! Folds are carved newest-first from the valid rows of a [`TrainingSet`]:
//! fold 0 tests the most recent `test_size` rows, fold 1 the block before
//! it, and so on. Each fold trains on every row whose period `p` satisfies
//! `p + h <= test_start`, so no training target is observed after the test
//! window opens.

use crate::artifact::ModelArtifact;
use crate::error::{ForecastError, Result};
use crate::features::TrainingSet;
use crate::models::{FittedRegressor, Regressor};
use crate::table::Period;
use chrono::Utc;
use forecast_math::metrics;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

/// Parameters of the rolling-origin evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationParams {
    /// Number of folds
    pub folds: usize,
    /// Rows per test window
    pub test_size: usize,
    /// Interval coverage levels to report
    pub interval_levels: Vec<f64>,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self {
            folds: 5,
            test_size: 1,
            interval_levels: vec![0.8, 0.95],
        }
    }
}

impl EvaluationParams {
    /// Check fold counts and interval levels
    pub fn validate(&self) -> Result<()> {
        if self.folds == 0 {
            return Err(ForecastError::InvalidParameter(
                "At least one fold is required".to_string(),
            ));
        }
        if self.test_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Test windows must hold at least one row".to_string(),
            ));
        }
        if let Some(level) = self
            .interval_levels
            .iter()
            .find(|l| l.is_nan() || **l <= 0.0 || **l >= 1.0)
        {
            return Err(ForecastError::InvalidParameter(format!(
                "Interval levels must lie in (0, 1), got {}",
                level
            )));
        }
        Ok(())
    }
}

/// Train and test row ranges of one fold
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// 0 is the most recent fold
    pub fold: usize,
    pub horizon: usize,
    pub train: Range<usize>,
    pub test: Range<usize>,
    pub train_end: Period,
    pub test_start: Period,
    pub test_end: Period,
}

impl Split {
    /// Check the training targets all resolve before the test window opens
    pub fn check_leakage(&self) -> Result<()> {
        if self.train.end > self.test.start {
            return Err(ForecastError::LeakageGuard(format!(
                "fold {}: train rows {:?} overlap test rows {:?}",
                self.fold, self.train, self.test
            )));
        }
        if self.train_end.offset(self.horizon as i64) > self.test_start {
            return Err(ForecastError::LeakageGuard(format!(
                "fold {}: training ends {} but horizon {} reaches past test start {}",
                self.fold, self.train_end, self.horizon, self.test_start
            )));
        }
        Ok(())
    }
}

/// Carve `folds` newest-first rolling-origin splits over sorted `periods`.
///
/// Fails with [`ForecastError::InsufficientFolds`] when a fold would have
/// an empty test or training window.
pub fn rolling_origin_splits(
    periods: &[Period],
    horizon: usize,
    folds: usize,
    test_size: usize,
) -> Result<Vec<Split>> {
    if folds == 0 || test_size == 0 {
        return Err(ForecastError::InvalidParameter(
            "Folds and test size must both be at least 1".to_string(),
        ));
    }
    if periods.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ForecastError::DataError(
            "Periods must be strictly increasing".to_string(),
        ));
    }

    let n = periods.len();
    let mut splits = Vec::with_capacity(folds);

    for fold in 0..folds {
        let Some(test_begin) = n.checked_sub((fold + 1) * test_size) else {
            break;
        };
        let test = test_begin..test_begin + test_size;
        let test_start = periods[test.start];
        let test_end = periods[test.end - 1];

        let train_len =
            periods[..test.start].partition_point(|p| p.offset(horizon as i64) <= test_start);
        if train_len == 0 {
            break;
        }

        let split = Split {
            fold,
            horizon,
            train: 0..train_len,
            test,
            train_end: periods[train_len - 1],
            test_start,
            test_end,
        };
        split.check_leakage()?;
        splits.push(split);
    }

    if splits.len() < folds {
        return Err(ForecastError::InsufficientFolds {
            requested: folds,
            available: splits.len(),
            horizon,
        });
    }

    Ok(splits)
}

/// Share of actuals inside the prediction intervals at one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetric {
    pub level: f64,
    pub coverage: f64,
}

/// Error metrics of one fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// Symmetric MAPE in percent
    pub smape: f64,
    pub coverage: Vec<CoverageMetric>,
}

/// Mean of each metric across folds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub smape: f64,
    /// Levels reported by every fold
    pub coverage: Vec<CoverageMetric>,
    pub folds: usize,
}

impl AggregateMetrics {
    /// Unweighted mean of the per-fold metrics
    pub fn from_folds(folds: &[FoldMetrics]) -> Result<Self> {
        let Some(first) = folds.first() else {
            return Err(ForecastError::DataError(
                "Cannot aggregate metrics over zero folds".to_string(),
            ));
        };

        let average = |f: fn(&FoldMetrics) -> f64| -> Result<f64> {
            Ok(metrics::mean(&folds.iter().map(f).collect::<Vec<_>>())?)
        };

        let mut coverage = Vec::new();
        for c in &first.coverage {
            let per_fold: Option<Vec<f64>> = folds
                .iter()
                .map(|f| {
                    f.coverage
                        .iter()
                        .find(|x| x.level == c.level)
                        .map(|x| x.coverage)
                })
                .collect();
            if let Some(values) = per_fold {
                coverage.push(CoverageMetric {
                    level: c.level,
                    coverage: metrics::mean(&values)?,
                });
            }
        }

        Ok(Self {
            rmse: average(|f| f.rmse)?,
            mae: average(|f| f.mae)?,
            smape: average(|f| f.smape)?,
            coverage,
            folds: folds.len(),
        })
    }

    /// Coverage at `level`, if every fold reported it
    pub fn coverage_at(&self, level: f64) -> Option<f64> {
        self.coverage
            .iter()
            .find(|c| c.level == level)
            .map(|c| c.coverage)
    }
}

/// Outcome of one fold
#[derive(Debug, Clone, PartialEq)]
pub struct FoldResult {
    pub split: Split,
    pub metrics: FoldMetrics,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

/// Cross-validation of one model on one horizon, plus its full-history fit
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model_name: String,
    pub horizon: usize,
    /// Newest fold first
    pub folds: Vec<FoldResult>,
    pub metrics: AggregateMetrics,
    pub artifact: ModelArtifact,
}

fn score_fold<M: FittedRegressor>(
    fitted: &M,
    rows: &[Vec<f64>],
    actual: &[f64],
    levels: &[f64],
) -> Result<(Vec<f64>, FoldMetrics)> {
    let predicted = fitted.predict(rows)?;

    let mut coverage = Vec::new();
    for &level in levels {
        if let Some(intervals) = fitted.predict_interval(rows, level) {
            let intervals = intervals?;
            let lower: Vec<f64> = intervals.iter().map(|i| i.lower).collect();
            let upper: Vec<f64> = intervals.iter().map(|i| i.upper).collect();
            coverage.push(CoverageMetric {
                level,
                coverage: metrics::interval_coverage(actual, &lower, &upper)?,
            });
        }
    }

    let fold_metrics = FoldMetrics {
        rmse: metrics::rmse(actual, &predicted)?,
        mae: metrics::mae(actual, &predicted)?,
        smape: metrics::smape(actual, &predicted)?,
        coverage,
    };
    Ok((predicted, fold_metrics))
}

/// Cross-validate the models produced by `factory` on `set`, then fit a
/// fresh one on every row to produce the artifact.
///
/// `factory` is called once per fold and once for the final fit, so no
/// fitted state crosses folds.
pub fn evaluate<R, F>(set: &TrainingSet, params: &EvaluationParams, factory: F) -> Result<Evaluation>
where
    R: Regressor,
    F: Fn() -> R,
{
    params.validate()?;
    let splits = rolling_origin_splits(&set.periods, set.horizon, params.folds, params.test_size)?;

    let mut folds = Vec::with_capacity(splits.len());
    for split in splits {
        let model = factory();
        let fitted = model.fit(
            &set.rows[split.train.clone()],
            &set.target[split.train.clone()],
            &set.feature_names,
        )?;

        let actual = set.target[split.test.clone()].to_vec();
        let (predicted, fold_metrics) = score_fold(
            &fitted,
            &set.rows[split.test.clone()],
            &actual,
            &params.interval_levels,
        )?;

        debug!(
            model = model.name(),
            horizon = set.horizon,
            fold = split.fold,
            train_rows = split.train.len(),
            test_start = %split.test_start,
            rmse = fold_metrics.rmse,
            "evaluated fold"
        );

        folds.push(FoldResult {
            split,
            metrics: fold_metrics,
            actual,
            predicted,
        });
    }

    let fold_metrics: Vec<FoldMetrics> = folds.iter().map(|f| f.metrics.clone()).collect();
    let aggregate = AggregateMetrics::from_folds(&fold_metrics)?;

    let model = factory();
    let model_name = model.name().to_string();
    let fitted = model.fit(&set.rows, &set.target, &set.feature_names)?;

    let (train_start, train_end) = match (set.periods.first(), set.periods.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ForecastError::DataError(
                "Training set is empty".to_string(),
            ))
        }
    };

    let artifact = ModelArtifact {
        model_name: model_name.clone(),
        horizon: set.horizon,
        feature_names: set.feature_names.clone(),
        metrics: aggregate.clone(),
        training_rows: set.len(),
        train_start,
        train_end,
        trained_at: Utc::now(),
        model: fitted.into(),
    };

    debug!(
        model = %model_name,
        horizon = set.horizon,
        rmse = aggregate.rmse,
        mae = aggregate.mae,
        smape = aggregate.smape,
        "finished rolling-origin evaluation"
    );

    Ok(Evaluation {
        model_name,
        horizon: set.horizon,
        folds,
        metrics: aggregate,
        artifact,
    })
}
