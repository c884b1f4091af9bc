//! Feature construction
//!
//! Turns a [`TimeSeriesTable`] into a fixed-width matrix of raw values,
//! lags, trailing rolling statistics and calendar encodings, plus the
//! forward-shifted targets for every forecast horizon.
//!
//! Every feature at period `t` is computed from periods `<= t` only. Values
//! that cannot be computed are left undefined and the affected rows are
//! dropped from training sets; nothing is imputed.

use crate::error::{ForecastError, Result};
use crate::table::{Period, TimeSeriesTable};
use forecast_math::rolling::{lag, lead, rolling_mean, rolling_std};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default lag offsets, in months
pub const DEFAULT_LAGS: [usize; 5] = [1, 2, 3, 6, 12];
/// Default rolling windows, in months
pub const DEFAULT_WINDOWS: [usize; 3] = [3, 6, 12];
/// Default forecast horizons, in months
pub const DEFAULT_HORIZONS: [usize; 3] = [1, 3, 6];

/// Months flagged as the summer demand peak (June to September)
const SUMMER_PEAK: std::ops::RangeInclusive<u32> = 6..=9;

/// Parameters of the feature constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Column whose future values are forecast
    pub target_column: String,
    /// Columns that get lag and rolling features; empty means every column
    pub raw_columns: Vec<String>,
    /// Lag offsets in months
    pub lags: Vec<usize>,
    /// Rolling window lengths in months
    pub windows: Vec<usize>,
    /// Forecast horizons in months
    pub horizons: Vec<usize>,
    /// Whether to append month, quarter and summer-peak encodings
    pub calendar: bool,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            target_column: "saudi_production".to_string(),
            raw_columns: Vec::new(),
            lags: DEFAULT_LAGS.to_vec(),
            windows: DEFAULT_WINDOWS.to_vec(),
            horizons: DEFAULT_HORIZONS.to_vec(),
            calendar: true,
        }
    }
}

impl FeatureParams {
    /// Default parameters forecasting `target_column`
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            ..Self::default()
        }
    }

    /// Check offsets, windows and horizons are usable
    pub fn validate(&self) -> Result<()> {
        if self.target_column.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Target column must be named".to_string(),
            ));
        }
        if self.lags.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "Lag offsets must be at least 1".to_string(),
            ));
        }
        if let Some(w) = self.windows.iter().find(|w| **w < 2) {
            return Err(ForecastError::InvalidParameter(format!(
                "Rolling windows must be at least 2 months, got {}",
                w
            )));
        }
        if self.horizons.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one forecast horizon is required".to_string(),
            ));
        }
        if self.horizons.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizons must be at least 1".to_string(),
            ));
        }
        check_unique("lag", &self.lags)?;
        check_unique("rolling window", &self.windows)?;
        check_unique("horizon", &self.horizons)?;
        check_unique("raw column", &self.raw_columns)?;
        Ok(())
    }

    /// Fewest contiguous periods giving at least one training row for
    /// `horizon`: every lag and window defined and the target observed
    pub fn periods_for_horizon(&self, horizon: usize) -> usize {
        let max_lag = self.lags.iter().max().copied().unwrap_or(0);
        let max_window = self.windows.iter().max().copied().unwrap_or(1);
        max_lag.max(max_window - 1) + horizon + 1
    }

    /// Fewest contiguous periods for which at least one value of every
    /// requested lag, window and horizon is defined
    pub fn required_periods(&self) -> usize {
        let max_lag = self.lags.iter().max().copied().unwrap_or(0);
        let max_window = self.windows.iter().max().copied().unwrap_or(1);
        let max_horizon = self.horizons.iter().max().copied().unwrap_or(0);
        (max_lag + 1).max(max_window).max(max_horizon + 1)
    }
}

fn check_unique<T: PartialEq + std::fmt::Display>(what: &str, values: &[T]) -> Result<()> {
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(ForecastError::InvalidParameter(format!(
                "Duplicate {} {}",
                what, value
            )));
        }
    }
    Ok(())
}

/// One period's feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub period: Period,
    pub values: Vec<Option<f64>>,
}

impl FeatureRow {
    /// Whether every feature is defined
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Column-major feature matrix over a contiguous monthly index
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    periods: Vec<Period>,
    feature_names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Forward-shifted target values per horizon, aligned with a [`FeatureMatrix`]
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonTargets {
    target_column: String,
    by_horizon: BTreeMap<usize, Vec<Option<f64>>>,
}

impl HorizonTargets {
    /// Targets for horizon `h`
    pub fn get(&self, horizon: usize) -> Option<&[Option<f64>]> {
        self.by_horizon.get(&horizon).map(Vec::as_slice)
    }

    /// Horizons in ascending order
    pub fn horizons(&self) -> Vec<usize> {
        self.by_horizon.keys().copied().collect()
    }

    /// Name of the forecast column
    pub fn target_column(&self) -> &str {
        &self.target_column
    }
}

/// Valid rows of a feature matrix paired with one horizon's target
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub horizon: usize,
    pub periods: Vec<Period>,
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl TrainingSet {
    /// Build a training set, checking dimensions and period order
    pub fn new(
        horizon: usize,
        periods: Vec<Period>,
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        target: Vec<f64>,
    ) -> Result<Self> {
        if periods.len() != rows.len() || rows.len() != target.len() {
            return Err(ForecastError::DataError(format!(
                "Training set has {} periods, {} rows and {} targets",
                periods.len(),
                rows.len(),
                target.len()
            )));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != feature_names.len()) {
            return Err(ForecastError::DataError(format!(
                "Row {} has {} values for {} features",
                bad,
                rows[bad].len(),
                feature_names.len()
            )));
        }
        if periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(
                "Training periods must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            horizon,
            periods,
            feature_names,
            rows,
            target,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FeatureMatrix {
    /// The period index
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of periods
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether the matrix has no periods
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Values of one feature, if present
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// The feature row at position `index`
    pub fn feature_row(&self, index: usize) -> Option<FeatureRow> {
        let period = *self.periods.get(index)?;
        Some(FeatureRow {
            period,
            values: self.columns.iter().map(|c| c[index]).collect(),
        })
    }

    /// Positions of rows where every feature is defined
    pub fn valid_rows(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.columns.iter().all(|c| c[i].is_some()))
            .collect()
    }

    /// Rows usable for horizon `h`: every feature and the target defined
    pub fn training_set(&self, targets: &HorizonTargets, horizon: usize) -> Result<TrainingSet> {
        let target = targets.get(horizon).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "No targets were built for horizon {}",
                horizon
            ))
        })?;
        if target.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Targets have {} values but the feature matrix has {} periods",
                target.len(),
                self.len()
            )));
        }

        let mut periods = Vec::new();
        let mut rows = Vec::new();
        let mut values = Vec::new();
        for i in self.valid_rows() {
            if let Some(y) = target[i] {
                periods.push(self.periods[i]);
                rows.push(self.columns.iter().flat_map(|c| c[i]).collect());
                values.push(y);
            }
        }

        debug!(
            horizon,
            valid_rows = rows.len(),
            total_rows = self.len(),
            "assembled training set"
        );
        TrainingSet::new(horizon, periods, self.feature_names.clone(), rows, values)
    }

    /// Write the matrix and its targets as CSV; undefined values are empty cells
    pub fn write_csv<P: AsRef<Path>>(&self, path: P, targets: &HorizonTargets) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["date".to_string()];
        header.extend(self.feature_names.iter().cloned());
        header.extend(
            targets
                .horizons()
                .iter()
                .map(|h| format!("target_h{}", h)),
        );
        writer.write_record(&header)?;

        let format = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        for (i, period) in self.periods.iter().enumerate() {
            let mut record = vec![period.first_day().format("%Y-%m-%d").to_string()];
            record.extend(self.columns.iter().map(|c| format(c[i])));
            for horizon in targets.horizons() {
                let value = targets.get(horizon).and_then(|t| t.get(i).copied().flatten());
                record.push(format(value));
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Build the feature matrix and per-horizon targets for `table`.
///
/// Fails with [`ForecastError::SchemaError`] when the target or a raw column
/// is missing, with [`ForecastError::InvalidParameter`] when two features
/// would share a name, and with [`ForecastError::InsufficientHistory`] when
/// the table holds fewer periods than the largest lag, window or horizon
/// needs or no row ends up with every feature defined.
pub fn build_features(
    table: &TimeSeriesTable,
    params: &FeatureParams,
) -> Result<(FeatureMatrix, HorizonTargets)> {
    params.validate()?;

    table.require_column(&params.target_column)?;
    let derived: Vec<String> = if params.raw_columns.is_empty() {
        table.column_names().iter().map(|s| s.to_string()).collect()
    } else {
        params.raw_columns.clone()
    };
    for name in &derived {
        table.require_column(name)?;
    }

    let required = params.required_periods();
    if table.len() < required {
        return Err(ForecastError::InsufficientHistory {
            available: table.len(),
            required,
        });
    }
    let grid = table.reindexed();

    let mut feature_names = Vec::new();
    let mut columns = Vec::new();

    for name in grid.column_names() {
        feature_names.push(name.to_string());
        columns.push(grid.require_column(name)?.to_vec());
    }

    for name in &derived {
        let values = grid.require_column(name)?;
        for &k in &params.lags {
            feature_names.push(format!("{}_lag_{}", name, k));
            columns.push(lag(values, k));
        }
        for &w in &params.windows {
            feature_names.push(format!("{}_roll_mean_{}", name, w));
            columns.push(rolling_mean(values, w)?);
            feature_names.push(format!("{}_roll_std_{}", name, w));
            columns.push(rolling_std(values, w)?);
        }
    }

    if params.calendar {
        let periods = grid.periods();
        feature_names.push("month".to_string());
        columns.push(periods.iter().map(|p| Some(p.month() as f64)).collect());
        feature_names.push("quarter".to_string());
        columns.push(periods.iter().map(|p| Some(p.quarter() as f64)).collect());
        feature_names.push("summer_peak".to_string());
        columns.push(
            periods
                .iter()
                .map(|p| Some(if SUMMER_PEAK.contains(&p.month()) { 1.0 } else { 0.0 }))
                .collect(),
        );
    }

    check_unique("feature name", &feature_names)?;

    let features = FeatureMatrix {
        periods: grid.periods().to_vec(),
        feature_names,
        columns,
    };
    if features.valid_rows().is_empty() {
        return Err(ForecastError::InsufficientHistory {
            available: table.len(),
            required,
        });
    }

    let target_values = grid.require_column(&params.target_column)?;
    let mut by_horizon = BTreeMap::new();
    for &h in &params.horizons {
        by_horizon.insert(h, lead(target_values, h));
    }

    debug!(
        periods = grid.len(),
        features = features.feature_names.len(),
        horizons = ?params.horizons,
        "built feature matrix"
    );

    Ok((
        features,
        HorizonTargets {
            target_column: params.target_column.clone(),
            by_horizon,
        },
    ))
}
