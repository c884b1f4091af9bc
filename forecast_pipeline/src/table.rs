//! Monthly time series tables
//!
//! A [`TimeSeriesTable`] holds one row per calendar month and any number of
//! named numeric series. Loaders and cleaning helpers produce tables; the
//! feature constructor only ever reads them.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::{CsvReader, DataFrame, DataType, NamedFrom, SerReader, Series};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period, validating the month number
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::DataError(format!(
                "Month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM`, a bare `YYYY`, or a
    /// datetime string starting with a date.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let head = trimmed.get(..10).unwrap_or(trimmed);

        for format in ["%Y-%m-%d", "%Y/%m/%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(head, format) {
                return Ok(Self::from_date(date));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }
        if trimmed.len() == 4 {
            if let Ok(year) = trimmed.parse::<i32>() {
                return Self::new(year, 1);
            }
        }

        Err(ForecastError::DataError(format!(
            "Unrecognised date '{}'",
            raw
        )))
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1-12
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Quarter number, 1-4
    pub fn quarter(&self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    /// Months since January of year 0
    pub fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Inverse of [`Period::index`]
    pub fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// The period `months` months later (earlier when negative)
    pub fn offset(&self, months: i64) -> Self {
        Self::from_index(self.index() + months)
    }

    /// Signed number of months from `self` to `other`
    pub fn months_until(&self, other: &Period) -> i64 {
        other.index() - self.index()
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // Valid by construction: month is always 1-12
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// How dated observations are collapsed onto months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resample {
    /// Average of the month's observations
    Mean,
    /// Sum of the month's observations
    Sum,
    /// Latest observation in the month
    Last,
    /// Latest observation, carried into following months without data
    ForwardFill,
}

#[derive(Debug, Clone, PartialEq)]
struct NamedSeries {
    name: String,
    values: Vec<Option<f64>>,
}

/// Date-indexed table with one row per month
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    periods: Vec<Period>,
    columns: Vec<NamedSeries>,
}

impl TimeSeriesTable {
    /// Create an empty-column table over strictly increasing periods
    pub fn new(periods: Vec<Period>) -> Result<Self> {
        if let Some(pair) = periods.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(format!(
                "Periods must be strictly increasing: {} followed by {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            periods,
            columns: Vec::new(),
        })
    }

    /// A contiguous table of `len` months starting at `start`
    pub fn monthly(start: Period, len: usize) -> Self {
        Self {
            periods: (0..len as i64).map(|i| start.offset(i)).collect(),
            columns: Vec::new(),
        }
    }

    /// Append a column; names must be unique and lengths must match the index
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(ForecastError::DataError(format!(
                "Column '{}' already exists",
                name
            )));
        }
        if values.len() != self.periods.len() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' has {} values but the table has {} periods",
                name,
                values.len(),
                self.periods.len()
            )));
        }

        self.columns.push(NamedSeries { name, values });
        Ok(())
    }

    /// Builder-style variant of [`TimeSeriesTable::add_column`] for fully observed series
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.add_column(name, values.into_iter().map(Some).collect())?;
        Ok(self)
    }

    /// Resample dated observations of one series onto months
    pub fn from_observations(
        name: &str,
        observations: &[(NaiveDate, f64)],
        resample: Resample,
    ) -> Result<Self> {
        if observations.is_empty() {
            return Err(ForecastError::DataError(format!(
                "No observations for series '{}'",
                name
            )));
        }

        let mut sorted = observations.to_vec();
        sorted.sort_by_key(|(date, _)| *date);

        let mut by_month: BTreeMap<Period, Vec<f64>> = BTreeMap::new();
        for (date, value) in sorted {
            by_month.entry(Period::from_date(date)).or_default().push(value);
        }

        let first = *by_month.keys().next().ok_or_else(|| {
            ForecastError::DataError(format!("No observations for series '{}'", name))
        })?;
        let last = *by_month.keys().next_back().unwrap_or(&first);
        let len = (first.months_until(&last) + 1) as usize;

        let mut table = Self::monthly(first, len);
        let mut carried: Option<f64> = None;
        let values = table
            .periods
            .iter()
            .map(|period| {
                let aggregated = by_month.get(period).map(|month| match resample {
                    Resample::Mean => month.iter().sum::<f64>() / month.len() as f64,
                    Resample::Sum => month.iter().sum(),
                    Resample::Last | Resample::ForwardFill => month[month.len() - 1],
                });
                match (resample, aggregated) {
                    (Resample::ForwardFill, Some(v)) => {
                        carried = Some(v);
                        Some(v)
                    }
                    (Resample::ForwardFill, None) => carried,
                    (_, value) => value,
                }
            })
            .collect();

        table.add_column(name, values)?;
        Ok(table)
    }

    /// Left join on periods, keeping this table's index
    pub fn join(&self, other: &TimeSeriesTable) -> Result<Self> {
        let mut joined = self.clone();
        for column in &other.columns {
            let values = self
                .periods
                .iter()
                .map(|p| other.position(p).and_then(|i| column.values[i]))
                .collect();
            joined.add_column(column.name.clone(), values)?;
        }
        Ok(joined)
    }

    /// Copy of the table with gaps in every column filled by the last observation
    pub fn forward_filled(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut carried = None;
                let values = column
                    .values
                    .iter()
                    .map(|v| {
                        if v.is_some() {
                            carried = *v;
                        }
                        carried
                    })
                    .collect();
                NamedSeries {
                    name: column.name.clone(),
                    values,
                }
            })
            .collect();

        Self {
            periods: self.periods.clone(),
            columns,
        }
    }

    /// Copy of the table on a gap-free monthly index; inserted months are missing
    pub fn reindexed(&self) -> Self {
        let (Some(first), Some(last)) = (self.periods.first(), self.periods.last()) else {
            return self.clone();
        };
        if self.is_contiguous() {
            return self.clone();
        }

        let len = (first.months_until(last) + 1) as usize;
        let mut grid = Self::monthly(*first, len);
        grid.columns = self
            .columns
            .iter()
            .map(|column| NamedSeries {
                name: column.name.clone(),
                values: grid
                    .periods
                    .iter()
                    .map(|p| self.position(p).and_then(|i| column.values[i]))
                    .collect(),
            })
            .collect();
        grid
    }

    /// Whether consecutive rows are exactly one month apart
    pub fn is_contiguous(&self) -> bool {
        self.periods.windows(2).all(|w| w[0].offset(1) == w[1])
    }

    /// Row index of `period`
    pub fn position(&self, period: &Period) -> Option<usize> {
        self.periods.binary_search(period).ok()
    }

    /// The period index
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Values of a column, if present
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Values of a column, or a schema error naming it
    pub fn require_column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name).ok_or_else(|| ForecastError::SchemaError {
            column: name.to_string(),
        })
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of periods
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether the table has no periods
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Export as a polars DataFrame with a `date` column of month starts
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self
            .periods
            .iter()
            .map(|p| p.first_day().format("%Y-%m-%d").to_string())
            .collect();

        let mut series = vec![Series::new("date", dates)];
        for column in &self.columns {
            series.push(Series::new(&column.name, column.values.clone()));
        }

        Ok(DataFrame::new(series)?)
    }
}

/// Loader turning tabular files into [`TimeSeriesTable`]s
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a monthly table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesTable> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Build a table from a DataFrame with one date column and numeric series
    pub fn from_dataframe(df: DataFrame) -> Result<TimeSeriesTable> {
        let time_column = Self::detect_time_column(&df)?;

        let dates = df.column(&time_column)?.cast(&DataType::Utf8)?;
        let mut periods = Vec::with_capacity(df.height());
        for (row, value) in dates.utf8()?.into_iter().enumerate() {
            let raw = value.ok_or_else(|| {
                ForecastError::DataError(format!("Missing date in row {}", row))
            })?;
            periods.push(Period::parse(raw)?);
        }

        let mut series = Vec::new();
        for column in df.get_columns() {
            if column.name() == time_column {
                continue;
            }
            if !column.dtype().is_numeric() {
                debug!(column = column.name(), "skipping non-numeric column");
                continue;
            }
            let values: Vec<Option<f64>> = column
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect();
            series.push((column.name().to_string(), values));
        }

        let mut order: Vec<usize> = (0..periods.len()).collect();
        order.sort_by_key(|&i| periods[i]);
        if let Some(pair) = order.windows(2).find(|w| periods[w[0]] == periods[w[1]]) {
            return Err(ForecastError::DataError(format!(
                "Duplicate period {} in column '{}'; resample before loading",
                periods[pair[0]], time_column
            )));
        }

        let mut table = TimeSeriesTable::new(order.iter().map(|&i| periods[i]).collect())?;
        for (name, values) in series {
            table.add_column(name, order.iter().map(|&i| values[i]).collect())?;
        }

        debug!(
            rows = table.len(),
            columns = table.column_names().len(),
            "loaded time series table"
        );
        Ok(table)
    }

    /// Detect the date column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        let date_like = |dtype: &DataType| dtype.is_temporal() || dtype == &DataType::Utf8;

        for column in df.get_columns() {
            let lower_name = column.name().to_lowercase();
            let named_like_date = lower_name.contains("date")
                || lower_name.contains("time")
                || lower_name.contains("period")
                || lower_name.contains("month");
            if named_like_date && date_like(column.dtype()) {
                return Ok(column.name().to_string());
            }
        }

        if let Some(first_col) = df.get_columns().first() {
            if date_like(first_col.dtype()) {
                return Ok(first_col.name().to_string());
            }
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }
}
