//! # GCC Forecast
//!
//! `gcc_forecast_workspace` ties together the numerical kernels in
//! [`forecast_math`] and the monthly forecasting pipeline in
//! [`forecast_pipeline`].
//!
//! ## Example
//!
//! ```
//! use gcc_forecast_workspace::pipeline::{Period, TimeSeriesTable};
//!
//! let start = Period::new(2020, 1).unwrap();
//! let table = TimeSeriesTable::monthly(start, 3)
//!     .with_column("saudi_production", vec![9_000.0, 9_100.0, 9_050.0])
//!     .unwrap();
//! assert_eq!(table.len(), 3);
//! assert_eq!(table.periods()[2].to_string(), "2020-03");
//! ```

pub use forecast_math as math;
pub use forecast_pipeline as pipeline;

/// Horizons, in months, trained when no configuration overrides them.
///
/// ```
/// assert_eq!(gcc_forecast_workspace::default_horizons(), vec![1, 3, 6]);
/// ```
pub fn default_horizons() -> Vec<usize> {
    forecast_pipeline::features::DEFAULT_HORIZONS.to_vec()
}
