//! Lag and trailing-window statistics over series with missing values
//!
//! Every function here is causal: the output at position `t` only reads
//! input positions `<= t`. Missing input (`None`) makes any window that
//! contains it undefined.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Shift a series forward by `offset` positions.
///
/// `output[t] = values[t - offset]`, undefined for the first `offset` positions.
pub fn lag(values: &[Option<f64>], offset: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| {
            if t >= offset {
                values[t - offset]
            } else {
                None
            }
        })
        .collect()
}

/// Shift a series backward by `offset` positions.
///
/// `output[t] = values[t + offset]`, undefined for the last `offset` positions.
/// Only used to build forecast targets, never features.
pub fn lead(values: &[Option<f64>], offset: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| values.get(t + offset).copied().flatten())
        .collect()
}

/// Trailing window over the most recent `window` observations
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: usize,
    values: VecDeque<Option<f64>>,
    missing: usize,
}

impl RollingWindow {
    /// Create a new trailing window of the given length
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            window,
            values: VecDeque::with_capacity(window),
            missing: 0,
        })
    }

    /// Push the next observation, evicting the oldest once the window is full
    pub fn push(&mut self, value: Option<f64>) {
        if value.is_none() {
            self.missing += 1;
        }
        self.values.push_back(value);

        if self.values.len() > self.window {
            if let Some(None) = self.values.pop_front() {
                self.missing -= 1;
            }
        }
    }

    /// Whether the window holds `window` observations and none are missing
    pub fn is_complete(&self) -> bool {
        self.values.len() == self.window && self.missing == 0
    }

    /// Mean of the window, if complete
    pub fn mean(&self) -> Option<f64> {
        if !self.is_complete() {
            return None;
        }

        let sum: f64 = self.values.iter().flatten().sum();
        Some(sum / self.window as f64)
    }

    /// Sample standard deviation (n - 1) of the window, if complete
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_complete() || self.window < 2 {
            return None;
        }

        let mean = self.mean()?;
        let variance = self
            .values
            .iter()
            .flatten()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (self.window - 1) as f64;

        Some(variance.sqrt())
    }

    /// Window length
    pub fn window(&self) -> usize {
        self.window
    }
}

/// Trailing mean over `[t - window + 1, t]` for every position
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    let mut rolling = RollingWindow::new(window)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.push(v);
            rolling.mean()
        })
        .collect())
}

/// Trailing sample standard deviation over `[t - window + 1, t]`
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    if window < 2 {
        return Err(MathError::InvalidInput(format!(
            "Standard deviation window must be at least 2, got {}",
            window
        )));
    }

    let mut rolling = RollingWindow::new(window)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.push(v);
            rolling.std_dev()
        })
        .collect())
}
