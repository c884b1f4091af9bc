//! # Forecast Math
//!
//! Numerical kernels used by the forecasting pipeline.
//! Everything in this crate works on plain slices and is free of I/O,
//! so the feature constructor and the model implementations can share it.

use thiserror::Error;

pub mod linalg;
pub mod metrics;
pub mod rolling;
pub mod tree;

/// Errors that can occur in numerical calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = MathError::InsufficientData("need 3 values".to_string());
        assert_eq!(err.to_string(), "Insufficient data for calculation: need 3 values");
    }
}
