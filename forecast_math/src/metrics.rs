//! Point and interval accuracy metrics
//!
//! All metrics are computed over paired slices of actual and predicted
//! values and fail on empty or mismatched input rather than returning a
//! misleading zero.

use crate::{MathError, Result};

/// Guard against division by zero in percentage metrics
const EPSILON: f64 = f64::EPSILON;

fn check_pair(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute a metric over zero observations".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Root Mean Squared Error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    Ok(mse.sqrt())
}

/// Mean Absolute Error
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64)
}

/// Mean Absolute Percentage Error, in percent
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(EPSILON))
        .sum::<f64>()
        / actual.len() as f64
        * 100.0)
}

/// Symmetric Mean Absolute Percentage Error, in percent
///
/// `mean(|y - ŷ| / max((|y| + |ŷ|) / 2, ε)) * 100`
pub fn smape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let denominator = (a.abs() + p.abs()) / 2.0;
            (a - p).abs() / denominator.max(EPSILON)
        })
        .sum::<f64>()
        / actual.len() as f64
        * 100.0)
}

/// Fraction of actual values inside the closed band `[lower, upper]`
pub fn interval_coverage(actual: &[f64], lower: &[f64], upper: &[f64]) -> Result<f64> {
    check_pair(actual, lower)?;
    check_pair(actual, upper)?;

    let inside = actual
        .iter()
        .zip(lower.iter().zip(upper))
        .filter(|(a, (lo, hi))| *lo <= *a && *a <= *hi)
        .count();

    Ok(inside as f64 / actual.len() as f64)
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot average zero values".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); zero for fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_metrics() {
        let actual = [1.0, 2.0, 3.0];
        let predicted = [1.0, 2.0, 5.0];

        assert_relative_eq!(mae(&actual, &predicted).unwrap(), 2.0 / 3.0);
        assert_relative_eq!(rmse(&actual, &predicted).unwrap(), (4.0f64 / 3.0).sqrt());
        // |3 - 5| / ((3 + 5) / 2) = 0.5 on one of three points
        assert_relative_eq!(smape(&actual, &predicted).unwrap(), 50.0 / 3.0);
        assert_relative_eq!(mape(&actual, &predicted).unwrap(), 200.0 / 9.0);
    }

    #[test]
    fn test_perfect_forecast_is_zero() {
        let values = [10.0, 20.0, 30.0];
        assert_eq!(rmse(&values, &values).unwrap(), 0.0);
        assert_eq!(smape(&values, &values).unwrap(), 0.0);
    }

    #[test]
    fn test_smape_zero_pair_does_not_divide_by_zero() {
        assert_eq!(smape(&[0.0], &[0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_coverage() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let lower = [0.5, 2.5, 2.0, 4.0];
        let upper = [1.5, 3.0, 4.0, 4.0];
        assert_relative_eq!(interval_coverage(&actual, &lower, &upper).unwrap(), 0.75);
    }

    #[test]
    fn test_empty_and_mismatched_inputs() {
        assert!(rmse(&[], &[]).is_err());
        assert!(mae(&[1.0], &[1.0, 2.0]).is_err());
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn test_mean_and_std() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_relative_eq!(sample_std(&[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(sample_std(&[5.0]), 0.0);
    }
}
