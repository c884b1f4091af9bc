//! Small dense linear algebra for least-squares models
//!
//! Feature matrices in this project are a few hundred rows by a few dozen
//! columns, so a Cholesky solve on the normal equations is plenty.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Column-wise standardisation fitted on a training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    /// Fit per-column means and population standard deviations.
    ///
    /// Constant columns get a scale of zero and standardise to zero.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = check_rectangular(rows)?;
        let n = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in scales.iter_mut() {
            *s = (*s / n).sqrt();
            if *s < 1e-12 {
                *s = 0.0;
            }
        }

        Ok(Self { means, scales })
    }

    /// Standardise one row
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(MathError::InvalidInput(format!(
                "Row has {} values, standardizer was fitted on {}",
                row.len(),
                self.means.len()
            )));
        }

        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| if *s == 0.0 { 0.0 } else { (v - m) / s })
            .collect())
    }

    /// Standardise every row
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Indices of columns that were constant in the training data
    pub fn constant_columns(&self) -> Vec<usize> {
        self.scales
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == 0.0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Check the matrix is non-empty with rows of equal length and return the width
pub fn check_rectangular(rows: &[Vec<f64>]) -> Result<usize> {
    let first = rows.first().ok_or_else(|| {
        MathError::InsufficientData("Matrix has no rows".to_string())
    })?;
    let width = first.len();
    if let Some(bad) = rows.iter().position(|r| r.len() != width) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} columns, expected {}",
            bad,
            rows[bad].len(),
            width
        )));
    }
    Ok(width)
}

/// Dot product of two equal-length slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Soft-thresholding operator used by coordinate descent
pub fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Solve `(XᵀX + ridge·I) β = Xᵀy` for β
pub fn ridge_solve(rows: &[Vec<f64>], target: &[f64], ridge: f64) -> Result<Vec<f64>> {
    let width = check_rectangular(rows)?;
    if rows.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Matrix has {} rows but target has {} values",
            rows.len(),
            target.len()
        )));
    }
    if ridge < 0.0 {
        return Err(MathError::InvalidInput(
            "Ridge penalty must be non-negative".to_string(),
        ));
    }

    let mut gram = vec![vec![0.0; width]; width];
    let mut rhs = vec![0.0; width];
    for (row, y) in rows.iter().zip(target) {
        for i in 0..width {
            rhs[i] += row[i] * y;
            for j in 0..=i {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..width {
        for j in 0..i {
            gram[j][i] = gram[i][j];
        }
        gram[i][i] += ridge;
    }

    cholesky_solve(gram, rhs)
}

/// Solve `A x = b` for a symmetric positive definite `A`
pub fn cholesky_solve(a: Vec<Vec<f64>>, b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(
            "Cholesky solve needs a square matrix matching the right-hand side".to_string(),
        ));
    }

    // Lower-triangular factor, A = L Lᵀ
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - dot(&l[i][..j], &l[j][..j]);
            if i == j {
                if sum <= 0.0 {
                    return Err(MathError::CalculationError(format!(
                        "Matrix is not positive definite (pivot {} = {:e})",
                        i, sum
                    )));
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        z[i] = (b[i] - dot(&l[i][..i], &z[..i])) / l[i][i];
    }

    // Back substitution: Lᵀ x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (z[i] - tail) / l[i][i];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cholesky_solve() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let x = cholesky_solve(a, vec![2.0, 1.0]).unwrap();
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!(cholesky_solve(a, vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_ridge_recovers_exact_coefficients() {
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, (i * i) as f64 / 10.0])
            .collect();
        let target: Vec<f64> = rows.iter().map(|r| 3.0 * r[0] - 2.0 * r[1]).collect();
        let beta = ridge_solve(&rows, &target, 0.0).unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-8);
        assert_relative_eq!(beta[1], -2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_standardizer_handles_constant_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = Standardizer::fit(&rows).unwrap();
        assert_eq!(scaler.constant_columns(), vec![1]);
        let z = scaler.transform_row(&[3.0, 5.0]).unwrap();
        assert_relative_eq!(z[0], 1.0);
        assert_eq!(z[1], 0.0);
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn test_ragged_matrix_is_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(check_rectangular(&rows).is_err());
    }
}
