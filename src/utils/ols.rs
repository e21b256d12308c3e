//! Ordinary Least Squares (OLS) regression on row-major design matrices.
//!
//! Used by the seasonal regression models for the exogenous regression and
//! for both Hannan–Rissanen stages.

use crate::error::{ImputeError, Result};

/// OLS regression coefficients and intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Intercept term.
    pub intercept: f64,
    /// Regression coefficients (one per regressor).
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    /// Predict one observation.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    /// Predict every row of a design matrix.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }
}

/// Fit `y = intercept + X @ coefficients`.
///
/// # Example
/// ```
/// use intentional_impute::utils::ols::ols_fit;
///
/// // y = 2 + 3*x
/// let x: Vec<Vec<f64>> = (1..=5).map(|i| vec![i as f64]).collect();
/// let y = vec![5.0, 8.0, 11.0, 14.0, 17.0];
/// let fit = ols_fit(&x, &y).unwrap();
/// assert!((fit.intercept - 2.0).abs() < 1e-6);
/// assert!((fit.coefficients[0] - 3.0).abs() < 1e-6);
/// ```
pub fn ols_fit(rows: &[Vec<f64>], y: &[f64]) -> Result<LinearFit> {
    let mut fits = ols_fit_multi(rows, &[y.to_vec()])?;
    fits.pop()
        .ok_or_else(|| ImputeError::InvalidParameter("no target supplied".into()))
}

/// Fit several targets against the same design matrix.
///
/// The normal equations are factored once and solved for every target.
pub fn ols_fit_multi(rows: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Vec<LinearFit>> {
    let n = rows.len();
    let k = rows.first().map_or(0, Vec::len);
    let num_params = k + 1;

    if n < num_params {
        return Err(ImputeError::InsufficientData {
            needed: num_params,
            got: n,
        });
    }
    for row in rows {
        if row.len() != k {
            return Err(ImputeError::DimensionMismatch {
                expected: k,
                got: row.len(),
            });
        }
    }
    for y in targets {
        if y.len() != n {
            return Err(ImputeError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }
    }

    // X'X with the intercept as column 0
    let mut xtx = vec![vec![0.0; num_params]; num_params];
    for row in rows {
        xtx[0][0] += 1.0;
        for j in 0..k {
            xtx[0][j + 1] += row[j];
            xtx[j + 1][0] += row[j];
            for l in 0..k {
                xtx[j + 1][l + 1] += row[j] * row[l];
            }
        }
    }

    // Relative ridge keeps collinear designs (constant covariates) solvable
    for i in 0..num_params {
        xtx[i][i] += 1e-8 * xtx[i][i].abs().max(1.0);
    }

    let chol = cholesky(&xtx).ok_or_else(|| {
        ImputeError::SingularMatrix("normal equations not positive definite".into())
    })?;

    targets
        .iter()
        .map(|y| {
            let mut xty = vec![0.0; num_params];
            for (row, yi) in rows.iter().zip(y) {
                xty[0] += yi;
                for j in 0..k {
                    xty[j + 1] += row[j] * yi;
                }
            }
            let beta = cholesky_solve(&chol, &xty);
            if beta.iter().any(|b| !b.is_finite()) {
                return Err(ImputeError::SingularMatrix(
                    "non-finite regression coefficients".into(),
                ));
            }
            Ok(LinearFit {
                intercept: beta[0],
                coefficients: beta[1..].to_vec(),
            })
        })
        .collect()
}

/// Cholesky decomposition A = L @ L' of a symmetric positive definite matrix.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve L @ L' @ x = b given the Cholesky factor L.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ols_fit_multiple_regressors() {
        // y = 1 + 2*x1 + 3*x2
        let x1 = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = [0.5, 2.5, 1.0, 3.0, 1.5, 3.5, 2.0, 4.0];
        let rows: Vec<Vec<f64>> = x1.iter().zip(&x2).map(|(a, b)| vec![*a, *b]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] + 3.0 * r[1]).collect();

        let fit = ols_fit(&rows, &y).unwrap();

        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-4);
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-4);
        assert_relative_eq!(fit.predict_row(&[10.0, 1.0]), 24.0, epsilon = 1e-3);
    }

    #[test]
    fn ols_fit_no_regressors_is_mean() {
        let rows = vec![Vec::new(); 5];
        let fit = ols_fit(&rows, &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
        assert_relative_eq!(fit.intercept, 6.0, epsilon = 1e-6);
        assert!(fit.coefficients.is_empty());
    }

    #[test]
    fn ols_fit_multi_shares_design() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y1: Vec<f64> = (0..6).map(|i| 1.0 + i as f64).collect();
        let y2: Vec<f64> = (0..6).map(|i| 4.0 - 2.0 * i as f64).collect();
        let fits = ols_fit_multi(&rows, &[y1, y2]).unwrap();

        assert_eq!(fits.len(), 2);
        assert_relative_eq!(fits[0].coefficients[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(fits[1].coefficients[0], -2.0, epsilon = 1e-5);
        assert_relative_eq!(fits[1].intercept, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn ols_constant_regressor_is_tolerated() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, 5.0]).collect();
        let y: Vec<f64> = (0..8).map(|i| 3.0 * i as f64).collect();
        let fit = ols_fit(&rows, &y).unwrap();
        let pred = fit.predict(&rows);
        for (p, t) in pred.iter().zip(&y) {
            assert_relative_eq!(p, t, epsilon = 1e-3);
        }
    }

    #[test]
    fn ols_insufficient_rows() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        let err = ols_fit(&rows, &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, ImputeError::InsufficientData { needed: 3, got: 2 });
    }

    #[test]
    fn ols_dimension_mismatch() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        assert!(ols_fit(&rows, &[1.0, 2.0]).is_err());
    }
}
