//! Coefficient-of-determination scores for held-out evaluation.

use crate::error::{ImputeError, Result};

/// Score of a prediction over the full test split and its accuracy window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldoutScore {
    /// R² over the whole test split.
    pub r2: f64,
    /// R² over the last `accuracy_size` rows of the test split.
    pub accuracy: f64,
}

/// Calculate R² between actual and predicted values.
///
/// With constant actual values the score is 1.0 for an exact prediction and
/// 0.0 otherwise. Fewer than two points give NaN.
///
/// # Example
/// ```
/// use intentional_impute::utils::metrics::r2_score;
///
/// let r2 = r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(r2, 1.0);
/// ```
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(ImputeError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if actual.len() < 2 {
        return Ok(f64::NAN);
    }

    let n = actual.len() as f64;
    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok(if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    })
}

/// Uniform average of per-output R² scores.
pub fn r2_score_multi(actual: &[Vec<f64>], predicted: &[Vec<f64>]) -> Result<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(ImputeError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    let mut total = 0.0;
    for (a, p) in actual.iter().zip(predicted) {
        total += r2_score(a, p)?;
    }
    Ok(total / actual.len() as f64)
}

/// Score the full test split and its trailing accuracy window.
pub fn holdout_score(
    actual: &[Vec<f64>],
    predicted: &[Vec<f64>],
    accuracy_size: usize,
) -> Result<HoldoutScore> {
    let tail = |s: &[Vec<f64>]| -> Vec<Vec<f64>> {
        s.iter()
            .map(|v| v[v.len().saturating_sub(accuracy_size)..].to_vec())
            .collect()
    };
    Ok(HoldoutScore {
        r2: r2_score_multi(actual, predicted)?,
        accuracy: r2_score_multi(&tail(actual), &tail(predicted))?,
    })
}

/// Whether `candidate` strictly improves on `incumbent`. NaN never improves.
pub fn improves(candidate: f64, incumbent: Option<f64>) -> bool {
    if candidate.is_nan() {
        return false;
    }
    match incumbent {
        None => true,
        Some(best) => best.is_nan() || candidate > best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_r2_perfect_and_mean() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(r2_score(&actual, &actual).unwrap(), 1.0);
        assert_relative_eq!(r2_score(&actual, &[2.5; 4]).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_r2_known_value() {
        // ss_res = 0.25 * 4 = 1.0, ss_tot = 5.0
        let r2 = r2_score(&[1.0, 2.0, 3.0, 4.0], &[1.5, 2.5, 2.5, 3.5]).unwrap();
        assert_relative_eq!(r2, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_r2_constant_actual() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]).unwrap(), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_r2_degenerate_inputs() {
        assert!(r2_score(&[1.0], &[1.0]).unwrap().is_nan());
        assert!(r2_score(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_r2_multi_averages_outputs() {
        let actual = vec![vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]];
        let predicted = vec![vec![1.0, 2.0, 3.0, 4.0], vec![2.5; 4]];
        assert_relative_eq!(r2_score_multi(&actual, &predicted).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_holdout_uses_trailing_window() {
        let actual = vec![vec![0.0, 10.0, 1.0, 2.0]];
        let predicted = vec![vec![10.0, 0.0, 1.0, 2.0]];
        let score = holdout_score(&actual, &predicted, 2).unwrap();
        assert!(score.r2 < 0.0);
        assert_eq!(score.accuracy, 1.0);
    }

    #[test]
    fn test_improves_is_strict() {
        assert!(improves(0.5, None));
        assert!(improves(0.6, Some(0.5)));
        assert!(!improves(0.5, Some(0.5)));
        assert!(!improves(f64::NAN, None));
        assert!(improves(-3.0, Some(f64::NAN)));
    }
}
