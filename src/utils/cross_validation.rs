//! K-fold cross-validation for tabular regressors.

use crate::error::{ImputeError, Result};
use crate::models::Regressor;
use crate::utils::metrics::r2_score;
use std::ops::Range;

/// Contiguous, unshuffled K-fold partition of `n` rows.
///
/// The first `n % k` folds hold one extra row.
pub fn kfold(n: usize, k: usize) -> Result<Vec<Range<usize>>> {
    if k < 2 || k > n {
        return Err(ImputeError::InvalidParameter(format!(
            "cannot split {n} rows into {k} folds"
        )));
    }
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = base + usize::from(i < extra);
        folds.push(start..start + size);
        start += size;
    }
    Ok(folds)
}

/// Results from cross-validation.
#[derive(Debug, Clone)]
pub struct CVResults {
    /// R² of each fold.
    pub fold_scores: Vec<f64>,
    /// Mean R² across folds.
    pub mean_score: f64,
}

/// Cross-validate a regressor by mean R² over K folds.
///
/// # Arguments
/// * `x` - Feature rows
/// * `y` - Targets
/// * `folds` - Requested number of folds, reduced to the number of rows
/// * `model_factory` - Creates a fresh model for each fold
pub fn cross_validate<R, Factory>(
    x: &[Vec<f64>],
    y: &[f64],
    folds: usize,
    model_factory: Factory,
) -> Result<CVResults>
where
    R: Regressor,
    Factory: Fn() -> R,
{
    if x.len() != y.len() {
        return Err(ImputeError::DimensionMismatch {
            expected: y.len(),
            got: x.len(),
        });
    }
    let n = y.len();
    let mut fold_scores = Vec::new();

    for fold in kfold(n, folds.min(n))? {
        let train: Vec<usize> = (0..n).filter(|i| !fold.contains(i)).collect();
        let x_train: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();

        let mut model = model_factory();
        model.fit(&x_train, &y_train)?;
        let predicted = model.predict(&x[fold.clone()])?;
        fold_scores.push(r2_score(&y[fold], &predicted)?);
    }

    let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
    Ok(CVResults {
        fold_scores,
        mean_score,
    })
}
