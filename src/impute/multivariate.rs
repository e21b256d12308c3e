//! VARMAX trainer over every slice of one measure.
//!
//! All series of the measure are modelled jointly with the remaining wide
//! columns as covariates. A row is used for fitting only when every series
//! is observed in it; predictions are written only into cells that were
//! missing.

use crate::config::RunConfig;
use crate::core::Table;
use crate::error::{ImputeError, Result};
use crate::impute::{covariates, fill_gaps, to_rows, Imputation, ORDER_GRID};
use crate::models::arima::Varmax;
use crate::models::Forecaster;
use crate::reshape::measure_columns;
use crate::search::{HyperParams, ParamGrid, RandomSearch};
use crate::utils::metrics::holdout_score;
use crate::utils::split::TrainTestSplit;

/// Model name used in logs and metrics.
pub const NAME: &str = "multivariateTS";

/// (p, q) grid. The (0, 0) corner is kept and fails as a trial.
pub fn grid() -> ParamGrid {
    ParamGrid::new()
        .with("p", ORDER_GRID.to_vec())
        .with("q", vec![0, 1, 2])
}

fn model_of(hp: &HyperParams) -> Varmax {
    Varmax::new(hp.get("p"), hp.get("q"))
}

/// Counts reported for a multivariate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Number of endogenous series.
    pub endog: usize,
    /// Number of covariates.
    pub exog: usize,
}

/// Fill the missing cells of every `measure` column of `wide`.
pub fn train(
    wide: &Table,
    measure: &str,
    test_size: usize,
    accuracy_size: usize,
    config: &RunConfig,
) -> Result<(Imputation, Dimensions)> {
    let targets = measure_columns(wide, measure, config.separator);
    if targets.is_empty() {
        return Err(ImputeError::ColumnNotFound(measure.to_string()));
    }
    let exog_columns: Vec<Vec<f64>> = covariates(wide, measure, config.separator)
        .into_iter()
        .map(|(_, values)| values)
        .collect();
    let dims = Dimensions {
        endog: targets.len(),
        exog: exog_columns.len(),
    };

    let series: Vec<&[Option<f64>]> = targets
        .iter()
        .map(|name| wide.numeric(name))
        .collect::<Result<_>>()?;
    let missing: Vec<bool> = (0..wide.n_rows())
        .map(|i| series.iter().any(|s| s[i].map_or(true, f64::is_nan)))
        .collect();
    if !missing.contains(&true) {
        log::debug!("{NAME}: no missing values in {measure}");
        return Ok((Imputation::unchanged(wide), dims));
    }

    let observed: Vec<usize> = (0..wide.n_rows()).filter(|&i| !missing[i]).collect();
    let endog: Vec<Vec<f64>> = series
        .iter()
        .map(|s| observed.iter().filter_map(|&i| s[i]).collect())
        .collect();
    let exog = to_rows(&exog_columns, &observed);
    let split = TrainTestSplit::new(observed.len(), test_size, accuracy_size);

    let slice_rows = |range: std::ops::Range<usize>| -> Vec<Vec<f64>> {
        endog.iter().map(|s| s[range.clone()].to_vec()).collect()
    };
    let (train_endog, test_endog) = (slice_rows(split.train()), slice_rows(split.test()));

    let result = RandomSearch::new(NAME, config.n_iter, config.seed).run(&grid(), |hp| {
        let mut model = model_of(hp);
        model.fit(&train_endog, &exog[split.train()])?;
        let forecast = model.forecast(split.test_len(), &exog[split.test()])?;
        holdout_score(&test_endog, forecast.point(), split.accuracy_len())
    });

    let mut imputation = Imputation {
        split: Some(split),
        successes: result.successes(),
        success_millis: Some(result.success_millis()),
        ..Imputation::unchanged(wide)
    };
    let (best, score) = match result.require_best(NAME) {
        Ok((best, score)) => (best.clone(), *score),
        Err(err) => {
            log::warn!("{NAME}({measure}) - final fit: {err}");
            imputation.failure = Some(err);
            return Ok((imputation, dims));
        }
    };
    imputation.score = Some(score.r2);
    imputation.accuracy = Some(score.accuracy);

    let mut model = model_of(&best);
    match model.fit(&endog, &exog) {
        Ok(()) => {
            let all_rows: Vec<usize> = (0..wide.n_rows()).collect();
            let exog_all = to_rows(&exog_columns, &all_rows);
            let mut table = wide.clone();
            let gaps = fill_gaps(&model, &mut table, &targets, &missing, &exog_all)?;
            log::info!("{NAME}({measure}) {best}: filled {} cells", gaps.filled.len());
            imputation.table = table;
            imputation.filled = Some(gaps.filled);
            imputation.failure = gaps.unfilled;
        }
        Err(err) => {
            log::warn!("{NAME}({best}) - final fit: {err}");
            imputation.failure = Some(err);
        }
    }
    imputation.best = Some(best);
    Ok((imputation, dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn wide(n: usize) -> Table {
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = vec![10.0];
        let mut b = vec![20.0];
        for t in 1..n {
            a.push(5.0 + 0.5 * a[t - 1] + rng.gen_range(-1.0..1.0));
            b.push(10.0 + 0.3 * a[t - 1] + 0.4 * b[t - 1] + rng.gen_range(-1.0..1.0));
        }
        let a: Vec<Option<f64>> = a
            .into_iter()
            .enumerate()
            .map(|(t, v)| (t < n - 3).then_some(v))
            .collect();
        let mut b: Vec<Option<f64>> = b.into_iter().map(Some).collect();
        b[n / 2] = None;
        Table::from_columns(vec![
            Column::numeric("adults!BO", a),
            Column::numeric("adults!RA", b),
            Column::dense("rain!BO", (0..n).map(|i| (i % 4) as f64).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_fills_only_missing_cells() {
        let table = wide(80);
        let (out, dims) = train(&table, "adults", 10, 5, &RunConfig::default()).unwrap();

        assert_eq!(dims, Dimensions { endog: 2, exog: 1 });
        assert_eq!(out.filled_count(), 4);
        for name in ["adults!BO", "adults!RA"] {
            let before = table.numeric(name).unwrap();
            let after = out.table.numeric(name).unwrap();
            for (b, a) in before.iter().zip(after) {
                if b.is_some() {
                    assert_eq!(b, a);
                } else {
                    assert!(a.is_some_and(f64::is_finite));
                }
            }
        }
    }

    #[test]
    fn test_fills_leading_gap() {
        let mut table = wide(80);
        let bo = table.numeric_mut("adults!BO").unwrap();
        bo[0] = None;
        bo[1] = None;
        for v in &mut bo[77..] {
            *v = Some(10.0);
        }
        table.numeric_mut("adults!RA").unwrap()[40] = Some(20.0);

        let (out, _) = train(&table, "adults", 10, 5, &RunConfig::default()).unwrap();
        assert!(out.failure.is_none());
        assert_eq!(out.filled_count(), 2);
        let bo = out.table.numeric("adults!BO").unwrap();
        assert!(bo[..2].iter().all(|v| v.is_some_and(f64::is_finite)));
        assert_eq!(
            out.table.numeric("adults!RA").unwrap(),
            table.numeric("adults!RA").unwrap()
        );
    }

    #[test]
    fn test_no_missing_is_a_no_op() {
        let table = Table::from_columns(vec![
            Column::dense("adults!BO", vec![1.0, 2.0, 3.0]),
            Column::dense("adults!RA", vec![3.0, 2.0, 1.0]),
        ])
        .unwrap();
        let (out, _) = train(&table, "adults", 1, 1, &RunConfig::default()).unwrap();
        assert!(out.is_no_op());
    }

    #[test]
    fn test_unknown_measure() {
        assert_eq!(
            train(&wide(20), "captures", 2, 2, &RunConfig::default()).unwrap_err(),
            ImputeError::ColumnNotFound("captures".into())
        );
    }

    #[test]
    fn test_grid_contains_invalid_corner() {
        let grid = grid();
        assert_eq!(grid.size(), 18);
        let corner = grid.all().into_iter().find(|hp| hp.get("p") == 0 && hp.get("q") == 0);
        let mut model = model_of(&corner.unwrap());
        assert!(model.fit(&[vec![1.0; 10]], &[]).is_err());
    }
}
