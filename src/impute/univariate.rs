//! SARIMAX trainer for a single wide series.
//!
//! The frame holds one target series and the covariates of the same slice.
//! Covariates are gap-filled, rows with a missing target are excluded from
//! fitting, and a random search over the order grid keeps the configuration
//! with the best test-split R². The winner is refit on every observed row
//! and each gap is forecast from the observations before it.

use crate::config::RunConfig;
use crate::core::Table;
use crate::error::Result;
use crate::impute::{covariates, fill_gaps, to_rows, Imputation, ORDER_GRID};
use crate::models::arima::{Sarimax, SarimaxOrder};
use crate::models::Forecaster;
use crate::reshape::measure_of;
use crate::search::{HyperParams, ParamGrid, RandomSearch};
use crate::utils::metrics::holdout_score;
use crate::utils::split::TrainTestSplit;

/// Model name used in logs and metrics.
pub const NAME: &str = "univariateTS";

/// Order grid; the seasonal part is held at zero.
pub fn grid() -> ParamGrid {
    ParamGrid::new()
        .with("p", ORDER_GRID.to_vec())
        .with("d", ORDER_GRID.to_vec())
        .with("q", ORDER_GRID.to_vec())
        .with("P", vec![0])
        .with("D", vec![0])
        .with("Q", vec![0])
        .with("s", vec![0])
}

fn order_of(hp: &HyperParams) -> SarimaxOrder {
    SarimaxOrder::new(hp.get("p"), hp.get("d"), hp.get("q")).with_seasonal(
        hp.get("P"),
        hp.get("D"),
        hp.get("Q"),
        hp.get("s"),
    )
}

/// Fill the missing cells of `target` in `frame`.
///
/// Returns the number of covariates alongside the imputation so callers can
/// report it.
pub fn train(
    frame: &Table,
    target: &str,
    test_size: usize,
    accuracy_size: usize,
    config: &RunConfig,
) -> Result<(Imputation, usize)> {
    let y_all = frame.numeric(target)?;
    let measure = measure_of(target, config.separator);
    let exog_columns: Vec<Vec<f64>> = covariates(frame, measure, config.separator)
        .into_iter()
        .map(|(_, values)| values)
        .collect();
    let n_exog = exog_columns.len();

    let target_data = &frame.column(target)?.data;
    let missing: Vec<bool> = (0..frame.n_rows()).map(|i| target_data.is_missing(i)).collect();
    if !missing.contains(&true) {
        log::debug!("{NAME}: no missing values in {target}");
        return Ok((Imputation::unchanged(frame), n_exog));
    }

    let observed: Vec<usize> = (0..frame.n_rows()).filter(|&i| !missing[i]).collect();
    let y: Vec<f64> = observed.iter().filter_map(|&i| y_all[i]).collect();
    let exog = to_rows(&exog_columns, &observed);
    let split = TrainTestSplit::new(y.len(), test_size, accuracy_size);

    let result = RandomSearch::new(NAME, config.n_iter, config.seed).run(&grid(), |hp| {
        let mut model = Sarimax::new(order_of(hp));
        model.fit(&[y[split.train()].to_vec()], &exog[split.train()])?;
        let forecast = model.forecast(split.test_len(), &exog[split.test()])?;
        holdout_score(
            &[y[split.test()].to_vec()],
            forecast.point(),
            split.accuracy_len(),
        )
    });

    let mut imputation = Imputation {
        split: Some(split),
        successes: result.successes(),
        success_millis: Some(result.success_millis()),
        ..Imputation::unchanged(frame)
    };
    let (best, score) = match result.require_best(NAME) {
        Ok((best, score)) => (best.clone(), *score),
        Err(err) => {
            log::warn!("{NAME}({target}) - final fit: {err}");
            imputation.failure = Some(err);
            return Ok((imputation, n_exog));
        }
    };
    imputation.score = Some(score.r2);
    imputation.accuracy = Some(score.accuracy);

    let mut model = Sarimax::new(order_of(&best));
    match model.fit(&[y], &exog) {
        Ok(()) => {
            let all_rows: Vec<usize> = (0..frame.n_rows()).collect();
            let exog_all = to_rows(&exog_columns, &all_rows);
            let mut table = frame.clone();
            let gaps = fill_gaps(&model, &mut table, &[target.to_string()], &missing, &exog_all)?;
            log::info!("{NAME}({target}) {best}: filled {} cells", gaps.filled.len());
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
    Ok((imputation, n_exog))
}
