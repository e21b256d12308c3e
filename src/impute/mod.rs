//! Model trainers that fill missing target cells.
//!
//! Every trainer takes a table by reference and returns an [`Imputation`]
//! holding a new table with the filled cells, the held-out scores of the
//! selected configuration and the trial counts of its search. A target without
//! missing cells is a no-op, not an error.

pub mod multivariate;
pub mod tabular;
pub mod univariate;

use crate::core::Table;
use crate::error::{ImputeError, Result};
use crate::models::Forecaster;
use crate::search::HyperParams;
use crate::utils::split::TrainTestSplit;
use std::fmt;
use std::str::FromStr;

/// Short-range order grid of the time-series searches.
pub const ORDER_GRID: [usize; 6] = [0, 1, 2, 4, 8, 24];

/// Model families known to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// SARIMAX per target series on the wide view.
    UnivariateTs,
    /// VARMAX over every series of the target measure.
    MultivariateTs,
    /// Regression tree per target series on the wide view.
    TimeDecisionTree,
    /// Random forest per target series on the wide view.
    TimeRandomForest,
    /// Regression tree on the long table.
    DecisionTree,
    /// Random forest on the long table.
    RandomForest,
}

impl ModelKind {
    /// Every model family, in roster order.
    pub const ALL: [ModelKind; 6] = [
        ModelKind::UnivariateTs,
        ModelKind::MultivariateTs,
        ModelKind::TimeDecisionTree,
        ModelKind::TimeRandomForest,
        ModelKind::DecisionTree,
        ModelKind::RandomForest,
    ];

    /// Look up a family by its roster name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Roster name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnivariateTs => "univariateTS",
            Self::MultivariateTs => "multivariateTS",
            Self::TimeDecisionTree => "timeDecisionTree",
            Self::TimeRandomForest => "timeRandomForest",
            Self::DecisionTree => "decisionTree",
            Self::RandomForest => "randomForest",
        }
    }

    /// Whether the family runs on the pivoted wide view.
    pub fn is_time_aware(&self) -> bool {
        !matches!(self, Self::DecisionTree | Self::RandomForest)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ImputeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s)
            .ok_or_else(|| ImputeError::InvalidParameter(format!("unknown model {s}")))
    }
}

/// One predicted cell written back into a table.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledCell {
    /// Column name.
    pub column: String,
    /// Row index in the table handed to the trainer.
    pub row: usize,
    /// Predicted value.
    pub value: f64,
}

/// Outcome of one trainer invocation.
#[derive(Debug, Clone)]
pub struct Imputation {
    /// Input table with the predicted cells filled.
    pub table: Table,
    /// Predicted cells; `None` when nothing was missing or the final fit failed.
    pub filled: Option<Vec<FilledCell>>,
    /// Split of the observed rows used for scoring.
    pub split: Option<TrainTestSplit>,
    /// Selected hyperparameters.
    pub best: Option<HyperParams>,
    /// R² of the selected configuration on the test split.
    pub score: Option<f64>,
    /// R² of the selected configuration on the accuracy window.
    pub accuracy: Option<f64>,
    /// Number of successful search trials.
    pub successes: usize,
    /// Wall-clock time of the successful trials, in milliseconds.
    pub success_millis: Option<u128>,
    /// Final fit failure or first gap left missing, contained rather than
    /// propagated.
    pub failure: Option<ImputeError>,
}

impl Imputation {
    /// The input returned untouched, for targets without missing cells.
    pub fn unchanged(table: &Table) -> Self {
        Self {
            table: table.clone(),
            filled: None,
            split: None,
            best: None,
            score: None,
            accuracy: None,
            successes: 0,
            success_millis: None,
            failure: None,
        }
    }

    /// Check whether the trainer had nothing to fill.
    pub fn is_no_op(&self) -> bool {
        self.filled.is_none() && self.failure.is_none() && self.split.is_none()
    }

    /// Number of cells filled.
    pub fn filled_count(&self) -> usize {
        self.filled.as_ref().map_or(0, Vec::len)
    }
}

/// A run of consecutive missing rows and the number of observed rows before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GapRun {
    /// Observed rows preceding the run.
    pub history: usize,
    /// Table rows in the run.
    pub rows: Vec<usize>,
}

/// Group missing rows into runs of consecutive rows.
pub(crate) fn gap_runs(missing: &[bool]) -> Vec<GapRun> {
    let mut runs: Vec<GapRun> = Vec::new();
    let mut observed = 0;
    for (row, &is_missing) in missing.iter().enumerate() {
        if !is_missing {
            observed += 1;
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.history == observed => run.rows.push(row),
            _ => runs.push(GapRun {
                history: observed,
                rows: vec![row],
            }),
        }
    }
    runs
}

/// Values of a covariate column with gaps filled forward then backward;
/// `None` if nothing is observed.
pub(crate) fn filled_covariate(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut values = values.to_vec();
    crate::reshape::fill_forward_backward(&mut values);
    values.into_iter().collect()
}

/// Cells written by [`fill_gaps`] and the first run it could not predict.
#[derive(Debug, Clone, Default)]
pub(crate) struct GapFill {
    pub filled: Vec<FilledCell>,
    pub unfilled: Option<ImputeError>,
}

/// Predict every run of missing rows and write the predictions into the
/// missing cells of `columns`.
///
/// A run with observed rows before it is forecast from that prefix; a
/// leading run is backcast from the whole sample. `model` must have been
/// fitted on the observed rows in table order, with one endogenous series
/// per entry of `columns`. A run that cannot be predicted stays missing and
/// is reported as [`ImputeError::GapNotFilled`].
pub(crate) fn fill_gaps(
    model: &dyn Forecaster,
    table: &mut Table,
    columns: &[String],
    missing: &[bool],
    exog: &[Vec<f64>],
) -> Result<GapFill> {
    let mut out = GapFill::default();
    for run in gap_runs(missing) {
        let exog_run: Vec<Vec<f64>> = run.rows.iter().map(|&r| exog[r].clone()).collect();
        let predicted = if run.history == 0 {
            model.backcast(run.rows.len(), &exog_run)
        } else {
            model.forecast_from(run.history, run.rows.len(), &exog_run)
        };
        let forecast = match predicted {
            Ok(forecast) => forecast,
            Err(err) => {
                log::warn!("{} - gap at row {} left missing: {}", model.name(), run.rows[0], err);
                if out.unfilled.is_none() {
                    out.unfilled = Some(ImputeError::GapNotFilled {
                        row: run.rows[0],
                        reason: err.to_string(),
                    });
                }
                continue;
            }
        };
        for (j, name) in columns.iter().enumerate() {
            let predicted = forecast.series(j)?;
            let values = table.numeric_mut(name)?;
            for (&row, &value) in run.rows.iter().zip(predicted) {
                if values[row].map_or(true, f64::is_nan) {
                    values[row] = Some(value);
                    out.filled.push(FilledCell {
                        column: name.clone(),
                        row,
                        value,
                    });
                }
            }
        }
    }
    Ok(out)
}

/// Numeric columns of `table` outside `measure`, gap-filled, by name.
/// Columns with no observed value are skipped.
pub(crate) fn covariates(table: &Table, measure: &str, separator: char) -> Vec<(String, Vec<f64>)> {
    table
        .columns()
        .iter()
        .filter(|c| crate::reshape::measure_of(&c.name, separator) != measure)
        .filter_map(|c| {
            let values = c.as_numeric().ok()?;
            match filled_covariate(values) {
                Some(filled) => Some((c.name.clone(), filled)),
                None => {
                    log::debug!("covariate {} has no observed value, skipped", c.name);
                    None
                }
            }
        })
        .collect()
}

/// Transpose covariate columns into rows.
pub(crate) fn to_rows(columns: &[Vec<f64>], rows: &[usize]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|&i| columns.iter().map(|c| c[i]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names_round_trip() {
        for kind in ModelKind::ALL {
            assert_eq!(ModelKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.to_string().parse::<ModelKind>().unwrap(), kind);
        }
        assert_eq!(ModelKind::from_name("notAModel"), None);
        assert!(!ModelKind::DecisionTree.is_time_aware());
        assert!(ModelKind::TimeRandomForest.is_time_aware());
    }

    #[test]
    fn test_gap_runs() {
        let missing = [true, false, false, true, true, false, true];
        let runs = gap_runs(&missing);
        assert_eq!(
            runs,
            vec![
                GapRun { history: 0, rows: vec![0] },
                GapRun { history: 2, rows: vec![3, 4] },
                GapRun { history: 3, rows: vec![6] },
            ]
        );
        assert!(gap_runs(&[false, false]).is_empty());
    }

    fn trend_table(missing: &[usize]) -> (Table, Vec<bool>, Vec<f64>) {
        let values: Vec<Option<f64>> = (0..12)
            .map(|i| (!missing.contains(&i)).then_some(10.0 + 2.0 * i as f64))
            .collect();
        let mask: Vec<bool> = values.iter().map(Option::is_none).collect();
        let observed = values.iter().flatten().copied().collect();
        let column = crate::core::Column::numeric("y!ALL", values);
        let table = Table::from_columns(vec![column]).unwrap();
        (table, mask, observed)
    }

    #[test]
    fn test_fill_gaps_backcasts_leading_run() {
        use crate::models::arima::{Sarimax, SarimaxOrder};

        let (mut table, mask, observed) = trend_table(&[0, 1]);
        let mut model = Sarimax::new(SarimaxOrder::new(0, 1, 0));
        model.fit(&[observed], &[]).unwrap();

        let exog = vec![Vec::new(); 12];
        let out = fill_gaps(&model, &mut table, &["y!ALL".to_string()], &mask, &exog).unwrap();
        assert!(out.unfilled.is_none());
        assert_eq!(out.filled.len(), 2);
        let y = table.numeric("y!ALL").unwrap();
        assert!((y[0].unwrap() - 10.0).abs() < 1e-9);
        assert!((y[1].unwrap() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_gaps_reports_unpredictable_run() {
        use crate::models::arima::{Sarimax, SarimaxOrder};

        // one observed row cannot seed a twice-differenced forecast
        let (mut table, mask, observed) = trend_table(&[1]);
        let mut model = Sarimax::new(SarimaxOrder::new(0, 2, 0));
        model.fit(&[observed], &[]).unwrap();

        let exog = vec![Vec::new(); 12];
        let out = fill_gaps(&model, &mut table, &["y!ALL".to_string()], &mask, &exog).unwrap();
        assert!(out.filled.is_empty());
        assert!(matches!(out.unfilled, Some(ImputeError::GapNotFilled { row: 1, .. })));
        assert_eq!(table.numeric("y!ALL").unwrap()[1], None);
    }

    #[test]
    fn test_filled_covariate() {
        assert_eq!(
            filled_covariate(&[None, Some(1.0), None, Some(3.0)]),
            Some(vec![1.0, 1.0, 1.0, 3.0])
        );
        assert_eq!(filled_covariate(&[None, None]), None);
    }
}
