//! Orchestration of one imputation run.
//!
//! A run classifies the grouping keys, parses the date column, pivots the
//! table when it is time-indexed and runs every requested time-aware family
//! on the wide view, then runs the time-agnostic families on the long table.
//! Each family starts from the same input; no family sees another's
//! imputations.
//!
//! # Example
//!
//! ```
//! use intentional_impute::config::RunConfig;
//! use intentional_impute::core::{Column, Table};
//! use intentional_impute::predict::predict;
//!
//! let table = Table::from_columns(vec![
//!     Column::dense("x", (0..30).map(|i| (i % 10) as f64).collect()),
//!     Column::numeric(
//!         "y",
//!         (0..30).map(|i| (i < 25).then_some((i % 10) as f64 * 2.0)).collect(),
//!     ),
//! ])
//! .unwrap();
//!
//! let config = RunConfig::default().with_n_iter(4);
//! let roster = ["decisionTree", "notAModel"];
//! let report = predict(&table, &[], "y", &roster, None, "run-1", &config).unwrap();
//! assert_eq!(report.metrics.len(), 1);
//! assert_eq!(report.metrics[0].model, "decisionTree");
//! ```

use crate::config::RunConfig;
use crate::core::{DateGranularity, Table};
use crate::error::{ImputeError, Result};
use crate::impute::tabular::{self, TreeKind};
use crate::impute::{multivariate, univariate, FilledCell, Imputation, ModelKind};
use crate::reshape::{measure_columns, melt, pivot, slice_frame, slice_of, PivotSpec, ALL};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// One row of the per-component statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    /// Model family name.
    pub model: String,
    /// Slice value of the imputed series, or `ALL`.
    pub component: String,
    /// R² on the test split; `None` if nothing was scored.
    pub interest: Option<f64>,
    /// Share of rows imputed; `None` if nothing was missing.
    pub sparsity: Option<f64>,
    /// Number of endogenous series.
    pub endog: Option<usize>,
    /// Number of covariates.
    pub exog: Option<usize>,
    /// Wall-clock time of the component, in milliseconds.
    pub component_time: u128,
    /// Successful search trials.
    pub success: usize,
    /// Wall-clock time of the successful trials, in milliseconds.
    pub success_time: Option<u128>,
    /// R² on the accuracy window.
    pub accuracy: Option<f64>,
    /// Final fit failure or first gap left missing; `None` when every
    /// missing cell was filled.
    pub failure: Option<ImputeError>,
    /// Execution the record belongs to.
    pub execution_id: String,
}

/// One row of the timing log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingRecord {
    /// Execution the record belongs to.
    pub execution_id: String,
    /// Step name: `pivot` or a model family.
    pub model: String,
    /// Wall-clock time, in milliseconds.
    pub time: u128,
}

/// Imputed long table of one model family.
#[derive(Debug, Clone)]
pub struct ImputedTable {
    /// Model family.
    pub model: ModelKind,
    /// Long table with the family's predictions filled in.
    pub table: Table,
}

/// Everything a run produces.
#[derive(Debug, Clone, Default)]
pub struct PredictReport {
    /// Per-component statistics.
    pub metrics: Vec<MetricsRecord>,
    /// Per-step timings.
    pub timings: Vec<TimingRecord>,
    /// Pivoted view, after trailing nullification.
    pub wide: Option<Table>,
    /// Imputed tables, one per family that ran.
    pub imputed: Vec<ImputedTable>,
}

/// Date and slice columns picked from the grouping keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Date column and its parsing rule.
    pub date: Option<(String, DateGranularity)>,
    /// Column spread into separate series.
    pub slice: Option<String>,
}

/// Pick at most one date column and at most one slice column.
///
/// Keywords are tried in priority order; the first keyword contained in any
/// key selects that key as the date column. The slice column is the first
/// remaining key.
pub fn classify_columns(by: &[&str], config: &RunConfig) -> Classification {
    let date = config.date_keywords.iter().find_map(|k| {
        by.iter()
            .find(|key| key.contains(k.keyword.as_str()))
            .map(|key| (key.to_string(), k.granularity))
    });
    let slice = by
        .iter()
        .find(|key| date.as_ref().map_or(true, |(d, _)| d.as_str() != **key))
        .map(|key| key.to_string());
    Classification { date, slice }
}

/// Blank the last `n` rows of every `target` series.
pub fn nullify_last_rows(
    wide: &mut Table,
    target: &str,
    n: usize,
    separator: char,
) -> Result<()> {
    for name in measure_columns(wide, target, separator) {
        let values = wide.numeric_mut(&name)?;
        let from = values.len().saturating_sub(n);
        for v in &mut values[from..] {
            *v = None;
        }
    }
    Ok(())
}

fn apply(table: &mut Table, filled: &[FilledCell]) -> Result<()> {
    for cell in filled {
        table.numeric_mut(&cell.column)?[cell.row] = Some(cell.value);
    }
    Ok(())
}

struct RecordContext<'a> {
    model: ModelKind,
    execution_id: &'a str,
}

impl RecordContext<'_> {
    fn record(
        &self,
        component: &str,
        imputation: &Imputation,
        (missing, rows): (usize, usize),
        (endog, exog): (Option<usize>, Option<usize>),
        elapsed: Duration,
    ) -> MetricsRecord {
        MetricsRecord {
            model: self.model.name().to_string(),
            component: component.to_string(),
            interest: imputation.score,
            sparsity: (missing > 0 && rows > 0).then(|| missing as f64 / rows as f64),
            endog,
            exog,
            component_time: elapsed.as_millis(),
            success: imputation.successes,
            success_time: imputation.success_millis,
            accuracy: imputation.accuracy,
            failure: imputation.failure.clone(),
            execution_id: self.execution_id.to_string(),
        }
    }
}

/// Run every requested model family over `table`.
///
/// # Arguments
/// * `table` - Long input table with lower-case headers
/// * `by` - Grouping keys; at most one date column and one slice column are used
/// * `target` - Measure to impute
/// * `roster` - Model family names; unknown names are skipped
/// * `nullify_last` - Blank this many trailing rows of every target series
///   after pivoting
/// * `execution_id` - Opaque identifier copied into every record
/// * `config` - Run configuration
///
/// # Errors
/// [`ImputeError::EmptyData`] if the table has no rows. Failures of single
/// trials or final fits are contained and reported through the metrics.
pub fn predict(
    table: &Table,
    by: &[&str],
    target: &str,
    roster: &[&str],
    nullify_last: Option<usize>,
    execution_id: &str,
    config: &RunConfig,
) -> Result<PredictReport> {
    if table.is_empty() {
        return Err(ImputeError::EmptyData);
    }

    let kinds: Vec<ModelKind> = roster
        .iter()
        .filter_map(|name| {
            let kind = ModelKind::from_name(name);
            if kind.is_none() {
                log::debug!("unknown model {name}, skipped");
            }
            kind
        })
        .collect();

    let classes = classify_columns(by, config);
    let mut table = table.clone();
    if let Some((date_col, granularity)) = &classes.date {
        let parsed = granularity.parse_column(table.column(date_col)?)?;
        table.set_column(parsed)?;
    }
    let values: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|name| !by.contains(name))
        .map(str::to_string)
        .collect();
    log::info!(
        "date: {:?}, slice: {:?}, values: {:?}",
        classes.date.as_ref().map(|(d, _)| d),
        classes.slice,
        values
    );

    let mut report = PredictReport::default();

    if let Some((date_col, _)) = &classes.date {
        let start = Instant::now();
        let mut spec = PivotSpec::new(date_col, target, config.separator)
            .with_values(values)
            .with_impute(config.impute_covariates);
        if let Some(slice) = &classes.slice {
            spec = spec.with_slice(slice);
        }
        let mut wide = pivot(&table, &spec)?;
        report.timings.push(TimingRecord {
            execution_id: execution_id.to_string(),
            model: "pivot".to_string(),
            time: start.elapsed().as_millis(),
        });
        if let Some(n) = nullify_last {
            nullify_last_rows(&mut wide, target, n, config.separator)?;
        }

        let test = config.test_rows(wide.n_rows());
        let accuracy = config.accuracy_rows(test);
        log::info!("pivoted test size: {test}, accuracy size: {accuracy}");
        let windows = (test, accuracy);

        let distinct_slices = classes.slice.as_ref().map_or(0, |slice| {
            table.column(slice).map_or(0, |c| {
                (0..table.n_rows())
                    .filter_map(|i| c.data.render(i))
                    .collect::<HashSet<_>>()
                    .len()
            })
        });

        for &kind in kinds.iter().filter(|k| k.is_time_aware()) {
            let ctx = RecordContext {
                model: kind,
                execution_id,
            };
            let start = Instant::now();
            let imputed = match kind {
                ModelKind::MultivariateTs => {
                    if distinct_slices <= 1 {
                        log::debug!("{kind}: needs more than one slice, skipped");
                        continue;
                    }
                    run_multivariate(&ctx, &wide, target, windows, config, &mut report.metrics)?
                }
                _ => run_per_series(
                    &ctx,
                    &wide,
                    date_col,
                    target,
                    windows,
                    config,
                    &mut report.metrics,
                )?,
            };
            report.timings.push(TimingRecord {
                execution_id: execution_id.to_string(),
                model: kind.name().to_string(),
                time: start.elapsed().as_millis(),
            });
            report.imputed.push(ImputedTable {
                model: kind,
                table: melt(
                    &imputed,
                    date_col,
                    classes.slice.as_deref(),
                    target,
                    config.separator,
                )?,
            });
        }
        report.wide = Some(wide);
    }

    let test = config.test_rows(table.n_rows());
    let accuracy = config.accuracy_rows(test);
    log::info!("test size: {test}, accuracy size: {accuracy}");
    let missing = table.missing_count(target)?;

    for &kind in kinds.iter().filter(|k| !k.is_time_aware()) {
        let tree = match kind {
            ModelKind::DecisionTree => TreeKind::DecisionTree,
            _ => TreeKind::RandomForest,
        };
        let start = Instant::now();
        let imputation = tabular::train(&table, target, tree, test, accuracy, config)?;
        let elapsed = start.elapsed();
        let ctx = RecordContext {
            model: kind,
            execution_id,
        };
        report.metrics.push(ctx.record(
            ALL,
            &imputation,
            (missing, table.n_rows()),
            (None, None),
            elapsed,
        ));
        report.timings.push(TimingRecord {
            execution_id: execution_id.to_string(),
            model: kind.name().to_string(),
            time: elapsed.as_millis(),
        });
        log::info!("{kind}: R2={:?}", imputation.score);
        report.imputed.push(ImputedTable {
            model: kind,
            table: imputation.table,
        });
    }

    Ok(report)
}

/// Run a per-series family over every target series with missing cells.
fn run_per_series(
    ctx: &RecordContext<'_>,
    wide: &Table,
    date_col: &str,
    target: &str,
    (test, accuracy): (usize, usize),
    config: &RunConfig,
    metrics: &mut Vec<MetricsRecord>,
) -> Result<Table> {
    let mut imputed = wide.clone();
    for series in measure_columns(wide, target, config.separator) {
        let missing = wide.missing_count(&series)?;
        if missing == 0 {
            continue;
        }
        let frame = slice_frame(wide, date_col, &series, config.separator)?;
        let start = Instant::now();
        let (imputation, n_exog) = match ctx.model {
            ModelKind::UnivariateTs => univariate::train(&frame, &series, test, accuracy, config)?,
            ModelKind::TimeDecisionTree => (
                tabular::train(&frame, &series, TreeKind::DecisionTree, test, accuracy, config)?,
                frame.n_cols().saturating_sub(2),
            ),
            _ => (
                tabular::train(&frame, &series, TreeKind::RandomForest, test, accuracy, config)?,
                frame.n_cols().saturating_sub(2),
            ),
        };
        let elapsed = start.elapsed();
        if let Some(filled) = &imputation.filled {
            apply(&mut imputed, filled)?;
        }
        metrics.push(ctx.record(
            slice_of(&series, config.separator).unwrap_or(ALL),
            &imputation,
            (missing, frame.n_rows()),
            (Some(1), Some(n_exog)),
            elapsed,
        ));
    }
    Ok(imputed)
}

/// Run the joint family over every series of the target measure.
fn run_multivariate(
    ctx: &RecordContext<'_>,
    wide: &Table,
    target: &str,
    (test, accuracy): (usize, usize),
    config: &RunConfig,
    metrics: &mut Vec<MetricsRecord>,
) -> Result<Table> {
    let start = Instant::now();
    let (imputation, dims) = multivariate::train(wide, target, test, accuracy, config)?;
    let mut missing = HashSet::new();
    for name in measure_columns(wide, target, config.separator) {
        missing.extend(wide.missing_rows(&name)?);
    }
    metrics.push(ctx.record(
        ALL,
        &imputation,
        (missing.len(), wide.n_rows()),
        (Some(dims.endog), Some(dims.exog)),
        start.elapsed(),
    ));
    Ok(imputation.table)
}
