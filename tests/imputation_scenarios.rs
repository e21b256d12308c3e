//! End-to-end imputation runs through the orchestrator.
//!
//! These tests drive `predict` over small long tables and check the
//! guarantees every family must keep: observed cells are never changed,
//! only requested families report, and a run is repeatable for a seed.

use intentional_impute::config::RunConfig;
use intentional_impute::core::{Column, Table};
use intentional_impute::predict::{classify_columns, predict, MetricsRecord, PredictReport};
use intentional_impute::prepare::{normalize_input, nullify_tail_keys};
use intentional_impute::reshape::melt;

const ALL_FAMILIES: [&str; 6] = [
    "univariateTS",
    "multivariateTS",
    "timeDecisionTree",
    "timeRandomForest",
    "decisionTree",
    "randomForest",
];

fn week_label(i: usize) -> String {
    format!("2023-W{:02}", i + 1)
}

/// Two parks observed over `weeks` weeks; adults in park BO are missing over
/// the last `gap` weeks.
fn park_table(weeks: usize, gap: usize) -> Table {
    let mut week = Vec::new();
    let mut park = Vec::new();
    let mut adults = Vec::new();
    let mut rain = Vec::new();
    for (p, name) in ["BO", "RA"].iter().enumerate() {
        for i in 0..weeks {
            let level = 40.0 + 10.0 * p as f64;
            let value = level + 0.4 * i as f64 + 3.0 * (i as f64 * 0.7).sin();
            week.push(Some(week_label(i)));
            park.push(Some(name.to_string()));
            adults.push((p == 1 || i + gap < weeks).then_some(value));
            rain.push(Some(((i * 5 + p) % 9) as f64));
        }
    }
    Table::from_columns(vec![
        Column::categorical("week", week),
        Column::categorical("park", park),
        Column::numeric("adults", adults),
        Column::numeric("rain", rain),
    ])
    .unwrap()
}

fn records<'a>(report: &'a PredictReport, model: &str) -> Vec<&'a MetricsRecord> {
    report.metrics.iter().filter(|r| r.model == model).collect()
}

fn config() -> RunConfig {
    RunConfig::default().with_n_iter(6)
}

#[test]
fn test_every_family_reports_on_sliced_series() {
    let table = park_table(40, 4);
    let by = ["week", "park"];
    let report = predict(&table, &by, "adults", &ALL_FAMILIES, None, "run-7", &config()).unwrap();

    let steps: Vec<&str> = report.timings.iter().map(|t| t.model.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "pivot",
            "univariateTS",
            "multivariateTS",
            "timeDecisionTree",
            "timeRandomForest",
            "decisionTree",
            "randomForest",
        ]
    );
    assert!(report.metrics.iter().all(|r| r.execution_id == "run-7"));
    assert!(report.timings.iter().all(|t| t.execution_id == "run-7"));

    // only park BO has gaps, so per-series families report one component
    for model in ["univariateTS", "timeDecisionTree", "timeRandomForest"] {
        let rows = records(&report, model);
        assert_eq!(rows.len(), 1, "{model}");
        assert_eq!(rows[0].component, "BO");
        assert_eq!(rows[0].endog, Some(1));
        assert_eq!(rows[0].exog, Some(1));
        assert_eq!(rows[0].sparsity, Some(0.1));
    }

    let joint = records(&report, "multivariateTS");
    assert_eq!(joint.len(), 1);
    assert_eq!(joint[0].component, "ALL");
    assert_eq!(joint[0].endog, Some(2));
    assert_eq!(joint[0].exog, Some(2));

    for model in ["decisionTree", "randomForest"] {
        let rows = records(&report, model);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].component, "ALL");
        assert_eq!(rows[0].endog, None);
        assert_eq!(rows[0].exog, None);
        assert_eq!(rows[0].sparsity, Some(4.0 / 80.0));
        assert!(rows[0].interest.is_some());
    }

    let wide = report.wide.as_ref().unwrap();
    assert_eq!(wide.n_rows(), 40);
    assert_eq!(report.imputed.len(), 6);
}

#[test]
fn test_observed_cells_are_never_changed() {
    let table = park_table(30, 3);
    let report = predict(&table, &["week", "park"], "adults", &ALL_FAMILIES, None, "x", &config())
        .unwrap();

    let wide = report.wide.as_ref().unwrap();
    let observed_long = melt(wide, "week", Some("park"), "adults", '!').unwrap();
    let expected_long = observed_long.numeric("adults").unwrap();
    let original = table.numeric("adults").unwrap();

    for imputed in &report.imputed {
        let values = imputed.table.numeric("adults").unwrap();
        let reference = if imputed.model.is_time_aware() {
            expected_long
        } else {
            original
        };
        assert_eq!(values.len(), reference.len());
        for (before, after) in reference.iter().zip(values) {
            if before.is_some() {
                assert_eq!(before, after, "{}", imputed.model);
            }
        }
    }
}

#[test]
fn test_weekly_series_with_nullified_tail() {
    let weeks: Vec<Option<String>> = (0..52).map(|i| Some(week_label(i))).collect();
    let adults: Vec<f64> = (0..52)
        .map(|i| 50.0 + 0.5 * i as f64 + (i as f64 * 0.6).sin())
        .collect();
    let rain: Vec<f64> = (0..52).map(|i| ((i * 3) % 7) as f64).collect();
    let table = Table::from_columns(vec![
        Column::categorical("week", weeks),
        Column::dense("adults", adults),
        Column::dense("rain", rain),
    ])
    .unwrap();

    let config = RunConfig::default();
    let report =
        predict(&table, &["week"], "adults", &["univariateTS"], Some(5), "b", &config).unwrap();

    let wide = report.wide.as_ref().unwrap();
    assert_eq!(wide.missing_count("adults!ALL").unwrap(), 5);

    let rows = records(&report, "univariateTS");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].component, "ALL");
    assert!(rows[0].interest.is_some());
    assert!(rows[0].failure.is_none());

    let filled = report.imputed[0].table.numeric("adults!ALL").unwrap();
    assert!(filled.iter().all(|v| v.is_some_and(f64::is_finite)));
    assert_eq!(&filled[..47], &wide.numeric("adults!ALL").unwrap()[..47]);
}

#[test]
fn test_late_starting_slice_is_backcast() {
    // park BO only opens in week 5; its first four weeks exist in the wide
    // view as missing cells with no history before them
    let keep: Vec<usize> = (4..80).collect();
    let table = park_table(40, 0).take_rows(&keep);

    let roster = ["univariateTS", "multivariateTS"];
    let report = predict(&table, &["week", "park"], "adults", &roster, None, "l", &config())
        .unwrap();

    let wide = report.wide.as_ref().unwrap();
    assert_eq!(wide.n_rows(), 40);
    assert_eq!(wide.missing_count("adults!BO").unwrap(), 4);

    assert_eq!(report.metrics.len(), 2);
    for record in &report.metrics {
        assert!(record.failure.is_none(), "{}: {:?}", record.model, record.failure);
    }
    assert_eq!(report.imputed.len(), 2);
    for imputed in &report.imputed {
        let values = imputed.table.numeric("adults").unwrap();
        assert_eq!(values.len(), 80);
        assert!(values.iter().all(|v| v.is_some_and(f64::is_finite)), "{}", imputed.model);
    }
}

#[test]
fn test_first_date_keyword_wins() {
    let config = RunConfig::default();
    let classes = classify_columns(&["day_label", "month"], &config);
    assert_eq!(classes.date.map(|(name, _)| name).as_deref(), Some("month"));
    assert_eq!(classes.slice.as_deref(), Some("day_label"));

    // day_label holds values no date rule can parse; the run only succeeds
    // because it is used as the slice
    let months = ["2024-01", "2024-01", "2024-02", "2024-02", "2024-03", "2024-03"];
    let labels = ["mon", "tue", "mon", "tue", "mon", "tue"];
    let table = Table::from_columns(vec![
        Column::categorical("day_label", labels.iter().map(|s| Some(*s)).collect()),
        Column::categorical("month", months.iter().map(|s| Some(*s)).collect()),
        Column::numeric(
            "adults",
            vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)],
        ),
    ])
    .unwrap();

    let by = ["day_label", "month"];
    let report = predict(&table, &by, "adults", &[], None, "c", &config).unwrap();
    let wide = report.wide.unwrap();
    assert_eq!(wide.column_names(), vec!["month", "adults!mon", "adults!tue"]);
    assert_eq!(wide.n_rows(), 3);
}

#[test]
fn test_unknown_model_is_skipped() {
    let table = Table::from_columns(vec![
        Column::dense("x", (0..30).map(|i| (i % 10) as f64).collect()),
        Column::numeric(
            "y",
            (0..30).map(|i| (i < 25).then_some(3.0 * (i % 10) as f64 + 1.0)).collect(),
        ),
    ])
    .unwrap();

    let report = predict(&table, &[], "y", &["notAModel"], None, "d", &config()).unwrap();
    assert!(report.metrics.is_empty());
    assert!(report.timings.is_empty());

    let report = predict(&table, &[], "y", &["notAModel", "decisionTree"], None, "d", &config())
        .unwrap();
    assert_eq!(report.metrics.len(), 1);
    assert_eq!(report.metrics[0].model, "decisionTree");
    let filled = report.imputed[0].table.numeric("y").unwrap();
    assert!(filled[25..].iter().all(Option::is_some));
}

#[test]
fn test_seeded_runs_are_repeatable() {
    let table = park_table(30, 3);
    let roster = ["univariateTS", "randomForest"];
    let a = predict(&table, &["week", "park"], "adults", &roster, None, "r", &config()).unwrap();
    let b = predict(&table, &["week", "park"], "adults", &roster, None, "r", &config()).unwrap();

    let scores = |r: &PredictReport| -> Vec<(String, Option<f64>, Option<f64>)> {
        r.metrics
            .iter()
            .map(|m| (m.model.clone(), m.interest, m.accuracy))
            .collect()
    };
    assert_eq!(scores(&a), scores(&b));
    for (x, y) in a.imputed.iter().zip(&b.imputed) {
        assert_eq!(x.table, y.table);
    }
}

#[test]
fn test_prepared_input_feeds_a_run() {
    let mut table = park_table(20, 0);
    table
        .set_column(Column::numeric("Empty", vec![None; 40]))
        .unwrap();
    let prepared = normalize_input(&table, &["Week", "Park"], "Adults").unwrap();
    assert!(!prepared.table.has_column("empty"));

    let config = config();
    let nullified =
        nullify_tail_keys(&prepared.table, &prepared.by, &prepared.target, 10.0, &config).unwrap();
    // two of twenty weeks, for both parks
    assert_eq!(nullified.missing_count("adults").unwrap(), 4);

    let by: Vec<&str> = prepared.by.iter().map(String::as_str).collect();
    let report = predict(&nullified, &by, &prepared.target, &["decisionTree"], None, "p", &config)
        .unwrap();
    assert_eq!(report.metrics.len(), 1);
    assert_eq!(report.imputed[0].table.missing_count("adults").unwrap(), 0);
}
