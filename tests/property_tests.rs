//! Property-based tests for reshaping, splitting and search.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated tables and grids.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use intentional_impute::core::{Column, Table};
use intentional_impute::reshape::{melt, pivot, PivotSpec};
use intentional_impute::search::{ParamGrid, RandomSearch, Sampling};
use intentional_impute::utils::split::TrainTestSplit;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Strategy for a long table: one optional value per (date, slice) pair,
/// rows shuffled by a seed-independent permutation.
fn long_table_strategy() -> impl Strategy<Value = Vec<(usize, usize, Option<f64>)>> {
    (1..8usize, 1..4usize).prop_flat_map(|(dates, slices)| {
        prop::collection::vec(prop::option::weighted(0.8, -100.0..100.0_f64), dates * slices)
            .prop_map(move |cells| {
                let mut rows: Vec<_> = cells
                    .into_iter()
                    .enumerate()
                    .map(|(k, v)| (k % dates, k / dates, v))
                    .collect();
                rows.reverse();
                rows
            })
    })
}

fn build(rows: &[(usize, usize, Option<f64>)]) -> Table {
    Table::from_columns(vec![
        Column::datetime(
            "day",
            rows.iter().map(|(d, _, _)| Some(base() + Duration::days(*d as i64))).collect(),
        ),
        Column::categorical("site", rows.iter().map(|(_, s, _)| Some(format!("s{s}"))).collect()),
        Column::numeric("count", rows.iter().map(|(_, _, v)| *v).collect()),
    ])
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every observed long cell survives a pivot followed by a melt.
    #[test]
    fn prop_melt_recovers_observed_cells(rows in long_table_strategy()) {
        let table = build(&rows);
        let spec = PivotSpec::new("day", "count", '!').with_slice("site");
        let wide = pivot(&table, &spec).unwrap();
        let long = melt(&wide, "day", Some("site"), "count", '!').unwrap();

        let dates = long.column("day").unwrap().as_datetime().unwrap().to_vec();
        let sites = &long.column("site").unwrap().data;
        let values = long.numeric("count").unwrap();
        let recovered: HashMap<(NaiveDateTime, String), Option<f64>> = (0..long.n_rows())
            .map(|i| ((dates[i].unwrap(), sites.render(i).unwrap()), values[i]))
            .collect();

        for (d, s, v) in &rows {
            let key = (base() + Duration::days(*d as i64), format!("s{s}"));
            if v.is_some() {
                prop_assert_eq!(recovered.get(&key).copied().flatten(), *v);
            }
        }
        let distinct_dates: HashSet<usize> = rows.iter().map(|(d, _, _)| *d).collect();
        prop_assert_eq!(wide.n_rows(), distinct_dates.len());
    }

    /// Train and test partition the rows; accuracy is a suffix of test.
    #[test]
    fn prop_split_partitions_rows(n in 0..200usize, test in 0..250usize, accuracy in 0..50usize) {
        let split = TrainTestSplit::new(n, test, accuracy);
        prop_assert_eq!(split.train_len() + split.test_len(), n);
        prop_assert_eq!(split.train().end, split.test().start);
        prop_assert!(split.accuracy_len() <= split.test_len());
        prop_assert!(split.accuracy().start >= split.test().start);
        prop_assert_eq!(split.accuracy().end, n);
    }

    /// Draws stay inside the grid, respect the budget and repeat for a seed.
    #[test]
    fn prop_search_draws_are_seeded(
        seed in any::<u64>(),
        n_iter in 0..40usize,
        replace in any::<bool>(),
    ) {
        let grid = ParamGrid::new()
            .with("p", vec![0, 1, 2, 4, 8, 24])
            .with("q", vec![0, 1, 2]);
        let sampling = if replace {
            Sampling::WithReplacement
        } else {
            Sampling::WithoutReplacement
        };
        let search = RandomSearch::new("prop", n_iter, seed).with_sampling(sampling);

        let draws = search.draws(&grid);
        prop_assert_eq!(draws.len(), n_iter.min(grid.size()));
        prop_assert_eq!(&draws, &search.draws(&grid));

        let all: HashSet<_> = grid.all().into_iter().collect();
        prop_assert!(draws.iter().all(|hp| all.contains(hp)));
        if !replace {
            let distinct: HashSet<_> = draws.iter().collect();
            prop_assert_eq!(distinct.len(), draws.len());
        }
    }
}
