//! Input preparation ahead of a prediction run.

use crate::config::RunConfig;
use crate::core::{Column, Table};
use crate::error::{ImputeError, Result};
use std::collections::HashSet;

/// Normalised input of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedInput {
    /// Table with lower-case headers and incomplete covariate rows dropped.
    pub table: Table,
    /// Lower-case grouping keys.
    pub by: Vec<String>,
    /// Lower-case target measure.
    pub target: String,
}

/// Normalise a raw table.
///
/// Headers, grouping keys and the target are lower-cased, columns without any
/// value are dropped, and rows missing any measure other than the target are
/// removed.
///
/// # Errors
/// [`ImputeError::EmptyData`] if the table has no rows.
pub fn normalize_input(table: &Table, by: &[&str], target: &str) -> Result<PreparedInput> {
    if table.is_empty() {
        return Err(ImputeError::EmptyData);
    }

    let by: Vec<String> = by.iter().map(|k| k.to_lowercase()).collect();
    let target = target.to_lowercase();

    let columns: Vec<Column> = table
        .columns()
        .iter()
        .filter(|c| c.data.missing_count() < c.len())
        .map(|c| Column {
            name: c.name.to_lowercase(),
            data: c.data.clone(),
        })
        .collect();
    let lowered = Table::from_columns(columns)?;

    let measures: Vec<&Column> = lowered
        .columns()
        .iter()
        .filter(|c| c.name != target && !by.contains(&c.name))
        .collect();
    let keep: Vec<usize> = (0..lowered.n_rows())
        .filter(|&i| measures.iter().all(|c| !c.data.is_missing(i)))
        .collect();
    let dropped = lowered.n_rows() - keep.len();
    if dropped > 0 {
        log::debug!("dropped {dropped} rows with missing covariates");
    }

    Ok(PreparedInput {
        table: lowered.take_rows(&keep),
        by,
        target,
    })
}

/// Column whose values identify the rows to nullify: the first column
/// matching a date keyword, else the first grouping key.
pub fn nullify_key<'a>(table: &'a Table, by: &'a [String], config: &RunConfig) -> Option<&'a str> {
    table
        .column_names()
        .into_iter()
        .find(|name| {
            config
                .date_keywords
                .iter()
                .any(|k| name.contains(k.keyword.as_str()))
        })
        .or_else(|| by.first().map(String::as_str))
}

/// Blank `target` on the rows whose key value is among the last `pct`% of
/// distinct key values (at least one).
///
/// Distinct values are ordered by their last occurrence in the table.
pub fn nullify_tail_keys(
    table: &Table,
    by: &[String],
    target: &str,
    pct: f64,
    config: &RunConfig,
) -> Result<Table> {
    let mut out = table.clone();
    if pct <= 0.0 {
        return Ok(out);
    }
    let key = nullify_key(table, by, config)
        .ok_or_else(|| ImputeError::InvalidParameter("no column to nullify by".into()))?;
    let keys = &table.column(key)?.data;

    let mut seen = HashSet::new();
    let mut last_occurrence: Vec<String> = (0..table.n_rows())
        .rev()
        .filter_map(|i| keys.render(i))
        .filter(|k| seen.insert(k.clone()))
        .collect();
    last_occurrence.reverse();

    let count = ((last_occurrence.len() as f64 * pct / 100.0) as usize).max(1);
    let blanked: HashSet<&String> = last_occurrence.iter().rev().take(count).collect();

    let values = out.numeric_mut(target)?;
    for (i, value) in values.iter_mut().enumerate() {
        if keys.render(i).is_some_and(|k| blanked.contains(&k)) {
            *value = None;
        }
    }
    Ok(out)
}

/// Summary of what a run is asked to do.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIntention {
    /// Opaque execution identifier.
    pub execution_id: String,
    /// Share of key values nullified, in percent.
    pub nullify_pct: f64,
    /// Number of rows.
    pub cardinality: usize,
    /// Rows with a missing target.
    pub missing_values: usize,
    /// Rows with an observed target.
    pub not_missing_values: usize,
    /// Held-out share, in percent.
    pub test_size_pct: f64,
    /// Accuracy window bound relative to the row count.
    pub cardinality_acc: f64,
}

impl RunIntention {
    /// Describe a prepared table.
    pub fn describe(
        table: &Table,
        target: &str,
        execution_id: &str,
        nullify_pct: f64,
        config: &RunConfig,
    ) -> Result<Self> {
        let missing_values = table.missing_count(target)?;
        let cardinality = table.n_rows();
        Ok(Self {
            execution_id: execution_id.to_string(),
            nullify_pct,
            cardinality,
            missing_values,
            not_missing_values: cardinality - missing_values,
            test_size_pct: config.test_size_pct,
            cardinality_acc: if cardinality == 0 {
                0.0
            } else {
                config.accuracy_size as f64 / cardinality as f64
            },
        })
    }
}
