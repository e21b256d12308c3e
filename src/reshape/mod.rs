//! Reshaping between long grouped tables and wide per-slice time series.
//!
//! A wide column is named `<measure><SEP><slice value>`; the same convention is
//! used to build names in [`pivot`] and to take them apart in [`melt`].
//!
//! # Example
//!
//! ```
//! use intentional_impute::core::{Column, Table};
//! use intentional_impute::reshape::{melt, pivot, PivotSpec};
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0);
//! let long = Table::from_columns(vec![
//!     Column::datetime("date", vec![day(1), day(1), day(2), day(2)]),
//!     Column::categorical("province", vec![Some("BO"), Some("RA"), Some("BO"), Some("RA")]),
//!     Column::numeric("adults", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
//! ])
//! .unwrap();
//!
//! let spec = PivotSpec::new("date", "adults", '!').with_slice("province");
//! let wide = pivot(&long, &spec).unwrap();
//! assert_eq!(wide.n_rows(), 2);
//! assert_eq!(wide.numeric("adults!RA").unwrap(), &[Some(2.0), Some(4.0)]);
//! assert_eq!(wide.numeric("adults!BO").unwrap(), &[Some(1.0), None]);
//!
//! let back = melt(&wide, "date", Some("province"), "adults", '!').unwrap();
//! assert_eq!(back.n_rows(), 4);
//! ```

use crate::core::{Column, ColumnData, Table};
use crate::error::{ImputeError, Result};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};

/// Slice marker used when there is no slice column.
pub const ALL: &str = "ALL";

/// Join a measure and a slice value into a wide column name.
pub fn compose(measure: &str, slice: &str, separator: char) -> String {
    format!("{measure}{separator}{slice}")
}

/// Split a wide column name into measure and slice value.
pub fn decompose(name: &str, separator: char) -> Option<(&str, &str)> {
    name.split_once(separator)
}

/// Measure part of a column name; plain names are their own measure.
pub fn measure_of(name: &str, separator: char) -> &str {
    decompose(name, separator).map_or(name, |(m, _)| m)
}

/// Slice part of a column name, if it is a composite name.
pub fn slice_of(name: &str, separator: char) -> Option<&str> {
    decompose(name, separator).map(|(_, s)| s)
}

/// Wide columns belonging to `measure`, in table order.
pub fn measure_columns(table: &Table, measure: &str, separator: char) -> Vec<String> {
    table
        .column_names()
        .into_iter()
        .filter(|name| decompose(name, separator).is_some_and(|(m, _)| m == measure))
        .map(str::to_string)
        .collect()
}

/// Date column plus every wide column sharing the slice value of `target`.
///
/// This is the frame a single series is modelled on: the target and the
/// covariates observed for the same slice.
pub fn slice_frame(wide: &Table, date_col: &str, target: &str, separator: char) -> Result<Table> {
    wide.column(target)?;
    let slice = slice_of(target, separator)
        .ok_or_else(|| ImputeError::InvalidParameter(format!("{target} is not a wide column")))?;
    let mut names = vec![date_col];
    names.extend(
        wide.column_names()
            .into_iter()
            .filter(|name| slice_of(name, separator) == Some(slice)),
    );
    wide.select(&names)
}

/// Fill gaps by carrying the last observation forward, then the first
/// observation backward over any leading gap.
pub fn fill_forward_backward(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        match v {
            Some(x) if !x.is_nan() => last = Some(*x),
            _ => *v = last,
        }
    }
    let mut next = None;
    for v in values.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None => *v = next,
        }
    }
}

/// Parameters of a pivot.
#[derive(Debug, Clone)]
pub struct PivotSpec {
    /// Date column becoming the row index.
    pub date_col: String,
    /// Column whose values are spread into separate columns.
    pub slice_col: Option<String>,
    /// Measures to spread; `None` spreads every numeric non-key column.
    pub value_cols: Option<Vec<String>>,
    /// Measure to be imputed; its columns are never filled.
    pub target_measure: String,
    /// Forward/backward fill every non-target column.
    pub impute_covariates: bool,
    /// Composite-name separator.
    pub separator: char,
}

impl PivotSpec {
    /// Create a pivot specification without slice column.
    pub fn new(date_col: &str, target_measure: &str, separator: char) -> Self {
        Self {
            date_col: date_col.to_string(),
            slice_col: None,
            value_cols: None,
            target_measure: target_measure.to_string(),
            impute_covariates: false,
            separator,
        }
    }

    /// Set the slice column.
    pub fn with_slice(mut self, slice_col: &str) -> Self {
        self.slice_col = Some(slice_col.to_string());
        self
    }

    /// Restrict the spread measures.
    pub fn with_values(mut self, value_cols: Vec<String>) -> Self {
        self.value_cols = Some(value_cols);
        self
    }

    /// Enable covariate filling.
    pub fn with_impute(mut self, impute: bool) -> Self {
        self.impute_covariates = impute;
        self
    }

    fn value_columns(&self, table: &Table) -> Vec<String> {
        let candidates: Vec<String> = match &self.value_cols {
            Some(cols) => cols.clone(),
            None => table
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|name| {
                name != &self.date_col
                    && Some(name) != self.slice_col.as_ref()
                    && name != "index"
                    && table
                        .column(name)
                        .is_ok_and(|c| matches!(c.data, ColumnData::Numeric(_)))
            })
            .collect()
    }
}

/// Pivot a long table into one row per date and one column per measure and
/// slice value.
///
/// Duplicate (date, slice) cells are averaged; absent combinations stay
/// missing. Without a slice column the rows are kept as they are and every
/// measure is renamed `<measure><SEP>ALL`.
pub fn pivot(table: &Table, spec: &PivotSpec) -> Result<Table> {
    let values = spec.value_columns(table);
    let date_column = table.column(&spec.date_col)?;

    let mut wide = match &spec.slice_col {
        None => {
            let mut columns = vec![date_column.clone()];
            for name in &values {
                columns.push(Column::numeric(
                    compose(name, ALL, spec.separator),
                    table.numeric(name)?.to_vec(),
                ));
            }
            Table::from_columns(columns)?
        }
        Some(slice_col) => {
            let dates = date_column.as_datetime()?;
            let slices = &table.column(slice_col)?.data;

            let date_index: BTreeMap<NaiveDateTime, usize> = dates
                .iter()
                .flatten()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .enumerate()
                .map(|(i, d)| (d, i))
                .collect();
            let slice_values: BTreeSet<String> =
                (0..table.n_rows()).filter_map(|i| slices.render(i)).collect();

            let mut columns = vec![Column::datetime(
                spec.date_col.clone(),
                date_index.keys().map(|d| Some(*d)).collect(),
            )];

            for name in &values {
                let measure = table.numeric(name)?;
                for slice in &slice_values {
                    let mut sums = vec![0.0; date_index.len()];
                    let mut counts = vec![0usize; date_index.len()];
                    for row in 0..table.n_rows() {
                        let (Some(date), Some(key), Some(value)) =
                            (dates[row], slices.render(row), measure[row])
                        else {
                            continue;
                        };
                        if key != *slice || value.is_nan() {
                            continue;
                        }
                        let i = date_index[&date];
                        sums[i] += value;
                        counts[i] += 1;
                    }
                    let cells = sums
                        .iter()
                        .zip(&counts)
                        .map(|(s, &c)| (c > 0).then(|| s / c as f64))
                        .collect();
                    columns.push(Column::numeric(compose(name, slice, spec.separator), cells));
                }
            }
            Table::from_columns(columns)?
        }
    };

    if spec.impute_covariates {
        let covariates: Vec<String> = wide
            .column_names()
            .into_iter()
            .filter(|name| {
                *name != spec.date_col && measure_of(name, spec.separator) != spec.target_measure
            })
            .map(str::to_string)
            .collect();
        for name in covariates {
            fill_forward_backward(wide.numeric_mut(&name)?);
        }
    }

    Ok(wide)
}

/// Reshape the target columns of a wide table back into long
/// `(date, slice, value)` rows.
///
/// Without a slice column the table is returned unchanged.
pub fn melt(
    wide: &Table,
    date_col: &str,
    slice_col: Option<&str>,
    target_measure: &str,
    separator: char,
) -> Result<Table> {
    let Some(slice_col) = slice_col else {
        return Ok(wide.clone());
    };

    let dates = &wide.column(date_col)?.data;
    let targets = measure_columns(wide, target_measure, separator);
    if targets.is_empty() {
        return Err(ImputeError::ColumnNotFound(compose(
            target_measure,
            "*",
            separator,
        )));
    }

    let n = wide.n_rows();
    let row_ids: Vec<usize> = (0..targets.len()).flat_map(|_| 0..n).collect();
    let mut date_out = Table::from_columns(vec![Column {
        name: date_col.to_string(),
        data: dates.clone(),
    }])?
    .take_rows(&row_ids);

    let mut slices = Vec::with_capacity(row_ids.len());
    let mut values = Vec::with_capacity(row_ids.len());
    for name in &targets {
        let slice = slice_of(name, separator).unwrap_or_default().to_string();
        let column = wide.numeric(name)?;
        for row in 0..n {
            slices.push(Some(slice.clone()));
            values.push(column[row]);
        }
    }

    date_out.set_column(Column::categorical(slice_col, slices))?;
    date_out.set_column(Column::numeric(target_measure, values))?;
    Ok(date_out)
}
