//! Column-oriented table with typed, nullable columns.

use crate::error::{ImputeError, Result};
use chrono::NaiveDateTime;

/// Values held by a single column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Floating-point measures.
    Numeric(Vec<Option<f64>>),
    /// Free-text or categorical labels.
    Categorical(Vec<Option<String>>),
    /// Calendar timestamps.
    DateTime(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
            Self::DateTime(v) => v.len(),
        }
    }

    /// Check if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether the cell at `row` is missing.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v.get(row).map_or(true, |x| x.map_or(true, f64::is_nan)),
            Self::Categorical(v) => v.get(row).map_or(true, Option::is_none),
            Self::DateTime(v) => v.get(row).map_or(true, Option::is_none),
        }
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Cell rendered as text, `None` when missing.
    pub fn render(&self, row: usize) -> Option<String> {
        if self.is_missing(row) {
            return None;
        }
        match self {
            Self::Numeric(v) => v[row].map(|x| format!("{x}")),
            Self::Categorical(v) => v[row].clone(),
            Self::DateTime(v) => v[row].map(|x| x.to_string()),
        }
    }

    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Self::Categorical(v) => Self::Categorical(rows.iter().map(|&i| v[i].clone()).collect()),
            Self::DateTime(v) => Self::DateTime(rows.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column values.
    pub data: ColumnData,
}

impl Column {
    /// Create a numeric column.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Create a numeric column without missing cells.
    pub fn dense(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::numeric(name, values.into_iter().map(Some).collect())
    }

    /// Create a categorical column.
    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(
                values.into_iter().map(|v| v.map(Into::into)).collect(),
            ),
        }
    }

    /// Create a datetime column.
    pub fn datetime(name: impl Into<String>, values: Vec<Option<NaiveDateTime>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::DateTime(values),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Numeric values, or a type error.
    pub fn as_numeric(&self) -> Result<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Ok(v),
            _ => Err(self.type_error("numeric")),
        }
    }

    /// Datetime values, or a type error.
    pub fn as_datetime(&self) -> Result<&[Option<NaiveDateTime>]> {
        match &self.data {
            ColumnData::DateTime(v) => Ok(v),
            _ => Err(self.type_error("datetime")),
        }
    }

    fn type_error(&self, expected: &'static str) -> ImputeError {
        ImputeError::ColumnType {
            column: self.name.clone(),
            expected,
        }
    }
}

/// A table of equally long named columns.
///
/// Column order is kept for display only; lookups are by name.
///
/// # Example
///
/// ```
/// use intentional_impute::core::{Column, Table};
///
/// let table = Table::from_columns(vec![
///     Column::dense("x", vec![1.0, 2.0, 3.0]),
///     Column::numeric("y", vec![Some(2.0), None, Some(6.0)]),
/// ])
/// .unwrap();
///
/// assert_eq!(table.n_rows(), 3);
/// assert_eq!(table.missing_rows("y").unwrap(), vec![1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, checking that all columns have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.set_column(column)?;
        }
        Ok(table)
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Column names in display order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// All columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ImputeError::ColumnNotFound(name.to_string()))
    }

    /// Numeric values of a column.
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)?.as_numeric()
    }

    /// Mutable numeric values of a column.
    pub fn numeric_mut(&mut self, name: &str) -> Result<&mut Vec<Option<f64>>> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ImputeError::ColumnNotFound(name.to_string()))?;
        match &mut column.data {
            ColumnData::Numeric(v) => Ok(v),
            _ => Err(ImputeError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
            }),
        }
    }

    /// Insert a column, replacing any column of the same name in place.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(ImputeError::DimensionMismatch {
                expected: self.n_rows,
                got: column.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::from_columns(columns)
    }

    /// Keep only the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(rows),
                })
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Row indices where the named column is missing.
    pub fn missing_rows(&self, name: &str) -> Result<Vec<usize>> {
        let column = self.column(name)?;
        Ok((0..self.n_rows)
            .filter(|&i| column.data.is_missing(i))
            .collect())
    }

    /// Row indices where any column is missing.
    pub fn rows_with_any_missing(&self) -> Vec<usize> {
        (0..self.n_rows)
            .filter(|&i| self.columns.iter().any(|c| c.data.is_missing(i)))
            .collect()
    }

    /// Number of missing cells in the named column.
    pub fn missing_count(&self, name: &str) -> Result<usize> {
        Ok(self.column(name)?.data.missing_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::dense("a", vec![1.0, 2.0, 3.0]),
            Column::numeric("b", vec![None, Some(1.0), Some(f64::NAN)]),
            Column::categorical("c", vec![Some("x"), None, Some("y")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_shape() {
        let table = sample();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 3);
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut table = sample();
        let err = table.set_column(Column::dense("d", vec![1.0])).unwrap_err();
        assert_eq!(err, ImputeError::DimensionMismatch { expected: 3, got: 1 });
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let table = sample();
        assert_eq!(table.missing_rows("b").unwrap(), vec![0, 2]);
        assert_eq!(table.rows_with_any_missing(), vec![0, 1, 2]);
        assert_eq!(table.missing_count("a").unwrap(), 0);
    }

    #[test]
    fn test_render_cells() {
        let table = sample();
        assert_eq!(table.column("a").unwrap().data.render(1).as_deref(), Some("2"));
        assert_eq!(table.column("b").unwrap().data.render(2), None);
        assert_eq!(table.column("c").unwrap().data.render(2).as_deref(), Some("y"));
    }

    #[test]
    fn test_set_column_replaces_in_place() {
        let mut table = sample();
        table.set_column(Column::dense("a", vec![9.0, 9.0, 9.0])).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.numeric("a").unwrap()[0], Some(9.0));
    }

    #[test]
    fn test_take_rows_and_select() {
        let table = sample();
        let sub = table.take_rows(&[2, 0]);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.numeric("a").unwrap(), &[Some(3.0), Some(1.0)]);

        let selected = table.select(&["c", "a"]).unwrap();
        assert_eq!(selected.column_names(), vec!["c", "a"]);
        assert!(table.select(&["zzz"]).is_err());
    }

    #[test]
    fn test_type_errors() {
        let table = sample();
        assert!(matches!(
            table.numeric("c"),
            Err(ImputeError::ColumnType { .. })
        ));
        assert!(matches!(
            table.column("missing"),
            Err(ImputeError::ColumnNotFound(_))
        ));
    }
}
