//! Conversion of typed tables into numeric feature matrices.

use crate::core::{ColumnData, Table};
use crate::error::Result;
use crate::reshape::compose;
use std::collections::BTreeSet;

/// Row-major numeric features. Missing inputs are encoded as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Feature names, one per matrix column.
    pub names: Vec<String>,
    /// Feature rows.
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Rows at the given positions.
    pub fn take(&self, rows: &[usize]) -> Vec<Vec<f64>> {
        rows.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

/// Encode every column but `target` as numeric features.
///
/// Categorical columns are one-hot encoded over their sorted levels with the
/// first level dropped, named `<column><SEP><level>`; a missing label encodes
/// as all zeros. Datetime columns become seconds since the Unix epoch.
pub fn encode_features(table: &Table, target: &str, separator: char) -> Result<FeatureMatrix> {
    let n = table.n_rows();
    let mut names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for column in table.columns().iter().filter(|c| c.name != target) {
        match &column.data {
            ColumnData::Numeric(v) => {
                names.push(column.name.clone());
                columns.push(v.iter().map(|x| x.unwrap_or(f64::NAN)).collect());
            }
            ColumnData::DateTime(v) => {
                names.push(column.name.clone());
                columns.push(
                    v.iter()
                        .map(|x| x.map_or(f64::NAN, |d| d.and_utc().timestamp() as f64))
                        .collect(),
                );
            }
            ColumnData::Categorical(v) => {
                let levels: BTreeSet<&str> = v.iter().flatten().map(String::as_str).collect();
                for level in levels.into_iter().skip(1) {
                    names.push(compose(&column.name, level, separator));
                    columns.push(
                        v.iter()
                            .map(|x| if x.as_deref() == Some(level) { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }
    }

    let rows = (0..n)
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();
    Ok(FeatureMatrix { names, rows })
}
