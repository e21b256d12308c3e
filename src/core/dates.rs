//! Date granularities and their parsing rules.

use crate::core::table::{Column, ColumnData};
use crate::error::{ImputeError, Result};
use chrono::{NaiveDate, NaiveDateTime, Weekday};

/// Granularity of a date-like grouping column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateGranularity {
    /// `YYYY-WW`, anchored to the Monday of that ISO week.
    Week,
    /// `YYYY-MM`, anchored to the first day of the month.
    Month,
    /// `YYYY`, anchored to January 1st.
    Year,
    /// `YYYY-MM-DD HH:MM:SS`.
    Timestamp,
    /// `YYYY-MM-DD`.
    Day,
}

impl DateGranularity {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::Timestamp => "timestamp",
            Self::Day => "day",
        }
    }

    /// Parse one raw value.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        let date = match self {
            Self::Week => {
                let (year, week) = raw.split_once('-')?;
                let week = week.trim_start_matches(['W', 'w']);
                NaiveDate::from_isoywd_opt(year.parse().ok()?, week.parse().ok()?, Weekday::Mon)?
            }
            Self::Month => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()?,
            Self::Year => NaiveDate::from_ymd_opt(raw.parse().ok()?, 1, 1)?,
            Self::Timestamp => {
                return NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok();
            }
            Self::Day => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?,
        };
        date.and_hms_opt(0, 0, 0)
    }

    /// Convert a raw column into a datetime column.
    ///
    /// Datetime columns are returned unchanged; numeric columns are formatted
    /// as integers first (e.g. a numeric `year` column).
    pub fn parse_column(&self, column: &Column) -> Result<Column> {
        let raw: Vec<Option<String>> = match &column.data {
            ColumnData::DateTime(_) => return Ok(column.clone()),
            ColumnData::Categorical(v) => v.clone(),
            ColumnData::Numeric(v) => v
                .iter()
                .map(|x| x.filter(|x| x.is_finite()).map(|x| format!("{}", x.round() as i64)))
                .collect(),
        };

        let parsed = raw
            .iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(s) => self.parse(s).map(Some).ok_or_else(|| ImputeError::DateParse {
                    column: column.name.clone(),
                    value: s.clone(),
                    granularity: self.name(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Column::datetime(column.name.clone(), parsed))
    }
}
