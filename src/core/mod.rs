//! Core data structures: tables, date parsing and forecasts.

mod dates;
mod forecast;
mod table;

pub use dates::DateGranularity;
pub use forecast::Forecast;
pub use table::{Column, ColumnData, Table};
