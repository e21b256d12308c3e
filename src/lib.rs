//! # intentional-impute
//!
//! Missing-value imputation by model comparison.
//!
//! A long table is pivoted on its date column into one series per slice,
//! each requested model family (SARIMAX, VARMAX, regression trees and
//! forests) is tuned by a seeded random search, and the predictions of the
//! winning configuration fill the missing cells. Every run reports
//! per-component scores and per-step timings.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod impute;
pub mod models;
pub mod predict;
pub mod prepare;
pub mod reshape;
pub mod search;
pub mod utils;

pub use error::{ImputeError, Result};

pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::core::{Column, Forecast, Table};
    pub use crate::error::{ImputeError, Result};
    pub use crate::impute::{Imputation, ModelKind};
    pub use crate::models::{Forecaster, Regressor};
    pub use crate::predict::{predict, MetricsRecord, PredictReport, TimingRecord};
    pub use crate::reshape::{melt, pivot, PivotSpec};
}
