//! Seasonal ARIMA-family models with exogenous covariates.
//!
//! This module provides:
//! - SARIMAX for a single endogenous series
//! - VARMAX for several endogenous series modelled jointly
//! - The differencing chain both rely on

mod diff;
mod sarimax;
mod varmax;

pub use diff::{difference_at, Differencing};
pub use sarimax::{Sarimax, SarimaxOrder};
pub use varmax::Varmax;
