//! Regression and forecasting models.

mod traits;

pub mod arima;
pub mod tree;

pub use traits::{BoxedRegressor, Forecaster, Regressor};
