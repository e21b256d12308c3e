//! Common interfaces for tabular regressors and time-series forecasters.

use crate::core::Forecast;
use crate::error::Result;

/// A regression model over row-major numeric features.
///
/// This trait is object-safe and can be used with `Box<dyn Regressor>`.
pub trait Regressor {
    /// Fit the model to feature rows and targets.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Predict one value per feature row.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool;
}

impl<R: Regressor + ?Sized> Regressor for Box<R> {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        (**self).fit(x, y)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        (**self).predict(x)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_fitted(&self) -> bool {
        (**self).is_fitted()
    }
}

/// A forecasting model over one or more endogenous series with optional
/// exogenous covariates.
///
/// Endogenous data is given as one vector per series; exogenous data as one
/// row per time step. Models without covariates accept empty rows.
pub trait Forecaster {
    /// Fit the model to the observed series.
    fn fit(&mut self, endog: &[Vec<f64>], exog: &[Vec<f64>]) -> Result<()>;

    /// Forecast `horizon` steps following the first `history` fitted
    /// observations, using `exog_future` covariate rows for those steps.
    fn forecast_from(
        &self,
        history: usize,
        horizon: usize,
        exog_future: &[Vec<f64>],
    ) -> Result<Forecast>;

    /// Predict the `horizon` steps immediately preceding the first fitted
    /// observation, using `exog_past` covariate rows for those steps in time
    /// order.
    fn backcast(&self, horizon: usize, exog_past: &[Vec<f64>]) -> Result<Forecast>;

    /// Number of observations the model was fitted on.
    fn n_obs(&self) -> Option<usize>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Forecast `horizon` steps past the end of the fitted sample.
    fn forecast(&self, horizon: usize, exog_future: &[Vec<f64>]) -> Result<Forecast> {
        let n = self.n_obs().ok_or(crate::error::ImputeError::FitRequired)?;
        self.forecast_from(n, horizon, exog_future)
    }

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.n_obs().is_some()
    }
}

/// Type alias for boxed regressor trait objects.
pub type BoxedRegressor = Box<dyn Regressor>;
