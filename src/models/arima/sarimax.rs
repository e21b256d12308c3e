//! SARIMAX: seasonal ARIMA errors around a linear regression on exogenous
//! covariates.
//!
//! Estimation is closed form. The target is regressed on the covariates, the
//! regression residual is differenced, and the differenced process is fitted
//! as ARMA by the two-stage Hannan–Rissanen procedure:
//!
//! 1. a long autoregression estimates the unobserved innovations;
//! 2. the series is regressed on its own lags and the lagged innovations.
//!
//! Forecasts recurse with zero future innovations, are integrated back to the
//! residual scale and have the regression part added.

use crate::core::Forecast;
use crate::error::{ImputeError, Result};
use crate::models::arima::diff::Differencing;
use crate::models::Forecaster;
use crate::utils::ols::{ols_fit, LinearFit};
use std::fmt;

/// SARIMAX order (p, d, q)x(P, D, Q, s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SarimaxOrder {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Seasonal AR order (P)
    pub seasonal_p: usize,
    /// Seasonal differencing order (D)
    pub seasonal_d: usize,
    /// Seasonal MA order (Q)
    pub seasonal_q: usize,
    /// Seasonal period (s); 0 disables the seasonal part.
    pub period: usize,
}

impl SarimaxOrder {
    /// Create a non-seasonal order.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            ..Self::default()
        }
    }

    /// Add a seasonal part.
    pub fn with_seasonal(mut self, p: usize, d: usize, q: usize, period: usize) -> Self {
        self.seasonal_p = p;
        self.seasonal_d = d;
        self.seasonal_q = q;
        self.period = period;
        self
    }

    /// Autoregressive lags, ascending and distinct.
    pub fn ar_lags(&self) -> Vec<usize> {
        lag_set(self.p, self.seasonal_p, self.period)
    }

    /// Moving-average lags, ascending and distinct.
    pub fn ma_lags(&self) -> Vec<usize> {
        lag_set(self.q, self.seasonal_q, self.period)
    }

    /// Differencing chain of this order.
    pub fn differencing(&self) -> Differencing {
        Differencing::new(self.d, self.seasonal_d, self.period)
    }
}

impl fmt::Display for SarimaxOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})x({},{},{},{})",
            self.p, self.d, self.q, self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
        )
    }
}

fn lag_set(regular: usize, seasonal: usize, period: usize) -> Vec<usize> {
    let mut lags: Vec<usize> = (1..=regular).collect();
    if period > 0 {
        lags.extend((1..=seasonal).map(|j| j * period));
    }
    lags.sort_unstable();
    lags.dedup();
    lags
}

/// ARMA part fitted on the differenced residual process.
#[derive(Debug, Clone)]
struct ArmaFit {
    constant: f64,
    ar: Vec<(usize, f64)>,
    ma: Vec<(usize, f64)>,
    /// Stands in for lags before the start of the sample.
    mean: f64,
}

impl ArmaFit {
    fn max_lag(&self) -> usize {
        self.ar
            .iter()
            .chain(&self.ma)
            .map(|&(lag, _)| lag)
            .max()
            .unwrap_or(0)
    }

    fn one_step(&self, w: &[f64], eps: &[f64], t: usize) -> f64 {
        let ar: f64 = self
            .ar
            .iter()
            .map(|&(lag, c)| c * if t >= lag { w[t - lag] } else { self.mean })
            .sum();
        let ma: f64 = self
            .ma
            .iter()
            .map(|&(lag, c)| if t >= lag { c * eps[t - lag] } else { 0.0 })
            .sum();
        self.constant + ar + ma
    }

    /// One-step-ahead residuals; zero before the longest lag.
    fn residuals(&self, w: &[f64]) -> Vec<f64> {
        let mut eps = vec![0.0; w.len()];
        for t in self.max_lag()..w.len() {
            eps[t] = w[t] - self.one_step(w, &eps, t);
        }
        eps
    }

    /// Continue `w` by `horizon` steps with zero future innovations.
    fn extend(&self, w: &[f64], horizon: usize) -> Vec<f64> {
        let mut eps = self.residuals(w);
        let mut path = w.to_vec();
        for _ in 0..horizon {
            let t = path.len();
            let next = self.one_step(&path, &eps, t);
            path.push(next);
            eps.push(0.0);
        }
        path.split_off(w.len())
    }
}

fn hannan_rissanen(w: &[f64], ar_lags: &[usize], ma_lags: &[usize]) -> Result<ArmaFit> {
    let n = w.len();
    if n == 0 {
        return Err(ImputeError::InsufficientData { needed: 1, got: 0 });
    }
    let mean = w.iter().sum::<f64>() / n as f64;
    if ar_lags.is_empty() && ma_lags.is_empty() {
        return Ok(ArmaFit {
            constant: mean,
            ar: Vec::new(),
            ma: Vec::new(),
            mean,
        });
    }

    let max_ar = ar_lags.last().copied().unwrap_or(0);
    let max_ma = ma_lags.last().copied().unwrap_or(0);
    let mut innovations = vec![0.0; n];
    let mut start = max_ar;

    if max_ma > 0 {
        let long = 2 * max_ar.max(max_ma);
        if n <= 2 * long {
            return Err(ImputeError::InsufficientData {
                needed: 2 * long + 1,
                got: n,
            });
        }
        let rows: Vec<Vec<f64>> = (long..n)
            .map(|t| (1..=long).map(|lag| w[t - lag]).collect())
            .collect();
        let long_ar = ols_fit(&rows, &w[long..])?;
        for (t, row) in (long..n).zip(&rows) {
            innovations[t] = w[t] - long_ar.predict_row(row);
        }
        start = start.max(long + max_ma);
    }

    let n_params = ar_lags.len() + ma_lags.len() + 1;
    if start + n_params > n {
        return Err(ImputeError::InsufficientData {
            needed: start + n_params,
            got: n,
        });
    }
    let rows: Vec<Vec<f64>> = (start..n)
        .map(|t| {
            ar_lags
                .iter()
                .map(|&lag| w[t - lag])
                .chain(ma_lags.iter().map(|&lag| innovations[t - lag]))
                .collect()
        })
        .collect();
    let fit = ols_fit(&rows, &w[start..])?;
    let (ar, ma) = fit.coefficients.split_at(ar_lags.len());

    Ok(ArmaFit {
        constant: fit.intercept,
        ar: ar_lags.iter().copied().zip(ar.iter().copied()).collect(),
        ma: ma_lags.iter().copied().zip(ma.iter().copied()).collect(),
        mean,
    })
}

/// SARIMAX forecasting model.
///
/// # Example
/// ```
/// use intentional_impute::models::arima::{Sarimax, SarimaxOrder};
/// use intentional_impute::models::Forecaster;
///
/// let y: Vec<f64> = (0..40).map(|i| 5.0 + 2.0 * i as f64).collect();
/// let mut model = Sarimax::new(SarimaxOrder::new(0, 1, 0));
/// model.fit(&[y], &[]).unwrap();
///
/// let forecast = model.forecast(3, &[]).unwrap();
/// assert!((forecast.primary()[0] - 85.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct Sarimax {
    order: SarimaxOrder,
    regression: Option<LinearFit>,
    arma: Option<ArmaFit>,
    /// Target minus the regression part, one value per fitted observation.
    residual: Vec<f64>,
    endog: Vec<f64>,
    exog: Vec<Vec<f64>>,
}

impl Sarimax {
    /// Create an unfitted model.
    pub fn new(order: SarimaxOrder) -> Self {
        Self {
            order,
            regression: None,
            arma: None,
            residual: Vec::new(),
            endog: Vec::new(),
            exog: Vec::new(),
        }
    }

    /// Get the order.
    pub fn order(&self) -> SarimaxOrder {
        self.order
    }

    /// Coefficients of the exogenous regression, if any covariates were used.
    pub fn regression(&self) -> Option<&LinearFit> {
        self.regression.as_ref()
    }

    /// AR coefficients by lag.
    pub fn ar_coefficients(&self) -> &[(usize, f64)] {
        self.arma.as_ref().map_or(&[], |a| a.ar.as_slice())
    }

    /// MA coefficients by lag.
    pub fn ma_coefficients(&self) -> &[(usize, f64)] {
        self.arma.as_ref().map_or(&[], |a| a.ma.as_slice())
    }

    fn regression_part(&self, row: Option<&Vec<f64>>) -> f64 {
        match (&self.regression, row) {
            (Some(fit), Some(row)) => fit.predict_row(row),
            _ => 0.0,
        }
    }
}

impl Forecaster for Sarimax {
    fn fit(&mut self, endog: &[Vec<f64>], exog: &[Vec<f64>]) -> Result<()> {
        let y = match endog {
            [y] => y,
            _ => {
                return Err(ImputeError::DimensionMismatch {
                    expected: 1,
                    got: endog.len(),
                })
            }
        };
        if y.is_empty() {
            return Err(ImputeError::EmptyData);
        }

        let n_exog = exog.first().map_or(0, Vec::len);
        let regression = if n_exog > 0 {
            if exog.len() != y.len() {
                return Err(ImputeError::DimensionMismatch {
                    expected: y.len(),
                    got: exog.len(),
                });
            }
            Some(ols_fit(exog, y)?)
        } else {
            None
        };

        let residual: Vec<f64> = match &regression {
            Some(fit) => y.iter().zip(fit.predict(exog)).map(|(v, r)| v - r).collect(),
            None => y.clone(),
        };

        let w = self.order.differencing().apply(&residual);
        let arma = hannan_rissanen(&w, &self.order.ar_lags(), &self.order.ma_lags())?;
        if arma.residuals(&w).iter().any(|e| !e.is_finite()) {
            return Err(ImputeError::NonConvergence(format!(
                "SARIMAX{} produced non-finite residuals",
                self.order
            )));
        }

        self.regression = regression;
        self.arma = Some(arma);
        self.residual = residual;
        self.endog = y.clone();
        self.exog = exog.to_vec();
        Ok(())
    }

    fn forecast_from(
        &self,
        history: usize,
        horizon: usize,
        exog_future: &[Vec<f64>],
    ) -> Result<Forecast> {
        let arma = self.arma.as_ref().ok_or(ImputeError::FitRequired)?;
        if history > self.residual.len() {
            return Err(ImputeError::InvalidParameter(format!(
                "history of {history} exceeds {} fitted observations",
                self.residual.len()
            )));
        }
        if horizon == 0 {
            return Ok(Forecast::from_values(Vec::new()));
        }
        if self.regression.is_some() && exog_future.len() < horizon {
            return Err(ImputeError::DimensionMismatch {
                expected: horizon,
                got: exog_future.len(),
            });
        }

        let chain = self.order.differencing();
        let past = &self.residual[..history];
        let w = chain.apply(past);
        if w.is_empty() {
            return Err(ImputeError::InsufficientData {
                needed: chain.loss() + 1,
                got: history,
            });
        }
        let future = chain.integrate(past, &arma.extend(&w, horizon))?;

        let values: Vec<f64> = future
            .iter()
            .enumerate()
            .map(|(i, u)| u + self.regression_part(exog_future.get(i)))
            .collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ImputeError::NonConvergence(format!(
                "SARIMAX{} forecast diverged",
                self.order
            )));
        }
        Ok(Forecast::from_values(values))
    }

    /// Forecast of the same order refitted on the reversed sample.
    fn backcast(&self, horizon: usize, exog_past: &[Vec<f64>]) -> Result<Forecast> {
        if self.arma.is_none() {
            return Err(ImputeError::FitRequired);
        }
        if horizon == 0 {
            return Ok(Forecast::from_values(Vec::new()));
        }
        let future: Vec<Vec<f64>> = match self.regression {
            Some(_) if exog_past.len() < horizon => {
                return Err(ImputeError::DimensionMismatch {
                    expected: horizon,
                    got: exog_past.len(),
                })
            }
            Some(_) => exog_past[exog_past.len() - horizon..].iter().rev().cloned().collect(),
            None => Vec::new(),
        };

        let mut reverse = Sarimax::new(self.order);
        let endog: Vec<f64> = self.endog.iter().rev().copied().collect();
        let exog: Vec<Vec<f64>> = self.exog.iter().rev().cloned().collect();
        reverse.fit(&[endog], &exog)?;

        let mut values = reverse.forecast(horizon, &future)?.primary().to_vec();
        values.reverse();
        Ok(Forecast::from_values(values))
    }

    fn n_obs(&self) -> Option<usize> {
        self.arma.as_ref().map(|_| self.residual.len())
    }

    fn name(&self) -> &str {
        "SARIMAX"
    }
}
