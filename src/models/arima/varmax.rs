//! VARMAX: vector autoregressive moving-average model with exogenous
//! covariates.
//!
//! Each equation is estimated by least squares on an intercept, the
//! exogenous columns, `p` lags of every endogenous series and `q` lags of
//! every innovation. Innovations come from a long VAR fitted first.

use crate::core::Forecast;
use crate::error::{ImputeError, Result};
use crate::models::Forecaster;
use crate::utils::ols::{ols_fit_multi, LinearFit};

/// VARMAX(p, q) forecasting model.
#[derive(Debug, Clone)]
pub struct Varmax {
    p: usize,
    q: usize,
    equations: Vec<LinearFit>,
    endog: Vec<Vec<f64>>,
    exog: Vec<Vec<f64>>,
    n_exog: usize,
    means: Vec<f64>,
}

impl Varmax {
    /// Create an unfitted model.
    pub fn new(p: usize, q: usize) -> Self {
        Self {
            p,
            q,
            equations: Vec::new(),
            endog: Vec::new(),
            exog: Vec::new(),
            n_exog: 0,
            means: Vec::new(),
        }
    }

    /// Get the (p, q) order.
    pub fn order(&self) -> (usize, usize) {
        (self.p, self.q)
    }

    /// Fitted equations, one per endogenous series.
    pub fn equations(&self) -> &[LinearFit] {
        &self.equations
    }

    fn max_lag(&self) -> usize {
        self.p.max(self.q)
    }

    /// Regressors at time `t`: exogenous row, then series lags, then
    /// innovation lags. Lags before the sample read as the series mean and
    /// as zero innovations.
    fn design_row(
        &self,
        series: &[Vec<f64>],
        innovations: &[Vec<f64>],
        exog_row: &[f64],
        t: usize,
        ar_lags: usize,
        ma_lags: usize,
    ) -> Vec<f64> {
        let mut row = exog_row.to_vec();
        for lag in 1..=ar_lags {
            for (s, mean) in series.iter().zip(&self.means) {
                row.push(if t >= lag { s[t - lag] } else { *mean });
            }
        }
        for lag in 1..=ma_lags {
            for e in innovations {
                row.push(if t >= lag { e[t - lag] } else { 0.0 });
            }
        }
        row
    }

    fn residuals(&self, series: &[Vec<f64>], exog: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n = series.first().map_or(0, Vec::len);
        let mut eps = vec![vec![0.0; n]; series.len()];
        for t in self.max_lag()..n {
            let row = self.design_row(series, &eps, exog_row(exog, t), t, self.p, self.q);
            for (j, eq) in self.equations.iter().enumerate() {
                eps[j][t] = series[j][t] - eq.predict_row(&row);
            }
        }
        eps
    }
}

fn exog_row(exog: &[Vec<f64>], t: usize) -> &[f64] {
    exog.get(t).map_or(&[], Vec::as_slice)
}

impl Forecaster for Varmax {
    fn fit(&mut self, endog: &[Vec<f64>], exog: &[Vec<f64>]) -> Result<()> {
        if self.p == 0 && self.q == 0 {
            return Err(ImputeError::InvalidParameter(
                "VARMAX(0,0) has no dynamics".into(),
            ));
        }
        let n = endog.first().map_or(0, Vec::len);
        if n == 0 {
            return Err(ImputeError::EmptyData);
        }
        if let Some(bad) = endog.iter().find(|s| s.len() != n) {
            return Err(ImputeError::DimensionMismatch {
                expected: n,
                got: bad.len(),
            });
        }
        if !exog.is_empty() && exog.len() != n {
            return Err(ImputeError::DimensionMismatch {
                expected: n,
                got: exog.len(),
            });
        }

        self.means = endog
            .iter()
            .map(|s| s.iter().sum::<f64>() / n as f64)
            .collect();
        self.equations.clear();

        let mut innovations = vec![vec![0.0; n]; endog.len()];
        let mut start = self.p;
        if self.q > 0 {
            let long = 2 * self.max_lag();
            if n <= long {
                return Err(ImputeError::InsufficientData {
                    needed: long + 1,
                    got: n,
                });
            }
            let rows: Vec<Vec<f64>> = (long..n)
                .map(|t| self.design_row(endog, &[], exog_row(exog, t), t, long, 0))
                .collect();
            let targets: Vec<Vec<f64>> = endog.iter().map(|s| s[long..].to_vec()).collect();
            let long_var = ols_fit_multi(&rows, &targets)?;
            for (j, eq) in long_var.iter().enumerate() {
                for (t, row) in (long..n).zip(&rows) {
                    innovations[j][t] = endog[j][t] - eq.predict_row(row);
                }
            }
            start = start.max(long + self.q);
        }
        if start >= n {
            return Err(ImputeError::InsufficientData {
                needed: start + 1,
                got: n,
            });
        }

        let rows: Vec<Vec<f64>> = (start..n)
            .map(|t| self.design_row(endog, &innovations, exog_row(exog, t), t, self.p, self.q))
            .collect();
        let targets: Vec<Vec<f64>> = endog.iter().map(|s| s[start..].to_vec()).collect();
        self.equations = ols_fit_multi(&rows, &targets)?;
        self.endog = endog.to_vec();
        self.exog = exog.to_vec();
        self.n_exog = exog.first().map_or(0, Vec::len);

        if self
            .residuals(endog, exog)
            .iter()
            .flatten()
            .any(|e| !e.is_finite())
        {
            self.equations.clear();
            return Err(ImputeError::NonConvergence(format!(
                "VARMAX({},{}) produced non-finite residuals",
                self.p, self.q
            )));
        }
        Ok(())
    }

    fn forecast_from(
        &self,
        history: usize,
        horizon: usize,
        exog_future: &[Vec<f64>],
    ) -> Result<Forecast> {
        let n = self.n_obs().ok_or(ImputeError::FitRequired)?;
        if history == 0 || history > n {
            return Err(ImputeError::InvalidParameter(format!(
                "history of {history} outside 1..={n} fitted observations"
            )));
        }
        if self.n_exog > 0 && exog_future.len() < horizon {
            return Err(ImputeError::DimensionMismatch {
                expected: horizon,
                got: exog_future.len(),
            });
        }

        let mut path: Vec<Vec<f64>> = self.endog.iter().map(|s| s[..history].to_vec()).collect();
        let past_exog = &self.exog[..history.min(self.exog.len())];
        let future_exog: &[Vec<f64>] = if self.n_exog > 0 { exog_future } else { &[] };
        let mut eps = self.residuals(&path, past_exog);

        for step in 0..horizon {
            let t = history + step;
            let row = self.design_row(
                &path,
                &eps,
                exog_row(future_exog, step),
                t,
                self.p,
                self.q,
            );
            for (j, eq) in self.equations.iter().enumerate() {
                path[j].push(eq.predict_row(&row));
                eps[j].push(0.0);
            }
        }

        let series: Vec<Vec<f64>> = path.into_iter().map(|s| s[history..].to_vec()).collect();
        let forecast = Forecast::from_series(series);
        if !forecast.is_finite() {
            return Err(ImputeError::NonConvergence(format!(
                "VARMAX({},{}) forecast diverged",
                self.p, self.q
            )));
        }
        Ok(forecast)
    }

    /// Forecast of the same order refitted on the reversed sample.
    fn backcast(&self, horizon: usize, exog_past: &[Vec<f64>]) -> Result<Forecast> {
        if self.n_obs().is_none() {
            return Err(ImputeError::FitRequired);
        }
        if self.n_exog > 0 && exog_past.len() < horizon {
            return Err(ImputeError::DimensionMismatch {
                expected: horizon,
                got: exog_past.len(),
            });
        }
        let future: Vec<Vec<f64>> = if self.n_exog > 0 {
            exog_past[exog_past.len() - horizon..].iter().rev().cloned().collect()
        } else {
            Vec::new()
        };

        let mut reverse = Varmax::new(self.p, self.q);
        let endog: Vec<Vec<f64>> = self
            .endog
            .iter()
            .map(|s| s.iter().rev().copied().collect())
            .collect();
        let exog: Vec<Vec<f64>> = self.exog.iter().rev().cloned().collect();
        reverse.fit(&endog, &exog)?;

        let series = reverse
            .forecast(horizon, &future)?
            .point()
            .iter()
            .map(|s| s.iter().rev().copied().collect())
            .collect();
        Ok(Forecast::from_series(series))
    }

    fn n_obs(&self) -> Option<usize> {
        if self.equations.is_empty() {
            None
        } else {
            self.endog.first().map(Vec::len)
        }
    }

    fn name(&self) -> &str {
        "VARMAX"
    }
}
