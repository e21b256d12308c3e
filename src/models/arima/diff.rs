//! Differencing utilities for the seasonal regression models.

use crate::error::{ImputeError, Result};

/// Difference a series once at the given lag.
///
/// # Arguments
/// * `series` - The input series
/// * `lag` - 1 for regular differencing, the period for seasonal differencing
///
/// # Returns
/// The differenced series, `lag` values shorter (empty if too short).
pub fn difference_at(series: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || series.len() <= lag {
        return Vec::new();
    }
    series
        .iter()
        .skip(lag)
        .zip(series.iter())
        .map(|(curr, prev)| curr - prev)
        .collect()
}

/// Differencing chain: `d` regular differences followed by `seasonal_d`
/// seasonal differences at `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Differencing {
    /// Regular differencing order.
    pub d: usize,
    /// Seasonal differencing order.
    pub seasonal_d: usize,
    /// Seasonal period; 0 disables seasonal differencing.
    pub period: usize,
}

impl Differencing {
    /// Create a differencing chain.
    pub fn new(d: usize, seasonal_d: usize, period: usize) -> Self {
        Self {
            d,
            seasonal_d,
            period,
        }
    }

    fn lags(&self) -> Vec<usize> {
        let mut lags = vec![1; self.d];
        if self.period > 0 {
            lags.extend(std::iter::repeat(self.period).take(self.seasonal_d));
        }
        lags
    }

    /// Number of observations consumed by the chain.
    pub fn loss(&self) -> usize {
        self.lags().iter().sum()
    }

    /// Apply every difference in the chain.
    pub fn apply(&self, series: &[f64]) -> Vec<f64> {
        self.lags()
            .into_iter()
            .fold(series.to_vec(), |acc, lag| difference_at(&acc, lag))
    }

    /// Undo the chain for values that continue `history` on the
    /// differenced scale.
    ///
    /// # Arguments
    /// * `history` - Observations on the original scale
    /// * `differenced` - Future values on the fully differenced scale
    ///
    /// # Returns
    /// The future values on the original scale.
    pub fn integrate(&self, history: &[f64], differenced: &[f64]) -> Result<Vec<f64>> {
        let lags = self.lags();
        if lags.is_empty() {
            return Ok(differenced.to_vec());
        }
        if history.len() <= self.loss() {
            return Err(ImputeError::InsufficientData {
                needed: self.loss() + 1,
                got: history.len(),
            });
        }

        let mut levels = vec![history.to_vec()];
        for &lag in &lags[..lags.len() - 1] {
            let next = difference_at(levels[levels.len() - 1].as_slice(), lag);
            levels.push(next);
        }

        let mut future = differenced.to_vec();
        for (level, &lag) in levels.iter().zip(&lags).rev() {
            let mut extended = level.clone();
            let start = extended.len();
            for w in &future {
                let prev = extended[extended.len() - lag];
                extended.push(w + prev);
            }
            future = extended[start..].to_vec();
        }
        Ok(future)
    }
}
