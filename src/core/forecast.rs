//! Forecast result structure for holding predictions.

use crate::error::{ImputeError, Result};

/// Point predictions for one or more endogenous series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    /// Point predictions: point[dimension][step]
    point: Vec<Vec<f64>>,
}

impl Forecast {
    /// Create a univariate forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: vec![values],
        }
    }

    /// Create a multivariate forecast from one vector per series.
    pub fn from_series(series: Vec<Vec<f64>>) -> Self {
        Self { point: series }
    }

    /// Get the number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.point.len()
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.first().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty() || self.point.iter().all(|s| s.is_empty())
    }

    /// Check that every prediction is finite.
    pub fn is_finite(&self) -> bool {
        self.point.iter().flatten().all(|v| v.is_finite())
    }

    /// Get reference to a series.
    pub fn series(&self, dimension: usize) -> Result<&[f64]> {
        self.point
            .get(dimension)
            .map(|v| v.as_slice())
            .ok_or(ImputeError::DimensionMismatch {
                expected: dimension + 1,
                got: self.point.len(),
            })
    }

    /// Get reference to the primary (first) series.
    pub fn primary(&self) -> &[f64] {
        self.point.first().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get all point predictions.
    pub fn point(&self) -> &[Vec<f64>] {
        &self.point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_series_lookup() {
        let forecast = Forecast::from_series(vec![vec![1.0, 2.0], vec![3.0, f64::NAN]]);
        assert_eq!(forecast.dimensions(), 2);
        assert_eq!(forecast.series(1).unwrap()[0], 3.0);
        assert!(forecast.series(2).is_err());
        assert!(!forecast.is_finite());
        assert!(Forecast::default().is_empty());
    }

    #[test]
    fn forecast_from_values_creates_univariate() {
        let forecast = Forecast::from_values(vec![1.0, 2.0, 3.0]);
        assert_eq!(forecast.dimensions(), 1);
        assert_eq!(forecast.horizon(), 3);
        assert_eq!(forecast.primary(), &[1.0, 2.0, 3.0]);
        assert!(forecast.is_finite());
    }
}
