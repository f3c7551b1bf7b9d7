//! Workload forecasting
//!
//! The engine treats forecasts as opaque. [`TrendForecaster`] is the
//! built-in implementation: it fits a least-squares line per metric over a
//! recent window and extrapolates it a few samples ahead.

use crate::models::WorkloadSample;

/// Minimum number of samples required before forecasting
pub const MIN_SAMPLES: usize = 10;

/// Workload assumed when neither a forecast nor a live sample is available
pub const DEFAULT_WORKLOAD: WorkloadSample = WorkloadSample {
    cpu_usage: 50.0,
    memory_usage: 60.0,
    network_usage: 40.0,
};

/// Produces a predicted workload from a chronological sample history
pub trait Forecaster: Send + Sync {
    /// Predict the next workload, or `None` when the history is insufficient
    fn forecast(&self, history: &[WorkloadSample]) -> Option<WorkloadSample>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Linear-trend extrapolation over a sliding window
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    window_size: usize,
    horizon: usize,
    min_samples: usize,
}

impl TrendForecaster {
    /// `horizon` is the number of sample intervals to project past the last sample
    pub fn new(window_size: usize, horizon: usize) -> Self {
        Self {
            window_size: window_size.max(2),
            horizon,
            min_samples: MIN_SAMPLES,
        }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples.max(1);
        self
    }

    fn project(&self, values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let slope = linear_regression_slope(values);
        // regression line evaluated `horizon` steps past the last sample
        let x = (n - 1.0) / 2.0 + self.horizon as f64;
        (mean + slope * x).clamp(0.0, 100.0)
    }
}

impl Default for TrendForecaster {
    fn default() -> Self {
        // one hour of minute samples, projected five minutes ahead
        Self::new(60, 5)
    }
}

impl Forecaster for TrendForecaster {
    fn forecast(&self, history: &[WorkloadSample]) -> Option<WorkloadSample> {
        if history.len() < self.min_samples {
            return None;
        }

        let start = history.len().saturating_sub(self.window_size);
        let window: Vec<WorkloadSample> = history[start..].iter().map(|s| s.sanitized()).collect();

        Some(WorkloadSample {
            cpu_usage: self.project(&column(&window, |s| s.cpu_usage)),
            memory_usage: self.project(&column(&window, |s| s.memory_usage)),
            network_usage: self.project(&column(&window, |s| s.network_usage)),
        })
    }

    fn name(&self) -> &str {
        "linear-trend"
    }
}

fn column(samples: &[WorkloadSample], metric: impl Fn(&WorkloadSample) -> f64) -> Vec<f64> {
    samples.iter().map(metric).collect()
}

/// Choose the workload to decide on: forecast first, then the latest live
/// sample, then [`DEFAULT_WORKLOAD`]
pub fn select_workload(
    forecast: Option<WorkloadSample>,
    latest: Option<WorkloadSample>,
) -> WorkloadSample {
    forecast.or(latest).unwrap_or(DEFAULT_WORKLOAD)
}

/// Least-squares slope of `values` against their index
pub fn linear_regression_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();
    let denom = n * sum_x2 - sum_x.powi(2);
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(cpu: impl Fn(usize) -> f64, count: usize) -> Vec<WorkloadSample> {
        (0..count)
            .map(|i| WorkloadSample::new(cpu(i), 50.0, 10.0))
            .collect()
    }

    #[test]
    fn test_insufficient_history() {
        let forecaster = TrendForecaster::default();
        assert!(forecaster.forecast(&history(|_| 50.0, 5)).is_none());
    }

    #[test]
    fn test_flat_history_forecasts_same_level() {
        let forecaster = TrendForecaster::default();
        let predicted = forecaster.forecast(&history(|_| 42.0, 20)).unwrap();
        assert!((predicted.cpu_usage - 42.0).abs() < 1e-9);
        assert!((predicted.memory_usage - 50.0).abs() < 1e-9);
        assert!((predicted.network_usage - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rising_history_extrapolates() {
        let forecaster = TrendForecaster::new(10, 1);
        let predicted = forecaster.forecast(&history(|i| i as f64, 10)).unwrap();
        assert!((predicted.cpu_usage - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_uses_most_recent_samples() {
        let forecaster = TrendForecaster::new(10, 0);
        // old samples at 90, recent ones flat at 20
        let mut samples = history(|_| 90.0, 30);
        samples.extend(history(|_| 20.0, 10));
        let predicted = forecaster.forecast(&samples).unwrap();
        assert!((predicted.cpu_usage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_is_clamped() {
        let forecaster = TrendForecaster::new(10, 50);
        let predicted = forecaster.forecast(&history(|i| i as f64 * 10.0, 10)).unwrap();
        assert_eq!(predicted.cpu_usage, 100.0);

        let predicted = forecaster
            .forecast(&history(|i| 90.0 - i as f64 * 10.0, 10))
            .unwrap();
        assert_eq!(predicted.cpu_usage, 0.0);
    }

    #[test]
    fn test_select_workload_fallback_order() {
        let forecast = WorkloadSample::new(1.0, 1.0, 1.0);
        let latest = WorkloadSample::new(2.0, 2.0, 2.0);

        assert_eq!(select_workload(Some(forecast), Some(latest)), forecast);
        assert_eq!(select_workload(None, Some(latest)), latest);
        assert_eq!(select_workload(None, None), DEFAULT_WORKLOAD);
    }

    #[test]
    fn test_linear_regression_slope() {
        assert!((linear_regression_slope(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 1.0).abs() < 0.01);
        assert_eq!(linear_regression_slope(&[]), 0.0);
        assert_eq!(linear_regression_slope(&[3.0]), 0.0);
    }
}
