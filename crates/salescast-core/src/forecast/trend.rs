//! Linear trend projection

use super::{non_negative, Forecaster};

/// Ordinary least-squares fit of `value = slope * index + intercept`
///
/// Returns None when the index has no variance (fewer than two points).
pub fn linear_fit(series: &[f64]) -> Option<(f64, f64)> {
    let n = series.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = series.iter().sum::<f64>() / n_f;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (i, y) in series.iter().enumerate() {
        let dx = i as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }

    if variance == 0.0 {
        return None;
    }

    let slope = covariance / variance;
    Some((slope, mean_y - slope * mean_x))
}

/// Projects the least-squares line beyond the end of the series
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendEstimator;

impl TrendEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl Forecaster for TrendEstimator {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn forecast(&self, series: &[f64], periods: usize) -> Vec<f64> {
        let n = series.len();

        if n < 2 {
            let value = series.first().copied().map(non_negative).unwrap_or(0.0);
            return vec![value; periods];
        }

        match linear_fit(series) {
            Some((slope, intercept)) => (0..periods)
                .map(|i| non_negative(slope * (n + i) as f64 + intercept))
                .collect(),
            None => {
                let mean = series.iter().sum::<f64>() / n as f64;
                vec![non_negative(mean); periods]
            }
        }
    }
}
