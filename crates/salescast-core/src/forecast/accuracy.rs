//! Forecast accuracy metrics

use serde::Serialize;

/// Error of a forecast against held-out actuals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AccuracyReport {
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error, in percent
    pub mape: f64,
}

impl std::fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RMSE {:.2}, MAPE {:.2}%", self.rmse, self.mape)
    }
}

/// Score `forecast` against `actual`
///
/// Only points with a positive actual value count. Empty input, length
/// mismatch, or no qualifying points give a zero report.
pub fn evaluate(actual: &[f64], forecast: &[f64]) -> AccuracyReport {
    if actual.is_empty() || actual.len() != forecast.len() {
        return AccuracyReport::default();
    }

    let mut squared = 0.0;
    let mut percentage = 0.0;
    let mut count = 0usize;

    for (a, f) in actual.iter().zip(forecast) {
        if *a > 0.0 {
            let diff = a - f;
            squared += diff * diff;
            percentage += diff.abs() / a;
            count += 1;
        }
    }

    if count == 0 {
        return AccuracyReport::default();
    }

    let n = count as f64;
    AccuracyReport {
        rmse: (squared / n).sqrt(),
        mape: percentage / n * 100.0,
    }
}
