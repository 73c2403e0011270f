//! Additive seasonal decomposition: Y = T + S + R

use serde::Serialize;

use super::trend::TrendEstimator;
use super::{non_negative, Forecaster};

/// Decomposed series components
#[derive(Debug, Clone, Serialize)]
pub struct SeasonalDecomposition {
    pub season_length: usize,
    /// Centered moving average
    pub trend: Vec<f64>,
    /// Seasonal index repeated over the series
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    /// Mean deviation from trend for each phase (`index % season_length`)
    pub seasonal_indices: Vec<f64>,
}

impl SeasonalDecomposition {
    /// In-sample values implied by trend + seasonal
    pub fn reconstruct(&self) -> Vec<f64> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .map(|(t, s)| t + s)
            .collect()
    }
}

/// Trend + phase-averaged seasonal index forecaster
#[derive(Debug, Clone, Copy)]
pub struct SeasonalDecomposer {
    season_length: usize,
}

impl Default for SeasonalDecomposer {
    fn default() -> Self {
        Self { season_length: 12 }
    }
}

impl SeasonalDecomposer {
    pub fn new(season_length: usize) -> Self {
        Self { season_length }
    }

    pub fn season_length(&self) -> usize {
        self.season_length
    }

    /// Decompose the series, or None when it covers fewer than two seasons
    /// or the season is shorter than 2
    pub fn decompose(&self, series: &[f64]) -> Option<SeasonalDecomposition> {
        let season = self.season_length;
        let n = series.len();
        if season < 2 || n < season * 2 {
            return None;
        }

        let trend = moving_average_trend(series, season);

        let mut sums = vec![0.0; season];
        let mut counts = vec![0usize; season];
        for (i, (value, t)) in series.iter().zip(&trend).enumerate() {
            sums[i % season] += value - t;
            counts[i % season] += 1;
        }
        let seasonal_indices: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
            .collect();

        let seasonal: Vec<f64> = (0..n).map(|i| seasonal_indices[i % season]).collect();
        let residual: Vec<f64> = series
            .iter()
            .zip(&trend)
            .zip(&seasonal)
            .map(|((y, t), s)| y - t - s)
            .collect();

        Some(SeasonalDecomposition {
            season_length: season,
            trend,
            seasonal,
            residual,
            seasonal_indices,
        })
    }

    /// Forecast split into its trend and seasonal parts
    ///
    /// For short series the trend part is the plain trend forecast and the
    /// seasonal part is all zeros.
    pub fn forecast_components(&self, series: &[f64], periods: usize) -> (Vec<f64>, Vec<f64>) {
        match self.decompose(series) {
            Some(decomposition) => {
                let n = series.len();
                let season = decomposition.season_length;
                let trend = TrendEstimator.forecast(&decomposition.trend, periods);
                let seasonal = (0..periods)
                    .map(|i| decomposition.seasonal_indices[(n + i) % season])
                    .collect();
                (trend, seasonal)
            }
            None => (TrendEstimator.forecast(series, periods), vec![0.0; periods]),
        }
    }
}

impl Forecaster for SeasonalDecomposer {
    fn name(&self) -> &'static str {
        "seasonal"
    }

    fn forecast(&self, series: &[f64], periods: usize) -> Vec<f64> {
        let (trend, seasonal) = self.forecast_components(series, periods);
        trend
            .iter()
            .zip(&seasonal)
            .map(|(t, s)| non_negative(t + s))
            .collect()
    }
}

/// Centered moving average with a window of `window` observations
///
/// Near either end the window slides inward so it always averages exactly
/// `window` available points. Requires `series.len() >= window`.
fn moving_average_trend(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    let half = window / 2;

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half).min(n - window);
            let sum: f64 = series[start..start + window].iter().sum();
            sum / window as f64
        })
        .collect()
}
