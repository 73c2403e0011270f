//! Weighted blend of the trend, seasonal and neural forecasters

use serde::Serialize;
use tracing::debug;

use super::neural::NeuralPredictor;
use super::seasonal::SeasonalDecomposer;
use super::trend::TrendEstimator;
use super::{non_negative, Forecaster};
use crate::config::{EnsembleWeights, ForecastSettings};

/// Combined forecast with its raw components kept for inspection
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleForecast {
    pub combined: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub nonlinear: Vec<f64>,
    pub weights: EnsembleWeights,
}

#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    weights: EnsembleWeights,
    seasonal: SeasonalDecomposer,
    neural: NeuralPredictor,
}

impl EnsembleCombiner {
    pub fn new(weights: EnsembleWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &ForecastSettings) -> Self {
        Self {
            weights: settings.weights,
            seasonal: SeasonalDecomposer::new(settings.season_length),
            neural: NeuralPredictor::from_settings(settings),
        }
    }

    pub fn with_seasonal(mut self, seasonal: SeasonalDecomposer) -> Self {
        self.seasonal = seasonal;
        self
    }

    pub fn with_neural(mut self, neural: NeuralPredictor) -> Self {
        self.neural = neural;
        self
    }

    pub fn weights(&self) -> EnsembleWeights {
        self.weights
    }

    /// Run all three forecasters and blend them
    pub fn combine(&self, series: &[f64], periods: usize) -> EnsembleForecast {
        let trend = TrendEstimator.forecast(series, periods);
        let seasonal = self.seasonal.forecast(series, periods);
        let nonlinear = self.neural.forecast(series, periods);

        let w = self.weights;
        let combined = (0..periods)
            .map(|i| {
                non_negative(w.trend * trend[i] + w.seasonal * seasonal[i] + w.nonlinear * nonlinear[i])
            })
            .collect();

        debug!(
            points = series.len(),
            periods,
            "Ensemble forecast (weights {}/{}/{})",
            w.trend,
            w.seasonal,
            w.nonlinear
        );

        EnsembleForecast {
            combined,
            trend,
            seasonal,
            nonlinear,
            weights: w,
        }
    }
}

impl Forecaster for EnsembleCombiner {
    fn name(&self) -> &'static str {
        "ensemble"
    }

    fn forecast(&self, series: &[f64], periods: usize) -> Vec<f64> {
        self.combine(series, periods).combined
    }
}
