//! Sliding-window neural predictor
//!
//! A single hidden layer (sigmoid) feeding a linear output, trained with plain
//! per-sample backpropagation on min-max normalized data. The network is
//! built and trained inside each `forecast` call and dropped afterwards.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trend::TrendEstimator;
use super::{non_negative, Forecaster};
use crate::config::ForecastSettings;

const INIT_RANGE: f64 = 0.5;

/// Min-max scaling of a series into [0, 1]
#[derive(Debug, Clone, Copy)]
struct Scaler {
    min: f64,
    range: f64,
}

impl Scaler {
    fn fit(series: &[f64]) -> Self {
        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Self {
                min: 0.0,
                range: 0.0,
            };
        }
        Self {
            min,
            range: max - min,
        }
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.range > 0.0 {
            (value - self.min) / self.range
        } else {
            0.5
        }
    }

    fn denormalize(&self, value: f64) -> f64 {
        if self.range > 0.0 {
            value * self.range + self.min
        } else {
            self.min
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One hidden layer, one linear output
#[derive(Debug, Clone)]
struct Network {
    hidden_weights: Vec<Vec<f64>>,
    hidden_bias: Vec<f64>,
    output_weights: Vec<f64>,
    output_bias: f64,
}

impl Network {
    fn new<R: Rng>(inputs: usize, hidden: usize, rng: &mut R) -> Self {
        let mut weight = || rng.gen_range(-INIT_RANGE..INIT_RANGE);
        let hidden_weights: Vec<Vec<f64>> = (0..hidden)
            .map(|_| (0..inputs).map(|_| weight()).collect())
            .collect();
        let hidden_bias: Vec<f64> = (0..hidden).map(|_| weight()).collect();
        let output_weights: Vec<f64> = (0..hidden).map(|_| weight()).collect();
        let output_bias = weight();

        Self {
            hidden_weights,
            hidden_bias,
            output_weights,
            output_bias,
        }
    }

    fn hidden_activations(&self, input: &[f64]) -> Vec<f64> {
        self.hidden_weights
            .iter()
            .zip(&self.hidden_bias)
            .map(|(weights, bias)| {
                let z: f64 = weights.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
                sigmoid(z)
            })
            .collect()
    }

    fn predict(&self, input: &[f64]) -> f64 {
        let hidden = self.hidden_activations(input);
        self.output(&hidden)
    }

    fn output(&self, hidden: &[f64]) -> f64 {
        self.output_weights
            .iter()
            .zip(hidden)
            .map(|(w, h)| w * h)
            .sum::<f64>()
            + self.output_bias
    }

    /// One gradient step on squared error for a single sample
    fn train_step(&mut self, input: &[f64], target: f64, learning_rate: f64) {
        let hidden = self.hidden_activations(input);
        let error = self.output(&hidden) - target;

        for (j, h) in hidden.iter().enumerate() {
            let hidden_delta = error * self.output_weights[j] * h * (1.0 - h);

            self.output_weights[j] -= learning_rate * error * h;

            for (w, x) in self.hidden_weights[j].iter_mut().zip(input) {
                *w -= learning_rate * hidden_delta * x;
            }
            self.hidden_bias[j] -= learning_rate * hidden_delta;
        }
        self.output_bias -= learning_rate * error;
    }
}

/// Sliding-window neural network forecaster
#[derive(Debug, Clone)]
pub struct NeuralPredictor {
    lookback: usize,
    epochs: usize,
    learning_rate: f64,
    seed: Option<u64>,
}

impl Default for NeuralPredictor {
    fn default() -> Self {
        Self {
            lookback: 6,
            epochs: 100,
            learning_rate: 0.01,
            seed: None,
        }
    }
}

impl NeuralPredictor {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &ForecastSettings) -> Self {
        Self {
            lookback: settings.lookback,
            epochs: settings.epochs,
            learning_rate: settings.learning_rate,
            seed: settings.seed,
        }
    }

    /// Fix the weight initialization so runs are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_training(mut self, epochs: usize, learning_rate: f64) -> Self {
        self.epochs = epochs;
        self.learning_rate = learning_rate;
        self
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    fn hidden_size(&self) -> usize {
        (self.lookback / 2).max(4)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Train a fresh network on `series` and roll it forward with `rng`
    pub fn forecast_with_rng<R: Rng>(&self, series: &[f64], periods: usize, rng: &mut R) -> Vec<f64> {
        let lookback = self.lookback;
        if lookback == 0 || series.len() < lookback + 1 {
            return TrendEstimator.forecast(series, periods);
        }

        let scaler = Scaler::fit(series);
        let normalized: Vec<f64> = series.iter().map(|v| scaler.normalize(*v)).collect();

        let samples: Vec<(&[f64], f64)> = normalized
            .windows(lookback + 1)
            .map(|w| (&w[..lookback], w[lookback]))
            .collect();

        let mut network = Network::new(lookback, self.hidden_size(), rng);
        for _ in 0..self.epochs {
            for (input, target) in &samples {
                network.train_step(input, *target, self.learning_rate);
            }
        }

        let mut window: Vec<f64> = normalized[normalized.len() - lookback..].to_vec();
        let mut forecast = Vec::with_capacity(periods);
        for _ in 0..periods {
            let prediction = network.predict(&window);
            window.remove(0);
            window.push(prediction);
            forecast.push(non_negative(scaler.denormalize(prediction)));
        }

        forecast
    }
}

impl Forecaster for NeuralPredictor {
    fn name(&self) -> &'static str {
        "nonlinear"
    }

    fn forecast(&self, series: &[f64], periods: usize) -> Vec<f64> {
        let mut rng = self.rng();
        self.forecast_with_rng(series, periods, &mut rng)
    }
}
