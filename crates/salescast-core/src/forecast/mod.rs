//! Forecasting primitives
//!
//! Every forecaster maps a non-negative revenue series to a forecast of
//! `periods` values, each clamped to >= 0. Degenerate input never fails; it
//! falls back to a simpler method instead.
//!
//! ## Core Forecasters
//!
//! - **Trend** - ordinary least-squares line
//! - **Seasonal** - moving-average trend plus phase-averaged seasonal index
//! - **Neural** - sliding-window network with one hidden layer
//! - **Ensemble** - weighted blend of the three
//!
//! ## Usage
//!
//! ```rust,ignore
//! use salescast_core::forecast::{EnsembleCombiner, Forecaster};
//!
//! let combiner = EnsembleCombiner::from_settings(&settings.forecast);
//! let next_six = combiner.forecast(&series, 6);
//! ```

pub mod accuracy;
pub mod ensemble;
pub mod neural;
pub mod seasonal;
pub mod trend;

pub use accuracy::{evaluate, AccuracyReport};
pub use ensemble::{EnsembleCombiner, EnsembleForecast};
pub use neural::NeuralPredictor;
pub use seasonal::{SeasonalDecomposer, SeasonalDecomposition};
pub use trend::{linear_fit, TrendEstimator};

/// A method that projects a revenue series forward
pub trait Forecaster {
    /// Short identifier used in logs and reports
    fn name(&self) -> &'static str;

    /// Forecast `periods` values following `series`
    fn forecast(&self, series: &[f64], periods: usize) -> Vec<f64>;
}

/// Replace non-finite values with 0 and clamp negatives to 0
pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
