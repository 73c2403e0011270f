//! Salescast Core Library
//!
//! Sales forecasting and client lifecycle engine:
//! - Period aggregation of raw sale records
//! - Trend, seasonal and neural forecasters blended by an ensemble
//! - Forecast accuracy metrics
//! - Client lifecycle classification with stage-specific forecasts
//! - Orchestration across managers, departments and client portfolios
//! - CSV/JSON record readers and TOML settings

pub mod aggregate;
pub mod config;
pub mod error;
pub mod forecast;
pub mod import;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;

/// Record builders for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{merge_daily_client_sales, PeriodAggregator};
pub use config::{EnsembleWeights, ForecastSettings, LifecycleSettings, Settings};
pub use error::{Error, Result};
pub use forecast::{
    evaluate, AccuracyReport, EnsembleCombiner, EnsembleForecast, Forecaster, NeuralPredictor,
    SeasonalDecomposer, SeasonalDecomposition, TrendEstimator,
};
pub use import::{load_records, parse_csv, parse_json};
pub use lifecycle::{ClientForecast, ClientLifecycleClassifier};
pub use models::{
    ClientDailySales, ClientLifecycleProfile, ForecastStrategy, Granularity, LifecycleStage,
    PeriodKey, SaleRecord,
};
pub use orchestrator::{DepartmentForecast, EntityForecast, ForecastOrchestrator, PortfolioForecast};
