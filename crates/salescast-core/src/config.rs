//! Forecast and lifecycle configuration
//!
//! Every threshold the engine uses lives in [`Settings`], which callers pass
//! explicitly into the classifier and orchestrator. Nothing is read from
//! globals.
//!
//! ## Configuration Resolution
//!
//! Settings are loaded with a two-layer resolution:
//! 1. An explicit path, or the per-user override
//!    (~/.config/salescast/salescast.toml on Linux)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Any key missing from a file keeps its default value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Granularity, LifecycleStage};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/salescast.toml");

/// Weights for blending the component forecasts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleWeights {
    pub trend: f64,
    pub seasonal: f64,
    pub nonlinear: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            trend: 0.4,
            seasonal: 0.4,
            nonlinear: 0.2,
        }
    }
}

impl EnsembleWeights {
    pub fn new(trend: f64, seasonal: f64, nonlinear: f64) -> Self {
        Self {
            trend,
            seasonal,
            nonlinear,
        }
    }

    pub fn total(&self) -> f64 {
        self.trend + self.seasonal + self.nonlinear
    }
}

/// Settings for the numerical forecasters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Calendar bucket used when aggregating manager/department series
    pub granularity: Granularity,
    /// Number of periods to forecast
    pub horizon: usize,
    /// Periods per seasonal cycle (12 for monthly data)
    pub season_length: usize,
    /// Sliding window size of the nonlinear predictor
    pub lookback: usize,
    /// Training passes over all windows
    pub epochs: usize,
    pub learning_rate: f64,
    /// Seed for predictor weight initialization; None draws from OS entropy
    pub seed: Option<u64>,
    /// Product ids left out of every aggregation
    pub excluded_products: Vec<String>,
    /// Shortest series the historical accuracy check will score
    pub accuracy_min_periods: usize,
    /// Fraction of the series used for training in the accuracy check
    pub train_ratio: f64,
    pub weights: EnsembleWeights,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            horizon: 6,
            season_length: 12,
            lookback: 6,
            epochs: 100,
            learning_rate: 0.01,
            seed: None,
            excluded_products: Vec::new(),
            accuracy_min_periods: 6,
            train_ratio: 0.8,
            weights: EnsembleWeights::default(),
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<()> {
        if self.season_length == 0 {
            return Err(Error::InvalidConfig(
                "forecast.season_length must be at least 1".into(),
            ));
        }
        if self.lookback == 0 {
            return Err(Error::InvalidConfig(
                "forecast.lookback must be at least 1".into(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "forecast.learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "forecast.train_ratio must be between 0 and 1 (exclusive), got {}",
                self.train_ratio
            )));
        }
        let weights = [
            ("trend", self.weights.trend),
            ("seasonal", self.weights.seasonal),
            ("nonlinear", self.weights.nonlinear),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "forecast.weights.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.weights.total() == 0.0 {
            warn!("All ensemble weights are zero; ensemble forecasts will be all zeros");
        }
        Ok(())
    }
}

/// Thresholds that drive lifecycle classification
///
/// Multipliers are applied to a client's own average interval between orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Exact order count that marks a client as new
    pub new_client_orders: usize,
    /// Orders required (strictly more than) to qualify as growing
    pub growing_client_min_orders: usize,
    /// Orders required (strictly more than) to qualify as active
    pub active_client_min_orders: usize,
    pub at_risk_multiplier: f64,
    pub active_client_multiplier: f64,
    pub growing_client_multiplier: f64,
    /// Scale applied to the trend forecast of at-risk clients
    pub forecast_reduction_for_at_risk: f64,
    pub min_confidence_new: f64,
    pub min_confidence_growing: f64,
    pub min_confidence_active: f64,
    pub min_confidence_at_risk: f64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            new_client_orders: 1,
            growing_client_min_orders: 3,
            active_client_min_orders: 10,
            at_risk_multiplier: 3.0,
            active_client_multiplier: 1.5,
            growing_client_multiplier: 2.0,
            forecast_reduction_for_at_risk: 0.7,
            min_confidence_new: 0.3,
            min_confidence_growing: 0.5,
            min_confidence_active: 0.7,
            min_confidence_at_risk: 0.4,
        }
    }
}

impl LifecycleSettings {
    /// Minimum confidence reported for forecasts of a stage
    pub fn confidence_for(&self, stage: LifecycleStage) -> f64 {
        match stage {
            LifecycleStage::New => self.min_confidence_new,
            LifecycleStage::Growing => self.min_confidence_growing,
            LifecycleStage::Active => self.min_confidence_active,
            LifecycleStage::AtRisk => self.min_confidence_at_risk,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.new_client_orders == 0 {
            return Err(Error::InvalidConfig(
                "lifecycle.new_client_orders must be at least 1".into(),
            ));
        }

        let multipliers = [
            ("at_risk_multiplier", self.at_risk_multiplier),
            ("active_client_multiplier", self.active_client_multiplier),
            ("growing_client_multiplier", self.growing_client_multiplier),
        ];
        for (name, value) in multipliers {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "lifecycle.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !(self.forecast_reduction_for_at_risk.is_finite()
            && self.forecast_reduction_for_at_risk >= 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "lifecycle.forecast_reduction_for_at_risk must be non-negative, got {}",
                self.forecast_reduction_for_at_risk
            )));
        }

        for stage in LifecycleStage::all() {
            let confidence = self.confidence_for(*stage);
            if !(0.0..=1.0).contains(&confidence) {
                return Err(Error::InvalidConfig(format!(
                    "lifecycle confidence for {} must be within [0, 1], got {}",
                    stage, confidence
                )));
            }
        }

        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub forecast: ForecastSettings,
    pub lifecycle: LifecycleSettings,
}

impl Settings {
    /// Load settings (explicit path or user override first, then embedded defaults)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let settings = load_config(override_path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML content without validating
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    pub fn validate(&self) -> Result<()> {
        self.forecast.validate()?;
        self.lifecycle.validate()
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("salescast").join("salescast.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<Settings> {
    let content = if let Some(path) = override_path {
        debug!("Loading settings from {}", path.display());
        fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("Failed to read config {}: {}", path.display(), e))
        })?
    } else {
        match default_config_path() {
            Some(default_path) if default_path.exists() => {
                debug!("Loading settings from {}", default_path.display());
                fs::read_to_string(&default_path).map_err(|e| {
                    Error::InvalidConfig(format!("Failed to read config: {}", e))
                })?
            }
            _ => DEFAULT_CONFIG.to_string(),
        }
    };

    parse_config(&content)
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<Settings> {
    Ok(toml::from_str(content)?)
}
