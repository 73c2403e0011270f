//! Shared command utilities
//!
//! This module contains:
//! - `load_settings` - Resolve settings and apply command-line overrides
//! - `load_sales` - Read the sales records file
//! - `resolve_now` - Reference instant for lifecycle classification
//! - `print_json` - Pretty JSON output

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use salescast_core::models::parse_datetime;
use salescast_core::{load_records, SaleRecord, Settings};
use serde::Serialize;
use tracing::{debug, info};

/// Load settings (explicit file, user override or defaults), then apply --seed
pub fn load_settings(config: Option<&Path>, seed: Option<u64>) -> Result<Settings> {
    let mut settings = Settings::load(config).context("Failed to load settings")?;
    if let Some(seed) = seed {
        debug!("Using seed {} from command line", seed);
        settings.forecast.seed = Some(seed);
    }
    Ok(settings)
}

/// Read sale records from a CSV or JSON file
pub fn load_sales(file: Option<&Path>) -> Result<Vec<SaleRecord>> {
    let Some(path) = file else {
        anyhow::bail!("No sales file given. Use --file <sales.csv|sales.json>");
    };

    let records = load_records(path)
        .with_context(|| format!("Failed to read sales records from {}", path.display()))?;

    info!("Loaded {} sale records from {}", records.len(), path.display());
    if records.is_empty() {
        anyhow::bail!("No usable sale records in {}", path.display());
    }
    Ok(records)
}

/// Parse --now, or use the current time
pub fn resolve_now(now: Option<&str>) -> Result<NaiveDateTime> {
    match now {
        Some(text) => parse_datetime(text)
            .with_context(|| format!("Invalid --now date: {} (use YYYY-MM-DD)", text)),
        None => Ok(Utc::now().naive_utc()),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}
