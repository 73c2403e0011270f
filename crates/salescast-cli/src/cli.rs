//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Salescast - Sales forecasting and client lifecycle analysis
#[derive(Parser)]
#[command(name = "salescast")]
#[command(about = "Revenue forecasts per manager, department and client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Sales records file (.csv or .json)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Settings file (defaults to the per-user config, then built-in defaults)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the neural predictor, for reproducible runs
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show revenue per calendar period
    Aggregate {
        /// Period size: month, quarter, year (defaults to settings)
        #[arg(short, long)]
        granularity: Option<String>,

        /// Product ids to leave out, in addition to the configured ones
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Forecast revenue for a manager or a department
    Forecast {
        #[command(subcommand)]
        action: ForecastAction,
    },

    /// Classify clients by lifecycle stage and forecast each of them
    Clients {
        /// Show a single client in detail
        #[arg(long)]
        client: Option<String>,

        /// Reference date for "days since last purchase" (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        now: Option<String>,

        /// Number of monthly periods to forecast
        #[arg(short, long, default_value = "3")]
        periods: usize,
    },

    /// Backtest the ensemble on held-out history
    Accuracy {
        /// Only check this manager (defaults to every manager)
        #[arg(short, long)]
        manager: Option<String>,
    },

    /// Show the resolved settings
    Config {
        /// Print the per-user override path instead
        #[arg(long)]
        path: bool,
    },
}

#[derive(Subcommand)]
pub enum ForecastAction {
    /// Forecast everything sold by one manager
    Manager {
        /// Manager name as it appears in the records
        name: String,

        /// Number of periods to forecast (defaults to settings)
        #[arg(short, long)]
        periods: Option<usize>,
    },

    /// Forecast a department from its member managers
    Department {
        /// Department name (used as a label)
        name: String,

        /// Member manager names, comma-separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        members: Vec<String>,

        /// Number of periods to forecast (defaults to settings)
        #[arg(short, long)]
        periods: Option<usize>,
    },
}
