//! Salescast CLI - Sales forecasting and client lifecycle analysis
//!
//! Usage:
//!   salescast -f sales.csv aggregate --granularity quarter
//!   salescast -f sales.csv forecast manager "Anna" --periods 6
//!   salescast -f sales.csv forecast department North --members Anna,Boris
//!   salescast -f sales.csv clients --now 2024-06-01
//!   salescast -f sales.csv accuracy
//!   salescast config

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Config { path } => commands::cmd_config(config, path, cli.json),
        Commands::Aggregate {
            granularity,
            exclude,
        } => {
            let settings = commands::load_settings(config, cli.seed)?;
            let records = commands::load_sales(cli.file.as_deref())?;
            commands::cmd_aggregate(
                &records,
                &settings,
                granularity.as_deref(),
                &exclude,
                cli.json,
            )
        }
        Commands::Forecast { action } => {
            let settings = commands::load_settings(config, cli.seed)?;
            let records = commands::load_sales(cli.file.as_deref())?;
            match action {
                ForecastAction::Manager { name, periods } => {
                    commands::cmd_forecast_manager(&records, settings, &name, periods, cli.json)
                }
                ForecastAction::Department {
                    name,
                    members,
                    periods,
                } => commands::cmd_forecast_department(
                    &records, settings, &name, &members, periods, cli.json,
                ),
            }
        }
        Commands::Clients {
            client,
            now,
            periods,
        } => {
            let settings = commands::load_settings(config, cli.seed)?;
            let records = commands::load_sales(cli.file.as_deref())?;
            let now = commands::resolve_now(now.as_deref())?;
            commands::cmd_clients(
                &records,
                settings,
                client.as_deref(),
                now,
                periods,
                cli.json,
            )
        }
        Commands::Accuracy { manager } => {
            let settings = commands::load_settings(config, cli.seed)?;
            let records = commands::load_sales(cli.file.as_deref())?;
            commands::cmd_accuracy(&records, settings, manager.as_deref(), cli.json)
        }
    }
}
