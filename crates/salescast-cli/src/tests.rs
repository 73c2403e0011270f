//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use clap::Parser;
use salescast_core::test_utils::{at, client_history, monthly_sales, sale};
use salescast_core::{SaleRecord, Settings};

use crate::cli::{Cli, Commands, ForecastAction};
use crate::commands::{self, format_amount, truncate};

fn seeded_settings() -> Settings {
    let mut settings = Settings::default();
    settings.forecast.seed = Some(11);
    settings
}

fn sample_records() -> Vec<SaleRecord> {
    let anna: Vec<f64> = (0..18)
        .map(|m| 1000.0 + m as f64 * 25.0 + if m % 12 == 6 { 400.0 } else { 0.0 })
        .collect();
    let mut records = monthly_sales("Anna", "C1", 2023, 1, &anna);
    records.extend(monthly_sales("Boris", "C2", 2023, 1, &[300.0, 320.0, 310.0]));
    records.extend(client_history("C3", at("2024-05-20"), 12, 7, 150.0));
    records
}

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long client name", 10), "a very ...");
    assert_eq!(truncate("Ёлка и Ко, ООО", 8), "Ёлка ...");
}

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(0.0), "0.00");
    assert_eq!(format_amount(999.5), "999.50");
    assert_eq!(format_amount(1234.5), "1 234.50");
    assert_eq!(format_amount(1234567.891), "1 234 567.89");
    assert_eq!(format_amount(-1500.0), "-1 500.00");
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_department_members() {
    let cli = Cli::try_parse_from([
        "salescast",
        "--file",
        "sales.csv",
        "forecast",
        "department",
        "North",
        "--members",
        "Anna,Boris",
        "--periods",
        "4",
    ])
    .unwrap();

    assert_eq!(cli.file.as_deref(), Some(std::path::Path::new("sales.csv")));
    match cli.command {
        Commands::Forecast {
            action:
                ForecastAction::Department {
                    name,
                    members,
                    periods,
                },
        } => {
            assert_eq!(name, "North");
            assert_eq!(members, vec!["Anna".to_string(), "Boris".to_string()]);
            assert_eq!(periods, Some(4));
        }
        _ => panic!("expected forecast department"),
    }
}

#[test]
fn test_parse_department_requires_members() {
    let result = Cli::try_parse_from(["salescast", "forecast", "department", "North"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["salescast", "clients", "--now", "2024-06-01", "--json", "--seed", "5"])
        .unwrap();
    assert!(cli.json);
    assert_eq!(cli.seed, Some(5));
    match cli.command {
        Commands::Clients { now, periods, .. } => {
            assert_eq!(now.as_deref(), Some("2024-06-01"));
            assert_eq!(periods, 3);
        }
        _ => panic!("expected clients"),
    }
}

// ========== Loading Tests ==========

#[test]
fn test_load_sales_requires_file() {
    assert!(commands::load_sales(None).is_err());
}

#[test]
fn test_load_sales_csv() {
    let file = write_temp(
        ".csv",
        "client_id,manager,product_id,date,revenue\nC1,Anna,P1,2024-01-10,\"1 200,50\"\nC1,Anna,P1,bad-date,5\n",
    );
    let records = commands::load_sales(Some(file.path())).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].revenue_value(), 1200.5);
}

#[test]
fn test_load_sales_empty_file_is_error() {
    let file = write_temp(".csv", "client_id,date,revenue\n");
    assert!(commands::load_sales(Some(file.path())).is_err());
}

#[test]
fn test_load_settings_with_seed_override() {
    let file = write_temp(".toml", "[forecast]\nhorizon = 2\nseed = 1\n");
    let settings = commands::load_settings(Some(file.path()), Some(99)).unwrap();
    assert_eq!(settings.forecast.horizon, 2);
    assert_eq!(settings.forecast.seed, Some(99));
}

#[test]
fn test_load_settings_rejects_invalid_values() {
    let file = write_temp(".toml", "[lifecycle]\nat_risk_multiplier = -1.0\n");
    assert!(commands::load_settings(Some(file.path()), None).is_err());
}

#[test]
fn test_resolve_now() {
    assert_eq!(commands::resolve_now(Some("2024-06-01")).unwrap(), at("2024-06-01"));
    assert!(commands::resolve_now(Some("yesterday")).is_err());
    assert!(commands::resolve_now(None).is_ok());
}

// ========== Command Tests ==========

#[test]
fn test_cmd_aggregate() {
    let records = sample_records();
    let settings = seeded_settings();
    assert!(commands::cmd_aggregate(&records, &settings, None, &[], false).is_ok());
    assert!(commands::cmd_aggregate(&records, &settings, Some("quarter"), &["P1".to_string()], true).is_ok());
}

#[test]
fn test_cmd_aggregate_invalid_granularity() {
    let records = sample_records();
    let result = commands::cmd_aggregate(&records, &seeded_settings(), Some("weekly"), &[], false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_forecast_manager() {
    let records = sample_records();
    assert!(commands::cmd_forecast_manager(&records, seeded_settings(), "Anna", Some(3), false).is_ok());
    assert!(commands::cmd_forecast_manager(&records, seeded_settings(), "Anna", None, true).is_ok());
}

#[test]
fn test_cmd_forecast_unknown_manager() {
    let records = sample_records();
    let result = commands::cmd_forecast_manager(&records, seeded_settings(), "Nobody", None, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_forecast_department() {
    let records = sample_records();
    let members = vec!["Anna".to_string(), " Boris ".to_string()];
    let result =
        commands::cmd_forecast_department(&records, seeded_settings(), "North", &members, Some(2), false);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_forecast_department_without_members() {
    let records = sample_records();
    let members = vec![" ".to_string()];
    let result =
        commands::cmd_forecast_department(&records, seeded_settings(), "North", &members, None, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_clients_portfolio_and_detail() {
    let records = sample_records();
    let now = at("2024-06-01");
    assert!(commands::cmd_clients(&records, seeded_settings(), None, now, 3, false).is_ok());
    assert!(commands::cmd_clients(&records, seeded_settings(), None, now, 3, true).is_ok());
    assert!(commands::cmd_clients(&records, seeded_settings(), Some("C3"), now, 3, false).is_ok());
}

#[test]
fn test_cmd_clients_unknown_client() {
    let records = vec![sale("C1", "P1", "2024-01-10", 10.0)];
    let result = commands::cmd_clients(&records, seeded_settings(), Some("C9"), at("2024-02-01"), 3, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_clients_invalid_settings() {
    let records = sample_records();
    let mut settings = seeded_settings();
    settings.lifecycle.min_confidence_new = 2.0;
    let result = commands::cmd_clients(&records, settings, None, at("2024-06-01"), 3, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_accuracy() {
    let records = sample_records();
    assert!(commands::cmd_accuracy(&records, seeded_settings(), None, false).is_ok());
    assert!(commands::cmd_accuracy(&records, seeded_settings(), Some("Anna"), true).is_ok());
    assert!(commands::cmd_accuracy(&records, seeded_settings(), Some("Nobody"), false).is_err());
}

#[test]
fn test_cmd_config() {
    assert!(commands::cmd_config(None, true, false).is_ok());

    let file = write_temp(".toml", "[forecast]\nhorizon = 9\n");
    assert!(commands::cmd_config(Some(file.path()), false, false).is_ok());
    assert!(commands::cmd_config(Some(file.path()), false, true).is_ok());
}
