//! Historical accuracy command

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use salescast_core::{AccuracyReport, ForecastOrchestrator, SaleRecord, Settings};
use serde::Serialize;

use super::{print_json, truncate};

#[derive(Serialize)]
struct ManagerAccuracy {
    manager: String,
    periods: usize,
    #[serde(flatten)]
    report: AccuracyReport,
}

pub fn cmd_accuracy(
    records: &[SaleRecord],
    settings: Settings,
    manager: Option<&str>,
    json: bool,
) -> Result<()> {
    let min_periods = settings.forecast.accuracy_min_periods;
    let orchestrator = ForecastOrchestrator::new(settings).context("Invalid settings")?;

    let managers: Vec<&str> = match manager {
        Some(name) => {
            if !records.iter().any(|r| r.manager == name) {
                anyhow::bail!("No sales found for manager '{}'", name);
            }
            vec![name]
        }
        None => records
            .iter()
            .map(|r| r.manager.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let rows: Vec<ManagerAccuracy> = managers
        .iter()
        .map(|name| {
            let series = orchestrator
                .aggregator()
                .aggregate(records.iter().filter(|r| r.manager == *name));
            ManagerAccuracy {
                manager: name.to_string(),
                periods: series.len(),
                report: orchestrator.historical_accuracy(&series),
            }
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    println!();
    println!("🎯 Forecast Accuracy (backtest on held-out periods)");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:24} │ {:>7} │ {:>12} │ {:>8}",
        "Manager", "Periods", "RMSE", "MAPE"
    );
    println!("   ─────────────────────────┼─────────┼──────────────┼──────────");
    for row in &rows {
        if row.periods < min_periods {
            println!(
                "   {:24} │ {:>7} │ {:>12} │ {:>8}",
                truncate(&row.manager, 24),
                row.periods,
                "-",
                "-"
            );
        } else {
            println!(
                "   {:24} │ {:>7} │ {:>12.2} │ {:>7.1}%",
                truncate(&row.manager, 24),
                row.periods,
                row.report.rmse,
                row.report.mape
            );
        }
    }
    println!();
    println!("   Managers with fewer than {} periods are not scored.", min_periods);
    println!();

    Ok(())
}
