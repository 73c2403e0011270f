//! Manager and department forecast commands

use anyhow::{Context, Result};
use salescast_core::{EntityForecast, ForecastOrchestrator, SaleRecord, Settings};

use super::{format_amount, print_json, truncate};

/// History periods shown before the forecast table
const HISTORY_TAIL: usize = 6;

pub fn cmd_forecast_manager(
    records: &[SaleRecord],
    settings: Settings,
    name: &str,
    periods: Option<usize>,
    json: bool,
) -> Result<()> {
    let orchestrator = ForecastOrchestrator::new(settings).context("Invalid settings")?;
    let periods = periods.unwrap_or_else(|| orchestrator.horizon());

    let result = orchestrator.forecast_manager(records, name, periods);
    if result.record_count == 0 {
        anyhow::bail!("No sales found for manager '{}'", name);
    }

    if json {
        return print_json(&result);
    }

    println!();
    println!("📈 Forecast for manager {}", name);
    print_entity(&result);
    Ok(())
}

pub fn cmd_forecast_department(
    records: &[SaleRecord],
    settings: Settings,
    name: &str,
    members: &[String],
    periods: Option<usize>,
    json: bool,
) -> Result<()> {
    if members.iter().all(|m| m.trim().is_empty()) {
        anyhow::bail!("Department '{}' has no members. Use --members a,b,...", name);
    }
    let members: Vec<String> = members
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();

    let orchestrator = ForecastOrchestrator::new(settings).context("Invalid settings")?;
    let periods = periods.unwrap_or_else(|| orchestrator.horizon());

    let result = orchestrator.forecast_department(records, name, &members, periods);

    if json {
        return print_json(&result);
    }

    println!();
    println!("🏢 Forecast for department {}", name);
    print_entity(&result.department);

    println!("   Members");
    println!(
        "   {:20} │ {:>8} │ {:>16}",
        "Manager", "Records", "Forecast total"
    );
    println!("   ─────────────────────┼──────────┼──────────────────");
    for member in &result.members {
        println!(
            "   {:20} │ {:>8} │ {:>16}",
            truncate(&member.name, 20),
            member.record_count,
            format_amount(member.total())
        );
    }
    println!("   ─────────────────────┼──────────┼──────────────────");
    let member_total: f64 = result.member_sum.iter().sum();
    println!(
        "   {:20} │ {:>8} │ {:>16}",
        "Sum of members",
        "",
        format_amount(member_total)
    );
    println!();

    Ok(())
}

fn print_entity(result: &EntityForecast) {
    println!("   ─────────────────────────────────────────────────────────────");

    if result.history.is_empty() {
        println!("   No sales history found.");
        println!();
        return;
    }

    println!(
        "   Records: {}   History: {} periods   Backtest: {}",
        result.record_count,
        result.history.len(),
        result.accuracy
    );
    println!();

    let skip = result.history.len().saturating_sub(HISTORY_TAIL);
    println!("   {:10} │ {:>14}", "Period", "Actual");
    println!("   ───────────┼────────────────");
    for (key, value) in &result.history[skip..] {
        println!("   {:10} │ {:>14}", key.to_string(), format_amount(*value));
    }
    println!();

    let ensemble = &result.ensemble;
    println!(
        "   {:10} │ {:>14} │ {:>12} │ {:>12} │ {:>12}",
        "Period", "Forecast", "Trend", "Seasonal", "Neural"
    );
    println!("   ───────────┼────────────────┼──────────────┼──────────────┼──────────────");
    for (i, key) in result.periods.iter().enumerate() {
        println!(
            "   {:10} │ {:>14} │ {:>12} │ {:>12} │ {:>12}",
            key.to_string(),
            format_amount(ensemble.combined[i]),
            format_amount(ensemble.trend[i]),
            format_amount(ensemble.seasonal[i]),
            format_amount(ensemble.nonlinear[i])
        );
    }
    println!("   ───────────┼────────────────┼──────────────┼──────────────┼──────────────");
    println!("   {:10} │ {:>14}", "Total", format_amount(result.total()));
    println!(
        "   Weights: trend {} / seasonal {} / neural {}",
        ensemble.weights.trend, ensemble.weights.seasonal, ensemble.weights.nonlinear
    );
    println!();
}
