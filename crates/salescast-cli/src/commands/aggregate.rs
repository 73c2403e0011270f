//! Period aggregation command

use anyhow::{Context, Result};
use salescast_core::{Granularity, PeriodAggregator, SaleRecord, Settings};
use serde::Serialize;

use super::{format_amount, print_json};

#[derive(Serialize)]
struct PeriodRow {
    period: String,
    revenue: f64,
}

pub fn cmd_aggregate(
    records: &[SaleRecord],
    settings: &Settings,
    granularity: Option<&str>,
    exclude: &[String],
    json: bool,
) -> Result<()> {
    let granularity: Granularity = match granularity {
        Some(g) => g
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid --granularity")?,
        None => settings.forecast.granularity,
    };

    let excluded = settings
        .forecast
        .excluded_products
        .iter()
        .chain(exclude)
        .cloned();
    let aggregator = PeriodAggregator::with_exclusions(granularity, excluded);
    let rows: Vec<PeriodRow> = aggregator
        .aggregate_labeled(records)
        .into_iter()
        .map(|(key, revenue)| PeriodRow {
            period: key.to_string(),
            revenue,
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    println!();
    println!("📊 Revenue by {}", granularity);
    println!("   ─────────────────────────────");

    if rows.is_empty() {
        println!("   No dated sales found.");
        return Ok(());
    }

    println!("   {:10} │ {:>16}", "Period", "Revenue");
    println!("   ───────────┼──────────────────");
    for row in &rows {
        println!("   {:10} │ {:>16}", row.period, format_amount(row.revenue));
    }
    println!("   ───────────┼──────────────────");
    let total: f64 = rows.iter().map(|r| r.revenue).sum();
    println!("   {:10} │ {:>16}", "Total", format_amount(total));
    println!();

    Ok(())
}
