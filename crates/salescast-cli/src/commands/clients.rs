//! Client lifecycle commands

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use salescast_core::{ClientForecast, ForecastOrchestrator, LifecycleStage, SaleRecord, Settings};

use super::{format_amount, print_json, truncate};

fn stage_icon(stage: LifecycleStage) -> &'static str {
    match stage {
        LifecycleStage::New => "🌱",
        LifecycleStage::Growing => "📈",
        LifecycleStage::Active => "✅",
        LifecycleStage::AtRisk => "⚠️ ",
    }
}

pub fn cmd_clients(
    records: &[SaleRecord],
    settings: Settings,
    client: Option<&str>,
    now: NaiveDateTime,
    periods: usize,
    json: bool,
) -> Result<()> {
    let orchestrator = ForecastOrchestrator::new(settings).context("Invalid settings")?;

    if let Some(client_id) = client {
        if !records.iter().any(|r| r.client_id == client_id) {
            anyhow::bail!("No sales found for client '{}'", client_id);
        }
        let result = orchestrator.forecast_client(records, client_id, now, periods);
        if json {
            return print_json(&result);
        }
        print_client(&result);
        return Ok(());
    }

    let portfolio = orchestrator.forecast_clients(records, now, periods);
    if json {
        return print_json(&portfolio);
    }

    println!();
    println!("👥 Client Portfolio (as of {})", now.format("%Y-%m-%d"));
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:12} │ {:24} │ {:10} │ {:>6} │ {:>14} │ {:>8} │ {:>14}",
        "Client", "Name", "Stage", "Orders", "Revenue", "Idle (d)", "Forecast"
    );
    println!("   ─────────────┼──────────────────────────┼────────────┼────────┼────────────────┼──────────┼────────────────");
    for client in &portfolio.clients {
        let profile = &client.profile;
        println!(
            "   {:12} │ {:24} │ {:10} │ {:>6} │ {:>14} │ {:>8.0} │ {:>14}",
            truncate(&profile.client_id, 12),
            truncate(&profile.client_name, 24),
            profile.stage.as_str(),
            profile.total_purchases,
            format_amount(profile.total_revenue),
            profile.days_since_last_purchase,
            format_amount(client.forecast.iter().sum())
        );
    }
    println!();

    println!("   Stages");
    for (stage, count) in &portfolio.stage_counts {
        println!("   {} {:10} {}", stage_icon(*stage), stage.as_str(), count);
    }
    println!();
    println!(
        "   Forecast total ({} months): {}",
        periods,
        format_amount(portfolio.total_forecast.iter().sum())
    );
    println!(
        "   Average confidence: {:.0}%",
        portfolio.average_confidence * 100.0
    );
    println!();

    Ok(())
}

fn print_client(result: &ClientForecast) {
    let profile = &result.profile;

    println!();
    println!(
        "{} Client {} {}",
        stage_icon(profile.stage),
        profile.client_id,
        profile.client_name
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Stage: {} (strategy: {})", profile.stage, result.strategy);
    println!("   Confidence: {:.0}%", result.confidence * 100.0);
    println!("   Orders: {}", profile.total_purchases);
    println!("   Revenue: {}", format_amount(profile.total_revenue));
    println!(
        "   Average order: {}",
        format_amount(profile.average_order_value)
    );
    println!(
        "   Frequency: {:.2} orders / 30 days",
        profile.purchase_frequency
    );
    if let Some(interval) = profile.average_interval_days {
        println!("   Average interval: {:.1} days", interval);
    }
    if let (Some(first), Some(last)) = (profile.first_purchase, profile.last_purchase) {
        println!(
            "   First / last purchase: {} / {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
    println!(
        "   Days since last purchase: {:.0}",
        profile.days_since_last_purchase
    );

    if !profile.product_preferences.is_empty() {
        println!();
        println!("   {:20} │ {:>6} │ {:>14}", "Product", "Orders", "Revenue");
        println!("   ─────────────────────┼────────┼────────────────");
        for product in profile.product_preferences.iter().take(5) {
            println!(
                "   {:20} │ {:>6} │ {:>14}",
                truncate(&product.product_id, 20),
                product.count,
                format_amount(product.revenue)
            );
        }
    }

    println!();
    println!(
        "   {:10} │ {:>14} │ {:>8} │ {:>14}",
        "Period", "Base", "Season", "Forecast"
    );
    println!("   ───────────┼────────────────┼──────────┼────────────────");
    for (i, key) in result.periods.iter().enumerate() {
        println!(
            "   {:10} │ {:>14} │ {:>8.2} │ {:>14}",
            key.to_string(),
            format_amount(result.base_forecast[i]),
            result.seasonal_coefficients[i],
            format_amount(result.forecast[i])
        );
    }

    println!();
    println!("   💡 Recommendations");
    for recommendation in &result.recommendations {
        println!("   - {}", recommendation);
    }
    println!();
}
