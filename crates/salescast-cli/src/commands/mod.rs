//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (load_settings, load_sales, resolve_now, print_json)
//! - `aggregate` - Revenue per calendar period
//! - `forecast` - Manager and department forecasts
//! - `clients` - Client lifecycle portfolio and single-client detail
//! - `accuracy` - Backtest of the ensemble on held-out history
//! - `config` - Resolved settings and override path

pub mod accuracy;
pub mod aggregate;
pub mod clients;
pub mod config;
pub mod core;
pub mod forecast;

// Re-export command functions for main.rs
pub use accuracy::*;
pub use aggregate::*;
pub use clients::*;
pub use config::*;
pub use core::*;
pub use forecast::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format a money amount with space-separated thousands
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
