//! Test utilities for salescast-core
//!
//! Builders for sale records and synthetic client histories, shared by the
//! unit tests, the integration tests and the CLI tests.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{Amount, SaleRecord};

pub const DEFAULT_MANAGER: &str = "Manager A";

/// A single sale with default name, sphere and manager
pub fn sale(client_id: &str, product_id: &str, date: &str, revenue: f64) -> SaleRecord {
    sale_with_manager(DEFAULT_MANAGER, client_id, product_id, date, revenue)
}

pub fn sale_with_manager(
    manager: &str,
    client_id: &str,
    product_id: &str,
    date: &str,
    revenue: f64,
) -> SaleRecord {
    SaleRecord {
        client_id: client_id.to_string(),
        client_name: format!("Client {}", client_id),
        business_sphere: "Retail".to_string(),
        manager: manager.to_string(),
        product_id: product_id.to_string(),
        date: date.to_string(),
        revenue: Amount::Number(revenue),
        quantity: Amount::Number(1.0),
    }
}

/// Midnight of a `YYYY-MM-DD` date
pub fn at(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .expect("test date must be YYYY-MM-DD")
        .and_time(NaiveTime::MIN)
}

/// `count` equal orders spaced `interval_days` apart, ending at `last`
///
/// Returned oldest first.
pub fn client_history(
    client_id: &str,
    last: NaiveDateTime,
    count: usize,
    interval_days: i64,
    revenue: f64,
) -> Vec<SaleRecord> {
    (0..count)
        .rev()
        .map(|i| {
            let ts = last - Duration::days(interval_days * i as i64);
            sale(
                client_id,
                "P1",
                &ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
                revenue,
            )
        })
        .collect()
}

/// One sale per month starting at `year`-`month`, revenue taken from `values`
pub fn monthly_sales(
    manager: &str,
    client_id: &str,
    year: i32,
    month: u32,
    values: &[f64],
) -> Vec<SaleRecord> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let offset = month - 1 + i as u32;
            let y = year + (offset / 12) as i32;
            let m = offset % 12 + 1;
            sale_with_manager(
                manager,
                client_id,
                "P1",
                &format!("{:04}-{:02}-15", y, m),
                *value,
            )
        })
        .collect()
}
