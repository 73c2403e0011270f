//! Sales record readers for CSV and JSON feeds
//!
//! The engine itself only needs an in-memory `Vec<SaleRecord>`. These readers
//! cover the common export shapes; rows that cannot be mapped are skipped,
//! never fatal.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Amount, SaleRecord};

/// Column positions resolved from a CSV header line
#[derive(Debug, Default)]
struct ColumnMap {
    client_id: Option<usize>,
    client_name: Option<usize>,
    business_sphere: Option<usize>,
    manager: Option<usize>,
    product_id: Option<usize>,
    date: Option<usize>,
    revenue: Option<usize>,
    quantity: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (i, header) in headers.iter().enumerate() {
            let key: String = header
                .trim()
                .to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect();
            let slot = match key.as_str() {
                "clientid" | "clientcode" | "client" => &mut map.client_id,
                "clientname" => &mut map.client_name,
                "businesssphere" | "sphere" => &mut map.business_sphere,
                "manager" | "managername" => &mut map.manager,
                "productid" | "product" | "productcode" | "item" => &mut map.product_id,
                "date" | "transactiondate" | "saledate" => &mut map.date,
                "revenue" | "amount" | "sum" => &mut map.revenue,
                "quantity" | "qty" => &mut map.quantity,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(i);
            }
        }
        map
    }
}

fn field(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index.and_then(|i| record.get(i)).map(str::trim)
}

/// Parse a CSV export of sales transactions
///
/// The header line decides column positions. `client_id` and `date` columns
/// are required; the others default to empty text or zero.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<SaleRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers);

    if columns.client_id.is_none() || columns.date.is_none() {
        return Err(Error::Import(
            "CSV header must contain client_id and date columns".into(),
        ));
    }

    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping CSV row {}: {}", line + 2, e);
                continue;
            }
        };

        let client_id = match field(&record, columns.client_id) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                debug!("Skipping CSV row {} - missing client id", line + 2);
                continue;
            }
        };

        let date = match field(&record, columns.date) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ => {
                debug!("Skipping CSV row {} - missing date", line + 2);
                continue;
            }
        };

        let text = |index: Option<usize>| field(&record, index).unwrap_or("").to_string();
        let amount = |index: Option<usize>| {
            field(&record, index)
                .map(Amount::from)
                .unwrap_or_default()
        };

        records.push(SaleRecord {
            client_id,
            client_name: text(columns.client_name),
            business_sphere: text(columns.business_sphere),
            manager: text(columns.manager),
            product_id: text(columns.product_id),
            date,
            revenue: amount(columns.revenue),
            quantity: amount(columns.quantity),
        });
    }

    Ok(records)
}

/// Parse a JSON array of sale record objects
///
/// Accepts snake_case or camelCase keys; revenue and quantity may be numbers
/// or locale-formatted strings. Objects that do not match are skipped.
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<SaleRecord>> {
    let value: Value = serde_json::from_reader(reader)?;
    let rows = match value {
        Value::Array(rows) => rows,
        _ => {
            return Err(Error::Import(
                "JSON input must be an array of sale records".into(),
            ))
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<SaleRecord>(row) {
            Ok(record) => records.push(record),
            Err(e) => debug!("Skipping JSON record {}: {}", i, e),
        }
    }

    Ok(records)
}

/// Load records from a file, choosing the reader by extension
pub fn load_records(path: &Path) -> Result<Vec<SaleRecord>> {
    let file = BufReader::new(File::open(path)?);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let records = match extension.as_deref() {
        Some("json") => parse_json(file)?,
        Some("csv") | None => parse_csv(file)?,
        Some(other) => {
            return Err(Error::Import(format!(
                "Unsupported record file type: .{}",
                other
            )))
        }
    };

    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
