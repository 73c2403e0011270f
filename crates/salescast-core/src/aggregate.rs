//! Period aggregation of the raw sales log
//!
//! Turns `SaleRecord`s into chronologically ordered revenue series. Revenue
//! text is normalized here, once, so the forecasters only ever see `f64`.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{ClientDailySales, Granularity, PeriodKey, SaleRecord};

/// Groups sale records into calendar-period buckets
#[derive(Debug, Clone, Default)]
pub struct PeriodAggregator {
    granularity: Granularity,
    excluded_products: HashSet<String>,
}

impl PeriodAggregator {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            excluded_products: HashSet::new(),
        }
    }

    pub fn with_exclusions<I, S>(granularity: Granularity, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granularity,
            excluded_products: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn is_excluded(&self, product_id: &str) -> bool {
        self.excluded_products.contains(product_id)
    }

    /// Revenue per period, labelled and sorted chronologically
    ///
    /// Every record with a valid date opens its period's bucket, so a period
    /// whose sales are all excluded still appears with a value of 0.
    pub fn aggregate_labeled<'a, I>(&self, records: I) -> Vec<(PeriodKey, f64)>
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        let mut buckets: BTreeMap<PeriodKey, f64> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(timestamp) = record.timestamp() else {
                skipped += 1;
                continue;
            };

            let bucket = buckets
                .entry(PeriodKey::from_date(timestamp.date(), self.granularity))
                .or_insert(0.0);

            if !self.is_excluded(&record.product_id) {
                *bucket += record.revenue_value();
            }
        }

        if skipped > 0 {
            debug!("Skipped {} records with unparseable dates", skipped);
        }

        buckets
            .into_iter()
            .map(|(key, value)| (key, value.max(0.0)))
            .collect()
    }

    /// Revenue per period as a plain time series
    pub fn aggregate<'a, I>(&self, records: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        self.aggregate_labeled(records)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }
}

/// Merge all sales of a client on the same calendar day into one entry
///
/// Revenue and quantity are summed; product ids are kept once each in the
/// order they first appear. Output is sorted by date, then client id.
pub fn merge_daily_client_sales<'a, I>(records: I) -> Vec<ClientDailySales>
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    let mut merged: Vec<ClientDailySales> = Vec::new();
    let mut index: HashMap<(String, NaiveDate), usize> = HashMap::new();

    for record in records {
        let Some(timestamp) = record.timestamp() else {
            continue;
        };
        let date = timestamp.date();
        let key = (record.client_id.clone(), date);

        match index.get(&key) {
            Some(&i) => {
                let entry = &mut merged[i];
                entry.revenue += record.revenue_value();
                entry.quantity += record.quantity_value();
                if !record.product_id.is_empty() && !entry.products.contains(&record.product_id)
                {
                    entry.products.push(record.product_id.clone());
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(ClientDailySales {
                    client_id: record.client_id.clone(),
                    client_name: record.client_name.clone(),
                    business_sphere: record.business_sphere.clone(),
                    manager: record.manager.clone(),
                    date,
                    revenue: record.revenue_value(),
                    quantity: record.quantity_value(),
                    products: if record.product_id.is_empty() {
                        Vec::new()
                    } else {
                        vec![record.product_id.clone()]
                    },
                });
            }
        }
    }

    merged.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.client_id.cmp(&b.client_id)));
    merged
}
