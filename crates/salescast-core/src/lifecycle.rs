//! Client lifecycle classification
//!
//! Classifies each client as new, growing, active or at-risk from their own
//! purchase rhythm, then forecasts their revenue with the method that suits
//! the stage:
//! - new: linear trend
//! - growing: ensemble
//! - active: seasonal decomposition
//! - at-risk: linear trend scaled down
//!
//! The reference instant is always passed in, so the same history and
//! settings always classify the same way.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{merge_daily_client_sales, PeriodAggregator};
use crate::config::{ForecastSettings, LifecycleSettings, Settings};
use crate::error::Result;
use crate::forecast::{EnsembleCombiner, Forecaster, SeasonalDecomposer, TrendEstimator};
use crate::models::{
    ClientLifecycleProfile, ForecastStrategy, Granularity, LifecycleStage, PeriodKey,
    ProductPreference, SaleRecord,
};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_MONTH: f64 = 30.0;

/// Forecast and advice for a single client
#[derive(Debug, Clone, Serialize)]
pub struct ClientForecast {
    pub profile: ClientLifecycleProfile,
    pub strategy: ForecastStrategy,
    pub confidence: f64,
    /// Monthly revenue history the strategy was fitted on
    pub history: Vec<(PeriodKey, f64)>,
    pub periods: Vec<PeriodKey>,
    /// Strategy output before seasonal adjustment
    pub base_forecast: Vec<f64>,
    pub seasonal_coefficients: Vec<f64>,
    pub forecast: Vec<f64>,
    pub recommendations: Vec<String>,
}

/// Decide the lifecycle stage from order count and timing
///
/// `average_interval_days` is None for a client with a single order; the
/// interval-based rules cannot fire then and the client falls back to new.
pub fn classify_stage(
    total_purchases: usize,
    average_interval_days: Option<f64>,
    days_since_last_purchase: f64,
    settings: &LifecycleSettings,
) -> LifecycleStage {
    if total_purchases == settings.new_client_orders {
        return LifecycleStage::New;
    }

    let Some(interval) = average_interval_days else {
        return LifecycleStage::New;
    };

    if days_since_last_purchase > interval * settings.at_risk_multiplier {
        return LifecycleStage::AtRisk;
    }

    if total_purchases > settings.active_client_min_orders
        && days_since_last_purchase < interval * settings.active_client_multiplier
    {
        return LifecycleStage::Active;
    }

    if total_purchases > settings.growing_client_min_orders
        && days_since_last_purchase < interval * settings.growing_client_multiplier
    {
        return LifecycleStage::Growing;
    }

    if days_since_last_purchase > interval * settings.growing_client_multiplier {
        return LifecycleStage::AtRisk;
    }

    LifecycleStage::New
}

/// Seasonal multiplier for each calendar month, peak month = 1
///
/// Months without purchases, and every month of an empty pattern, get 1.
/// A partly filled pattern therefore scales down only the months that had
/// purchases below the peak; empty months are left unadjusted.
pub fn seasonal_coefficients(pattern: &[f64; 12]) -> [f64; 12] {
    let peak = pattern.iter().copied().fold(0.0, f64::max);
    let mut coefficients = [1.0; 12];
    if peak <= 0.0 {
        return coefficients;
    }
    for (coefficient, value) in coefficients.iter_mut().zip(pattern) {
        if *value > 0.0 {
            *coefficient = value / peak;
        }
    }
    coefficients
}

/// Fixed advice texts for a client's stage and purchase rhythm
pub fn recommendations(profile: &ClientLifecycleProfile) -> Vec<String> {
    let mut advice: Vec<&str> = match profile.stage {
        LifecycleStage::New => vec![
            "Active work with new client: schedule a follow-up call within a week of the first order",
            "Present the full product range and identify related needs",
            "Offer onboarding terms on the second order",
        ],
        LifecycleStage::Growing => vec![
            "Client is growing: propose volume-based pricing",
            "Cross-sell products that complement the most purchased items",
            "Agree on a regular ordering schedule",
        ],
        LifecycleStage::Active => vec![
            "Active client: keep regular contact and plan orders ahead of the season",
            "Offer a loyalty program or long-term contract",
            "Introduce new products before they reach the wider market",
        ],
        LifecycleStage::AtRisk => vec![
            "Client at risk: contact the client personally and find out the reason for the pause",
            "Prepare a targeted offer based on previously purchased products",
            "Review service quality and delivery issues for this client",
        ],
    };

    if profile.total_purchases > 0 && profile.purchase_frequency < 1.0 {
        advice.push("Low purchase frequency: propose a subscription or scheduled deliveries");
    }

    advice.into_iter().map(String::from).collect()
}

fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Whole months from `from` to `to`, 0 when `to` is not later
fn months_between(from: PeriodKey, to: PeriodKey) -> usize {
    let months = (to.year - from.year) as i64 * 12 + to.index as i64 - from.index as i64;
    months.max(0) as usize
}

/// Builds lifecycle profiles and stage-specific forecasts
#[derive(Debug, Clone)]
pub struct ClientLifecycleClassifier {
    lifecycle: LifecycleSettings,
    forecast: ForecastSettings,
}

impl ClientLifecycleClassifier {
    /// Create a classifier, rejecting invalid settings up front
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_settings(settings.lifecycle.clone(), settings.forecast.clone())
    }

    pub fn with_settings(lifecycle: LifecycleSettings, forecast: ForecastSettings) -> Result<Self> {
        lifecycle.validate()?;
        forecast.validate()?;
        Ok(Self {
            lifecycle,
            forecast,
        })
    }

    pub fn lifecycle_settings(&self) -> &LifecycleSettings {
        &self.lifecycle
    }

    /// Purchase statistics and stage for one client's records
    ///
    /// Records for other clients and records with unparseable dates are
    /// ignored. All lines of a client on one calendar day count as a single
    /// order; product preferences are still counted per line.
    pub fn profile(
        &self,
        client_id: &str,
        records: &[&SaleRecord],
        now: NaiveDateTime,
    ) -> ClientLifecycleProfile {
        let mut lines: Vec<(NaiveDateTime, &SaleRecord)> = records
            .iter()
            .filter(|r| r.client_id == client_id)
            .filter_map(|r| r.timestamp().map(|ts| (ts, *r)))
            .collect();

        if lines.is_empty() {
            return ClientLifecycleProfile::empty(client_id);
        }
        lines.sort_by_key(|(ts, _)| *ts);

        let orders = merge_daily_client_sales(lines.iter().map(|(_, r)| *r));
        let order_dates: Vec<NaiveDateTime> = orders
            .iter()
            .map(|order| order.date.and_time(NaiveTime::MIN))
            .collect();

        let first = order_dates[0];
        let last = order_dates[order_dates.len() - 1];
        let count = orders.len();

        let total_revenue: f64 = orders.iter().map(|order| order.revenue).sum();
        let span_days = days_between(first, last);
        let purchase_frequency = if span_days > 0.0 {
            count as f64 / (span_days / DAYS_PER_MONTH)
        } else {
            count as f64
        };
        let average_interval_days = if count > 1 {
            Some(span_days / (count - 1) as f64)
        } else {
            None
        };
        let days_since_last_purchase = days_between(last, now);

        let stage = classify_stage(
            count,
            average_interval_days,
            days_since_last_purchase,
            &self.lifecycle,
        );

        let mut month_revenue = [0.0; 12];
        let mut month_orders = [0usize; 12];
        for order in &orders {
            let m = order.date.month0() as usize;
            month_revenue[m] += order.revenue;
            month_orders[m] += 1;
        }
        let mut seasonal_pattern = [0.0; 12];
        for m in 0..12 {
            if month_orders[m] > 0 {
                seasonal_pattern[m] = month_revenue[m] / month_orders[m] as f64;
            }
        }

        let mut products: HashMap<&str, ProductPreference> = HashMap::new();
        for (ts, record) in &lines {
            let entry = products
                .entry(record.product_id.as_str())
                .or_insert_with(|| ProductPreference {
                    product_id: record.product_id.clone(),
                    count: 0,
                    revenue: 0.0,
                    last_purchase: *ts,
                });
            entry.count += 1;
            entry.revenue += record.revenue_value();
            entry.last_purchase = entry.last_purchase.max(*ts);
        }
        let mut product_preferences: Vec<ProductPreference> = products.into_values().collect();
        product_preferences.sort_by(|a, b| {
            b.revenue
                .partial_cmp(&a.revenue)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });

        let client_name = lines
            .iter()
            .rev()
            .map(|(_, r)| r.client_name.as_str())
            .find(|name| !name.is_empty())
            .unwrap_or("")
            .to_string();

        debug!(
            client = client_id,
            orders = count,
            days_since_last = days_since_last_purchase,
            "Classified client as {}",
            stage
        );

        ClientLifecycleProfile {
            client_id: client_id.to_string(),
            client_name,
            first_purchase: Some(first),
            last_purchase: Some(last),
            total_purchases: count,
            total_revenue,
            average_order_value: total_revenue / count as f64,
            purchase_frequency,
            average_interval_days,
            days_since_last_purchase,
            stage,
            seasonal_pattern,
            product_preferences,
        }
    }

    /// Profile a client picked out of the full record set
    pub fn profile_from_all(
        &self,
        client_id: &str,
        records: &[SaleRecord],
        now: NaiveDateTime,
    ) -> ClientLifecycleProfile {
        let own: Vec<&SaleRecord> = records.iter().filter(|r| r.client_id == client_id).collect();
        self.profile(client_id, &own, now)
    }

    /// Run the strategy chosen for `stage` on a revenue series
    pub fn strategy_forecast(&self, stage: LifecycleStage, series: &[f64], periods: usize) -> Vec<f64> {
        match ForecastStrategy::for_stage(stage) {
            ForecastStrategy::Trend => TrendEstimator.forecast(series, periods),
            ForecastStrategy::Ensemble => {
                EnsembleCombiner::from_settings(&self.forecast).forecast(series, periods)
            }
            ForecastStrategy::Seasonal => {
                SeasonalDecomposer::new(self.forecast.season_length).forecast(series, periods)
            }
            ForecastStrategy::ReducedTrend => {
                let reduction = self.lifecycle.forecast_reduction_for_at_risk;
                TrendEstimator
                    .forecast(series, periods)
                    .into_iter()
                    .map(|v| v * reduction)
                    .collect()
            }
        }
    }

    /// Profile, forecast and advise one client
    pub fn forecast_client(
        &self,
        client_id: &str,
        records: &[&SaleRecord],
        now: NaiveDateTime,
        periods: usize,
    ) -> ClientForecast {
        let profile = self.profile(client_id, records, now);
        let stage = profile.stage;
        let strategy = ForecastStrategy::for_stage(stage);

        let aggregator = PeriodAggregator::with_exclusions(
            Granularity::Month,
            self.forecast.excluded_products.iter().cloned(),
        );
        let history = aggregator.aggregate_labeled(
            records
                .iter()
                .copied()
                .filter(|r| r.client_id == client_id),
        );
        let series: Vec<f64> = history.iter().map(|(_, v)| *v).collect();

        // Forecast months always follow the month of `now`; months between the
        // last history month and `now` are projected but not reported.
        let current = PeriodKey::from_date(now.date(), Granularity::Month);
        let gap = history
            .last()
            .map(|(key, _)| months_between(*key, current))
            .unwrap_or(0);
        let forecast_periods = current.following(periods);

        let base_forecast: Vec<f64> = self
            .strategy_forecast(stage, &series, gap + periods)
            .into_iter()
            .skip(gap)
            .collect();

        let by_month = seasonal_coefficients(&profile.seasonal_pattern);
        let coefficients: Vec<f64> = forecast_periods
            .iter()
            .map(|key| by_month[(key.start_month() - 1) as usize])
            .collect();

        let forecast = base_forecast
            .iter()
            .zip(&coefficients)
            .map(|(v, c)| (v * c).max(0.0))
            .collect();

        ClientForecast {
            confidence: self.lifecycle.confidence_for(stage),
            recommendations: recommendations(&profile),
            profile,
            strategy,
            history,
            periods: forecast_periods,
            base_forecast,
            seasonal_coefficients: coefficients,
            forecast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, client_history, sale};
    use chrono::Duration;

    fn classifier() -> ClientLifecycleClassifier {
        ClientLifecycleClassifier::new(&Settings::default()).unwrap()
    }

    fn refs(records: &[SaleRecord]) -> Vec<&SaleRecord> {
        records.iter().collect()
    }

    #[test]
    fn test_no_records_is_new_with_zero_stats() {
        let now = at("2024-06-01");
        let profile = classifier().profile("C1", &[], now);
        assert_eq!(profile.stage, LifecycleStage::New);
        assert_eq!(profile.total_purchases, 0);
        assert_eq!(profile.total_revenue, 0.0);
        assert_eq!(profile.purchase_frequency, 0.0);
        assert!(profile.last_purchase.is_none());
    }

    #[test]
    fn test_single_order_is_new_with_onboarding_advice() {
        let now = at("2024-06-01");
        let records = vec![sale("C1", "P1", "2024-05-20", 500.0)];
        let result = classifier().forecast_client("C1", &refs(&records), now, 3);

        assert_eq!(result.profile.stage, LifecycleStage::New);
        assert_eq!(result.strategy, ForecastStrategy::Trend);
        assert_eq!(result.confidence, 0.3);
        assert!(result.profile.average_interval_days.is_none());
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.starts_with("Active work with new client")));
    }

    #[test]
    fn test_frequent_recent_client_is_active() {
        let now = at("2024-06-01");
        let last = now - Duration::days(1);
        let records = client_history("C1", last, 15, 3, 200.0);

        let profile = classifier().profile("C1", &refs(&records), now);
        assert_eq!(profile.total_purchases, 15);
        assert!((profile.average_interval_days.unwrap() - 3.0).abs() < 1e-9);
        assert!((profile.days_since_last_purchase - 1.0).abs() < 1e-9);
        assert_eq!(profile.stage, LifecycleStage::Active);
    }

    #[test]
    fn test_long_silent_client_is_at_risk_with_reduced_trend() {
        let now = at("2024-06-01");
        let last = now - Duration::days(400);
        let records = client_history("C1", last, 5, 10, 100.0);

        let classifier = classifier();
        let result = classifier.forecast_client("C1", &refs(&records), now, 4);
        assert_eq!(result.profile.stage, LifecycleStage::AtRisk);
        assert_eq!(result.strategy, ForecastStrategy::ReducedTrend);
        assert_eq!(result.confidence, 0.4);

        // History ends in 2023-04; 2023-05 through 2024-06 are projected and dropped
        let series: Vec<f64> = result.history.iter().map(|(_, v)| *v).collect();
        let trend = TrendEstimator.forecast(&series, 14 + 4);
        assert_eq!(result.base_forecast.len(), 4);
        for (actual, expected) in result.base_forecast.iter().zip(&trend[14..]) {
            assert!((actual - expected * 0.7).abs() < 1e-9);
        }
        // Equal order values leave every month at coefficient 1
        assert!(result.seasonal_coefficients.iter().all(|c| *c == 1.0));
        assert_eq!(result.forecast, result.base_forecast);
    }

    #[test]
    fn test_classify_stage_rules_in_order() {
        let s = LifecycleSettings::default();
        assert_eq!(classify_stage(1, None, 500.0, &s), LifecycleStage::New);
        assert_eq!(classify_stage(15, Some(3.0), 1.0, &s), LifecycleStage::Active);
        assert_eq!(classify_stage(5, Some(10.0), 400.0, &s), LifecycleStage::AtRisk);
        assert_eq!(classify_stage(5, Some(10.0), 5.0, &s), LifecycleStage::Growing);
        // Not enough orders for growing, silent longer than 2x interval
        assert_eq!(classify_stage(3, Some(10.0), 25.0, &s), LifecycleStage::AtRisk);
        // Fallback
        assert_eq!(classify_stage(3, Some(10.0), 5.0, &s), LifecycleStage::New);
        // Many orders but a slower-than-usual gap drops from active to growing
        assert_eq!(classify_stage(15, Some(10.0), 18.0, &s), LifecycleStage::Growing);
    }

    #[test]
    fn test_classify_without_interval_falls_back_to_new() {
        let s = LifecycleSettings {
            new_client_orders: 2,
            ..LifecycleSettings::default()
        };
        assert_eq!(classify_stage(1, None, 1000.0, &s), LifecycleStage::New);
    }

    #[test]
    fn test_statistics() {
        let now = at("2024-04-01");
        let records = vec![
            sale("C1", "P1", "2024-01-01", 100.0),
            sale("C1", "P2", "2024-01-31", 300.0),
            sale("C1", "P1", "2024-03-01", 200.0),
            sale("C2", "P1", "2024-03-01", 999.0),
        ];

        let profile = classifier().profile_from_all("C1", &records, now);
        assert_eq!(profile.total_purchases, 3);
        assert_eq!(profile.total_revenue, 600.0);
        assert_eq!(profile.average_order_value, 200.0);
        // 60 days span, 3 orders -> 1.5 orders per 30 days
        assert!((profile.purchase_frequency - 1.5).abs() < 1e-9);
        assert!((profile.average_interval_days.unwrap() - 30.0).abs() < 1e-9);
        assert!((profile.days_since_last_purchase - 31.0).abs() < 1e-9);

        // January: mean of 100 and 300
        assert_eq!(profile.seasonal_pattern[0], 200.0);
        assert_eq!(profile.seasonal_pattern[2], 200.0);
        assert_eq!(profile.seasonal_pattern[5], 0.0);

        assert_eq!(profile.product_preferences[0].product_id, "P1");
        assert_eq!(profile.product_preferences[0].count, 2);
        assert_eq!(profile.product_preferences[0].revenue, 300.0);
        assert_eq!(profile.product_preferences[0].last_purchase, at("2024-03-01"));
    }

    #[test]
    fn test_low_frequency_adds_advice() {
        let now = at("2024-06-01");
        let records = vec![
            sale("C1", "P1", "2023-01-01", 10.0),
            sale("C1", "P1", "2024-01-01", 10.0),
        ];
        let result = classifier().forecast_client("C1", &refs(&records), now, 1);
        assert!(result.profile.purchase_frequency < 1.0);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.starts_with("Low purchase frequency")));
    }

    #[test]
    fn test_seasonal_coefficients() {
        let mut pattern = [0.0; 12];
        assert_eq!(seasonal_coefficients(&pattern), [1.0; 12]);

        pattern[0] = 50.0;
        pattern[6] = 200.0;
        let coefficients = seasonal_coefficients(&pattern);
        assert_eq!(coefficients[0], 0.25);
        assert_eq!(coefficients[6], 1.0);
        // A month without purchases is left unadjusted, even though a month
        // with small purchases is scaled down
        assert_eq!(coefficients[3], 1.0);
        assert!(coefficients[3] > coefficients[0]);
    }

    #[test]
    fn test_same_day_lines_are_one_order() {
        let now = at("2024-06-02");
        let records = vec![
            sale("C1", "P1", "2024-06-01", 120.0),
            sale("C1", "P2", "2024-06-01T14:00:00", 80.0),
        ];
        let result = classifier().forecast_client("C1", &refs(&records), now, 3);

        assert_eq!(result.profile.total_purchases, 1);
        assert!(result.profile.average_interval_days.is_none());
        assert_eq!(result.profile.stage, LifecycleStage::New);
        assert_eq!(result.strategy, ForecastStrategy::Trend);
        assert_eq!(result.profile.total_revenue, 200.0);
        assert_eq!(result.profile.average_order_value, 200.0);
        assert_eq!(result.profile.seasonal_pattern[5], 200.0);
        // Preferences keep the individual lines
        assert_eq!(result.profile.product_preferences.len(), 2);
        assert_eq!(result.profile.product_preferences[0].product_id, "P1");
    }

    #[test]
    fn test_repeat_orders_with_multiple_lines() {
        let now = at("2024-03-02");
        let records = vec![
            sale("C1", "P1", "2024-01-01", 50.0),
            sale("C1", "P2", "2024-01-01", 50.0),
            sale("C1", "P1", "2024-01-31", 100.0),
            sale("C1", "P1", "2024-03-01", 60.0),
            sale("C1", "P3", "2024-03-01", 40.0),
        ];
        let profile = classifier().profile("C1", &refs(&records), now);

        assert_eq!(profile.total_purchases, 3);
        assert!((profile.average_interval_days.unwrap() - 30.0).abs() < 1e-9);
        assert_eq!(profile.average_order_value, 100.0);
        assert_eq!(profile.product_preferences[0].product_id, "P1");
        assert_eq!(profile.product_preferences[0].count, 3);
    }

    #[test]
    fn test_forecast_months_follow_now_for_idle_client() {
        let now = at("2024-06-01");
        let records = client_history("C1", now - Duration::days(400), 5, 10, 100.0);
        let result = classifier().forecast_client("C1", &refs(&records), now, 3);

        assert_eq!(result.profile.stage, LifecycleStage::AtRisk);
        let current = PeriodKey::from_date(now.date(), Granularity::Month);
        assert!(result.periods.iter().all(|key| *key > current));
        let labels: Vec<String> = result.periods.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels, vec!["2024-07", "2024-08", "2024-09"]);
    }

    #[test]
    fn test_months_between() {
        let from = PeriodKey::from_date(at("2023-04-28").date(), Granularity::Month);
        let to = PeriodKey::from_date(at("2024-06-01").date(), Granularity::Month);
        assert_eq!(months_between(from, to), 14);
        assert_eq!(months_between(to, from), 0);
        assert_eq!(months_between(to, to), 0);
    }

    #[test]
    fn test_seasonal_adjustment_applied_to_forecast_months() {
        let now = at("2024-03-15");
        // Cheap January order, expensive February order
        let records = vec![
            sale("C1", "P1", "2024-01-10", 100.0),
            sale("C1", "P1", "2024-02-10", 400.0),
        ];
        let result = classifier().forecast_client("C1", &refs(&records), now, 12);

        let labels: Vec<String> = result.periods.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels[0], "2024-04");
        assert_eq!(labels[9], "2025-01");
        assert_eq!(result.seasonal_coefficients[9], 0.25);
        assert_eq!(result.seasonal_coefficients[10], 1.0);
        assert!((result.forecast[9] - result.base_forecast[9] * 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.lifecycle.at_risk_multiplier = 0.0;
        assert!(ClientLifecycleClassifier::new(&settings).is_err());
    }

    #[test]
    fn test_growing_client_uses_ensemble() {
        let now = at("2024-06-01");
        let last = now - Duration::days(5);
        let records = client_history("C1", last, 5, 10, 80.0);

        let mut settings = Settings::default();
        settings.forecast.seed = Some(8);
        let classifier = ClientLifecycleClassifier::new(&settings).unwrap();
        let result = classifier.forecast_client("C1", &refs(&records), now, 3);

        assert_eq!(result.profile.stage, LifecycleStage::Growing);
        assert_eq!(result.strategy, ForecastStrategy::Ensemble);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.forecast.len(), 3);
        assert!(result.forecast.iter().all(|v| *v >= 0.0));
    }
}
