//! Forecast orchestration across managers, departments and client portfolios
//!
//! Each entity forecast is independent, so departments and portfolios fan
//! out with rayon. With a configured seed every entity seeds its own RNG
//! from that value and parallel runs match sequential ones.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::PeriodAggregator;
use crate::config::Settings;
use crate::error::Result;
use crate::forecast::{evaluate, AccuracyReport, EnsembleCombiner, EnsembleForecast, Forecaster};
use crate::lifecycle::{ClientForecast, ClientLifecycleClassifier};
use crate::models::{LifecycleStage, PeriodKey, SaleRecord};

/// Ensemble forecast of one aggregated entity (a manager, a department)
#[derive(Debug, Clone, Serialize)]
pub struct EntityForecast {
    pub name: String,
    pub record_count: usize,
    pub history: Vec<(PeriodKey, f64)>,
    /// Labels of the forecast periods; empty when there is no history to
    /// anchor them
    pub periods: Vec<PeriodKey>,
    pub ensemble: EnsembleForecast,
    pub accuracy: AccuracyReport,
}

impl EntityForecast {
    pub fn forecast(&self) -> &[f64] {
        &self.ensemble.combined
    }

    pub fn total(&self) -> f64 {
        self.ensemble.combined.iter().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentForecast {
    pub department: EntityForecast,
    pub members: Vec<EntityForecast>,
    /// Elementwise sum of the member forecasts
    pub member_sum: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioForecast {
    pub clients: Vec<ClientForecast>,
    /// Elementwise sum of the client forecasts; index 0 is the month after `now`
    pub total_forecast: Vec<f64>,
    pub average_confidence: f64,
    pub stage_counts: BTreeMap<LifecycleStage, usize>,
}

/// Runs the engine over every entity of a record set
#[derive(Debug, Clone)]
pub struct ForecastOrchestrator {
    settings: Settings,
    aggregator: PeriodAggregator,
    combiner: EnsembleCombiner,
    classifier: ClientLifecycleClassifier,
}

impl ForecastOrchestrator {
    /// Create an orchestrator, rejecting invalid settings up front
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let classifier = ClientLifecycleClassifier::new(&settings)?;
        let aggregator = PeriodAggregator::with_exclusions(
            settings.forecast.granularity,
            settings.forecast.excluded_products.iter().cloned(),
        );
        let combiner = EnsembleCombiner::from_settings(&settings.forecast);

        Ok(Self {
            settings,
            aggregator,
            combiner,
            classifier,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn aggregator(&self) -> &PeriodAggregator {
        &self.aggregator
    }

    pub fn classifier(&self) -> &ClientLifecycleClassifier {
        &self.classifier
    }

    /// Forecast horizon from settings
    pub fn horizon(&self) -> usize {
        self.settings.forecast.horizon
    }

    /// Score an ensemble trained on the first part of `series` against the rest
    ///
    /// Series shorter than the configured minimum give a zero report.
    pub fn historical_accuracy(&self, series: &[f64]) -> AccuracyReport {
        let n = series.len();
        let min_periods = self.settings.forecast.accuracy_min_periods.max(2);
        if n < min_periods {
            debug!("Only {} periods, skipping accuracy check", n);
            return AccuracyReport::default();
        }

        let split = ((n as f64 * self.settings.forecast.train_ratio).floor() as usize).clamp(1, n - 1);
        let (train, test) = series.split_at(split);
        let predicted = self.combiner.forecast(train, test.len());
        evaluate(test, &predicted)
    }

    fn forecast_entity<'a, I>(&self, name: &str, records: I, periods: usize) -> EntityForecast
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        let records: Vec<&SaleRecord> = records.into_iter().collect();
        let history = self.aggregator.aggregate_labeled(records.iter().copied());
        let series: Vec<f64> = history.iter().map(|(_, v)| *v).collect();

        let labels = history
            .last()
            .map(|(key, _)| key.following(periods))
            .unwrap_or_default();

        let ensemble = self.combiner.combine(&series, periods);
        let accuracy = self.historical_accuracy(&series);

        debug!(
            entity = name,
            method = self.combiner.name(),
            records = records.len(),
            periods = series.len(),
            "Forecast entity ({})",
            accuracy
        );

        EntityForecast {
            name: name.to_string(),
            record_count: records.len(),
            history,
            periods: labels,
            ensemble,
            accuracy,
        }
    }

    /// Ensemble forecast of everything sold by one manager
    pub fn forecast_manager(
        &self,
        records: &[SaleRecord],
        manager: &str,
        periods: usize,
    ) -> EntityForecast {
        let result = self.forecast_entity(
            manager,
            records.iter().filter(|r| r.manager == manager),
            periods,
        );
        if result.record_count == 0 {
            warn!("No sales found for manager '{}'", manager);
        }
        info!(
            "Manager '{}': {} periods of history, forecast total {:.2}",
            manager,
            result.history.len(),
            result.total()
        );
        result
    }

    /// Forecast a department from its member managers
    ///
    /// Membership comes from the caller; duplicate member names count once.
    pub fn forecast_department(
        &self,
        records: &[SaleRecord],
        department: &str,
        members: &[String],
        periods: usize,
    ) -> DepartmentForecast {
        let mut seen = HashSet::new();
        let members: Vec<&str> = members
            .iter()
            .map(|m| m.as_str())
            .filter(|m| seen.insert(*m))
            .collect();

        let union = self.forecast_entity(
            department,
            records.iter().filter(|r| seen.contains(r.manager.as_str())),
            periods,
        );

        let member_forecasts: Vec<EntityForecast> = members
            .par_iter()
            .map(|member| {
                self.forecast_entity(
                    member,
                    records.iter().filter(|r| r.manager == *member),
                    periods,
                )
            })
            .collect();

        let member_sum = sum_elementwise(
            member_forecasts.iter().map(|m| m.forecast()),
            periods,
        );

        info!(
            "Department '{}': {} members, {} records, forecast total {:.2}",
            department,
            members.len(),
            union.record_count,
            union.total()
        );

        DepartmentForecast {
            department: union,
            members: member_forecasts,
            member_sum,
        }
    }

    /// Lifecycle forecast of a single client
    pub fn forecast_client(
        &self,
        records: &[SaleRecord],
        client_id: &str,
        now: NaiveDateTime,
        periods: usize,
    ) -> ClientForecast {
        let own: Vec<&SaleRecord> = records.iter().filter(|r| r.client_id == client_id).collect();
        self.classifier.forecast_client(client_id, &own, now, periods)
    }

    /// Classify and forecast every distinct client
    pub fn forecast_clients(
        &self,
        records: &[SaleRecord],
        now: NaiveDateTime,
        periods: usize,
    ) -> PortfolioForecast {
        let mut by_client: BTreeMap<&str, Vec<&SaleRecord>> = BTreeMap::new();
        for record in records {
            by_client
                .entry(record.client_id.as_str())
                .or_default()
                .push(record);
        }
        let groups: Vec<(&str, Vec<&SaleRecord>)> = by_client.into_iter().collect();

        let clients: Vec<ClientForecast> = groups
            .par_iter()
            .map(|(client_id, own)| self.classifier.forecast_client(client_id, own, now, periods))
            .collect();

        let total_forecast = sum_elementwise(clients.iter().map(|c| c.forecast.as_slice()), periods);

        let average_confidence = if clients.is_empty() {
            0.0
        } else {
            clients.iter().map(|c| c.confidence).sum::<f64>() / clients.len() as f64
        };

        let mut stage_counts: BTreeMap<LifecycleStage, usize> =
            LifecycleStage::all().iter().map(|s| (*s, 0)).collect();
        for client in &clients {
            *stage_counts.entry(client.profile.stage).or_insert(0) += 1;
        }

        info!(
            "Forecast {} clients, average confidence {:.2}",
            clients.len(),
            average_confidence
        );

        PortfolioForecast {
            clients,
            total_forecast,
            average_confidence,
            stage_counts,
        }
    }
}

fn sum_elementwise<'a, I>(forecasts: I, periods: usize) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut total = vec![0.0; periods];
    for forecast in forecasts {
        for (sum, value) in total.iter_mut().zip(forecast) {
            *sum += value;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnsembleWeights;
    use crate::forecast::TrendEstimator;
    use crate::test_utils::{at, client_history, monthly_sales, sale};
    use chrono::Duration;

    fn seeded() -> Settings {
        let mut settings = Settings::default();
        settings.forecast.seed = Some(17);
        settings
    }

    fn orchestrator() -> ForecastOrchestrator {
        ForecastOrchestrator::new(seeded()).unwrap()
    }

    fn two_managers() -> Vec<SaleRecord> {
        let mut records = monthly_sales("Anna", "C1", 2023, 1, &[100.0, 110.0, 120.0, 130.0]);
        records.extend(monthly_sales("Boris", "C2", 2023, 1, &[50.0, 50.0, 50.0, 50.0]));
        records
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.forecast.season_length = 0;
        assert!(ForecastOrchestrator::new(settings).is_err());
    }

    #[test]
    fn test_manager_forecast_filters_and_labels() {
        let records = two_managers();
        let result = orchestrator().forecast_manager(&records, "Anna", 3);

        assert_eq!(result.record_count, 4);
        let history: Vec<f64> = result.history.iter().map(|(_, v)| *v).collect();
        assert_eq!(history, vec![100.0, 110.0, 120.0, 130.0]);

        let labels: Vec<String> = result.periods.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels, vec!["2023-05", "2023-06", "2023-07"]);
        assert_eq!(result.forecast().len(), 3);
        // Four periods is below the accuracy minimum
        assert_eq!(result.accuracy, AccuracyReport::default());
    }

    #[test]
    fn test_unknown_manager_gives_zero_forecast() {
        let result = orchestrator().forecast_manager(&two_managers(), "Nobody", 2);
        assert_eq!(result.record_count, 0);
        assert!(result.periods.is_empty());
        assert_eq!(result.forecast(), &[0.0, 0.0]);
    }

    #[test]
    fn test_department_member_sum() {
        let records = two_managers();
        let members = vec!["Anna".to_string(), "Boris".to_string(), "Anna".to_string()];
        let result = orchestrator().forecast_department(&records, "Sales", &members, 2);

        assert_eq!(result.department.record_count, 8);
        assert_eq!(result.members.len(), 2);
        assert_eq!(result.members[0].name, "Anna");
        for i in 0..2 {
            let expected = result.members[0].forecast()[i] + result.members[1].forecast()[i];
            assert!((result.member_sum[i] - expected).abs() < 1e-9);
        }
        let union: Vec<f64> = result.department.history.iter().map(|(_, v)| *v).collect();
        assert_eq!(union, vec![150.0, 160.0, 170.0, 180.0]);
    }

    #[test]
    fn test_trend_only_weights_make_department_linear() {
        let mut settings = seeded();
        settings.forecast.weights = EnsembleWeights::new(1.0, 0.0, 0.0);
        let orchestrator = ForecastOrchestrator::new(settings).unwrap();

        let records = two_managers();
        let members = vec!["Anna".to_string(), "Boris".to_string()];
        let result = orchestrator.forecast_department(&records, "Sales", &members, 3);
        let expected = TrendEstimator.forecast(&[150.0, 160.0, 170.0, 180.0], 3);
        assert_eq!(result.department.forecast(), expected.as_slice());
        for (sum, union) in result.member_sum.iter().zip(&expected) {
            assert!((sum - union).abs() < 1e-9);
        }
    }

    #[test]
    fn test_historical_accuracy_needs_min_periods() {
        let orchestrator = orchestrator();
        assert_eq!(
            orchestrator.historical_accuracy(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            AccuracyReport::default()
        );
    }

    #[test]
    fn test_historical_accuracy_perfect_line() {
        let mut settings = seeded();
        settings.forecast.weights = EnsembleWeights::new(1.0, 0.0, 0.0);
        let orchestrator = ForecastOrchestrator::new(settings).unwrap();

        let series: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();
        let report = orchestrator.historical_accuracy(&series);
        assert!(report.rmse < 1e-6);
        assert!(report.mape < 1e-6);
    }

    #[test]
    fn test_historical_accuracy_detects_error() {
        let mut settings = seeded();
        settings.forecast.weights = EnsembleWeights::new(1.0, 0.0, 0.0);
        let orchestrator = ForecastOrchestrator::new(settings).unwrap();

        // Flat training part, jump in the held-out part
        let series = vec![10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 20.0, 20.0];
        let report = orchestrator.historical_accuracy(&series);
        assert!((report.rmse - 10.0).abs() < 1e-9);
        assert!((report.mape - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_client_portfolio() {
        let now = at("2024-06-01");
        let mut records = vec![sale("NEW", "P1", "2024-05-25", 300.0)];
        records.extend(client_history("ACTIVE", now - Duration::days(1), 15, 3, 100.0));
        records.extend(client_history("RISK", now - Duration::days(400), 5, 10, 80.0));

        let portfolio = orchestrator().forecast_clients(&records, now, 3);
        assert_eq!(portfolio.clients.len(), 3);
        // Sorted by client id
        assert_eq!(portfolio.clients[0].profile.client_id, "ACTIVE");
        assert_eq!(portfolio.clients[1].profile.client_id, "NEW");
        assert_eq!(portfolio.clients[2].profile.client_id, "RISK");

        assert_eq!(portfolio.stage_counts[&LifecycleStage::Active], 1);
        assert_eq!(portfolio.stage_counts[&LifecycleStage::New], 1);
        assert_eq!(portfolio.stage_counts[&LifecycleStage::AtRisk], 1);
        assert_eq!(portfolio.stage_counts[&LifecycleStage::Growing], 0);

        let expected_confidence = (0.7 + 0.3 + 0.4) / 3.0;
        assert!((portfolio.average_confidence - expected_confidence).abs() < 1e-9);

        for i in 0..3 {
            let sum: f64 = portfolio.clients.iter().map(|c| c.forecast[i]).sum();
            assert!((portfolio.total_forecast[i] - sum).abs() < 1e-9);
        }

        // Every client is forecast for the same calendar months
        let labels: Vec<String> = portfolio.clients[2]
            .periods
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(labels, vec!["2024-07", "2024-08", "2024-09"]);
        assert!(portfolio
            .clients
            .iter()
            .all(|c| c.periods == portfolio.clients[2].periods));
    }

    #[test]
    fn test_empty_portfolio() {
        let portfolio = orchestrator().forecast_clients(&[], at("2024-01-01"), 2);
        assert!(portfolio.clients.is_empty());
        assert_eq!(portfolio.total_forecast, vec![0.0, 0.0]);
        assert_eq!(portfolio.average_confidence, 0.0);
    }

    #[test]
    fn test_parallel_runs_are_reproducible() {
        let mut records = Vec::new();
        for (i, manager) in ["A", "B", "C", "D"].iter().enumerate() {
            let values: Vec<f64> = (0..30)
                .map(|m| 100.0 + (i * 10) as f64 + ((m * 7) % 11) as f64 * 5.0)
                .collect();
            records.extend(monthly_sales(manager, &format!("C{}", i), 2021, 1, &values));
        }
        let members: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();

        let orchestrator = orchestrator();
        let first = orchestrator.forecast_department(&records, "All", &members, 6);
        let second = orchestrator.forecast_department(&records, "All", &members, 6);
        assert_eq!(first.member_sum, second.member_sum);
        assert_eq!(first.department.forecast(), second.department.forecast());

        // Same as forecasting the manager alone
        let single = orchestrator.forecast_manager(&records, "C", 6);
        assert_eq!(first.members[2].forecast(), single.forecast());
    }
}
