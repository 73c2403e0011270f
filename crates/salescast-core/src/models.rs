//! Domain models for Salescast

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A numeric field as it arrives from the record supplier.
///
/// Feeds mix native numbers with locale-formatted text such as
/// `"1 234,50"` (space thousands separator, comma decimal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Numeric value of the field; unparsable or non-finite input yields 0.
    pub fn value(&self) -> f64 {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => parse_locale_number(s).unwrap_or(0.0),
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Parse a locale-formatted number: whitespace (including non-breaking
/// spaces) is removed and a comma decimal separator becomes a point.
pub fn parse_locale_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok()
}

/// One line of the sales transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    #[serde(alias = "clientCode", alias = "client_code")]
    pub client_id: String,
    #[serde(default, alias = "clientName")]
    pub client_name: String,
    #[serde(default, alias = "sphere")]
    pub business_sphere: String,
    #[serde(default, alias = "managerName")]
    pub manager: String,
    #[serde(default, alias = "productId", alias = "product")]
    pub product_id: String,
    pub date: String,
    #[serde(default)]
    pub revenue: Amount,
    #[serde(default)]
    pub quantity: Amount,
}

impl SaleRecord {
    /// Transaction instant, or None when the date text is not recognized
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_datetime(&self.date)
    }

    pub fn revenue_value(&self) -> f64 {
        self.revenue.value()
    }

    pub fn quantity_value(&self) -> f64 {
        self.quantity.value()
    }
}

/// Parse a transaction date/time in any of the formats seen in sales feeds
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%S%.f", // 2024-01-15T10:30:00.000
        "%Y-%m-%dT%H:%M:%S",    // 2024-01-15T10:30:00
        "%Y-%m-%d %H:%M:%S",    // 2024-01-15 10:30:00
        "%Y-%m-%d %H:%M",       // 2024-01-15 10:30
        "%d.%m.%Y %H:%M:%S",    // 15.01.2024 10:30:00
        "%d.%m.%Y %H:%M",       // 15.01.2024 10:30
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let date_formats = [
        "%Y-%m-%d", // 2024-01-15
        "%d.%m.%Y", // 15.01.2024
        "%m/%d/%Y", // 01/15/2024
    ];
    for fmt in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// Calendar bucket size for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            "year" | "yearly" => Ok(Self::Year),
            _ => Err(format!(
                "Unknown granularity: {} (valid: month, quarter, year)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A calendar period: `YYYY-MM`, `YYYY-Qn` or `YYYY`
///
/// Ordering is chronological for keys of the same granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    pub year: i32,
    /// Month (1-12), quarter (1-4), or 0 for yearly keys
    pub index: u32,
    pub granularity: Granularity,
}

impl PeriodKey {
    pub fn from_date(date: NaiveDate, granularity: Granularity) -> Self {
        let index = match granularity {
            Granularity::Month => date.month(),
            Granularity::Quarter => (date.month() - 1) / 3 + 1,
            Granularity::Year => 0,
        };
        Self {
            year: date.year(),
            index,
            granularity,
        }
    }

    /// The period immediately after this one
    pub fn next(&self) -> Self {
        let (year, index) = match self.granularity {
            Granularity::Month if self.index >= 12 => (self.year + 1, 1),
            Granularity::Quarter if self.index >= 4 => (self.year + 1, 1),
            Granularity::Month | Granularity::Quarter => (self.year, self.index + 1),
            Granularity::Year => (self.year + 1, 0),
        };
        Self {
            year,
            index,
            granularity: self.granularity,
        }
    }

    /// `count` consecutive periods following this one
    pub fn following(&self, count: usize) -> Vec<PeriodKey> {
        let mut keys = Vec::with_capacity(count);
        let mut current = *self;
        for _ in 0..count {
            current = current.next();
            keys.push(current);
        }
        keys
    }

    /// Calendar month (1-12) this period starts in
    pub fn start_month(&self) -> u32 {
        match self.granularity {
            Granularity::Month => self.index,
            Granularity::Quarter => (self.index - 1) * 3 + 1,
            Granularity::Year => 1,
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.granularity {
            Granularity::Month => write!(f, "{:04}-{:02}", self.year, self.index),
            Granularity::Quarter => write!(f, "{:04}-Q{}", self.year, self.index),
            Granularity::Year => write!(f, "{:04}", self.year),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// All sales of one client on one calendar day, merged across product lines
#[derive(Debug, Clone, Serialize)]
pub struct ClientDailySales {
    pub client_id: String,
    pub client_name: String,
    pub business_sphere: String,
    pub manager: String,
    pub date: NaiveDate,
    pub revenue: f64,
    pub quantity: f64,
    /// Distinct product ids in first-seen order
    pub products: Vec<String>,
}

/// Coarse classification of a client's purchase behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStage {
    New,
    Growing,
    Active,
    AtRisk,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Growing => "growing",
            Self::Active => "active",
            Self::AtRisk => "at-risk",
        }
    }

    pub fn all() -> &'static [LifecycleStage] {
        &[Self::New, Self::Growing, Self::Active, Self::AtRisk]
    }
}

impl std::str::FromStr for LifecycleStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "growing" => Ok(Self::Growing),
            "active" => Ok(Self::Active),
            "at-risk" | "at_risk" | "atrisk" => Ok(Self::AtRisk),
            _ => Err(format!("Unknown lifecycle stage: {}", s)),
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which forecasting primitive a lifecycle stage uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStrategy {
    Trend,
    Ensemble,
    Seasonal,
    /// Trend scaled down by the at-risk reduction factor
    ReducedTrend,
}

impl ForecastStrategy {
    pub fn for_stage(stage: LifecycleStage) -> Self {
        match stage {
            LifecycleStage::New => Self::Trend,
            LifecycleStage::Growing => Self::Ensemble,
            LifecycleStage::Active => Self::Seasonal,
            LifecycleStage::AtRisk => Self::ReducedTrend,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Ensemble => "ensemble",
            Self::Seasonal => "seasonal",
            Self::ReducedTrend => "reduced_trend",
        }
    }
}

impl std::fmt::Display for ForecastStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-product purchase history of one client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPreference {
    pub product_id: String,
    pub count: usize,
    pub revenue: f64,
    pub last_purchase: NaiveDateTime,
}

/// Purchase statistics and lifecycle stage of one client
#[derive(Debug, Clone, Serialize)]
pub struct ClientLifecycleProfile {
    pub client_id: String,
    pub client_name: String,
    pub first_purchase: Option<NaiveDateTime>,
    pub last_purchase: Option<NaiveDateTime>,
    pub total_purchases: usize,
    pub total_revenue: f64,
    pub average_order_value: f64,
    /// Orders per 30 days over the observed span
    pub purchase_frequency: f64,
    /// Mean days between consecutive orders (None for a single order)
    pub average_interval_days: Option<f64>,
    pub days_since_last_purchase: f64,
    pub stage: LifecycleStage,
    /// Mean revenue per order, by calendar month (January first)
    pub seasonal_pattern: [f64; 12],
    /// Ordered by revenue, highest first
    pub product_preferences: Vec<ProductPreference>,
}

impl ClientLifecycleProfile {
    /// Profile for a client with no usable purchase history
    pub fn empty(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: String::new(),
            first_purchase: None,
            last_purchase: None,
            total_purchases: 0,
            total_revenue: 0.0,
            average_order_value: 0.0,
            purchase_frequency: 0.0,
            average_interval_days: None,
            days_since_last_purchase: 0.0,
            stage: LifecycleStage::New,
            seasonal_pattern: [0.0; 12],
            product_preferences: Vec::new(),
        }
    }
}
