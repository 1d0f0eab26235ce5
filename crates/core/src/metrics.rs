//! Aggregated period rows and the per-metric accumulator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bucket::Granularity;

/// Metric fed by mapped event types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    PageViews,
    Signups,
    Conversions,
    Purchases,
    EmailOpens,
    EmailClicks,
    Referrals,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageViews => "page_views",
            Self::Signups => "signups",
            Self::Conversions => "conversions",
            Self::Purchases => "purchases",
            Self::EmailOpens => "email_opens",
            Self::EmailClicks => "email_clicks",
            Self::Referrals => "referrals",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count, sum, and derived average for one metric within one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStat {
    pub count: u64,
    pub total_value: f64,
    pub average_value: f64,
}

impl MetricStat {
    /// Records one event carrying `value`.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.total_value += value;
        self.average_value = self.total_value / self.count as f64;
    }
}

/// Derived headline metrics for one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    /// Size of the bucket's event list
    pub total_events: u64,
    /// Distinct non-null user ids
    pub unique_users: u64,
    /// conversions / page_views, 0 when there are no page views
    pub conversion_rate: f64,
}

/// One aggregate row per organization × granularity × bucket key.
///
/// Re-running aggregation recomputes the whole row from raw events and
/// replaces the stored one; rows are never incremented in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPeriod {
    /// Bucket key: `YYYY-MM-DD` or `YYYY-MM`
    pub period: String,
    pub granularity: Granularity,
    pub metrics: BTreeMap<MetricType, MetricStat>,
    pub key_metrics: KeyMetrics,
}

impl AggregatedPeriod {
    /// Count for one metric, 0 when the bucket never saw it.
    pub fn metric_count(&self, metric: MetricType) -> u64 {
        self.metrics.get(&metric).map_or(0, |stat| stat.count)
    }
}
