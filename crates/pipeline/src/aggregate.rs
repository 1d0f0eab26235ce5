//! Period aggregation: bucket raw events and upsert per-bucket metrics.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use growth_core::{
    bucket_key, AggregateStore, AggregatedPeriod, Event, EventStore, Granularity, KeyMetrics,
    MetricStat, MetricType, Result, TimeRange,
};
use telemetry::metrics;

/// Outcome summary for one aggregation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub granularity: Granularity,
    pub periods_written: usize,
    pub events_processed: usize,
}

/// Groups stored events into buckets and upserts per-bucket metric totals.
pub struct PeriodAggregator {
    events: Arc<dyn EventStore>,
    aggregates: Arc<dyn AggregateStore>,
}

impl PeriodAggregator {
    pub fn new(events: Arc<dyn EventStore>, aggregates: Arc<dyn AggregateStore>) -> Self {
        Self { events, aggregates }
    }

    /// Aggregates one organization's events over `range`.
    ///
    /// Every bucket the range touches is recomputed in full from raw events
    /// and the stored row replaced, so re-running over an overlapping range
    /// never double counts.
    pub async fn run(
        &self,
        organization_id: Uuid,
        range: &TimeRange,
        granularity: Granularity,
    ) -> Result<AggregateSummary> {
        let events = self.events.query(organization_id, None, range).await?;
        let events_processed = events.len();

        let buckets = bucket_events(&events, granularity);
        let periods_written = buckets.len();

        for (period, bucket) in &buckets {
            let row = build_period(period, granularity, bucket);
            self.aggregates
                .upsert(organization_id, granularity, period, &row)
                .await?;
            metrics().periods_upserted.inc();
        }

        debug!(
            organization_id = %organization_id,
            granularity = %granularity,
            periods = periods_written,
            events = events_processed,
            "Aggregation complete"
        );

        Ok(AggregateSummary {
            granularity,
            periods_written,
            events_processed,
        })
    }
}

/// Assigns each event to exactly one bucket key.
fn bucket_events(events: &[Event], granularity: Granularity) -> BTreeMap<String, Vec<&Event>> {
    let mut buckets: BTreeMap<String, Vec<&Event>> = BTreeMap::new();
    for event in events {
        buckets
            .entry(bucket_key(event.timestamp, granularity))
            .or_default()
            .push(event);
    }
    buckets
}

/// Builds one aggregate row from a bucket's events.
fn build_period(period: &str, granularity: Granularity, events: &[&Event]) -> AggregatedPeriod {
    let mut metric_stats: BTreeMap<MetricType, MetricStat> = BTreeMap::new();
    let mut users: HashSet<&str> = HashSet::new();

    for event in events {
        if let Some(metric) = event.event_type.metric() {
            metric_stats.entry(metric).or_default().record(event.value());
        }
        if let Some(ref user_id) = event.user_id {
            users.insert(user_id.as_str());
        }
    }

    let page_views = metric_stats
        .get(&MetricType::PageViews)
        .map_or(0, |s| s.count);
    let conversions = metric_stats
        .get(&MetricType::Conversions)
        .map_or(0, |s| s.count);
    let conversion_rate = if page_views == 0 {
        0.0
    } else {
        conversions as f64 / page_views as f64
    };

    AggregatedPeriod {
        period: period.to_string(),
        granularity,
        metrics: metric_stats,
        key_metrics: KeyMetrics {
            total_events: events.len() as u64,
            unique_users: users.len() as u64,
            conversion_rate,
        },
    }
}
