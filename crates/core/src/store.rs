//! Store interfaces consumed by the pipeline components.
//!
//! Production implementations live in the clickhouse-store crate; the
//! in-memory implementation in [`crate::memory`] backs tests. Every derived
//! write is an idempotent upsert keyed by its stable bucket identity, so
//! callers may retry whole tasks safely.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::bucket::{Granularity, TimeRange};
use crate::cohort::Cohort;
use crate::error::Result;
use crate::event::{Event, EventType, JourneyStage};
use crate::insight::InsightReport;
use crate::metrics::{AggregatedPeriod, MetricType};

/// Append-only behavioral event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists one event and returns its id.
    async fn insert(&self, event: &Event) -> Result<Uuid>;

    /// Events for one organization within `range`, ascending by timestamp,
    /// optionally filtered to the given event types.
    async fn query(
        &self,
        organization_id: Uuid,
        event_types: Option<&[EventType]>,
        range: &TimeRange,
    ) -> Result<Vec<Event>>;
}

/// Upsertable aggregate rows keyed by (organization, granularity, bucket).
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Replaces any existing row with the same key.
    async fn upsert(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        period: &str,
        row: &AggregatedPeriod,
    ) -> Result<()>;

    /// Rows whose bucket key falls within `range`, ascending by key.
    async fn query(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        range: &TimeRange,
    ) -> Result<Vec<AggregatedPeriod>>;
}

/// Upsertable cohort rows keyed by (organization, granularity, bucket).
#[async_trait]
pub trait CohortStore: Send + Sync {
    async fn upsert(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        period: &str,
        cohort: &Cohort,
    ) -> Result<()>;

    /// All cohort rows for the granularity, ascending by bucket key.
    async fn query(&self, organization_id: Uuid, granularity: Granularity)
        -> Result<Vec<Cohort>>;
}

/// Latest insight report per organization.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Replaces the organization's current report.
    async fn upsert(&self, organization_id: Uuid, report: &InsightReport) -> Result<()>;
}

/// Best-effort rollups nudged synchronously on ingest.
///
/// Failures here are logged and swallowed by the caller; event durability
/// takes priority over rollup freshness.
#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Increments the per-day counter for one mapped metric.
    async fn increment_daily(
        &self,
        organization_id: Uuid,
        date: NaiveDate,
        metric: MetricType,
    ) -> Result<()>;

    /// Upserts the user's journey-stage pointer.
    async fn record_journey(
        &self,
        organization_id: Uuid,
        user_id: &str,
        stage: JourneyStage,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Upserts the session's activity record.
    async fn touch_session(
        &self,
        organization_id: Uuid,
        session_id: &str,
        event_type: &EventType,
        at: DateTime<Utc>,
    ) -> Result<()>;
}
