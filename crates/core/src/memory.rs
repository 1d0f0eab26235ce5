//! In-memory store backing tests and single-process deployments.
//!
//! Implements the same store traits as the ClickHouse backend, so the full
//! pipeline can be exercised without a database. Fault injection switches
//! let tests drive the fatal and best-effort failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::bucket::{Granularity, TimeRange};
use crate::cohort::Cohort;
use crate::error::{Error, Result};
use crate::event::{Event, EventType, JourneyStage};
use crate::insight::InsightReport;
use crate::metrics::{AggregatedPeriod, MetricType};
use crate::store::{AggregateStore, CohortStore, EventStore, InsightStore, RollupStore};

#[derive(Default)]
struct Inner {
    events: Vec<Event>,
    aggregates: HashMap<(Uuid, Granularity), BTreeMap<String, AggregatedPeriod>>,
    cohorts: HashMap<(Uuid, Granularity), BTreeMap<String, Cohort>>,
    insights: HashMap<Uuid, InsightReport>,
    daily_counts: BTreeMap<(Uuid, NaiveDate, MetricType), u64>,
    journeys: HashMap<(Uuid, String), (JourneyStage, DateTime<Utc>)>,
    sessions: HashMap<(Uuid, String), (EventType, DateTime<Utc>)>,
}

/// Process-local implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_events: AtomicBool,
    fail_rollups: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes event inserts/queries fail, for fatal-path testing.
    pub fn set_fail_events(&self, fail: bool) {
        self.fail_events.store(fail, Ordering::Relaxed);
    }

    /// Makes rollup writes fail, for best-effort-path testing.
    pub fn set_fail_rollups(&self, fail: bool) {
        self.fail_rollups.store(fail, Ordering::Relaxed);
    }

    pub fn event_count(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Current per-day counter value, 0 when never incremented.
    pub fn daily_count(&self, organization_id: Uuid, date: NaiveDate, metric: MetricType) -> u64 {
        *self
            .inner
            .lock()
            .daily_counts
            .get(&(organization_id, date, metric))
            .unwrap_or(&0)
    }

    /// Latest journey stage recorded for a user.
    pub fn journey_stage(&self, organization_id: Uuid, user_id: &str) -> Option<JourneyStage> {
        self.inner
            .lock()
            .journeys
            .get(&(organization_id, user_id.to_string()))
            .map(|(stage, _)| *stage)
    }

    /// Whether a session activity record exists.
    pub fn session_seen(&self, organization_id: Uuid, session_id: &str) -> bool {
        self.inner
            .lock()
            .sessions
            .contains_key(&(organization_id, session_id.to_string()))
    }

    /// All stored aggregate rows for one granularity, ascending by key.
    pub fn aggregated_periods(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
    ) -> Vec<AggregatedPeriod> {
        self.inner
            .lock()
            .aggregates
            .get(&(organization_id, granularity))
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All stored cohort rows for one granularity, ascending by key.
    pub fn cohort_rows(&self, organization_id: Uuid, granularity: Granularity) -> Vec<Cohort> {
        self.inner
            .lock()
            .cohorts
            .get(&(organization_id, granularity))
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Latest stored insight report for an organization.
    pub fn insight_report(&self, organization_id: Uuid) -> Option<InsightReport> {
        self.inner.lock().insights.get(&organization_id).cloned()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, event: &Event) -> Result<Uuid> {
        if self.fail_events.load(Ordering::Relaxed) {
            return Err(Error::store("event store offline"));
        }

        self.inner.lock().events.push(event.clone());
        Ok(event.id)
    }

    async fn query(
        &self,
        organization_id: Uuid,
        event_types: Option<&[EventType]>,
        range: &TimeRange,
    ) -> Result<Vec<Event>> {
        if self.fail_events.load(Ordering::Relaxed) {
            return Err(Error::store("event store offline"));
        }

        let mut events: Vec<Event> = self
            .inner
            .lock()
            .events
            .iter()
            .filter(|e| e.organization_id == organization_id)
            .filter(|e| range.contains(e.timestamp))
            .filter(|e| event_types.map_or(true, |types| types.contains(&e.event_type)))
            .cloned()
            .collect();

        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn upsert(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        period: &str,
        row: &AggregatedPeriod,
    ) -> Result<()> {
        self.inner
            .lock()
            .aggregates
            .entry((organization_id, granularity))
            .or_default()
            .insert(period.to_string(), row.clone());
        Ok(())
    }

    async fn query(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        range: &TimeRange,
    ) -> Result<Vec<AggregatedPeriod>> {
        let low = crate::bucket::bucket_key(range.start, granularity);
        // Half-open: the high bucket is the one holding the last included instant.
        let high = range
            .end
            .map(|end| crate::bucket::bucket_key(end - chrono::Duration::milliseconds(1), granularity));

        Ok(self
            .inner
            .lock()
            .aggregates
            .get(&(organization_id, granularity))
            .map(|rows| {
                rows.iter()
                    .filter(|(period, _)| {
                        **period >= low && high.as_ref().map_or(true, |h| *period <= h)
                    })
                    .map(|(_, row)| row.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CohortStore for MemoryStore {
    async fn upsert(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        period: &str,
        cohort: &Cohort,
    ) -> Result<()> {
        self.inner
            .lock()
            .cohorts
            .entry((organization_id, granularity))
            .or_default()
            .insert(period.to_string(), cohort.clone());
        Ok(())
    }

    async fn query(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
    ) -> Result<Vec<Cohort>> {
        Ok(self.cohort_rows(organization_id, granularity))
    }
}

#[async_trait]
impl InsightStore for MemoryStore {
    async fn upsert(&self, organization_id: Uuid, report: &InsightReport) -> Result<()> {
        self.inner
            .lock()
            .insights
            .insert(organization_id, report.clone());
        Ok(())
    }
}

#[async_trait]
impl RollupStore for MemoryStore {
    async fn increment_daily(
        &self,
        organization_id: Uuid,
        date: NaiveDate,
        metric: MetricType,
    ) -> Result<()> {
        if self.fail_rollups.load(Ordering::Relaxed) {
            return Err(Error::store("rollup store offline"));
        }

        *self
            .inner
            .lock()
            .daily_counts
            .entry((organization_id, date, metric))
            .or_insert(0) += 1;
        Ok(())
    }

    async fn record_journey(
        &self,
        organization_id: Uuid,
        user_id: &str,
        stage: JourneyStage,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail_rollups.load(Ordering::Relaxed) {
            return Err(Error::store("rollup store offline"));
        }

        self.inner
            .lock()
            .journeys
            .insert((organization_id, user_id.to_string()), (stage, at));
        Ok(())
    }

    async fn touch_session(
        &self,
        organization_id: Uuid,
        session_id: &str,
        event_type: &EventType,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail_rollups.load(Ordering::Relaxed) {
            return Err(Error::store("rollup store offline"));
        }

        self.inner.lock().sessions.insert(
            (organization_id, session_id.to_string()),
            (event_type.clone(), at),
        );
        Ok(())
    }
}
