//! Event ingestion: one fatal write, then best-effort rollups.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use growth_core::{
    Error, EventStore, JourneyStage, MetricType, Result, RollupStore, TrackEventRequest,
};
use telemetry::metrics;

/// Outcome summary for one ingested event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub event_id: Uuid,
    pub session_id: String,
    pub journey_stage: JourneyStage,
    /// Per-day counter fed by this event, when its type is mapped
    pub metric: Option<MetricType>,
}

/// Validates and persists one event, then nudges the per-day counter and
/// the journey/session pointers.
pub struct EventIngestor {
    events: Arc<dyn EventStore>,
    rollups: Arc<dyn RollupStore>,
}

impl EventIngestor {
    pub fn new(events: Arc<dyn EventStore>, rollups: Arc<dyn RollupStore>) -> Self {
        Self { events, rollups }
    }

    /// Ingests one event for `organization_id`.
    ///
    /// The primary event write is fatal on failure. The rollup nudges are
    /// best-effort: failures are logged and swallowed, so event durability
    /// never hinges on rollup freshness.
    pub async fn ingest(
        &self,
        organization_id: Uuid,
        request: TrackEventRequest,
    ) -> Result<IngestSummary> {
        let start = std::time::Instant::now();

        if let Err(e) = request.validate() {
            metrics().events_rejected.inc();
            return Err(Error::validation(e.to_string()));
        }
        if let Err(e) = request.metadata.validate() {
            metrics().events_rejected.inc();
            return Err(Error::validation(format!("metadata: {}", e)));
        }

        let event = request.into_event(organization_id);
        let event_id = self.events.insert(&event).await?;
        metrics().events_ingested.inc();

        let journey_stage = event.event_type.journey_stage();
        let metric = event.event_type.metric();

        if let Some(metric) = metric {
            if let Err(e) = self
                .rollups
                .increment_daily(organization_id, event.timestamp.date_naive(), metric)
                .await
            {
                metrics().rollup_failures.inc();
                warn!(error = %e, metric = %metric, "Daily counter increment failed, continuing");
            }
        }

        if let Some(ref user_id) = event.user_id {
            if let Err(e) = self
                .rollups
                .record_journey(organization_id, user_id, journey_stage, event.timestamp)
                .await
            {
                metrics().rollup_failures.inc();
                warn!(error = %e, user_id = %user_id, "Journey pointer update failed, continuing");
            }
        }

        // Always Some after into_event.
        let session_id = event.session_id.clone().unwrap_or_default();
        if let Err(e) = self
            .rollups
            .touch_session(organization_id, &session_id, &event.event_type, event.timestamp)
            .await
        {
            metrics().rollup_failures.inc();
            warn!(error = %e, session_id = %session_id, "Session activity update failed, continuing");
        }

        metrics()
            .ingest_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        Ok(IngestSummary {
            event_id,
            session_id,
            journey_stage,
            metric,
        })
    }
}
