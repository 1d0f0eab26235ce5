//! Test fixtures and task builders.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use growth_core::{
    AggregateRequest, CohortRequest, EventMetadata, EventType, FunnelReport, FunnelRequest,
    Granularity, InsightRequest, Task, TaskPayload, TaskPriority, TimeRange, TrackEventRequest,
};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// March 2025, half-open.
pub fn march() -> TimeRange {
    TimeRange::new(at(2025, 3, 1, 0), at(2025, 4, 1, 0))
}

pub fn track_request(
    event_type: EventType,
    user: Option<&str>,
    session: Option<&str>,
    ts: DateTime<Utc>,
) -> TrackEventRequest {
    TrackEventRequest {
        user_id: user.map(String::from),
        session_id: session.map(String::from),
        event_type,
        event_data: serde_json::Value::Null,
        source: Some("organic".into()),
        timestamp: Some(ts),
        metadata: EventMetadata::default(),
    }
}

fn task(organization_id: Uuid, payload: TaskPayload) -> Task {
    Task {
        organization_id,
        priority: TaskPriority::Normal,
        scheduled_at: None,
        payload,
    }
}

pub fn track_task(organization_id: Uuid, request: TrackEventRequest) -> Task {
    task(organization_id, TaskPayload::TrackEvent(request))
}

pub fn aggregate_task(organization_id: Uuid, granularity: Granularity, range: TimeRange) -> Task {
    task(
        organization_id,
        TaskPayload::AggregateMetrics(AggregateRequest { range, granularity }),
    )
}

pub fn cohort_task(
    organization_id: Uuid,
    granularity: Granularity,
    range: TimeRange,
    conversion_events: Vec<EventType>,
) -> Task {
    task(
        organization_id,
        TaskPayload::CalculateCohorts(CohortRequest {
            range,
            granularity,
            formation_event: EventType::UserSignup,
            conversion_events,
        }),
    )
}

pub fn funnel_task(organization_id: Uuid, steps: Vec<EventType>, range: TimeRange) -> Task {
    task(
        organization_id,
        TaskPayload::ProcessFunnel(FunnelRequest { steps, range }),
    )
}

pub fn insights_task(
    organization_id: Uuid,
    granularity: Granularity,
    funnel: Option<FunnelReport>,
) -> Task {
    task(
        organization_id,
        TaskPayload::GenerateInsights(InsightRequest {
            granularity,
            lookback_periods: 6,
            funnel,
        }),
    )
}

/// Wire-shaped track_event task JSON, as an external scheduler would send it.
pub fn track_task_json(organization_id: Uuid, event_type: &str, session: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "track_event",
        "organizationId": organization_id.to_string(),
        "priority": "normal",
        "data": {
            "sessionId": session,
            "eventType": event_type,
            "eventData": { "value": 1.0 },
            "source": "organic",
            "timestamp": "2025-03-10T09:00:00Z"
        }
    })
}
