//! Task envelope for the dispatch boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::bucket::{Granularity, TimeRange};
use crate::event::{EventType, TrackEventRequest};
use crate::funnel::FunnelReport;

/// Scheduling hint carried on the envelope; the pipeline itself runs tasks
/// in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Payload for `aggregate_metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub range: TimeRange,
    pub granularity: Granularity,
}

/// Payload for `calculate_cohorts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRequest {
    /// Formation-event window
    pub range: TimeRange,
    pub granularity: Granularity,
    /// Event type that forms a cohort; signups unless overridden
    #[serde(default = "default_formation_event")]
    pub formation_event: EventType,
    /// Target conversion event types, each measured independently
    pub conversion_events: Vec<EventType>,
}

fn default_formation_event() -> EventType {
    EventType::UserSignup
}

/// Payload for `process_funnel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelRequest {
    /// Ordered funnel step event types
    pub steps: Vec<EventType>,
    pub range: TimeRange,
}

/// Payload for `generate_insights`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub granularity: Granularity,
    /// Trailing buckets of aggregates to read
    #[serde(default = "default_lookback_periods")]
    pub lookback_periods: u32,
    /// Precomputed funnel report to fold into the findings
    pub funnel: Option<FunnelReport>,
}

fn default_lookback_periods() -> u32 {
    6
}

/// Task-specific payload, tagged by task name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskPayload {
    TrackEvent(TrackEventRequest),
    AggregateMetrics(AggregateRequest),
    CalculateCohorts(CohortRequest),
    ProcessFunnel(FunnelRequest),
    GenerateInsights(InsightRequest),
}

impl TaskPayload {
    /// Task name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrackEvent(_) => "track_event",
            Self::AggregateMetrics(_) => "aggregate_metrics",
            Self::CalculateCohorts(_) => "calculate_cohorts",
            Self::ProcessFunnel(_) => "process_funnel",
            Self::GenerateInsights(_) => "generate_insights",
        }
    }
}

/// A typed unit of work submitted by the external scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub organization_id: Uuid,
    #[serde(default)]
    pub priority: TaskPriority,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: TaskPayload,
}

/// Outcome envelope returned for every task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
