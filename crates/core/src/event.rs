//! Behavioral event types for the growth pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::limits::MAX_EVENT_DATA_BYTES;
use crate::metrics::MetricType;

/// A behavioral event tag.
///
/// The known tags drive the metric and journey-stage lookup tables below;
/// anything else round-trips as `Custom` and is stored without feeding
/// counters or journey pointers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PageView,
    SignupStarted,
    UserSignup,
    TrialStarted,
    SubscriptionCreated,
    PurchaseCompleted,
    EmailOpened,
    EmailClicked,
    ReferralCompleted,
    Custom(String),
}

impl EventType {
    /// Returns the event type as its wire string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PageView => "page_view",
            Self::SignupStarted => "signup_started",
            Self::UserSignup => "user_signup",
            Self::TrialStarted => "trial_started",
            Self::SubscriptionCreated => "subscription_created",
            Self::PurchaseCompleted => "purchase_completed",
            Self::EmailOpened => "email_opened",
            Self::EmailClicked => "email_clicked",
            Self::ReferralCompleted => "referral_completed",
            Self::Custom(name) => name,
        }
    }

    /// Parses a wire string into an event type. Unknown tags become `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "page_view" => Self::PageView,
            "signup_started" => Self::SignupStarted,
            "user_signup" => Self::UserSignup,
            "trial_started" => Self::TrialStarted,
            "subscription_created" => Self::SubscriptionCreated,
            "purchase_completed" => Self::PurchaseCompleted,
            "email_opened" => Self::EmailOpened,
            "email_clicked" => Self::EmailClicked,
            "referral_completed" => Self::ReferralCompleted,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Per-day counter metric fed by this event type, if any.
    ///
    /// Unmapped event types are stored but feed no counter.
    pub fn metric(&self) -> Option<MetricType> {
        match self {
            Self::PageView => Some(MetricType::PageViews),
            Self::UserSignup => Some(MetricType::Signups),
            Self::SubscriptionCreated => Some(MetricType::Conversions),
            Self::PurchaseCompleted => Some(MetricType::Purchases),
            Self::EmailOpened => Some(MetricType::EmailOpens),
            Self::EmailClicked => Some(MetricType::EmailClicks),
            Self::ReferralCompleted => Some(MetricType::Referrals),
            _ => None,
        }
    }

    /// Lifecycle stage implied by this event type.
    pub fn journey_stage(&self) -> JourneyStage {
        match self {
            Self::PageView => JourneyStage::Awareness,
            Self::SignupStarted => JourneyStage::Interest,
            Self::UserSignup => JourneyStage::Consideration,
            Self::TrialStarted => JourneyStage::Trial,
            Self::SubscriptionCreated | Self::PurchaseCompleted => JourneyStage::Customer,
            Self::ReferralCompleted => JourneyStage::Advocate,
            _ => JourneyStage::Unknown,
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse lifecycle label derived from a user's most recent event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyStage {
    Awareness,
    Interest,
    Consideration,
    Trial,
    Customer,
    Advocate,
    Unknown,
}

impl JourneyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Awareness => "awareness",
            Self::Interest => "interest",
            Self::Consideration => "consideration",
            Self::Trial => "trial",
            Self::Customer => "customer",
            Self::Advocate => "advocate",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JourneyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client and network context attached to events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EventMetadata {
    /// User agent string
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    /// Client IP (set by the caller)
    #[validate(length(max = 45))]
    pub ip: Option<String>,
    /// Referrer URL
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    /// Stamped by the ingestor when the event is accepted.
    pub processed_at: Option<DateTime<Utc>>,
}

/// A single stored behavioral event. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,
    /// Tenant partition key
    pub organization_id: Uuid,
    /// Present once a visitor is identified
    pub user_id: Option<String>,
    /// Assigned by the ingestor when the caller sends none
    pub session_id: Option<String>,
    pub event_type: EventType,
    /// Open attribute map, opaque to the pipeline except for `value`
    #[serde(default)]
    pub event_data: serde_json::Value,
    /// Acquisition channel tag
    pub source: Option<String>,
    /// Event time, distinct from ingestion time
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl Event {
    /// Numeric value carried in `event_data`, 0 when absent.
    ///
    /// Feeds per-metric sums during period aggregation.
    pub fn value(&self) -> f64 {
        self.event_data
            .get("value")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }
}

/// Validates serialized event_data size.
fn validate_event_data_size(data: &serde_json::Value) -> Result<(), ValidationError> {
    if data.is_null() {
        return Ok(());
    }

    let size = serde_json::to_vec(data).map(|v| v.len()).unwrap_or(0);

    if size > MAX_EVENT_DATA_BYTES {
        let mut err = ValidationError::new("event_data_too_large");
        err.message = Some(
            format!(
                "event_data {}KB exceeds {}KB limit",
                size / 1024,
                MAX_EVENT_DATA_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Inbound `track_event` payload.
///
/// The organization id rides on the task envelope, not here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    /// Generated if absent
    #[validate(length(max = 128))]
    pub session_id: Option<String>,
    pub event_type: EventType,
    #[serde(default)]
    #[validate(custom(function = "validate_event_data_size"))]
    pub event_data: serde_json::Value,
    #[validate(length(max = 64))]
    pub source: Option<String>,
    /// Event time; defaults to processing time when omitted
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl TrackEventRequest {
    /// Builds the stored event: assigns a session id when absent and stamps
    /// processing metadata.
    pub fn into_event(self, organization_id: Uuid) -> Event {
        let now = Utc::now();
        let mut metadata = self.metadata;
        metadata.processed_at = Some(now);

        Event {
            id: Uuid::new_v4(),
            organization_id,
            user_id: self.user_id,
            session_id: Some(
                self.session_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            ),
            event_type: self.event_type,
            event_data: self.event_data,
            source: self.source,
            timestamp: self.timestamp.unwrap_or(now),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trip() {
        for tag in [
            "page_view",
            "signup_started",
            "user_signup",
            "trial_started",
            "subscription_created",
            "purchase_completed",
            "email_opened",
            "email_clicked",
            "referral_completed",
        ] {
            assert_eq!(EventType::parse(tag).as_str(), tag);
        }

        let custom = EventType::parse("webinar_attended");
        assert_eq!(custom, EventType::Custom("webinar_attended".into()));
        assert_eq!(custom.as_str(), "webinar_attended");
    }

    #[test]
    fn test_metric_lookup_table() {
        assert_eq!(EventType::PageView.metric(), Some(MetricType::PageViews));
        assert_eq!(EventType::UserSignup.metric(), Some(MetricType::Signups));
        assert_eq!(
            EventType::SubscriptionCreated.metric(),
            Some(MetricType::Conversions)
        );
        assert_eq!(
            EventType::PurchaseCompleted.metric(),
            Some(MetricType::Purchases)
        );
        assert_eq!(EventType::EmailOpened.metric(), Some(MetricType::EmailOpens));
        assert_eq!(
            EventType::EmailClicked.metric(),
            Some(MetricType::EmailClicks)
        );
        assert_eq!(
            EventType::ReferralCompleted.metric(),
            Some(MetricType::Referrals)
        );

        // Stored but counterless
        assert_eq!(EventType::SignupStarted.metric(), None);
        assert_eq!(EventType::TrialStarted.metric(), None);
        assert_eq!(EventType::Custom("webinar_attended".into()).metric(), None);
    }

    #[test]
    fn test_journey_stage_lookup_table() {
        assert_eq!(EventType::PageView.journey_stage(), JourneyStage::Awareness);
        assert_eq!(
            EventType::SignupStarted.journey_stage(),
            JourneyStage::Interest
        );
        assert_eq!(
            EventType::UserSignup.journey_stage(),
            JourneyStage::Consideration
        );
        assert_eq!(EventType::TrialStarted.journey_stage(), JourneyStage::Trial);
        assert_eq!(
            EventType::SubscriptionCreated.journey_stage(),
            JourneyStage::Customer
        );
        assert_eq!(
            EventType::PurchaseCompleted.journey_stage(),
            JourneyStage::Customer
        );
        assert_eq!(
            EventType::ReferralCompleted.journey_stage(),
            JourneyStage::Advocate
        );
        assert_eq!(
            EventType::EmailOpened.journey_stage(),
            JourneyStage::Unknown
        );
        assert_eq!(
            EventType::Custom("anything".into()).journey_stage(),
            JourneyStage::Unknown
        );
    }

    #[test]
    fn test_into_event_assigns_session_and_stamps() {
        let org = Uuid::new_v4();
        let req = TrackEventRequest {
            user_id: Some("u-1".into()),
            session_id: None,
            event_type: EventType::PageView,
            event_data: serde_json::json!({"value": 2.5}),
            source: Some("organic".into()),
            timestamp: None,
            metadata: EventMetadata::default(),
        };

        let event = req.into_event(org);
        assert_eq!(event.organization_id, org);
        assert!(event.session_id.is_some());
        assert!(event.metadata.processed_at.is_some());
        assert_eq!(event.value(), 2.5);
    }

    #[test]
    fn test_event_data_size_limit() {
        let big = "x".repeat(MAX_EVENT_DATA_BYTES + 1);
        let req = TrackEventRequest {
            user_id: None,
            session_id: Some("s-1".into()),
            event_type: EventType::PageView,
            event_data: serde_json::json!({ "blob": big }),
            source: None,
            timestamp: None,
            metadata: EventMetadata::default(),
        };

        assert!(req.validate().is_err());
    }
}
