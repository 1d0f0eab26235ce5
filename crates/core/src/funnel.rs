//! Funnel step rows.

use serde::{Deserialize, Serialize};

/// Drop-off rate above which a step is flagged as a major drop-off point.
pub const MAJOR_DROPOFF_THRESHOLD: f64 = 0.3;

/// Published numbers for one funnel step.
///
/// `conversion_from_previous` counts sessions that completed this step AND
/// the immediately preceding one (funnel conditioning). That can publish
/// per-step numbers below a naive "ever fired this event" count; the
/// conditioning is intentional and must be preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    pub step_name: String,
    /// 1-based, matching the caller-supplied step ordering
    pub step_number: usize,
    /// Sessions whose event set contains this step's event type
    pub sessions_reached: u64,
    /// sessions_reached / total observed sessions
    pub conversion_rate: f64,
    /// Sessions containing both this step and the previous one;
    /// equals `sessions_reached` for step 1
    pub conversion_from_previous: u64,
    /// 1 - conversion_from_previous / previous step's reach; 0 for step 1
    /// and whenever the previous step reached nobody
    pub dropoff_rate: f64,
}

/// A step whose drop-off crossed [`MAJOR_DROPOFF_THRESHOLD`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorDropoff {
    pub step_number: usize,
    pub step_name: String,
    pub dropoff_rate: f64,
}

/// Full funnel output for one run. Returned in the task result; not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub steps: Vec<FunnelStep>,
    /// Distinct session groups observed across any funnel event
    pub total_sessions: u64,
    /// Sorted descending by drop-off rate
    pub major_dropoffs: Vec<MajorDropoff>,
}
