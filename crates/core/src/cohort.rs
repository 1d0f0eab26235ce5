//! Cohort retention and conversion rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bucket::Granularity;
use crate::event::EventType;

/// Fixed retention check-points, in days since the cohort bucket's start.
pub const RETENTION_OFFSETS_DAYS: [u32; 5] = [7, 30, 90, 180, 365];

/// Retention at one age offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPoint {
    pub retained_users: u64,
    /// retained / cohort size, in [0, 1]
    pub retention_rate: f64,
}

/// Conversion into one target event type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPoint {
    pub converted_users: u64,
    /// converted / cohort size, in [0, 1]
    pub conversion_rate: f64,
}

/// Users sharing a formation-event bucket, with retention and conversion
/// curves.
///
/// `cohort_size` is recomputed fresh from current formation events on every
/// run; a re-run after backfilled signups replaces the row wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    /// Bucket key of the formation event
    pub cohort_period: String,
    pub granularity: Granularity,
    pub cohort_size: u64,
    /// Keyed by age offset in days
    pub retention: BTreeMap<u32, RetentionPoint>,
    /// Keyed by target conversion event type
    pub conversion_rates: BTreeMap<EventType, ConversionPoint>,
}
