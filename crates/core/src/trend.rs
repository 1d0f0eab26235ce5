//! Period-over-period trend rows.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricType;

/// Direction of a period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    /// Classifies a percentage change.
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Self::Up
        } else if change < 0.0 {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

/// Change of one metric between two adjacent buckets.
///
/// Only produced when the previous bucket's count is non-zero; cold-start
/// metrics are omitted rather than reported as infinite spikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub metric_type: MetricType,
    /// Bucket key of the current period
    pub period: String,
    pub change_percentage: f64,
    pub direction: TrendDirection,
}
