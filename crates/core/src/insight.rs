//! Heuristic insight rows.

use serde::{Deserialize, Serialize};

/// Category of a generated finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Opportunity,
    Alert,
    Recommendation,
}

/// Severity ladder; variant order drives ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

/// One human-readable finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub kind: InsightKind,
    /// Metric or funnel step the finding is about, when there is one
    pub metric: Option<String>,
    pub message: String,
    pub severity: Severity,
    /// Orders findings within a severity band; higher first
    pub priority: u8,
}

/// Ranked findings for one organization.
///
/// Recomputed wholesale on each run, never incrementally updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    pub insights: Vec<Insight>,
    /// 0-100, proportional to how many categories produced findings
    pub confidence: u32,
}
