//! ClickHouse table schemas.
//!
//! Conventions:
//! - LowCardinality for enum-like tag columns
//! - DateTime64(3) for millisecond precision
//! - JSON blobs as String columns for map-shaped payloads
//! - ReplacingMergeTree keyed by the row's upsert identity, versioned by
//!   the compute timestamp; reads go through FINAL
//! - SummingMergeTree for the additive per-day counters

/// SQL for creating the raw events table.
///
/// Append-only; the pipeline never mutates a stored event. TTL is two
/// years so the longest cohort retention offset stays measurable.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.events (
    id String,
    organization_id String,
    user_id Nullable(String),
    session_id Nullable(String),

    type LowCardinality(String),
    source Nullable(String),
    timestamp DateTime64(3),
    processed_at DateTime64(3),

    user_agent Nullable(String),
    ip Nullable(String),
    referrer Nullable(String),

    -- Open attribute map
    event_data String,

    created_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (organization_id, timestamp, id)
TTL toDateTime(timestamp) + INTERVAL 730 DAY
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the aggregated period metrics table.
///
/// One row per organization x granularity x bucket key; re-aggregation
/// inserts a newer version and the engine collapses to the latest.
pub const CREATE_PERIOD_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.period_metrics (
    organization_id String,
    granularity LowCardinality(String),
    period String,

    -- Map of metric name -> {count, totalValue, averageValue}
    metrics String,

    total_events UInt64,
    unique_users UInt64,
    conversion_rate Float64,

    computed_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(computed_at)
ORDER BY (organization_id, granularity, period)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the cohorts table.
pub const CREATE_COHORTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.cohorts (
    organization_id String,
    granularity LowCardinality(String),
    cohort_period String,

    cohort_size UInt64,
    -- Map of age offset days -> {retainedUsers, retentionRate}
    retention String,
    -- Map of event type -> {convertedUsers, conversionRate}
    conversion_rates String,

    computed_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(computed_at)
ORDER BY (organization_id, granularity, cohort_period)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the insights table.
///
/// One current report per organization, replaced wholesale on each run.
pub const CREATE_INSIGHTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.insights (
    organization_id String,
    report String,
    confidence UInt32,
    generated_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(generated_at)
ORDER BY organization_id
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the per-day counter table.
///
/// Ingest inserts unit deltas; the engine sums rows sharing a key.
pub const CREATE_DAILY_ROLLUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.daily_rollups (
    organization_id String,
    date String,
    metric LowCardinality(String),
    count UInt64
)
ENGINE = SummingMergeTree(count)
ORDER BY (organization_id, date, metric)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the user journey pointer table.
pub const CREATE_USER_JOURNEYS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.user_journeys (
    organization_id String,
    user_id String,
    stage LowCardinality(String),
    updated_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (organization_id, user_id)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the session activity table.
pub const CREATE_SESSION_ACTIVITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS growth.session_activity (
    organization_id String,
    session_id String,
    last_event LowCardinality(String),
    last_seen DateTime64(3)
)
ENGINE = ReplacingMergeTree(last_seen)
ORDER BY (organization_id, session_id)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the database.
pub const CREATE_DATABASE: &str = r#"
CREATE DATABASE IF NOT EXISTS growth
"#;

/// All table creation statements.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_DATABASE,
        CREATE_EVENTS_TABLE,
        CREATE_PERIOD_METRICS_TABLE,
        CREATE_COHORTS_TABLE,
        CREATE_INSIGHTS_TABLE,
        CREATE_DAILY_ROLLUPS_TABLE,
        CREATE_USER_JOURNEYS_TABLE,
        CREATE_SESSION_ACTIVITY_TABLE,
    ]
}

use crate::client::ClickHouseClient;
use growth_core::Result;

/// Initialize the database schema.
///
/// Creates the database and all tables if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for sql in all_tables() {
        client
            .inner()
            .query(sql)
            .execute()
            .await
            .map_err(|e| growth_core::Error::store(format!("Schema init error: {}", e)))?;
    }
    Ok(())
}
