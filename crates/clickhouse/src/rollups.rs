//! Best-effort rollup rows nudged on ingest.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use growth_core::{Error, EventType, JourneyStage, MetricType, Result, RollupStore};

use crate::client::ClickHouseClient;

/// Unit delta for the growth.daily_rollups SummingMergeTree.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DailyRollupRow {
    pub organization_id: String,
    pub date: String,
    pub metric: String,
    pub count: u64,
}

/// Pointer row for the growth.user_journeys table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct JourneyRow {
    pub organization_id: String,
    pub user_id: String,
    pub stage: String,
    pub updated_at: i64,
}

/// Pointer row for the growth.session_activity table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SessionActivityRow {
    pub organization_id: String,
    pub session_id: String,
    pub last_event: String,
    pub last_seen: i64,
}

async fn write_row<R: Row + Serialize>(
    client: &ClickHouseClient,
    table: &str,
    row: &R,
) -> Result<()> {
    let mut insert = client
        .inner()
        .insert(table)
        .map_err(|e| Error::store(format!("Insert error: {}", e)))?;

    insert
        .write(row)
        .await
        .map_err(|e| Error::store(format!("Write error: {}", e)))?;

    insert
        .end()
        .await
        .map_err(|e| Error::store(format!("End error: {}", e)))?;
    Ok(())
}

#[async_trait]
impl RollupStore for ClickHouseClient {
    async fn increment_daily(
        &self,
        organization_id: Uuid,
        date: NaiveDate,
        metric: MetricType,
    ) -> Result<()> {
        let row = DailyRollupRow {
            organization_id: organization_id.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            metric: metric.as_str().to_string(),
            count: 1,
        };
        write_row(self, "growth.daily_rollups", &row).await
    }

    async fn record_journey(
        &self,
        organization_id: Uuid,
        user_id: &str,
        stage: JourneyStage,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let row = JourneyRow {
            organization_id: organization_id.to_string(),
            user_id: user_id.to_string(),
            stage: stage.as_str().to_string(),
            updated_at: at.timestamp_millis(),
        };
        write_row(self, "growth.user_journeys", &row).await
    }

    async fn touch_session(
        &self,
        organization_id: Uuid,
        session_id: &str,
        event_type: &EventType,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let row = SessionActivityRow {
            organization_id: organization_id.to_string(),
            session_id: session_id.to_string(),
            last_event: event_type.as_str().to_string(),
            last_seen: at.timestamp_millis(),
        };
        write_row(self, "growth.session_activity", &row).await
    }
}
