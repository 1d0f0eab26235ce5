//! Event rows: insert and range queries.

use async_trait::async_trait;
use chrono::DateTime;
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use growth_core::{
    Error, Event, EventMetadata, EventStore, EventType, Result, TimeRange,
};
use telemetry::metrics;

use crate::client::ClickHouseClient;

/// Flattened event row for the growth.events table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub organization_id: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: Option<String>,
    pub timestamp: i64, // milliseconds since epoch
    pub processed_at: i64,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub referrer: Option<String>,
    pub event_data: String, // JSON blob
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.to_string(),
            organization_id: event.organization_id.to_string(),
            user_id: event.user_id.clone(),
            session_id: event.session_id.clone(),
            event_type: event.event_type.as_str().to_string(),
            source: event.source.clone(),
            timestamp: event.timestamp.timestamp_millis(),
            processed_at: event
                .metadata
                .processed_at
                .map(|t| t.timestamp_millis())
                .unwrap_or_else(|| event.timestamp.timestamp_millis()),
            user_agent: event.metadata.user_agent.clone(),
            ip: event.metadata.ip.clone(),
            referrer: event.metadata.referrer.clone(),
            event_data: event.event_data.to_string(),
        }
    }
}

impl EventRow {
    /// Rehydrates the stored row into a domain event.
    pub fn into_event(self) -> Result<Event> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::store(format!("bad event id {}: {}", self.id, e)))?;
        let organization_id = Uuid::parse_str(&self.organization_id).map_err(|e| {
            Error::store(format!("bad organization id {}: {}", self.organization_id, e))
        })?;
        let timestamp = DateTime::from_timestamp_millis(self.timestamp)
            .ok_or_else(|| Error::store(format!("bad timestamp {}", self.timestamp)))?;
        let processed_at = DateTime::from_timestamp_millis(self.processed_at);
        let event_data = if self.event_data.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&self.event_data)?
        };

        Ok(Event {
            id,
            organization_id,
            user_id: self.user_id,
            session_id: self.session_id,
            event_type: EventType::parse(&self.event_type),
            event_data,
            source: self.source,
            timestamp,
            metadata: EventMetadata {
                user_agent: self.user_agent,
                ip: self.ip,
                referrer: self.referrer,
                processed_at,
            },
        })
    }
}

#[async_trait]
impl EventStore for ClickHouseClient {
    async fn insert(&self, event: &Event) -> Result<Uuid> {
        let start = std::time::Instant::now();
        let row = EventRow::from(event);

        let mut insert = self
            .inner()
            .insert("growth.events")
            .map_err(|e| Error::store(format!("Insert error: {}", e)))?;

        insert
            .write(&row)
            .await
            .map_err(|e| Error::store(format!("Write error: {}", e)))?;

        insert
            .end()
            .await
            .map_err(|e| Error::store(format!("End error: {}", e)))?;

        metrics()
            .store_write_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        debug!(event_id = %event.id, event_type = %event.event_type, "Inserted event");
        Ok(event.id)
    }

    async fn query(
        &self,
        organization_id: Uuid,
        event_types: Option<&[EventType]>,
        range: &TimeRange,
    ) -> Result<Vec<Event>> {
        let start = std::time::Instant::now();

        let mut sql = String::from(
            "SELECT id, organization_id, user_id, session_id, type, source, \
             timestamp, processed_at, user_agent, ip, referrer, event_data \
             FROM growth.events \
             WHERE organization_id = ? AND timestamp >= fromUnixTimestamp64Milli(?)",
        );
        if range.end.is_some() {
            sql.push_str(" AND timestamp < fromUnixTimestamp64Milli(?)");
        }
        if event_types.is_some() {
            sql.push_str(" AND type IN ?");
        }
        sql.push_str(" ORDER BY timestamp ASC");

        let mut query = self
            .inner()
            .query(&sql)
            .bind(organization_id.to_string())
            .bind(range.start.timestamp_millis());
        if let Some(end) = range.end {
            query = query.bind(end.timestamp_millis());
        }
        if let Some(types) = event_types {
            let tags: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            query = query.bind(tags);
        }

        let rows: Vec<EventRow> = query
            .fetch_all()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))?;

        metrics()
            .store_query_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        rows.into_iter().map(EventRow::into_event).collect()
    }
}
