//! Derived rows: period metrics, cohorts, and insights.
//!
//! Upserts are plain inserts versioned by `computed_at`; the
//! ReplacingMergeTree engines collapse rows sharing an upsert key and
//! reads go through FINAL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use growth_core::{
    bucket_key, AggregateStore, AggregatedPeriod, Cohort, CohortStore, ConversionPoint, Error,
    EventType, Granularity, InsightReport, InsightStore, KeyMetrics, MetricStat, MetricType,
    Result, RetentionPoint, TimeRange,
};
use telemetry::metrics;

use crate::client::ClickHouseClient;

/// Row for the growth.period_metrics table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct PeriodRow {
    pub organization_id: String,
    pub granularity: String,
    pub period: String,
    /// JSON map of metric name -> stat
    pub metrics: String,
    pub total_events: u64,
    pub unique_users: u64,
    pub conversion_rate: f64,
    pub computed_at: i64,
}

impl PeriodRow {
    fn new(organization_id: Uuid, row: &AggregatedPeriod) -> Result<Self> {
        Ok(Self {
            organization_id: organization_id.to_string(),
            granularity: row.granularity.as_str().to_string(),
            period: row.period.clone(),
            metrics: serde_json::to_string(&row.metrics)?,
            total_events: row.key_metrics.total_events,
            unique_users: row.key_metrics.unique_users,
            conversion_rate: row.key_metrics.conversion_rate,
            computed_at: Utc::now().timestamp_millis(),
        })
    }

    fn into_period(self) -> Result<AggregatedPeriod> {
        let granularity = Granularity::parse(&self.granularity)
            .ok_or_else(|| Error::store(format!("bad granularity {}", self.granularity)))?;
        let metrics: BTreeMap<MetricType, MetricStat> = serde_json::from_str(&self.metrics)?;

        Ok(AggregatedPeriod {
            period: self.period,
            granularity,
            metrics,
            key_metrics: KeyMetrics {
                total_events: self.total_events,
                unique_users: self.unique_users,
                conversion_rate: self.conversion_rate,
            },
        })
    }
}

/// Row for the growth.cohorts table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct CohortRow {
    pub organization_id: String,
    pub granularity: String,
    pub cohort_period: String,
    pub cohort_size: u64,
    /// JSON map of age offset days -> retention point
    pub retention: String,
    /// JSON map of event type -> conversion point
    pub conversion_rates: String,
    pub computed_at: i64,
}

impl CohortRow {
    fn new(organization_id: Uuid, cohort: &Cohort) -> Result<Self> {
        Ok(Self {
            organization_id: organization_id.to_string(),
            granularity: cohort.granularity.as_str().to_string(),
            cohort_period: cohort.cohort_period.clone(),
            cohort_size: cohort.cohort_size,
            retention: serde_json::to_string(&cohort.retention)?,
            conversion_rates: serde_json::to_string(&cohort.conversion_rates)?,
            computed_at: Utc::now().timestamp_millis(),
        })
    }

    fn into_cohort(self) -> Result<Cohort> {
        let granularity = Granularity::parse(&self.granularity)
            .ok_or_else(|| Error::store(format!("bad granularity {}", self.granularity)))?;
        let retention: BTreeMap<u32, RetentionPoint> = serde_json::from_str(&self.retention)?;
        let conversion_rates: BTreeMap<EventType, ConversionPoint> =
            serde_json::from_str(&self.conversion_rates)?;

        Ok(Cohort {
            cohort_period: self.cohort_period,
            granularity,
            cohort_size: self.cohort_size,
            retention,
            conversion_rates,
        })
    }
}

/// Row for the growth.insights table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct InsightRow {
    pub organization_id: String,
    /// JSON-encoded report
    pub report: String,
    pub confidence: u32,
    pub generated_at: i64,
}

async fn write_row<R: Row + Serialize>(
    client: &ClickHouseClient,
    table: &str,
    row: &R,
) -> Result<()> {
    let start = std::time::Instant::now();

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

    metrics()
        .store_write_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(())
}

#[async_trait]
impl AggregateStore for ClickHouseClient {
    async fn upsert(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        period: &str,
        row: &AggregatedPeriod,
    ) -> Result<()> {
        let row = PeriodRow::new(organization_id, row)?;
        write_row(self, "growth.period_metrics", &row).await?;

        debug!(
            organization_id = %organization_id,
            granularity = %granularity,
            period = period,
            "Upserted period metrics"
        );
        Ok(())
    }

    async fn query(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        range: &TimeRange,
    ) -> Result<Vec<AggregatedPeriod>> {
        let low = bucket_key(range.start, granularity);
        // Half-open: the high bucket is the one holding the last included instant.
        let high = range
            .end
            .map(|end| bucket_key(end - chrono::Duration::milliseconds(1), granularity));

        let mut sql = String::from(
            "SELECT organization_id, granularity, period, metrics, total_events, \
             unique_users, conversion_rate, computed_at \
             FROM growth.period_metrics FINAL \
             WHERE organization_id = ? AND granularity = ? AND period >= ?",
        );
        if high.is_some() {
            sql.push_str(" AND period <= ?");
        }
        sql.push_str(" ORDER BY period ASC");

        let mut query = self
            .inner()
            .query(&sql)
            .bind(organization_id.to_string())
            .bind(granularity.as_str())
            .bind(low);
        if let Some(high) = high {
            query = query.bind(high);
        }

        let rows: Vec<PeriodRow> = query
            .fetch_all()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))?;

        rows.into_iter().map(PeriodRow::into_period).collect()
    }
}

#[async_trait]
impl CohortStore for ClickHouseClient {
    async fn upsert(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
        period: &str,
        cohort: &Cohort,
    ) -> Result<()> {
        let row = CohortRow::new(organization_id, cohort)?;
        write_row(self, "growth.cohorts", &row).await?;

        debug!(
            organization_id = %organization_id,
            granularity = %granularity,
            cohort_period = period,
            "Upserted cohort"
        );
        Ok(())
    }

    async fn query(
        &self,
        organization_id: Uuid,
        granularity: Granularity,
    ) -> Result<Vec<Cohort>> {
        let rows: Vec<CohortRow> = self
            .inner()
            .query(
                "SELECT organization_id, granularity, cohort_period, cohort_size, \
                 retention, conversion_rates, computed_at \
                 FROM growth.cohorts FINAL \
                 WHERE organization_id = ? AND granularity = ? \
                 ORDER BY cohort_period ASC",
            )
            .bind(organization_id.to_string())
            .bind(granularity.as_str())
            .fetch_all()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))?;

        rows.into_iter().map(CohortRow::into_cohort).collect()
    }
}

#[async_trait]
impl InsightStore for ClickHouseClient {
    async fn upsert(&self, organization_id: Uuid, report: &InsightReport) -> Result<()> {
        let row = InsightRow {
            organization_id: organization_id.to_string(),
            report: serde_json::to_string(report)?,
            confidence: report.confidence,
            generated_at: Utc::now().timestamp_millis(),
        };
        write_row(self, "growth.insights", &row).await?;

        debug!(
            organization_id = %organization_id,
            insights = report.insights.len(),
            "Upserted insight report"
        );
        Ok(())
    }
}
