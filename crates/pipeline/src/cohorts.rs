//! Cohort analysis: retention at fixed age offsets and per-type conversion.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use growth_core::{
    bucket_key, bucket_start, Cohort, CohortRequest, CohortStore, ConversionPoint, Event,
    EventStore, Result, RetentionPoint, TimeRange, RETENTION_OFFSETS_DAYS,
};
use telemetry::metrics;

/// Outcome summary for one cohort run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    pub cohorts_written: usize,
    pub users_grouped: usize,
}

/// Groups users by formation bucket and measures retention and conversion.
pub struct CohortAnalyzer {
    events: Arc<dyn EventStore>,
    cohorts: Arc<dyn CohortStore>,
}

impl CohortAnalyzer {
    pub fn new(events: Arc<dyn EventStore>, cohorts: Arc<dyn CohortStore>) -> Self {
        Self { events, cohorts }
    }

    /// Analyzes cohorts formed within the request window.
    ///
    /// Cohort sizes are recomputed fresh from current formation events on
    /// every run; each cohort row replaces its stored predecessor.
    pub async fn run(
        &self,
        organization_id: Uuid,
        request: &CohortRequest,
    ) -> Result<CohortSummary> {
        let formation = self
            .events
            .query(
                organization_id,
                Some(std::slice::from_ref(&request.formation_event)),
                &request.range,
            )
            .await?;

        // Each user's cohort is the bucket of their first formation event.
        let mut formed_at: HashMap<String, DateTime<Utc>> = HashMap::new();
        for event in &formation {
            let Some(user_id) = event.user_id.as_deref() else {
                continue;
            };
            formed_at
                .entry(user_id.to_string())
                .and_modify(|t| {
                    if event.timestamp < *t {
                        *t = event.timestamp;
                    }
                })
                .or_insert(event.timestamp);
        }

        let mut cohort_members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (user_id, ts) in &formed_at {
            cohort_members
                .entry(bucket_key(*ts, request.granularity))
                .or_default()
                .push(user_id.clone());
        }

        // Conversions can land long after formation: no upper bound here.
        let conversions = self
            .events
            .query(
                organization_id,
                Some(&request.conversion_events),
                &TimeRange::since(request.range.start),
            )
            .await?;

        let mut user_conversions: HashMap<&str, Vec<&Event>> = HashMap::new();
        for event in &conversions {
            if let Some(user_id) = event.user_id.as_deref() {
                user_conversions.entry(user_id).or_default().push(event);
            }
        }

        let users_grouped = formed_at.len();
        let mut cohorts_written = 0;

        for (period, members) in &cohort_members {
            let cohort = build_cohort(period, request, members, &formed_at, &user_conversions);
            self.cohorts
                .upsert(organization_id, request.granularity, period, &cohort)
                .await?;
            metrics().cohorts_upserted.inc();
            cohorts_written += 1;
        }

        debug!(
            organization_id = %organization_id,
            granularity = %request.granularity,
            cohorts = cohorts_written,
            users = users_grouped,
            "Cohort analysis complete"
        );

        Ok(CohortSummary {
            cohorts_written,
            users_grouped,
        })
    }
}

/// Builds one cohort row.
fn build_cohort(
    period: &str,
    request: &CohortRequest,
    members: &[String],
    formed_at: &HashMap<String, DateTime<Utc>>,
    user_conversions: &HashMap<&str, Vec<&Event>>,
) -> Cohort {
    let cohort_size = members.len() as u64;

    // Age offsets anchor on the bucket's start date, not each member's own
    // formation time.
    let cohort_start = members
        .first()
        .and_then(|user| formed_at.get(user))
        .map(|ts| bucket_start(*ts, request.granularity))
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
        .and_utc();

    let mut retention = BTreeMap::new();
    for offset in RETENTION_OFFSETS_DAYS {
        let deadline = cohort_start + Duration::days(offset as i64);
        let retained_users = members
            .iter()
            .filter(|user| {
                user_conversions
                    .get(user.as_str())
                    .map_or(false, |events| events.iter().any(|e| e.timestamp <= deadline))
            })
            .count() as u64;

        retention.insert(
            offset,
            RetentionPoint {
                retained_users,
                retention_rate: ratio(retained_users, cohort_size),
            },
        );
    }

    let mut conversion_rates = BTreeMap::new();
    for target in &request.conversion_events {
        let converted_users = members
            .iter()
            .filter(|user| {
                let Some(formed) = formed_at.get(*user) else {
                    return false;
                };
                user_conversions.get(user.as_str()).map_or(false, |events| {
                    events
                        .iter()
                        .any(|e| e.event_type == *target && e.timestamp > *formed)
                })
            })
            .count() as u64;

        conversion_rates.insert(
            target.clone(),
            ConversionPoint {
                converted_users,
                conversion_rate: ratio(converted_users, cohort_size),
            },
        );
    }

    Cohort {
        cohort_period: period.to_string(),
        granularity: request.granularity,
        cohort_size,
        retention,
        conversion_rates,
    }
}

fn ratio(n: u64, d: u64) -> f64 {
    if d == 0 {
        0.0
    } else {
        n as f64 / d as f64
    }
}
