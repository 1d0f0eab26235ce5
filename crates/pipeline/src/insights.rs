//! Heuristic insight generation over precomputed analytics outputs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use growth_core::{
    AggregateStore, AggregatedPeriod, Cohort, CohortStore, FunnelReport, Granularity, Insight,
    InsightKind, InsightReport, InsightRequest, InsightStore, MetricType, Result, Severity,
    TimeRange, Trend,
};
use telemetry::metrics;

use crate::trends::calculate_trends;

/// Period-over-period growth that makes a metric a key finding (+25%).
pub const GROWTH_FINDING_PCT: f64 = 25.0;

/// Decline past which a metric raises an alert (-10%).
pub const DECLINE_ALERT_PCT: f64 = -10.0;

/// Volume falling to less than half its previous level (-50%) escalates
/// the alert to critical.
pub const CRITICAL_DECLINE_PCT: f64 = -50.0;

/// Floor under which a rate-like metric becomes an opportunity (2%).
pub const RATE_OPPORTUNITY_FLOOR: f64 = 0.02;

/// Everything the generator consumes. Any empty category simply yields no
/// findings of that kind; nothing here can fail.
#[derive(Debug, Clone, Default)]
pub struct InsightInputs {
    pub periods: Vec<AggregatedPeriod>,
    pub trends: Vec<Trend>,
    pub cohorts: Vec<Cohort>,
    pub funnel: Option<FunnelReport>,
}

/// Generates the ranked insight report from fixed thresholds.
pub fn generate(inputs: &InsightInputs) -> InsightReport {
    let mut insights = Vec::new();

    for trend in &inputs.trends {
        if trend.change_percentage > GROWTH_FINDING_PCT {
            insights.push(Insight {
                kind: InsightKind::Trend,
                metric: Some(trend.metric_type.to_string()),
                message: format!(
                    "{} grew {:.1}% in {}",
                    trend.metric_type, trend.change_percentage, trend.period
                ),
                severity: Severity::Info,
                priority: 60,
            });
        } else if trend.change_percentage <= CRITICAL_DECLINE_PCT {
            insights.push(Insight {
                kind: InsightKind::Alert,
                metric: Some(trend.metric_type.to_string()),
                message: format!(
                    "{} fell {:.1}% in {}, to less than half its previous level",
                    trend.metric_type,
                    trend.change_percentage.abs(),
                    trend.period
                ),
                severity: Severity::Critical,
                priority: 90,
            });
        } else if trend.change_percentage < DECLINE_ALERT_PCT {
            insights.push(Insight {
                kind: InsightKind::Alert,
                metric: Some(trend.metric_type.to_string()),
                message: format!(
                    "{} declined {:.1}% in {}",
                    trend.metric_type,
                    trend.change_percentage.abs(),
                    trend.period
                ),
                severity: Severity::High,
                priority: 70,
            });
        }
    }

    if let Some(latest) = inputs.periods.last() {
        // A 0% rate with no page views is absence of traffic, not a lead.
        if latest.metric_count(MetricType::PageViews) > 0
            && latest.key_metrics.conversion_rate < RATE_OPPORTUNITY_FLOOR
        {
            insights.push(Insight {
                kind: InsightKind::Opportunity,
                metric: Some("conversion_rate".to_string()),
                message: format!(
                    "Conversion rate {:.2}% in {} sits below the {:.0}% floor",
                    latest.key_metrics.conversion_rate * 100.0,
                    latest.period,
                    RATE_OPPORTUNITY_FLOOR * 100.0
                ),
                severity: Severity::Warning,
                priority: 50,
            });
        }
    }

    for cohort in &inputs.cohorts {
        for (event_type, point) in &cohort.conversion_rates {
            if cohort.cohort_size > 0 && point.conversion_rate < RATE_OPPORTUNITY_FLOOR {
                insights.push(Insight {
                    kind: InsightKind::Opportunity,
                    metric: Some(event_type.as_str().to_string()),
                    message: format!(
                        "Cohort {} converts only {:.2}% into {}",
                        cohort.cohort_period,
                        point.conversion_rate * 100.0,
                        event_type
                    ),
                    severity: Severity::Warning,
                    priority: 40,
                });
            }
        }
    }

    if let Some(funnel) = &inputs.funnel {
        for drop in &funnel.major_dropoffs {
            insights.push(Insight {
                kind: InsightKind::Recommendation,
                metric: Some(drop.step_name.clone()),
                message: format!(
                    "Funnel step {} ({}) loses {:.0}% of sessions from the previous step",
                    drop.step_number,
                    drop.step_name,
                    drop.dropoff_rate * 100.0
                ),
                severity: Severity::Warning,
                priority: 55,
            });
        }
    }

    // Most severe first, priority breaking ties within a band.
    insights.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.priority.cmp(&a.priority))
    });

    let categories = [
        InsightKind::Trend,
        InsightKind::Opportunity,
        InsightKind::Alert,
        InsightKind::Recommendation,
    ];
    let nonempty = categories
        .iter()
        .filter(|kind| insights.iter().any(|i| i.kind == **kind))
        .count() as u32;
    let confidence = (nonempty * 25).min(100);

    InsightReport {
        insights,
        confidence,
    }
}

/// Insight task runner: reads recent history, generates, stores the report.
pub struct InsightGenerator {
    aggregates: Arc<dyn AggregateStore>,
    cohorts: Arc<dyn CohortStore>,
    insights: Arc<dyn InsightStore>,
}

impl InsightGenerator {
    pub fn new(
        aggregates: Arc<dyn AggregateStore>,
        cohorts: Arc<dyn CohortStore>,
        insights: Arc<dyn InsightStore>,
    ) -> Self {
        Self {
            aggregates,
            cohorts,
            insights,
        }
    }

    /// Generates and stores the report for one organization.
    ///
    /// Trends are recomputed in-process from the trailing aggregate rows;
    /// the funnel report, when wanted, arrives precomputed in the request.
    pub async fn run(
        &self,
        organization_id: Uuid,
        request: &InsightRequest,
    ) -> Result<InsightReport> {
        let lookback = lookback_range(request.granularity, request.lookback_periods);
        let periods = self
            .aggregates
            .query(organization_id, request.granularity, &lookback)
            .await?;
        let trends = calculate_trends(&periods);
        let cohorts = self.cohorts.query(organization_id, request.granularity).await?;

        let report = generate(&InsightInputs {
            periods,
            trends,
            cohorts,
            funnel: request.funnel.clone(),
        });

        self.insights.upsert(organization_id, &report).await?;
        metrics()
            .insights_generated
            .inc_by(report.insights.len() as u64);

        debug!(
            organization_id = %organization_id,
            insights = report.insights.len(),
            confidence = report.confidence,
            "Insight generation complete"
        );

        Ok(report)
    }
}

fn lookback_range(granularity: Granularity, periods: u32) -> TimeRange {
    let days_per_bucket = match granularity {
        Granularity::Daily => 1,
        Granularity::Weekly => 7,
        Granularity::Monthly => 31,
    };
    TimeRange::since(Utc::now() - Duration::days(days_per_bucket * periods as i64))
}
