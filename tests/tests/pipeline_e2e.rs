//! End-to-end pipeline tests over the in-memory store.
//!
//! Tasks flow through the same dispatcher production wires up:
//! track_event → aggregate_metrics → generate_insights.

use chrono::{Duration, Utc};
use uuid::Uuid;

use growth_core::{
    EventType, Granularity, InsightKind, JourneyStage, MetricType, Severity, TimeRange,
};
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_track_aggregate_insights_flow() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();

    let now = Utc::now();
    let yesterday = now - Duration::days(1);

    // Yesterday: healthy volume.
    for i in 0..20 {
        let req = fixtures::track_request(
            EventType::PageView,
            Some(&format!("u-{}", i)),
            None,
            yesterday,
        );
        let result = ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await;
        assert!(result.success, "track failed: {:?}", result.error);
    }
    for i in 0..8 {
        let req = fixtures::track_request(
            EventType::UserSignup,
            Some(&format!("su-{}", i)),
            None,
            yesterday,
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }

    // Today: page views grow, signups collapse.
    for i in 0..30 {
        let req = fixtures::track_request(
            EventType::PageView,
            Some(&format!("u-{}", i)),
            None,
            now,
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }
    let req = fixtures::track_request(EventType::UserSignup, Some("su-99"), None, now);
    assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);

    // Ingest side effects: per-day counters and journey pointers.
    assert_eq!(
        ctx.store
            .daily_count(org, yesterday.date_naive(), MetricType::PageViews),
        20
    );
    assert_eq!(
        ctx.store
            .daily_count(org, yesterday.date_naive(), MetricType::Signups),
        8
    );
    assert_eq!(
        ctx.store.journey_stage(org, "u-0"),
        Some(JourneyStage::Awareness)
    );
    assert_eq!(
        ctx.store.journey_stage(org, "su-0"),
        Some(JourneyStage::Consideration)
    );

    // Aggregate the window.
    let range = TimeRange::new(now - Duration::days(3), now + Duration::days(1));
    let result = ctx
        .dispatcher
        .dispatch(fixtures::aggregate_task(org, Granularity::Daily, range))
        .await;
    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["periodsWritten"], 2);
    assert_eq!(data["eventsProcessed"], 59);

    let rows = ctx.store.aggregated_periods(org, Granularity::Daily);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].metric_count(MetricType::PageViews), 20);
    assert_eq!(rows[1].metric_count(MetricType::PageViews), 30);
    assert_eq!(rows[0].metric_count(MetricType::Signups), 8);
    assert_eq!(rows[1].metric_count(MetricType::Signups), 1);

    // Generate insights over the trailing week of aggregates.
    let result = ctx
        .dispatcher
        .dispatch(fixtures::insights_task(org, Granularity::Daily, None))
        .await;
    assert!(result.success);

    let report = ctx.store.insight_report(org).expect("report stored");
    assert!(!report.insights.is_empty());

    // Signups collapsed 8 → 1 (-87.5%): a critical alert leads the ranking.
    assert_eq!(report.insights[0].severity, Severity::Critical);
    assert_eq!(report.insights[0].kind, InsightKind::Alert);
    // Page views +50%: a key finding is present.
    assert!(report
        .insights
        .iter()
        .any(|i| i.kind == InsightKind::Trend && i.metric.as_deref() == Some("page_views")));
    // Zero conversions against live traffic: an opportunity is flagged.
    assert!(report
        .insights
        .iter()
        .any(|i| i.kind == InsightKind::Opportunity));
    assert_eq!(report.confidence, 75);
}

#[tokio::test]
async fn test_organizations_are_isolated() {
    let ctx = TestContext::new();
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();
    let ts = fixtures::at(2025, 3, 10, 9);

    let req = fixtures::track_request(EventType::PageView, Some("u-1"), None, ts);
    assert!(ctx.dispatcher.dispatch(fixtures::track_task(org_a, req)).await.success);

    let result = ctx
        .dispatcher
        .dispatch(fixtures::aggregate_task(
            org_b,
            Granularity::Daily,
            fixtures::march(),
        ))
        .await;
    assert!(result.success);
    assert_eq!(result.data.unwrap()["eventsProcessed"], 0);
    assert!(ctx.store.aggregated_periods(org_b, Granularity::Daily).is_empty());
}

#[tokio::test]
async fn test_rollup_failure_never_blocks_ingest() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    ctx.store.set_fail_rollups(true);

    let req = fixtures::track_request(
        EventType::PageView,
        Some("u-1"),
        Some("s-1"),
        fixtures::at(2025, 3, 10, 9),
    );
    let result = ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await;

    assert!(result.success);
    assert_eq!(ctx.store.event_count(), 1);
    assert!(!ctx.store.session_seen(org, "s-1"));
}
