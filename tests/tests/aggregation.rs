//! Aggregation idempotency and bucketing properties.

use uuid::Uuid;

use growth_core::{EventType, Granularity, MetricType, TimeRange};
use integration_tests::{fixtures, setup::TestContext};
use pipeline::calculate_trends;

async fn seed(ctx: &TestContext, org: Uuid) {
    // Two days of traffic in March.
    for i in 0..10 {
        let req = fixtures::track_request(
            EventType::PageView,
            Some(&format!("u-{}", i)),
            None,
            fixtures::at(2025, 3, 10, 9),
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }
    for i in 0..4 {
        let req = fixtures::track_request(
            EventType::UserSignup,
            Some(&format!("u-{}", i)),
            None,
            fixtures::at(2025, 3, 11, 14),
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }
}

#[tokio::test]
async fn test_rerun_produces_identical_rows() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    seed(&ctx, org).await;

    let run = fixtures::aggregate_task(org, Granularity::Daily, fixtures::march());
    assert!(ctx.dispatcher.dispatch(run.clone()).await.success);
    let first = ctx.store.aggregated_periods(org, Granularity::Daily);

    assert!(ctx.dispatcher.dispatch(run).await.success);
    let second = ctx.store.aggregated_periods(org, Granularity::Daily);

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_overlapping_rerun_does_not_double_count() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    seed(&ctx, org).await;

    assert!(ctx
        .dispatcher
        .dispatch(fixtures::aggregate_task(org, Granularity::Daily, fixtures::march()))
        .await
        .success);

    // A narrower overlapping window recomputes the touched buckets in full.
    let overlap = TimeRange::new(fixtures::at(2025, 3, 10, 0), fixtures::at(2025, 3, 11, 0));
    assert!(ctx
        .dispatcher
        .dispatch(fixtures::aggregate_task(org, Granularity::Daily, overlap))
        .await
        .success);

    let rows = ctx.store.aggregated_periods(org, Granularity::Daily);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].period, "2025-03-10");
    assert_eq!(rows[0].metric_count(MetricType::PageViews), 10);
    assert_eq!(rows[0].key_metrics.total_events, 10);
}

#[tokio::test]
async fn test_insertion_order_is_irrelevant() {
    let ctx = TestContext::new();
    let forward = Uuid::new_v4();
    let reversed = Uuid::new_v4();

    let timestamps = [
        fixtures::at(2025, 3, 10, 8),
        fixtures::at(2025, 3, 10, 12),
        fixtures::at(2025, 3, 10, 23),
    ];

    for ts in timestamps {
        let req = fixtures::track_request(EventType::PageView, Some("u-1"), None, ts);
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(forward, req)).await.success);
    }
    for ts in timestamps.iter().rev() {
        let req = fixtures::track_request(EventType::PageView, Some("u-1"), None, *ts);
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(reversed, req)).await.success);
    }

    for org in [forward, reversed] {
        assert!(ctx
            .dispatcher
            .dispatch(fixtures::aggregate_task(org, Granularity::Daily, fixtures::march()))
            .await
            .success);
    }

    let a = ctx.store.aggregated_periods(forward, Granularity::Daily);
    let b = ctx.store.aggregated_periods(reversed, Granularity::Daily);
    assert_eq!(a, b);
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].period, "2025-03-10");
}

#[tokio::test]
async fn test_monthly_rollup_spans_days() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    seed(&ctx, org).await;

    assert!(ctx
        .dispatcher
        .dispatch(fixtures::aggregate_task(org, Granularity::Monthly, fixtures::march()))
        .await
        .success);

    let rows = ctx.store.aggregated_periods(org, Granularity::Monthly);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].period, "2025-03");
    assert_eq!(rows[0].key_metrics.total_events, 14);
    assert_eq!(rows[0].key_metrics.unique_users, 10);
}

#[tokio::test]
async fn test_trend_omission_over_stored_rows() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    seed(&ctx, org).await;

    // Day one has no signups; day two introduces them.
    assert!(ctx
        .dispatcher
        .dispatch(fixtures::aggregate_task(org, Granularity::Daily, fixtures::march()))
        .await
        .success);

    let rows = ctx.store.aggregated_periods(org, Granularity::Daily);
    let trends = calculate_trends(&rows);

    // Signups had previous value 0: no trend entry may exist for them.
    assert!(trends.iter().all(|t| t.metric_type != MetricType::Signups));
    // Page views are absent from the second bucket entirely, so they yield
    // no entry either; the pair trends nothing at all.
    assert!(trends.is_empty());
}
