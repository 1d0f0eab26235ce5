//! Cohort and funnel scenarios end to end.

use chrono::Duration;
use uuid::Uuid;

use growth_core::{EventType, FunnelReport, Granularity, InsightKind, TimeRange};
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_cohort_day_30_retention_scenario() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    let day0 = fixtures::at(2025, 1, 6, 9);

    // 50 users sign up on day 0; 20 subscribe within 30 days.
    for i in 0..50 {
        let req = fixtures::track_request(
            EventType::UserSignup,
            Some(&format!("u-{}", i)),
            None,
            day0,
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }
    for i in 0..20 {
        let req = fixtures::track_request(
            EventType::SubscriptionCreated,
            Some(&format!("u-{}", i)),
            None,
            day0 + Duration::days(12),
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }

    let range = TimeRange::new(fixtures::at(2025, 1, 1, 0), fixtures::at(2025, 2, 1, 0));
    let result = ctx
        .dispatcher
        .dispatch(fixtures::cohort_task(
            org,
            Granularity::Daily,
            range,
            vec![EventType::SubscriptionCreated],
        ))
        .await;
    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["cohortsWritten"], 1);
    assert_eq!(data["usersGrouped"], 50);

    let rows = ctx.store.cohort_rows(org, Granularity::Daily);
    assert_eq!(rows.len(), 1);
    let cohort = &rows[0];
    assert_eq!(cohort.cohort_period, "2025-01-06");
    assert_eq!(cohort.cohort_size, 50);

    let day30 = &cohort.retention[&30];
    assert_eq!(day30.retained_users, 20);
    assert_eq!(day30.retention_rate, 0.4);

    // Every retention offset is populated and finite.
    for offset in [7u32, 30, 90, 180, 365] {
        assert!(cohort.retention[&offset].retention_rate.is_finite());
    }

    let conv = &cohort.conversion_rates[&EventType::SubscriptionCreated];
    assert_eq!(conv.converted_users, 20);
    assert_eq!(conv.conversion_rate, 0.4);
}

#[tokio::test]
async fn test_cohort_rerun_replaces_rows() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    let day0 = fixtures::at(2025, 1, 6, 9);

    for i in 0..5 {
        let req = fixtures::track_request(
            EventType::UserSignup,
            Some(&format!("u-{}", i)),
            None,
            day0,
        );
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    }

    let range = TimeRange::new(fixtures::at(2025, 1, 1, 0), fixtures::at(2025, 2, 1, 0));
    let task = fixtures::cohort_task(org, Granularity::Daily, range, vec![
        EventType::SubscriptionCreated,
    ]);

    assert!(ctx.dispatcher.dispatch(task.clone()).await.success);
    let first = ctx.store.cohort_rows(org, Granularity::Daily);

    // A late-arriving signup lands in the same bucket; the re-run replaces
    // the row with the fresh size rather than stacking a second one.
    let req = fixtures::track_request(EventType::UserSignup, Some("u-99"), None, day0);
    assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
    assert!(ctx.dispatcher.dispatch(task).await.success);
    let second = ctx.store.cohort_rows(org, Granularity::Daily);

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].cohort_size, 5);
    assert_eq!(second[0].cohort_size, 6);
}

#[tokio::test]
async fn test_funnel_scenario_and_insight_handoff() {
    let ctx = TestContext::new();
    let org = Uuid::new_v4();
    let ts = fixtures::at(2025, 3, 10, 10);

    // 50 sessions view, 20 of them sign up, 5 of those purchase.
    for i in 0..50 {
        let session = format!("s-{}", i);
        let req = fixtures::track_request(EventType::PageView, None, Some(&session), ts);
        assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);

        if i < 20 {
            let req = fixtures::track_request(EventType::UserSignup, None, Some(&session), ts);
            assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
        }
        if i < 5 {
            let req =
                fixtures::track_request(EventType::PurchaseCompleted, None, Some(&session), ts);
            assert!(ctx.dispatcher.dispatch(fixtures::track_task(org, req)).await.success);
        }
    }

    let steps = vec![
        EventType::PageView,
        EventType::UserSignup,
        EventType::PurchaseCompleted,
    ];
    let result = ctx
        .dispatcher
        .dispatch(fixtures::funnel_task(org, steps, fixtures::march()))
        .await;
    assert!(result.success);

    let report: FunnelReport = serde_json::from_value(result.data.unwrap()).unwrap();
    assert_eq!(report.total_sessions, 50);
    assert_eq!(report.steps[0].sessions_reached, 50);
    assert_eq!(report.steps[1].conversion_from_previous, 20);
    assert!((report.steps[1].dropoff_rate - 0.6).abs() < 1e-9);
    assert_eq!(report.steps[2].conversion_from_previous, 5);
    assert!((report.steps[2].dropoff_rate - 0.75).abs() < 1e-9);

    // Conditioning invariants.
    assert_eq!(
        report.steps[0].conversion_from_previous,
        report.steps[0].sessions_reached
    );
    for pair in report.steps.windows(2) {
        assert!(pair[1].conversion_from_previous <= pair[0].sessions_reached);
    }

    // Both drop-offs are major, steepest first.
    assert_eq!(report.major_dropoffs.len(), 2);
    assert_eq!(report.major_dropoffs[0].step_number, 3);

    // Hand the precomputed report to insight generation.
    let result = ctx
        .dispatcher
        .dispatch(fixtures::insights_task(org, Granularity::Daily, Some(report)))
        .await;
    assert!(result.success);

    let insight_report = ctx.store.insight_report(org).expect("report stored");
    let recommendations: Vec<_> = insight_report
        .insights
        .iter()
        .filter(|i| i.kind == InsightKind::Recommendation)
        .collect();
    assert_eq!(recommendations.len(), 2);
}
