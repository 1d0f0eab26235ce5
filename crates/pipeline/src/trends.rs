//! Trend calculation between adjacent aggregated periods.

use growth_core::{AggregatedPeriod, Trend, TrendDirection};

/// Computes period-over-period trends for an ascending run of rows.
///
/// A metric only yields a trend when the previous bucket saw it; cold-start
/// metrics (previous count 0) are skipped for that period rather than
/// reported as infinite growth.
pub fn calculate_trends(periods: &[AggregatedPeriod]) -> Vec<Trend> {
    let mut trends = Vec::new();

    for pair in periods.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);

        for (metric, stat) in &current.metrics {
            let prev = previous.metric_count(*metric);
            if prev == 0 {
                continue;
            }

            let change = (stat.count as f64 - prev as f64) / prev as f64 * 100.0;
            trends.push(Trend {
                metric_type: *metric,
                period: current.period.clone(),
                change_percentage: change,
                direction: TrendDirection::from_change(change),
            });
        }
    }

    trends
}
