//! Funnel analysis with step conditioning.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use growth_core::{
    Error, EventStore, EventType, FunnelReport, FunnelRequest, FunnelStep, MajorDropoff, Result,
    MAJOR_DROPOFF_THRESHOLD,
};

/// Measures how many sessions reach each funnel step and the
/// step-to-step drop-off.
pub struct FunnelAnalyzer {
    events: Arc<dyn EventStore>,
}

impl FunnelAnalyzer {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Runs one funnel over the request window.
    ///
    /// Events group by session id, falling back to user id when a session
    /// id is absent. Step conversion is conditioned on the previous step:
    /// `conversion_from_previous` counts sessions containing both event
    /// types, which intentionally differs from raw per-step reach.
    pub async fn run(
        &self,
        organization_id: Uuid,
        request: &FunnelRequest,
    ) -> Result<FunnelReport> {
        if request.steps.is_empty() {
            return Err(Error::invalid_task("funnel needs at least one step"));
        }

        let events = self
            .events
            .query(organization_id, Some(&request.steps), &request.range)
            .await?;

        let mut sessions: HashMap<&str, HashSet<&EventType>> = HashMap::new();
        for event in &events {
            let Some(key) = event.session_id.as_deref().or(event.user_id.as_deref()) else {
                continue;
            };
            sessions.entry(key).or_default().insert(&event.event_type);
        }

        let total_sessions = sessions.len() as u64;

        let reached: Vec<u64> = request
            .steps
            .iter()
            .map(|step| sessions.values().filter(|set| set.contains(step)).count() as u64)
            .collect();

        let mut steps = Vec::with_capacity(request.steps.len());
        for (i, step) in request.steps.iter().enumerate() {
            let sessions_reached = reached[i];
            let conversion_rate = if total_sessions == 0 {
                0.0
            } else {
                sessions_reached as f64 / total_sessions as f64
            };

            let conversion_from_previous = if i == 0 {
                sessions_reached
            } else {
                let previous = &request.steps[i - 1];
                sessions
                    .values()
                    .filter(|set| set.contains(step) && set.contains(previous))
                    .count() as u64
            };

            // Nothing to drop from when the previous step reached nobody.
            let dropoff_rate = if i == 0 || reached[i - 1] == 0 {
                0.0
            } else {
                1.0 - conversion_from_previous as f64 / reached[i - 1] as f64
            };

            steps.push(FunnelStep {
                step_name: step.as_str().to_string(),
                step_number: i + 1,
                sessions_reached,
                conversion_rate,
                conversion_from_previous,
                dropoff_rate,
            });
        }

        let mut major_dropoffs: Vec<MajorDropoff> = steps
            .iter()
            .filter(|s| s.dropoff_rate > MAJOR_DROPOFF_THRESHOLD)
            .map(|s| MajorDropoff {
                step_number: s.step_number,
                step_name: s.step_name.clone(),
                dropoff_rate: s.dropoff_rate,
            })
            .collect();
        major_dropoffs.sort_by(|a, b| {
            b.dropoff_rate
                .partial_cmp(&a.dropoff_rate)
                .unwrap_or(Ordering::Equal)
        });

        debug!(
            organization_id = %organization_id,
            steps = steps.len(),
            total_sessions,
            major_dropoffs = major_dropoffs.len(),
            "Funnel analysis complete"
        );

        Ok(FunnelReport {
            steps,
            total_sessions,
            major_dropoffs,
        })
    }
}
