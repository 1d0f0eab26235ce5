//! Typed task dispatch to the pipeline components.

use std::sync::Arc;

use tracing::{debug, error};

use growth_core::{
    AggregateStore, CohortStore, EventStore, InsightStore, Result, RollupStore, Task, TaskPayload,
    TaskResult,
};
use telemetry::metrics;

use crate::aggregate::PeriodAggregator;
use crate::cohorts::CohortAnalyzer;
use crate::funnel::FunnelAnalyzer;
use crate::ingest::EventIngestor;
use crate::insights::InsightGenerator;

/// Store handles wired into the components.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub aggregates: Arc<dyn AggregateStore>,
    pub cohorts: Arc<dyn CohortStore>,
    pub insights: Arc<dyn InsightStore>,
    pub rollups: Arc<dyn RollupStore>,
}

impl Stores {
    /// Wires every interface to one backend implementing them all.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: EventStore + AggregateStore + CohortStore + InsightStore + RollupStore + 'static,
    {
        Self {
            events: backend.clone(),
            aggregates: backend.clone(),
            cohorts: backend.clone(),
            insights: backend.clone(),
            rollups: backend,
        }
    }
}

/// Routes each task to its component and wraps the outcome.
pub struct Dispatcher {
    ingestor: EventIngestor,
    aggregator: PeriodAggregator,
    cohort_analyzer: CohortAnalyzer,
    funnel_analyzer: FunnelAnalyzer,
    insight_generator: InsightGenerator,
}

impl Dispatcher {
    pub fn new(stores: Stores) -> Self {
        Self {
            ingestor: EventIngestor::new(stores.events.clone(), stores.rollups.clone()),
            aggregator: PeriodAggregator::new(stores.events.clone(), stores.aggregates.clone()),
            cohort_analyzer: CohortAnalyzer::new(stores.events.clone(), stores.cohorts.clone()),
            funnel_analyzer: FunnelAnalyzer::new(stores.events.clone()),
            insight_generator: InsightGenerator::new(
                stores.aggregates,
                stores.cohorts,
                stores.insights,
            ),
        }
    }

    /// Runs one task to completion and wraps the outcome in the result
    /// envelope.
    ///
    /// Component failures become `success: false`; buckets already written
    /// before the failure stay valid, and a retry of the whole task is safe
    /// because every write is a keyed upsert.
    pub async fn dispatch(&self, task: Task) -> TaskResult {
        match self.execute(task).await {
            Ok(data) => TaskResult::ok(data),
            Err(e) => TaskResult::failure(e.to_string()),
        }
    }

    /// Runs one task, returning the raw outcome for callers that need the
    /// error class (the HTTP layer maps it to a status).
    pub async fn execute(&self, task: Task) -> Result<serde_json::Value> {
        let start = std::time::Instant::now();
        metrics().tasks_dispatched.inc();

        let task_name = task.payload.name();
        let organization_id = task.organization_id;

        let outcome = self.run_task(task).await;

        metrics()
            .task_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match &outcome {
            Ok(_) => {
                debug!(organization_id = %organization_id, task = task_name, "Task complete");
            }
            Err(e) => {
                metrics().task_failures.inc();
                error!(
                    organization_id = %organization_id,
                    task = task_name,
                    error = %e,
                    "Task failed"
                );
            }
        }

        outcome
    }

    async fn run_task(&self, task: Task) -> Result<serde_json::Value> {
        let organization_id = task.organization_id;

        match task.payload {
            TaskPayload::TrackEvent(request) => {
                let summary = self.ingestor.ingest(organization_id, request).await?;
                Ok(serde_json::to_value(summary)?)
            }
            TaskPayload::AggregateMetrics(request) => {
                let summary = self
                    .aggregator
                    .run(organization_id, &request.range, request.granularity)
                    .await?;
                Ok(serde_json::to_value(summary)?)
            }
            TaskPayload::CalculateCohorts(request) => {
                let summary = self.cohort_analyzer.run(organization_id, &request).await?;
                Ok(serde_json::to_value(summary)?)
            }
            TaskPayload::ProcessFunnel(request) => {
                let report = self.funnel_analyzer.run(organization_id, &request).await?;
                Ok(serde_json::to_value(report)?)
            }
            TaskPayload::GenerateInsights(request) => {
                let report = self.insight_generator.run(organization_id, &request).await?;
                Ok(serde_json::to_value(report)?)
            }
        }
    }
}
