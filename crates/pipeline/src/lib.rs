//! Analytics batch components and task dispatch for the growth pipeline.
//!
//! Each component is a bounded read → compute → bounded write job holding no
//! state between invocations. An external scheduler submits typed tasks
//! through [`Dispatcher::dispatch`]; concurrent runs are safe across
//! organizations, and within one organization because every derived write is
//! an idempotent upsert keyed by its bucket identity.

pub mod aggregate;
pub mod cohorts;
pub mod dispatcher;
pub mod funnel;
pub mod ingest;
pub mod insights;
pub mod trends;

pub use aggregate::{AggregateSummary, PeriodAggregator};
pub use cohorts::{CohortAnalyzer, CohortSummary};
pub use dispatcher::{Dispatcher, Stores};
pub use funnel::FunnelAnalyzer;
pub use ingest::{EventIngestor, IngestSummary};
pub use insights::{generate, InsightGenerator, InsightInputs};
pub use trends::calculate_trends;
