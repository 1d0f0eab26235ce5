//! Internal telemetry for the growth pipeline.
//!
//! In-process counters and histograms that are snapshotted on demand, plus
//! the health registry behind the readiness probes.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
