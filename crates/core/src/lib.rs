//! Core types, bucketing, and store interfaces for the growth pipeline.

pub mod bucket;
pub mod cohort;
pub mod error;
pub mod event;
pub mod funnel;
pub mod insight;
pub mod limits;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod task;
pub mod trend;

pub use bucket::*;
pub use cohort::*;
pub use error::{Error, Result};
pub use event::*;
pub use funnel::*;
pub use insight::*;
pub use memory::MemoryStore;
pub use metrics::*;
pub use store::*;
pub use task::*;
pub use trend::*;
