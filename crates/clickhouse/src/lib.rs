//! ClickHouse-backed stores for the growth pipeline.
//!
//! Implements the core store traits over one HTTP client. Upserts ride the
//! table engines: ReplacingMergeTree rows keyed by their bucket identity
//! replace on merge (reads use FINAL), and the additive daily counters are
//! a SummingMergeTree.

pub mod aggregates;
pub mod client;
pub mod config;
pub mod events;
pub mod health;
pub mod rollups;
pub mod schema;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use schema::init_schema;
