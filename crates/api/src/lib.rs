//! HTTP task boundary for the growth pipeline.
//!
//! One route accepts the typed task payload and returns the result
//! envelope. Callers authenticate and isolate tenants before invoking;
//! there is no auth surface here.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
