//! Standardized API responses.
//!
//! Task outcomes ride the core result envelope; only the health payload
//! is api-specific.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub tasks_dispatched: u64,
    pub task_failures: u64,
}
