//! Task submission endpoint.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use growth_core::{Task, TaskResult};

use crate::state::AppState;

/// POST /v1/tasks - Run one pipeline task.
///
/// The body always carries the result envelope; the HTTP status mirrors
/// the failure class (400 for validation, 500 for store failures).
/// Malformed bodies are rejected by the JSON extractor before reaching
/// the dispatcher.
pub async fn submit_task_handler(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> (StatusCode, Json<TaskResult>) {
    info!(
        organization_id = %task.organization_id,
        task = task.payload.name(),
        "Task submitted"
    );

    match state.dispatcher.execute(task).await {
        Ok(data) => (StatusCode::OK, Json(TaskResult::ok(data))),
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(TaskResult::failure(e.to_string())))
        }
    }
}
