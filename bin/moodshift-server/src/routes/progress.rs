//! Progress-poll endpoint.
//!
//! `GET /progress/{task_id}` returns the task's current record; unknown ids
//! are a hard 404, never a stale or default record.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::ServerError;
use crate::state::{AppState, TaskEntry, TaskStatus};

#[derive(OpenApi)]
#[openapi(paths(get_progress))]
pub struct ProgressApi;

/// Register the poll route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/progress/{task_id}", get(get_progress))
}

/// Poll response for one task.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    pub percent: u8,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<TaskEntry> for ProgressResponse {
    fn from(entry: TaskEntry) -> Self {
        // The download link only appears once the output actually exists.
        let download_url = match (entry.status, &entry.filename) {
            (TaskStatus::Completed, Some(name)) => Some(format!("/download/{name}")),
            _ => None,
        };
        Self {
            percent: entry.percent,
            status: entry.status,
            filename: entry.filename,
            error: entry.error,
            download_url,
        }
    }
}

/// Current progress of a conversion (`GET /progress/{task_id}`).
#[utoipa::path(
    get,
    path = "/progress/{task_id}",
    tag = "progress",
    params(
        ("task_id" = String, Path, description = "Task id returned by the upload endpoint")
    ),
    responses(
        (status = 200, description = "Current task record", body = ProgressResponse),
        (status = 404, description = "Unknown task id"),
    )
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<ProgressResponse>, ServerError> {
    let entry = state
        .progress
        .get(&task_id)
        .ok_or_else(|| ServerError::NotFound(format!("task {task_id} not found")))?;
    Ok(Json(entry.into()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
