//! Upload endpoint – accepts an audio file and starts a conversion task.
//!
//! `POST /convert/{category}` with a multipart `file` field.  All request
//! validation (category, filename, extension allow-list, size cap) happens
//! before any task record or temp file exists, so a rejected upload leaves
//! no trace.  On acceptance the job runner takes over and the client polls
//! `GET /progress/{task_id}`.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use moodshift_audio::Preset;

use crate::error::ServerError;
use crate::jobs::{self, JobSpec};
use crate::state::AppState;

/// Upload extensions the decoder supports.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "flac"];

#[derive(OpenApi)]
#[openapi(paths(convert))]
pub struct ConvertApi;

/// Register the upload route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/convert/{category}", post(convert))
}

/// Accepted-upload response: the task id plus where to poll it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConvertAccepted {
    pub task_id: String,
    pub status_url: String,
}

/// Start an audio conversion (`POST /convert/{category}`).
///
/// Accepts a multipart `file` field, validates it, persists it to the
/// upload directory and spawns a background conversion job.  Returns
/// `{task_id, status_url}` immediately; progress is polled, never pushed.
#[utoipa::path(
    post,
    path = "/convert/{category}",
    tag = "convert",
    params(
        ("category" = String, Path, description = "Transform preset: lofi, phonk, melody or 8d")
    ),
    request_body(content = Vec<u8>, description = "multipart/form-data with a `file` field"),
    responses(
        (status = 200, description = "Task accepted", body = ConvertAccepted),
        (status = 400, description = "Unknown category, missing file or disallowed extension"),
        (status = 503, description = "Worker pool and queue are saturated"),
    )
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ConvertAccepted>, ServerError> {
    let preset: Preset = category.parse().map_err(|_| {
        ServerError::BadRequest(format!(
            "unknown category '{category}'; expected one of lofi, phonk, melody, 8d"
        ))
    })?;

    // ── Extract and validate the upload before anything is created ───────────
    let max_bytes = state.config.max_upload_bytes();
    let mut file_bytes: Vec<u8> = Vec::new();
    let mut file_name = String::new();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        ServerError::BadRequest(format!("failed to read multipart field: {e}"))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_owned();
        if field_name != "file" {
            return Err(ServerError::BadRequest(format!("unknown field: {field_name}")));
        }
        if !file_name.is_empty() {
            return Err(ServerError::BadRequest("duplicate file field".into()));
        }

        file_name = field.file_name().unwrap_or_default().to_owned();
        if file_name.is_empty() {
            return Err(ServerError::BadRequest("no file selected".into()));
        }
        validate_extension(&file_name)?;

        while let Some(chunk) = field.chunk().await.map_err(|e| {
            ServerError::BadRequest(format!("failed to read file chunk: {e}"))
        })? {
            file_bytes.extend_from_slice(&chunk);
            if file_bytes.len() > max_bytes {
                return Err(ServerError::BadRequest(format!(
                    "file too large: {} bytes exceeds the {}MB limit",
                    file_bytes.len(),
                    state.config.max_upload_mb
                )));
            }
        }
    }

    if file_name.is_empty() {
        return Err(ServerError::BadRequest("no file provided".into()));
    }
    if file_bytes.is_empty() {
        return Err(ServerError::BadRequest("uploaded file is empty".into()));
    }

    // ── Admission control ─────────────────────────────────────────────────────
    let admission = state.admission.clone().try_acquire_owned().map_err(|_| {
        ServerError::Overloaded("conversion queue is full, retry later".into())
    })?;

    // ── Persist the upload and hand off to the job runner ─────────────────────
    let task_id = Uuid::new_v4().to_string();
    let safe_name = sanitize_filename(&file_name);
    let stem = FsPath::new(&safe_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload")
        .to_owned();

    let input_path = state.config.upload_dir.join(format!("{task_id}_{safe_name}"));
    let output_name = format!("{task_id}_{preset}_{stem}.wav");

    debug!(
        task_id = %task_id,
        file_name = %file_name,
        size_bytes = file_bytes.len(),
        preset = %preset,
        "upload accepted"
    );

    tokio::fs::write(&input_path, &file_bytes).await?;
    state.progress.insert(task_id.clone());

    jobs::spawn(
        Arc::clone(&state),
        JobSpec {
            task_id: task_id.clone(),
            preset,
            input_path,
            output_name,
        },
        admission,
    );

    info!(task_id = %task_id, preset = %preset, "conversion task submitted");

    let status_url = format!("/progress/{task_id}");
    Ok(Json(ConvertAccepted { task_id, status_url }))
}

/// Reject filenames whose extension is not on the allow-list.
fn validate_extension(file_name: &str) -> Result<(), ServerError> {
    let ext = FsPath::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ServerError::BadRequest(format!(
            "invalid file type '.{ext}'; allowed: mp3, wav, m4a, flac"
        )));
    }
    Ok(())
}

/// Sanitize a filename to prevent directory traversal.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
