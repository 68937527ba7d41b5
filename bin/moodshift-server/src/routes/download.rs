//! Download endpoint for finished conversions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(download))]
pub struct DownloadApi;

/// Register the download route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/download/{filename}", get(download))
}

/// Fetch a finished conversion (`GET /download/{filename}`).
///
/// The filename comes straight from the progress response; anything that
/// looks like a path escape is rejected before touching the filesystem.
#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "download",
    params(
        ("filename" = String, Path, description = "Output filename from the progress response")
    ),
    responses(
        (status = 200, description = "Audio file stream"),
        (status = 404, description = "No such file"),
    )
)]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ServerError::BadRequest("invalid filename".into()));
    }

    let path = state.config.processed_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound(format!("file {filename} not found")));
        }
        Err(e) => return Err(e.into()),
    };

    debug!(filename = %filename, size_bytes = bytes.len(), "serving download");

    let headers = [
        (header::CONTENT_TYPE, content_type_for(&filename).to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Container is inferred from the served extension; the pipeline only
/// produces WAV today.
fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
