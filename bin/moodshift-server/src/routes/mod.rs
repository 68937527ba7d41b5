//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - A raised body limit sized to the configured upload cap
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `MOODSHIFT_ENABLE_SWAGGER=false`)
//! - Health, upload, progress-poll and download routes

pub mod convert;
pub mod doc;
pub mod download;
pub mod health;
pub mod progress;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(convert::router())
        .merge(progress::router())
        .merge(download::router());

    // Enabled by default; disable with MOODSHIFT_ENABLE_SWAGGER=false in
    // production to avoid exposing the API structure.
    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Axum's default body limit (2 MiB) is far below a typical upload.
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes() + 64 * 1024))
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(workers: usize, queue: usize) -> (TempDir, Arc<AppState>, Router) {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::from_env();
        cfg.upload_dir = dir.path().join("uploads");
        cfg.processed_dir = dir.path().join("processed");
        cfg.workers = workers;
        cfg.queue_capacity = queue;
        cfg.enable_swagger = false;
        std::fs::create_dir_all(&cfg.upload_dir).unwrap();
        std::fs::create_dir_all(&cfg.processed_dir).unwrap();
        let state = AppState::from_config(cfg);
        let app = build(Arc::clone(&state));
        (dir, state, app)
    }

    fn multipart_request(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "moodshift-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn sine_wav_bytes(sample_rate: u32, secs: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (sample_rate as f32 * secs) as usize;
            for n in 0..frames {
                let t = n as f32 / sample_rate as f32;
                let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin();
                writer.write_sample((s * 0.5 * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn dir_is_empty(path: &std::path::Path) -> bool {
        std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_without_a_task() {
        let (_dir, state, app) = test_app(2, 4);
        let req = multipart_request("/convert/vaporwave", "a.wav", &sine_wav_bytes(8_000, 0.05));
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(state.progress.is_empty());
        assert!(dir_is_empty(&state.config.upload_dir));
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected_without_a_task() {
        let (_dir, state, app) = test_app(2, 4);
        let req = multipart_request("/convert/lofi", "notes.txt", b"hello");
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(body["error"].as_str().unwrap().contains("invalid file type"));
        assert!(state.progress.is_empty());
        assert!(dir_is_empty(&state.config.upload_dir));
    }

    #[tokio::test]
    async fn second_file_part_is_rejected_without_a_task() {
        let (_dir, state, app) = test_app(2, 4);
        let boundary = "moodshift-test-boundary";
        let mut body = Vec::new();
        for name in ["first.wav", "second.wav"] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                     filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&sine_wav_bytes(8_000, 0.05));
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/convert/lofi")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(body["error"].as_str().unwrap().contains("duplicate file field"));
        assert!(state.progress.is_empty());
        assert!(dir_is_empty(&state.config.upload_dir));
    }

    #[tokio::test]
    async fn unknown_task_id_polls_as_404() {
        let (_dir, _state, app) = test_app(2, 4);
        let req = Request::builder()
            .uri("/progress/no-such-task")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_output_file_downloads_as_404() {
        let (_dir, _state, app) = test_app(2, 4);
        let req = Request::builder()
            .uri("/download/absent.wav")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn saturated_queue_rejects_uploads_with_503() {
        // Zero workers and zero queue slots: the first upload already has
        // nowhere to go.
        let (_dir, state, app) = test_app(0, 0);
        let req = multipart_request("/convert/lofi", "a.wav", &sine_wav_bytes(8_000, 0.05));
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.progress.is_empty());
        assert!(dir_is_empty(&state.config.upload_dir));
    }

    #[tokio::test]
    async fn upload_poll_download_round_trip() {
        let (_dir, state, app) = test_app(2, 4);

        // Upload.
        let req = multipart_request("/convert/lofi", "tone.wav", &sine_wav_bytes(44_100, 0.5));
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let accepted = json_body(resp).await;
        let task_id = accepted["task_id"].as_str().unwrap().to_owned();
        assert_eq!(
            accepted["status_url"].as_str().unwrap(),
            format!("/progress/{task_id}")
        );

        // Poll until terminal.
        let mut download_url = None;
        for _ in 0..1200 {
            let req = Request::builder()
                .uri(format!("/progress/{task_id}"))
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body = json_body(resp).await;
            match body["status"].as_str().unwrap() {
                "completed" => {
                    assert_eq!(body["percent"].as_u64(), Some(100));
                    download_url = Some(body["download_url"].as_str().unwrap().to_owned());
                    break;
                }
                "failed" => panic!("conversion failed: {:?}", body["error"]),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
        let download_url = download_url.expect("task never completed");

        // Download.
        let req = Request::builder()
            .uri(&download_url)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "audio/wav"
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(!bytes.is_empty());

        // The uploaded input was cleaned up.
        assert!(dir_is_empty(&state.config.upload_dir));
    }
}
