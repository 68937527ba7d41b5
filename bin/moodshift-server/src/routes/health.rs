//! Liveness endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register the liveness route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Service liveness (`GET /health`).
///
/// Always 200 while the process is up.  Besides `status` and `version` the
/// payload carries a snapshot of the conversion pool: configured worker
/// count, currently idle workers and how many task records are pollable.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up; body carries a pool snapshot", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":        "ok",
        "version":       env!("CARGO_PKG_VERSION"),
        "workers":       state.config.workers,
        "idle_workers":  state.workers.available_permits(),
        "tracked_tasks": state.progress.len(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    fn test_state() -> Arc<AppState> {
        AppState::from_config(Config::from_env())
    }

    #[tokio::test]
    async fn health_reports_ok_and_version() {
        let Json(body) = get_health(State(test_state())).await;
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn health_snapshots_the_idle_pool() {
        let state = test_state();
        state.progress.insert("t1");
        let Json(body) = get_health(State(Arc::clone(&state))).await;
        assert_eq!(body["workers"].as_u64(), Some(state.config.workers as u64));
        assert_eq!(body["idle_workers"].as_u64(), Some(state.config.workers as u64));
        assert_eq!(body["tracked_tasks"].as_u64(), Some(1));
    }

    #[tokio::test]
    async fn health_counts_held_worker_permits() {
        let state = test_state();
        let _permit = state.workers.clone().try_acquire_owned().unwrap();
        let Json(body) = get_health(State(Arc::clone(&state))).await;
        assert_eq!(
            body["idle_workers"].as_u64(),
            Some(state.config.workers as u64 - 1)
        );
    }
}
