//! moodshift-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Create the upload and processed directories.
//! 4. Build the shared state (progress store, task manager, worker pool).
//! 5. Start the progress-store reaper in a background task.
//! 6. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod jobs;
mod middleware;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::state::AppState;

/// How often the reaper sweeps finished tasks.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: MOODSHIFT_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "moodshift-server starting");

    // ── 3. Working directories ─────────────────────────────────────────────────
    tokio::fs::create_dir_all(&cfg.upload_dir).await?;
    tokio::fs::create_dir_all(&cfg.processed_dir).await?;
    info!(
        upload_dir = %cfg.upload_dir.display(),
        processed_dir = %cfg.processed_dir.display(),
        "working directories ready"
    );

    // ── 4. Shared application state ────────────────────────────────────────────
    let state = AppState::from_config(cfg.clone());
    info!(
        workers = cfg.workers,
        queue_capacity = cfg.queue_capacity,
        "worker pool configured"
    );

    // ── 5. Progress-store reaper ───────────────────────────────────────────────
    let reaper_state = Arc::clone(&state);
    let ttl = Duration::from_secs(cfg.task_ttl_secs);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(REAP_INTERVAL);
        loop {
            tick.tick().await;
            let removed = reaper_state.progress.reap(ttl);
            if removed > 0 {
                debug!(removed, remaining = reaper_state.progress.len(), "reaped finished tasks");
            }
        }
    });

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop whatever conversions are still in flight; their uploads stay on
    // disk and are re-creatable by the client.
    let aborted = state.tasks.abort_all();
    if aborted > 0 {
        warn!(aborted, "aborted in-flight conversions during shutdown");
    }

    info!("moodshift-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c    => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
