//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

/// Runtime configuration for moodshift-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5000"`).
    pub bind_address: String,

    /// Directory holding uploads while their conversion runs.
    pub upload_dir: PathBuf,

    /// Directory the finished conversions are written to and served from.
    pub processed_dir: PathBuf,

    /// Upload size cap in MiB.
    pub max_upload_mb: usize,

    /// How many conversions run concurrently.
    pub workers: usize,

    /// How many accepted conversions may wait for a worker; uploads beyond
    /// `workers + queue_capacity` are rejected with 503.
    pub queue_capacity: usize,

    /// Seconds a finished task stays pollable before the reaper drops it.
    pub task_ttl_secs: u64,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,

    /// Comma-separated CORS origin allow-list; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("MOODSHIFT_BIND", "0.0.0.0:5000"),
            upload_dir: env_or("MOODSHIFT_UPLOAD_DIR", "uploads").into(),
            processed_dir: env_or("MOODSHIFT_PROCESSED_DIR", "processed").into(),
            max_upload_mb: parse_env("MOODSHIFT_MAX_UPLOAD_MB", 50),
            workers: parse_env("MOODSHIFT_WORKERS", 4),
            queue_capacity: parse_env("MOODSHIFT_QUEUE_CAPACITY", 64),
            task_ttl_secs: parse_env("MOODSHIFT_TASK_TTL_SECS", 3600),
            log_level: env_or("MOODSHIFT_LOG", "info"),
            log_json: std::env::var("MOODSHIFT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            enable_swagger: std::env::var("MOODSHIFT_ENABLE_SWAGGER")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            cors_allowed_origins: std::env::var("MOODSHIFT_CORS_ORIGINS").ok(),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
