//! Shared application state injected into every Axum handler.
//!
//! The progress store is the single source of truth a client polls; it is
//! created once at startup, passed by `Arc` to the accepting handler and
//! every background job, and reaped on a TTL so finished entries do not
//! accumulate for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use utoipa::ToSchema;

use crate::config::Config;

// ── Task status ──────────────────────────────────────────────────────────────

/// Lifecycle of one conversion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Loading,
    Processing,
    Writing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

// ── Progress store ───────────────────────────────────────────────────────────

/// Current state of one task, as returned by the poll endpoint.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub percent: u8,
    pub status: TaskStatus,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub updated_at: Instant,
}

/// Partial update merged into an existing [`TaskEntry`].
#[derive(Debug, Default)]
pub struct ProgressUpdate {
    pub percent: Option<u8>,
    pub status: Option<TaskStatus>,
    pub filename: Option<String>,
    pub error: Option<String>,
}

/// Process-wide task table, one lock around the whole map.
///
/// Critical sections are a few field writes, so the coarse lock is fine for
/// this access pattern.
#[derive(Default)]
pub struct ProgressStore {
    entries: Mutex<HashMap<String, TaskEntry>>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        write!(f, "ProgressStore({count} entries)")
    }
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the initial `queued` / 0% record for a freshly accepted task.
    pub fn insert(&self, task_id: impl Into<String>) {
        if let Ok(mut map) = self.entries.lock() {
            map.insert(
                task_id.into(),
                TaskEntry {
                    percent: 0,
                    status: TaskStatus::Queued,
                    filename: None,
                    error: None,
                    updated_at: Instant::now(),
                },
            );
        }
    }

    /// Merge `update` into the task's record.
    ///
    /// Percent is clamped to [0, 100] and never decreases, so a poller sees
    /// a monotone progression.  Updates for unknown ids are dropped rather
    /// than resurrecting reaped tasks.
    pub fn update(&self, task_id: &str, update: ProgressUpdate) {
        if let Ok(mut map) = self.entries.lock() {
            if let Some(entry) = map.get_mut(task_id) {
                if let Some(p) = update.percent {
                    entry.percent = entry.percent.max(p.min(100));
                }
                if let Some(s) = update.status {
                    entry.status = s;
                }
                if let Some(f) = update.filename {
                    entry.filename = Some(f);
                }
                if let Some(e) = update.error {
                    entry.error = Some(e);
                }
                entry.updated_at = Instant::now();
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<TaskEntry> {
        self.entries
            .lock()
            .ok()
            .and_then(|map| map.get(task_id).cloned())
    }

    /// Drop terminal entries older than `ttl`.  Returns how many were removed.
    pub fn reap(&self, ttl: Duration) -> usize {
        let Ok(mut map) = self.entries.lock() else {
            return 0;
        };
        let before = map.len();
        let now = Instant::now();
        map.retain(|_, e| {
            !e.status.is_terminal() || now.duration_since(e.updated_at) < ttl
        });
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Task manager ─────────────────────────────────────────────────────────────

/// Tracks in-flight tokio task abort handles, keyed by task ID, so graceful
/// shutdown can stop running conversions.
pub struct TaskManager {
    handles: Mutex<HashMap<String, tokio::task::AbortHandle>>,
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handles.lock().map(|h| h.len()).unwrap_or(0);
        write!(f, "TaskManager({count} handles)")
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self { handles: Mutex::new(HashMap::new()) }
    }

    pub fn insert(&self, id: impl Into<String>, handle: tokio::task::AbortHandle) {
        if let Ok(mut map) = self.handles.lock() {
            map.insert(id.into(), handle);
        }
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut map) = self.handles.lock() {
            map.remove(id);
        }
    }

    /// Abort everything still running.  Returns the number of aborted tasks.
    pub fn abort_all(&self) -> usize {
        let Ok(mut map) = self.handles.lock() else {
            return 0;
        };
        let count = map.len();
        for (_, handle) in map.drain() {
            handle.abort();
        }
        count
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── App state ────────────────────────────────────────────────────────────────

/// State shared across all HTTP handlers and background jobs.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Poll-able task table.
    pub progress: Arc<ProgressStore>,
    /// Abort handles for running conversions.
    pub tasks: Arc<TaskManager>,
    /// Worker-pool bound: how many conversions run concurrently.
    pub workers: Arc<Semaphore>,
    /// Admission bound: running + queued; uploads beyond this are rejected.
    pub admission: Arc<Semaphore>,
}

impl AppState {
    pub fn from_config(config: Config) -> Arc<Self> {
        let workers = config.workers;
        let queued = config.queue_capacity;
        Arc::new(Self {
            config: Arc::new(config),
            progress: Arc::new(ProgressStore::new()),
            tasks: Arc::new(TaskManager::new()),
            workers: Arc::new(Semaphore::new(workers)),
            admission: Arc::new(Semaphore::new(workers + queued)),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_starts_queued_at_zero() {
        let store = ProgressStore::new();
        store.insert("t1");
        let entry = store.get("t1").unwrap();
        assert_eq!(entry.status, TaskStatus::Queued);
        assert_eq!(entry.percent, 0);
        assert!(entry.filename.is_none());
    }

    #[test]
    fn unknown_id_returns_none() {
        let store = ProgressStore::new();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn percent_is_clamped_and_monotone() {
        let store = ProgressStore::new();
        store.insert("t1");
        store.update("t1", ProgressUpdate { percent: Some(200), ..Default::default() });
        assert_eq!(store.get("t1").unwrap().percent, 100);
        // A later, lower value must not roll progress back.
        store.update("t1", ProgressUpdate { percent: Some(10), ..Default::default() });
        assert_eq!(store.get("t1").unwrap().percent, 100);
    }

    #[test]
    fn update_merges_without_erasing_fields() {
        let store = ProgressStore::new();
        store.insert("t1");
        store.update("t1", ProgressUpdate {
            percent: Some(75),
            status: Some(TaskStatus::Writing),
            ..Default::default()
        });
        store.update("t1", ProgressUpdate {
            filename: Some("out.wav".into()),
            ..Default::default()
        });
        let entry = store.get("t1").unwrap();
        assert_eq!(entry.percent, 75);
        assert_eq!(entry.status, TaskStatus::Writing);
        assert_eq!(entry.filename.as_deref(), Some("out.wav"));
    }

    #[test]
    fn update_for_unknown_id_is_dropped() {
        let store = ProgressStore::new();
        store.update("ghost", ProgressUpdate { percent: Some(50), ..Default::default() });
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn reap_removes_only_stale_terminal_entries() {
        let store = ProgressStore::new();
        store.insert("done");
        store.update("done", ProgressUpdate {
            status: Some(TaskStatus::Completed),
            percent: Some(100),
            ..Default::default()
        });
        store.insert("running");
        store.update("running", ProgressUpdate {
            status: Some(TaskStatus::Processing),
            ..Default::default()
        });

        // Nothing is older than an hour.
        assert_eq!(store.reap(Duration::from_secs(3600)), 0);
        // With a zero TTL the completed entry goes, the running one stays.
        assert_eq!(store.reap(Duration::ZERO), 1);
        assert!(store.get("done").is_none());
        assert!(store.get("running").is_some());
    }

    #[test]
    fn status_labels_are_lowercase() {
        assert_eq!(TaskStatus::Queued.to_string(), "queued");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Writing.is_terminal());
    }
}
