//! Background conversion jobs.
//!
//! One accepted upload becomes one spawned task.  The task waits for a
//! worker-pool permit (its record stays `queued`), runs the CPU-bound
//! pipeline on the blocking pool while pushing stage updates into the
//! progress store, and removes the uploaded input on every exit path.
//! Errors never propagate out of the job; they terminate it with a `failed`
//! record that the client discovers by polling.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use moodshift_audio::{decode, encode, Preset};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{info, warn};

use crate::state::{AppState, ProgressStore, ProgressUpdate, TaskStatus};

/// Everything a conversion job needs to run.
#[derive(Debug)]
pub struct JobSpec {
    pub task_id: String,
    pub preset: Preset,
    pub input_path: PathBuf,
    pub output_name: String,
}

/// Launch the background task for an accepted upload and register its abort
/// handle so shutdown can stop it.
///
/// `admission` is the accept-side permit; holding it for the job's lifetime
/// is what bounds running + queued work.
pub fn spawn(state: Arc<AppState>, spec: JobSpec, admission: OwnedSemaphorePermit) {
    let task_id = spec.task_id.clone();
    let join = tokio::spawn(run(Arc::clone(&state), spec, admission));
    state.tasks.insert(task_id.clone(), join.abort_handle());
    // A very fast job can run its own `tasks.remove` before the insert
    // above; drop the handle again so it cannot go stale.
    if join.is_finished() {
        state.tasks.remove(&task_id);
    }
}

async fn run(state: Arc<AppState>, spec: JobSpec, admission: OwnedSemaphorePermit) {
    let _admission = admission;
    let JobSpec { task_id, preset, input_path, output_name } = spec;

    let result = match state.workers.clone().acquire_owned().await {
        Ok(_worker) => {
            let store = Arc::clone(&state.progress);
            let output_path = state.config.processed_dir.join(&output_name);
            let tid = task_id.clone();
            let input = input_path.clone();
            match tokio::task::spawn_blocking(move || {
                run_pipeline(&store, &tid, preset, &input, &output_path)
            })
            .await
            {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("conversion worker panicked: {e}")),
            }
        }
        // Only happens when the pool is closed during shutdown.
        Err(e) => Err(anyhow::anyhow!("worker pool unavailable: {e}")),
    };

    match result {
        Ok(()) => {
            state.progress.update(&task_id, ProgressUpdate {
                percent: Some(100),
                status: Some(TaskStatus::Completed),
                filename: Some(output_name.clone()),
                ..Default::default()
            });
            info!(task_id = %task_id, output = %output_name, "conversion completed");
        }
        Err(e) => {
            warn!(task_id = %task_id, error = %format!("{e:#}"), "conversion failed");
            state.progress.update(&task_id, ProgressUpdate {
                status: Some(TaskStatus::Failed),
                error: Some(format!("{e:#}")),
                ..Default::default()
            });
        }
    }

    // The uploaded input is removed regardless of outcome.
    if let Err(e) = tokio::fs::remove_file(&input_path).await {
        warn!(task_id = %task_id, error = %e, "failed to remove uploaded input");
    }
    state.tasks.remove(&task_id);
}

/// The synchronous decode → transform → encode pipeline, with the stage
/// checkpoints the poll endpoint reports.
fn run_pipeline(
    store: &ProgressStore,
    task_id: &str,
    preset: Preset,
    input: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    store.update(task_id, ProgressUpdate {
        status: Some(TaskStatus::Loading),
        percent: Some(10),
        ..Default::default()
    });
    let buffer = decode::decode_file(input).context("decoding upload")?;

    store.update(task_id, ProgressUpdate {
        status: Some(TaskStatus::Processing),
        percent: Some(35),
        ..Default::default()
    });
    let transformed = preset.apply(buffer).context("applying preset")?;

    store.update(task_id, ProgressUpdate {
        status: Some(TaskStatus::Writing),
        percent: Some(75),
        ..Default::default()
    });
    encode::write_wav(&transformed, output).context("writing output")?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
