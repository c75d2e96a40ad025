use drain_config::Settings;
use drain_db::MasterStore;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::coordinator::{run_one, CycleOutcome};

/// Long-running cooperative scheduler: keeps up to `max_concurrent_masters`
/// `run_one` cycles in flight at once, refilling a freed slot immediately
/// unless the cycle that freed it came back `idle` or `errored`, in which
/// case that slot waits out `poll_interval`/`error_backoff` before its next
/// attempt. Exits once `shutdown` is observed and every in-flight cycle has
/// reached a safe boundary.
pub async fn run(pool: PgPool, settings: Settings, worker_id: String, shutdown: Arc<AtomicBool>) {
    let store = MasterStore::new(pool);

    info!(
        worker = %worker_id,
        config_hash = %settings.config_hash,
        batch_size = settings.batch_size,
        lock_timeout_seconds = settings.lock_timeout_seconds,
        poll_interval_seconds = settings.poll_interval_seconds,
        error_backoff_seconds = settings.error_backoff_seconds,
        max_concurrent_masters = settings.max_concurrent_masters,
        output_directory = %settings.output_directory,
        "drain-worker starting"
    );

    let output_directory = PathBuf::from(&settings.output_directory);
    let lock_horizon = chrono::Duration::seconds(settings.lock_timeout_seconds as i64);
    let fetch_hint = settings.batch_size;
    let poll_interval = Duration::from_secs(settings.poll_interval_seconds as u64);
    let error_backoff = Duration::from_secs(settings.error_backoff_seconds as u64);
    let cap = settings.max_concurrent_masters as usize;

    let mut tasks: JoinSet<CycleOutcome> = JoinSet::new();

    loop {
        while tasks.len() < cap && !shutdown.load(Ordering::Relaxed) {
            let store = store.clone();
            let output_directory = output_directory.clone();
            let worker_id = worker_id.clone();
            let task_shutdown = Arc::clone(&shutdown);
            tasks.spawn(async move {
                run_one(&store, &output_directory, &worker_id, lock_horizon, fetch_hint, &task_shutdown).await
            });
        }

        if tasks.is_empty() {
            break;
        }

        match tasks.join_next().await {
            Some(Ok(CycleOutcome::Processed)) => {}
            Some(Ok(CycleOutcome::Idle)) => {
                if !shutdown.load(Ordering::Relaxed) {
                    tokio::time::sleep(poll_interval).await;
                }
            }
            Some(Ok(CycleOutcome::Errored(err))) => {
                warn!(error = %err, "entering error backoff");
                if !shutdown.load(Ordering::Relaxed) {
                    tokio::time::sleep(error_backoff).await;
                }
            }
            Some(Err(join_err)) => warn!(error = %join_err, "cycle task panicked"),
            None => break,
        }
    }

    info!(worker = %worker_id, "drain-worker shutting down");
}
