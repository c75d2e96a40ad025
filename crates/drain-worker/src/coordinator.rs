use chrono::Utc;
use drain_db::{stream_detail_rows, try_claim, MasterStore};
use drain_project::{project, Aggregator};
use drain_schemas::{DrainError, FileHeader, MasterStatus};
use drain_sink::FileSink;
use futures_util::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

const FILE_VERSION: &str = "1.0";

/// Outcome of one `run_one` cycle, consumed by the worker loop to decide how
/// long to wait before the next attempt.
pub enum CycleOutcome {
    Processed,
    Idle,
    Errored(DrainError),
}

/// One claim -> stream -> flatten -> write -> finalize cycle for `worker`.
pub async fn run_one(
    store: &MasterStore,
    output_directory: &Path,
    worker: &str,
    lock_horizon: chrono::Duration,
    fetch_hint: u32,
    shutdown: &Arc<AtomicBool>,
) -> CycleOutcome {
    let now = Utc::now();

    let master_id = match try_claim(store, worker, now, lock_horizon).await {
        Ok(Some(id)) => id,
        Ok(None) => return CycleOutcome::Idle,
        Err(err) => return CycleOutcome::Errored(DrainError::transient(err)),
    };

    let span = info_span!("cycle", master_id, worker);
    run_claimed(store, output_directory, worker, master_id, fetch_hint, shutdown)
        .instrument(span)
        .await
}

async fn run_claimed(
    store: &MasterStore,
    output_directory: &Path,
    worker: &str,
    master_id: i64,
    fetch_hint: u32,
    shutdown: &Arc<AtomicBool>,
) -> CycleOutcome {
    let master = match store.load(master_id).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            warn!(master_id, "claimed master vanished before load; attempting fail");
            let _ = store.fail(master_id, worker, "master row vanished after claim").await;
            return CycleOutcome::Errored(DrainError::integrity(anyhow::anyhow!(
                "master {master_id} vanished after claim"
            )));
        }
        Err(err) => {
            let _ = store.fail(master_id, worker, &err.to_string()).await;
            return CycleOutcome::Errored(DrainError::transient(err));
        }
    };
    debug_assert!(matches!(master.status, MasterStatus::Processing));

    let monotonic_tag = Utc::now().timestamp_millis();
    let mut sink = match FileSink::open(output_directory, &master.business_center_code, master_id, monotonic_tag) {
        Ok(s) => s,
        Err(err) => {
            let _ = store.fail(master_id, worker, &err.to_string()).await;
            return CycleOutcome::Errored(DrainError::sink(err));
        }
    };

    if let Err(err) = sink.write_header(&FileHeader {
        master_id,
        business_center_code: master.business_center_code.clone(),
        date: Utc::now().format("%Y-%m-%d").to_string(),
        file_version: FILE_VERSION,
    }) {
        sink.abort();
        let _ = store.fail(master_id, worker, &err.to_string()).await;
        return CycleOutcome::Errored(DrainError::sink(err));
    }

    let mut aggregator = Aggregator::new();
    let mut stream = Box::pin(stream_detail_rows(store.pool().clone(), master_id, fetch_hint));

    while let Some(row_result) = stream.next().await {
        let row = match row_result {
            Ok(row) => row,
            Err(err) => {
                sink.abort();
                let _ = store.fail(master_id, worker, &err.to_string()).await;
                return CycleOutcome::Errored(DrainError::stream_interrupted(err));
            }
        };

        let projection = project(&row);
        if let Err(err) = sink.write_detail(&projection) {
            sink.abort();
            let _ = store.fail(master_id, worker, &err.to_string()).await;
            return CycleOutcome::Errored(DrainError::sink(err));
        }
        aggregator.fold(&projection);

        if shutdown.load(Ordering::Relaxed) {
            let err = DrainError::Cancelled { master_id };
            sink.abort();
            let _ = store.fail(master_id, worker, &err.to_string()).await;
            warn!(master_id, "shutdown observed mid-cycle; cancelling");
            return CycleOutcome::Errored(err);
        }
    }

    let stats = aggregator.finish();
    if let Err(err) = sink.write_trailer(&stats) {
        sink.abort();
        let _ = store.fail(master_id, worker, &err.to_string()).await;
        return CycleOutcome::Errored(DrainError::sink(err));
    }

    if let Err(err) = sink.close() {
        let _ = store.fail(master_id, worker, &err.to_string()).await;
        return CycleOutcome::Errored(DrainError::sink(err));
    }

    match store.complete(master_id, worker).await {
        Ok(true) => {
            info!(master_id, records = stats.total_records, "cycle completed");
            CycleOutcome::Processed
        }
        Ok(false) => {
            // Lock horizon expired mid-cycle and another worker re-claimed this
            // master: treated as success for the losing worker per the
            // ownership-lost category — our file still exists on disk, which is
            // an accepted at-least-once duplicate.
            let err = DrainError::OwnershipLost { master_id };
            warn!(master_id, error = %err, "ownership lost before finalize; exiting silently");
            CycleOutcome::Processed
        }
        Err(err) => CycleOutcome::Errored(DrainError::transient(err)),
    }
}
