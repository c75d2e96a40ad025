use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::master_store::MasterStore;

/// Composes [`MasterStore::find_claimable`] and [`MasterStore::claim`] inside
/// one transaction: the row lock taken by the former is held until the
/// latter's conditional update commits, so no two concurrent callers can
/// observe a successful claim of the same row.
///
/// Returns `Ok(None)` when there is nothing claimable, or when the candidate
/// lost a race between the lock and the update (the outer loop simply
/// retries on its next cycle).
pub async fn try_claim(
    store: &MasterStore,
    worker: &str,
    now: DateTime<Utc>,
    lock_horizon: chrono::Duration,
) -> Result<Option<i64>> {
    let mut tx = store
        .pool()
        .begin()
        .await
        .context("try_claim: begin transaction failed")?;

    let candidate = MasterStore::find_claimable(&mut tx, now, lock_horizon).await?;

    let Some(master_id) = candidate else {
        tx.rollback().await.ok();
        return Ok(None);
    };

    debug!(master_id, worker, "claim candidate found");

    let claimed = MasterStore::claim(&mut tx, master_id, worker, now, lock_horizon).await?;

    if !claimed {
        tx.rollback().await.ok();
        return Ok(None);
    }

    tx.commit().await.context("try_claim: commit failed")?;

    debug!(master_id, worker, "claim committed");
    Ok(Some(master_id))
}
