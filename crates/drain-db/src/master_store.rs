use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use drain_schemas::{MasterRecord, MasterStatus};
use sqlx::{PgConnection, PgPool, Row};

/// CRUD + claim/release queries on `master_records`.
///
/// `find_claimable` and `claim` take an open connection (typically the
/// connection backing a transaction) so the caller can hold the row lock
/// across both steps; `load`/`complete`/`fail` take a pool since they run as
/// standalone statements.
#[derive(Clone)]
pub struct MasterStore {
    pool: PgPool,
}

impl MasterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns at most one candidate whose status is PENDING, or PROCESSING
    /// with a lock older than `lock_horizon`, ordered by
    /// `(priority DESC, created_at ASC)`, locked `FOR UPDATE SKIP LOCKED` so
    /// concurrent claimants never contend on the same row.
    pub async fn find_claimable(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
        lock_horizon: chrono::Duration,
    ) -> Result<Option<i64>> {
        let horizon_cutoff = now - lock_horizon;

        let row = sqlx::query(
            r#"
            select master_id
            from master_records
            where status = 'PENDING'
               or (status = 'PROCESSING' and locked_at < $1)
            order by priority desc, created_at asc
            limit 1
            for update skip locked
            "#,
        )
        .bind(horizon_cutoff)
        .fetch_optional(conn)
        .await
        .context("find_claimable query failed")?;

        Ok(row.map(|r| r.get::<i64, _>("master_id")))
    }

    /// Conditionally updates the candidate row to PROCESSING, owned by
    /// `worker`, only if the row is currently unlocked, already owned by
    /// `worker`, or its lock is older than `lock_horizon` — the same
    /// abandoned-lock condition `find_claimable` selected it under. Returns
    /// true iff exactly one row was updated.
    pub async fn claim(
        conn: &mut PgConnection,
        master_id: i64,
        worker: &str,
        now: DateTime<Utc>,
        lock_horizon: chrono::Duration,
    ) -> Result<bool> {
        let horizon_cutoff = now - lock_horizon;

        let result = sqlx::query(
            r#"
            update master_records
               set status = 'PROCESSING',
                   locked_by = $2,
                   locked_at = $3,
                   updated_at = $3
             where master_id = $1
               and (locked_by is null or locked_by = $2 or locked_at < $4)
            "#,
        )
        .bind(master_id)
        .bind(worker)
        .bind(now)
        .bind(horizon_cutoff)
        .execute(conn)
        .await
        .context("claim query failed")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn load(&self, master_id: i64) -> Result<Option<MasterRecord>> {
        let row = sqlx::query(
            r#"
            select master_id, business_center_code, priority, status, locked_by,
                   locked_at, error_message, created_at, updated_at
            from master_records
            where master_id = $1
            "#,
        )
        .bind(master_id)
        .fetch_optional(&self.pool)
        .await
        .context("load query failed")?;

        row.map(row_to_master_record).transpose()
    }

    /// Transitions a PROCESSING row owned by `worker` to COMPLETED. Idempotent
    /// no-op (returns false) if the row is not owned by `worker` — a losing
    /// worker's finalize call after lock expiry must not clobber the winner.
    pub async fn complete(&self, master_id: i64, worker: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            update master_records
               set status = 'COMPLETED',
                   locked_by = null,
                   locked_at = null,
                   updated_at = now()
             where master_id = $1
               and locked_by = $2
            "#,
        )
        .bind(master_id)
        .bind(worker)
        .execute(&self.pool)
        .await
        .context("complete query failed")?;

        Ok(result.rows_affected() == 1)
    }

    /// Transitions a PROCESSING row owned by `worker` to FAILED, recording
    /// `error_message`. Same ownership-gated idempotency as `complete`.
    pub async fn fail(&self, master_id: i64, worker: &str, error_message: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            update master_records
               set status = 'FAILED',
                   locked_by = null,
                   locked_at = null,
                   error_message = $3,
                   updated_at = now()
             where master_id = $1
               and locked_by = $2
            "#,
        )
        .bind(master_id)
        .bind(worker)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .context("fail query failed")?;

        Ok(result.rows_affected() == 1)
    }
}

fn row_to_master_record(row: sqlx::postgres::PgRow) -> Result<MasterRecord> {
    let status_str: String = row.try_get("status")?;
    Ok(MasterRecord {
        master_id: row.try_get("master_id")?,
        business_center_code: row.try_get("business_center_code")?,
        priority: row.try_get("priority")?,
        status: MasterStatus::parse(&status_str)
            .with_context(|| format!("unrecognized master status: {status_str}"))?,
        locked_by: row.try_get("locked_by")?,
        locked_at: row.try_get("locked_at")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
