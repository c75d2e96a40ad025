//! Postgres-backed store for the master/detail claim-and-stream pipeline:
//! connection setup, embedded migrations, the master store (C1), the claim
//! engine (C5), and the detail-row cursor (C2).

mod claim;
mod master_store;
mod stream;

pub use claim::try_claim;
pub use master_store::MasterStore;
pub use stream::stream_detail_rows;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub const ENV_DB_URL: &str = "DRAIN_DATABASE_URL";

/// Connect to Postgres using `DRAIN_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    connect_with_max_connections(url, 10).await
}

pub async fn connect_with_max_connections(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Test helper: connect using `DRAIN_DATABASE_URL` and ensure migrations are applied.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}
