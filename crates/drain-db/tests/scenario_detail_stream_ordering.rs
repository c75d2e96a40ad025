//! Detail rows stream back in ascending detail_id order, bounded by the
//! fetch hint page size rather than loaded all at once.
//!
//! Skips gracefully when `DRAIN_DATABASE_URL` is not set.

use drain_db::stream_detail_rows;
use futures_util::StreamExt;
use sqlx::PgPool;

async fn make_pool() -> anyhow::Result<Option<PgPool>> {
    let url = match std::env::var(drain_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    let pool = drain_db::connect(&url).await?;
    drain_db::migrate(&pool).await?;
    sqlx::query("truncate table detail_records, master_records cascade")
        .execute(&pool)
        .await?;
    Ok(Some(pool))
}

#[tokio::test]
#[ignore = "requires DRAIN_DATABASE_URL"]
async fn detail_rows_stream_in_ascending_order_across_pages() -> anyhow::Result<()> {
    let Some(pool) = make_pool().await? else {
        return Ok(());
    };

    sqlx::query(
        "insert into master_records (master_id, business_center_code, priority, status, locked_by, locked_at) \
         values (3001, 'NYC', 1, 'PROCESSING', 'worker-A', now())",
    )
    .execute(&pool)
    .await?;

    for detail_id in 1..=7_i64 {
        sqlx::query(
            "insert into detail_records (master_id, detail_id, amount) values (3001, $1, 1.00)",
        )
        .bind(detail_id)
        .execute(&pool)
        .await?;
    }

    // fetch_hint smaller than the row count forces multiple pages.
    let mut stream = Box::pin(stream_detail_rows(pool, 3001, 3));
    let mut seen = Vec::new();
    while let Some(row) = stream.next().await {
        seen.push(row?.detail_id);
    }

    assert_eq!(seen, (1..=7).collect::<Vec<_>>());
    Ok(())
}
