use async_stream::try_stream;
use drain_schemas::{DetailRow, DrainError};
use futures_util::Stream;
use sqlx::{PgPool, Row};

/// Streams the detail rows of `master_id` in ascending `detail_id` order.
///
/// Implemented as keyset pagination over a single dedicated pooled
/// connection rather than a `DECLARE CURSOR`: each page holds at most
/// `fetch_hint` rows in memory, and the next page is requested only once the
/// consumer has drained the current one, giving the same O(`fetch_hint`)
/// working-set bound a server-side cursor would. If the connection is lost
/// mid-stream the stream yields an error and ends — the caller treats this as
/// a non-terminal cycle failure.
pub fn stream_detail_rows(
    pool: PgPool,
    master_id: i64,
    fetch_hint: u32,
) -> impl Stream<Item = Result<DetailRow, DrainError>> {
    try_stream! {
        let page_size = fetch_hint.max(1) as i64;
        let mut after_detail_id: i64 = i64::MIN;

        loop {
            let rows = sqlx::query(
                r#"
                select detail_id, master_id, account_number, customer_name,
                       amount, currency, description, transaction_date, created_at,
                       transaction_data
                from detail_records
                where master_id = $1 and detail_id > $2
                order by detail_id asc
                limit $3
                "#,
            )
            .bind(master_id)
            .bind(after_detail_id)
            .bind(page_size)
            .fetch_all(&pool)
            .await
            .map_err(DrainError::from)?;

            if rows.is_empty() {
                break;
            }

            for row in &rows {
                after_detail_id = row.try_get::<i64, _>("detail_id").map_err(DrainError::from)?;
                yield row_to_detail(row).map_err(DrainError::from)?;
            }
        }
    }
}

fn row_to_detail(row: &sqlx::postgres::PgRow) -> Result<DetailRow, sqlx::Error> {
    Ok(DetailRow {
        detail_id: row.try_get("detail_id")?,
        master_id: row.try_get("master_id")?,
        account_number: row.try_get("account_number")?,
        customer_name: row.try_get("customer_name")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        description: row.try_get("description")?,
        transaction_date: row.try_get("transaction_date")?,
        created_at: row.try_get("created_at")?,
        transaction_data: row.try_get("transaction_data")?,
    })
}
