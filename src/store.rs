//! Snapshot store: double-buffered tables with an atomic pointer flip.
//!
//! Exactly one of `records_a` / `records_b` is the active snapshot at any
//! moment; the one-row `snapshot_state` table names it. A replace fills the
//! inactive table and flips the pointer inside a single transaction, so a
//! query that starts after the commit sees 100% new data and a query that
//! started before it keeps reading the old table untouched. A failure at
//! any point before commit leaves the previous snapshot active.
//!
//! Ids continue from a persisted high-water mark (`next_id`) across
//! replaces, so a cursor held across a snapshot boundary can never alias a
//! new row; it simply falls off the end.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error::PipelineError;
use crate::models::CanonicalRecord;

pub const SLOT_A: &str = "records_a";
pub const SLOT_B: &str = "records_b";

/// Outcome of a completed replace.
#[derive(Debug)]
pub struct ReplaceReport {
    pub version: i64,
    pub record_count: i64,
    pub first_id: i64,
    pub last_id: i64,
}

/// Current snapshot pointer state, for health and stats surfaces.
#[derive(Debug)]
pub struct SnapshotInfo {
    pub active_table: String,
    pub version: i64,
    pub record_count: i64,
    pub replaced_at: i64,
}

/// Install a harmonized batch as the new active snapshot.
///
/// All-or-nothing: the delete, the inserts, and the pointer flip commit
/// together. Rejects an empty batch with [`PipelineError::EmptyBatch`]
/// before opening a transaction.
pub async fn replace_snapshot(
    pool: &SqlitePool,
    batch: &[CanonicalRecord],
) -> Result<ReplaceReport, PipelineError> {
    if batch.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }

    let mut tx = pool.begin().await?;

    let state = sqlx::query("SELECT active_table, version, next_id FROM snapshot_state WHERE id = 1")
        .fetch_one(&mut *tx)
        .await?;
    let active: String = state.get("active_table");
    let version: i64 = state.get("version");
    let first_id: i64 = state.get("next_id");

    let target = if active == SLOT_A { SLOT_B } else { SLOT_A };

    // The inactive table may hold the snapshot before last; clear it
    sqlx::query(&format!("DELETE FROM {target}"))
        .execute(&mut *tx)
        .await?;

    let insert_sql = format!(
        "INSERT INTO {target} (id, customer_id, sale_date, customer_location, age, gender, \
         mobile_name, sell_price, from_facebook, followed_page, previous_purchase, \
         heard_of_shop, source_file, processed_at, extra_json) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );

    let mut id = first_id;
    for record in batch {
        let extra_json =
            serde_json::to_string(&record.extra).unwrap_or_else(|_| "{}".to_string());
        sqlx::query(&insert_sql)
            .bind(id)
            .bind(record.customer_id)
            .bind(record.date.map(|d| d.to_string()))
            .bind(&record.customer_location)
            .bind(record.age)
            .bind(&record.gender)
            .bind(&record.mobile_name)
            .bind(record.sell_price)
            .bind(&record.from_facebook)
            .bind(&record.followed_page)
            .bind(&record.previous_purchase)
            .bind(&record.heard_of_shop)
            .bind(&record.source_file)
            .bind(record.processed_at)
            .bind(extra_json)
            .execute(&mut *tx)
            .await?;
        id += 1;
    }

    let record_count = batch.len() as i64;
    sqlx::query(
        "UPDATE snapshot_state SET active_table = ?, version = version + 1, next_id = ?, \
         record_count = ?, replaced_at = ? WHERE id = 1",
    )
    .bind(target)
    .bind(id)
    .bind(record_count)
    .bind(Utc::now().timestamp())
    .execute(&mut *tx)
    .await?;

    // Single atomicity point; everything above is invisible until here
    tx.commit().await?;

    Ok(ReplaceReport {
        version: version + 1,
        record_count,
        first_id,
        last_id: id - 1,
    })
}

pub async fn snapshot_info(pool: &SqlitePool) -> Result<SnapshotInfo, PipelineError> {
    let row = sqlx::query(
        "SELECT active_table, version, record_count, replaced_at FROM snapshot_state WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;

    Ok(SnapshotInfo {
        active_table: row.get("active_table"),
        version: row.get("version"),
        record_count: row.get("record_count"),
        replaced_at: row.get("replaced_at"),
    })
}
