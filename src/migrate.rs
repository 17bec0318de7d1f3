//! Schema creation for the double-buffered snapshot store.
//!
//! Two identical record tables (`records_a`, `records_b`) hold at most one
//! snapshot each; the single-row `snapshot_state` table names the active
//! one. A replace fills the inactive table and flips the pointer in the
//! same transaction, so the schema never needs a drop-and-rebuild.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::{SLOT_A, SLOT_B};

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    for table in [SLOT_A, SLOT_B] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                customer_id INTEGER NOT NULL DEFAULT 0,
                sale_date TEXT,
                customer_location TEXT NOT NULL DEFAULT 'Unknown',
                age INTEGER NOT NULL DEFAULT 0,
                gender TEXT NOT NULL DEFAULT 'Unknown',
                mobile_name TEXT NOT NULL DEFAULT 'Unknown',
                sell_price REAL NOT NULL DEFAULT 0,
                from_facebook TEXT NOT NULL DEFAULT 'Unknown',
                followed_page TEXT NOT NULL DEFAULT 'Unknown',
                previous_purchase TEXT NOT NULL DEFAULT 'Unknown',
                heard_of_shop TEXT NOT NULL DEFAULT 'Unknown',
                source_file TEXT NOT NULL,
                processed_at INTEGER NOT NULL,
                extra_json TEXT NOT NULL DEFAULT '{{}}'
            )
            "#
        ))
        .execute(&pool)
        .await?;

        // sale_date is ISO-formatted text, so the range filter can use this
        // index directly
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_sale_date ON {table}(sale_date)"
        ))
        .execute(&pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshot_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            active_table TEXT NOT NULL,
            version INTEGER NOT NULL,
            next_id INTEGER NOT NULL,
            record_count INTEGER NOT NULL,
            replaced_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Seed the pointer row once; version 0 is the empty pre-ingest snapshot
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO snapshot_state (id, active_table, version, next_id, record_count, replaced_at)
        VALUES (1, ?, 0, 1, 0, ?)
        "#,
    )
    .bind(SLOT_A)
    .bind(chrono::Utc::now().timestamp())
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
