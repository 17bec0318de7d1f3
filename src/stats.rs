//! Store statistics and health overview.
//!
//! A quick summary of what the active snapshot holds: record count, snapshot
//! version, when the last replace landed, and a per-source-file breakdown.
//! Used by `spp stats` to confirm ingestion runs are doing what they claim.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::store;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let info = store::snapshot_info(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Salespipe — Store Stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Snapshot:    v{} ({})", info.version, info.active_table);
    println!("  Records:     {}", info.record_count);
    println!("  Replaced:    {}", format_ts_relative(info.replaced_at));

    // Per-source-file breakdown of the active snapshot
    let rows = sqlx::query(&format!(
        "SELECT source_file, COUNT(*) AS record_count, MAX(processed_at) AS processed_at \
         FROM {} GROUP BY source_file ORDER BY record_count DESC",
        info.active_table
    ))
    .fetch_all(&pool)
    .await?;

    if !rows.is_empty() {
        println!();
        println!("  By source file:");
        println!("  {:<32} {:>8}   {}", "FILE", "RECORDS", "PROCESSED");
        println!("  {}", "-".repeat(60));
        for row in &rows {
            let source_file: String = row.get("source_file");
            let record_count: i64 = row.get("record_count");
            let processed_at: i64 = row.get("processed_at");
            println!(
                "  {:<32} {:>8}   {}",
                source_file,
                record_count,
                format_ts_relative(processed_at)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
