//! Ingestion run orchestration.
//!
//! Coordinates the full write path: source documents → per-document
//! normalization → batch harmonization → snapshot replace. A document that
//! fails to parse is reported as skipped and does not abort its siblings; a
//! run in which no document yields a record ends with
//! [`PipelineError::EmptyBatch`] and never touches the store. Concurrent
//! runs are not supported here; the external scheduler serializes them.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::PipelineError;
use crate::harmonize;
use crate::models::{CanonicalRecord, SourceDocument};
use crate::normalize;
use crate::store::{self, ReplaceReport};

/// Write entry point: normalize, harmonize, and persist one set of source
/// documents as the new active snapshot. Returns the replace report (record
/// count, id range, snapshot version) on success.
pub async fn ingest_documents(
    pool: &SqlitePool,
    config: &Config,
    documents: &[SourceDocument],
) -> Result<ReplaceReport, PipelineError> {
    let (batch, _skipped) = normalize_all(config, documents);
    store::replace_snapshot(pool, &batch).await
}

/// CLI wrapper around the write path with the run summary output.
pub async fn run_ingest(
    config: &Config,
    documents: Vec<SourceDocument>,
    dry_run: bool,
) -> Result<()> {
    if documents.is_empty() {
        println!("ingest");
        println!("  no source documents found");
        println!("ok");
        return Ok(());
    }

    let (batch, skipped) = normalize_all(config, &documents);
    let parsed = documents.len() - skipped;

    if dry_run {
        println!("ingest (dry-run)");
        println!("  files: {} (parsed {}, skipped {})", documents.len(), parsed, skipped);
        println!("  records: {}", batch.len());
        return Ok(());
    }

    if batch.is_empty() {
        // The previous snapshot keeps serving reads
        eprintln!(
            "ingest failed: no usable records across {} file(s); store unchanged",
            documents.len()
        );
        return Err(PipelineError::EmptyBatch.into());
    }

    let pool = db::connect(config).await?;
    let report = store::replace_snapshot(&pool, &batch).await?;
    pool.close().await;

    println!("ingest");
    println!("  files: {} (parsed {}, skipped {})", documents.len(), parsed, skipped);
    println!("  records persisted: {}", report.record_count);
    println!(
        "  snapshot: v{} (ids {}..={})",
        report.version, report.first_id, report.last_id
    );
    println!("ok");

    Ok(())
}

/// Normalize every document, skipping the ones that fail to parse, and
/// harmonize the survivors into one batch. Returns the batch and the count
/// of skipped documents.
fn normalize_all(
    config: &Config,
    documents: &[SourceDocument],
) -> (Vec<CanonicalRecord>, usize) {
    let mut batches = Vec::new();
    let mut skipped = 0usize;

    for doc in documents {
        match normalize::normalize_document(doc, &config.ingest.date_format) {
            Ok(records) => batches.push(records),
            Err(err) => {
                skipped += 1;
                eprintln!("  skipped {}: {}", doc.name, err);
            }
        }
    }

    (harmonize::merge_batches(batches), skipped)
}
