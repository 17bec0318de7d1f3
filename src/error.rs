//! Error taxonomy for the pipeline and query engine.
//!
//! Per-field problems (unparseable dates, numbers) never surface here — they
//! are absorbed by the defaulting rules in [`crate::normalize`]. What remains
//! is the set of classifications callers actually branch on: a document that
//! could not be parsed, a structurally invalid query, an unreachable store,
//! and a run that produced nothing to persist.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source document could not be read or parsed. Isolated to that
    /// document; the ingest loop reports it as skipped and continues.
    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    /// Structurally invalid query input (malformed cursor, limit out of
    /// bounds, unparsable date filter). Rejected before touching the store.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The backing store is unreachable or failed mid-operation. A failed
    /// replace leaves the previous snapshot active.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// An ingestion run produced zero canonical records across all
    /// documents. The store is left untouched.
    #[error("ingestion produced no canonical records")]
    EmptyBatch,
}

impl PipelineError {
    pub fn parse(file: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}
