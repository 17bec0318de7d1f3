//! Core data models used throughout the pipeline.
//!
//! These types represent source documents, harmonized records, and query
//! results as they flow from ingestion to the paginated read API.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The declared shape of a raw source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Delimited text with a header row (CSV).
    Delimited,
    /// Structured document: a JSON object or array of objects.
    Structured,
}

impl DocumentKind {
    /// Infer the kind from a file extension. Unknown extensions have no
    /// kind and are skipped by the landing scan.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Some(Self::Delimited),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Self::Structured),
            _ => None,
        }
    }
}

/// A local file handed to the normalizer, with its declared kind.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// File name used for provenance stamping (`source_file`).
    pub name: String,
    pub kind: DocumentKind,
}

impl SourceDocument {
    pub fn new(path: PathBuf, kind: DocumentKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name, kind }
    }
}

/// One harmonized sales observation, before a store id is assigned.
///
/// All defaulting has already been applied: numeric fields hold 0 where the
/// source was absent or unparseable, text fields hold "Unknown", and the
/// four yes/no fields hold exactly one of "Yes", "No", "Unknown". Columns
/// outside the canonical set live in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub customer_id: i64,
    /// Cleared (None) when the source value did not match the configured
    /// day-month-year format.
    pub date: Option<NaiveDate>,
    pub customer_location: String,
    pub age: i64,
    pub gender: String,
    pub mobile_name: String,
    pub sell_price: f64,
    pub from_facebook: String,
    pub followed_page: String,
    pub previous_purchase: String,
    pub heard_of_shop: String,
    pub source_file: String,
    /// Normalization wall-clock time, epoch seconds.
    pub processed_at: i64,
    /// Unrecognized source columns, retained as-is.
    pub extra: BTreeMap<String, String>,
}

/// A canonical record as persisted in the active snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub customer_id: i64,
    pub date: Option<NaiveDate>,
    pub customer_location: String,
    pub age: i64,
    pub gender: String,
    pub mobile_name: String,
    pub sell_price: f64,
    pub from_facebook: String,
    pub followed_page: String,
    pub previous_purchase: String,
    pub heard_of_shop: String,
    pub source_file: String,
    pub processed_at: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// One page of query results.
#[derive(Debug, Serialize)]
pub struct RecordPage {
    /// Up to `limit` matching records in ascending id order.
    pub items: Vec<StoredRecord>,
    /// Present only when more matching records exist beyond this page.
    pub next_cursor: Option<String>,
    /// Count of all records matching the filters, ignoring the cursor.
    pub total_count: i64,
}
