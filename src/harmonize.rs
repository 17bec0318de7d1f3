//! Batch harmonization: merge per-document record batches into one
//! homogeneous batch with a unified column set.
//!
//! The canonical fields are already uniform after normalization; what can
//! differ across documents is the set of extra attributes. The merge takes
//! the union of all extra keys seen in the run and backfills records that
//! lack one with the "Unknown" text default. Merge order follows document
//! arrival order; nothing is re-sorted.

use std::collections::BTreeSet;

use crate::models::CanonicalRecord;
use crate::normalize::UNKNOWN;

pub fn merge_batches(batches: Vec<Vec<CanonicalRecord>>) -> Vec<CanonicalRecord> {
    let mut merged: Vec<CanonicalRecord> = batches.into_iter().flatten().collect();

    let extra_keys: BTreeSet<String> = merged
        .iter()
        .flat_map(|rec| rec.extra.keys().cloned())
        .collect();

    for record in &mut merged {
        for key in &extra_keys {
            record
                .extra
                .entry(key.clone())
                .or_insert_with(|| UNKNOWN.to_string());
        }
    }

    merged
}
