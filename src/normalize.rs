//! Record normalization: one raw source document in, canonical records out.
//!
//! This is where heterogeneous source files are reconciled into the unified
//! schema. Column labels are harmonized (lower-cased, separator characters
//! folded to underscores, known source-specific labels renamed), values are
//! coerced per column classification, and the missing-value policy is
//! applied. Field-level problems never fail a document: an unparseable date
//! clears the date for that record only, an unparseable number becomes the
//! 0 sentinel. Only an unreadable or structurally invalid document yields a
//! [`PipelineError::Parse`], and that is isolated to the document.

use chrono::{NaiveDate, Utc};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;

use crate::error::PipelineError;
use crate::models::{CanonicalRecord, DocumentKind, SourceDocument};

pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const UNKNOWN: &str = "Unknown";

/// Source-specific labels (post-mangling) mapped to canonical field names.
const RENAME_TABLE: &[(&str, &str)] = &[
    ("cus_id", "customer_id"),
    ("cus__location", "customer_location"),
    ("does_he_she_come_from_facebook_page_", "from_facebook"),
    ("does_he_she_followed_our_page_", "followed_page"),
    ("did_he_she_buy_any_mobile_before_", "previous_purchase"),
    ("did_he_she_hear_of_our_shop_before_", "heard_of_shop"),
];

/// Harmonize one source column label: lower-case, fold whitespace, periods,
/// and slashes to underscores, then apply the fixed rename table.
/// Unrecognized labels pass through and end up as extra attributes.
pub fn harmonize_label(label: &str) -> String {
    let mangled: String = label
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '.' || c == '/' {
                '_'
            } else {
                c
            }
        })
        .collect();

    for (from, to) in RENAME_TABLE {
        if mangled == *from {
            return (*to).to_string();
        }
    }
    mangled
}

/// Normalize the four yes/no-style survey answers into the closed
/// {"Yes","No","Unknown"} set. Out-of-enumeration values are coerced to
/// "Unknown" so the invariant holds for everything that reaches the store.
pub fn normalize_tristate(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "yes" | "y" => YES,
        "no" | "n" => NO,
        _ => UNKNOWN,
    }
    .to_string()
}

/// Convert one source document into canonical records.
///
/// `date_format` is the fixed day-month-year format source dates are parsed
/// against. The returned records carry provenance (`source_file`,
/// `processed_at`) but no id; ids are assigned at store time.
pub fn normalize_document(
    doc: &SourceDocument,
    date_format: &str,
) -> Result<Vec<CanonicalRecord>, PipelineError> {
    let processed_at = Utc::now().timestamp();

    let rows = match doc.kind {
        DocumentKind::Delimited => read_delimited(doc)?,
        DocumentKind::Structured => read_structured(doc)?,
    };

    Ok(rows
        .into_iter()
        .map(|fields| build_record(fields, &doc.name, processed_at, date_format))
        .collect())
}

/// Read a CSV document into per-row field maps keyed by harmonized label.
fn read_delimited(doc: &SourceDocument) -> Result<Vec<BTreeMap<String, String>>, PipelineError> {
    let file = File::open(&doc.path).map_err(|e| PipelineError::parse(&doc.name, e))?;

    // flexible: a short row means trailing fields are missing, which the
    // defaulting rules absorb; it is not a document-level failure
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::parse(&doc.name, e))?
        .iter()
        .map(harmonize_label)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| PipelineError::parse(&doc.name, e))?;
        let mut fields = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(i) {
                fields.insert(header.clone(), value.to_string());
            }
        }
        rows.push(fields);
    }

    Ok(rows)
}

/// Read a JSON document (array of objects, or a single object) into per-row
/// field maps. Nested objects are flattened with underscore-joined keys
/// before label harmonization.
fn read_structured(doc: &SourceDocument) -> Result<Vec<BTreeMap<String, String>>, PipelineError> {
    let content =
        std::fs::read_to_string(&doc.path).map_err(|e| PipelineError::parse(&doc.name, e))?;
    let value: Value =
        serde_json::from_str(&content).map_err(|e| PipelineError::parse(&doc.name, e))?;

    let objects = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => {
            return Err(PipelineError::parse(
                &doc.name,
                "top-level JSON must be an object or an array of objects",
            ))
        }
    };

    let mut rows = Vec::new();
    for item in objects {
        let Value::Object(map) = item else {
            return Err(PipelineError::parse(
                &doc.name,
                "array elements must be JSON objects",
            ));
        };

        let mut flat = BTreeMap::new();
        flatten_object("", &map, &mut flat);

        let fields = flat
            .into_iter()
            .map(|(k, v)| (harmonize_label(&k), v))
            .collect();
        rows.push(fields);
    }

    Ok(rows)
}

fn flatten_object(
    prefix: &str,
    map: &serde_json::Map<String, Value>,
    out: &mut BTreeMap<String, String>,
) {
    for (key, value) in map {
        let label = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}_{key}")
        };
        match value {
            // null is a missing value, not an empty string
            Value::Null => {}
            Value::Object(inner) => flatten_object(&label, inner, out),
            Value::String(s) => {
                out.insert(label, s.clone());
            }
            other => {
                out.insert(label, other.to_string());
            }
        }
    }
}

/// Apply type coercion and the missing-value policy to one row.
fn build_record(
    mut fields: BTreeMap<String, String>,
    source_file: &str,
    processed_at: i64,
    date_format: &str,
) -> CanonicalRecord {
    let customer_id = take_int(&mut fields, "customer_id");
    let age = take_int(&mut fields, "age");
    let sell_price = take_float(&mut fields, "sell_price");

    // A malformed date clears the field for this record only
    let date = take(&mut fields, "date")
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), date_format).ok());

    let customer_location = take_text(&mut fields, "customer_location");
    let mobile_name = take_text(&mut fields, "mobile_name");

    let gender = take(&mut fields, "gender")
        .map(|g| capitalize(g.trim()))
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let from_facebook = take_tristate(&mut fields, "from_facebook");
    let followed_page = take_tristate(&mut fields, "followed_page");
    let previous_purchase = take_tristate(&mut fields, "previous_purchase");
    let heard_of_shop = take_tristate(&mut fields, "heard_of_shop");

    // Whatever remains is an unrecognized column, retained as an extra
    // attribute with the text missing-value default
    let extra = fields
        .into_iter()
        .map(|(k, v)| {
            if v.trim().is_empty() {
                (k, UNKNOWN.to_string())
            } else {
                (k, v)
            }
        })
        .collect();

    CanonicalRecord {
        customer_id,
        date,
        customer_location,
        age,
        gender,
        mobile_name,
        sell_price,
        from_facebook,
        followed_page,
        previous_purchase,
        heard_of_shop,
        source_file: source_file.to_string(),
        processed_at,
        extra,
    }
}

/// Remove a field, treating blank values as missing.
fn take(fields: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    fields.remove(key).filter(|v| !v.trim().is_empty())
}

fn take_int(fields: &mut BTreeMap<String, String>, key: &str) -> i64 {
    take(fields, key)
        .and_then(|v| {
            let trimmed = v.trim();
            trimmed
                .parse::<i64>()
                .ok()
                // structured sources serialize whole numbers as floats
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        })
        .unwrap_or(0)
}

fn take_float(fields: &mut BTreeMap<String, String>, key: &str) -> f64 {
    take(fields, key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn take_text(fields: &mut BTreeMap<String, String>, key: &str) -> String {
    take(fields, key).unwrap_or_else(|| UNKNOWN.to_string())
}

fn take_tristate(fields: &mut BTreeMap<String, String>, key: &str) -> String {
    match take(fields, key) {
        Some(value) => normalize_tristate(&value),
        None => UNKNOWN.to_string(),
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
