//! Filter compilation and cursor pagination over the active snapshot.
//!
//! Compilation turns the optional filter parameters into a conjunctive SQL
//! predicate plus an ordered bind list; it performs no I/O and fails only
//! on structurally invalid input (malformed cursor or date filter, limit
//! out of bounds), all classified as [`PipelineError::BadRequest`].
//!
//! Execution resolves the active table and runs both the page select and
//! the total count inside one transaction, so every response reflects a
//! single logical snapshot even if a replace commits mid-request. Paging
//! fetches `limit + 1` rows: the extra row only proves more data exists and
//! is trimmed before the page is returned.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

use crate::config::QueryConfig;
use crate::error::PipelineError;
use crate::models::{RecordPage, StoredRecord};

/// Filter parameters as received from the API boundary or CLI.
/// Every field is optional; absent means unconstrained.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    /// Inclusive lower date bound, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// Inclusive upper date bound, `YYYY-MM-DD`.
    pub date_to: Option<String>,
    /// Case-insensitive substring match on customer_location.
    pub location: Option<String>,
    /// Exact match on gender.
    pub gender: Option<String>,
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    /// Case-insensitive substring match on mobile_name.
    pub product: Option<String>,
    /// Opaque resumption token from a previous page.
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug)]
enum Bind {
    Int(i64),
    Text(String),
}

/// A compiled retrieval plan: predicate, bind values, decoded cursor, and
/// validated page size.
#[derive(Debug)]
pub struct CompiledQuery {
    predicate: String,
    binds: Vec<Bind>,
    cursor: Option<i64>,
    limit: i64,
}

pub fn compile(
    request: &QueryRequest,
    config: &QueryConfig,
) -> Result<CompiledQuery, PipelineError> {
    let limit = request.limit.unwrap_or(config.default_limit);
    if limit < 1 || limit > config.max_limit {
        return Err(PipelineError::bad_request(format!(
            "limit must be between 1 and {}",
            config.max_limit
        )));
    }

    let cursor = match nonblank(&request.cursor) {
        Some(raw) => Some(decode_cursor(raw)?),
        None => None,
    };

    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();

    if let Some(raw) = nonblank(&request.date_from) {
        let date = parse_filter_date(raw, "date_from")?;
        conditions.push("sale_date >= ?".to_string());
        binds.push(Bind::Text(date.to_string()));
    }
    if let Some(raw) = nonblank(&request.date_to) {
        let date = parse_filter_date(raw, "date_to")?;
        conditions.push("sale_date <= ?".to_string());
        binds.push(Bind::Text(date.to_string()));
    }
    if let Some(location) = nonblank(&request.location) {
        // instr matches anywhere in the value, not just a prefix
        conditions.push("instr(lower(customer_location), lower(?)) > 0".to_string());
        binds.push(Bind::Text(location.to_string()));
    }
    if let Some(gender) = nonblank(&request.gender) {
        conditions.push("gender = ?".to_string());
        binds.push(Bind::Text(gender.to_string()));
    }
    if let Some(age_min) = request.age_min {
        conditions.push("age >= ?".to_string());
        binds.push(Bind::Int(age_min));
    }
    if let Some(age_max) = request.age_max {
        conditions.push("age <= ?".to_string());
        binds.push(Bind::Int(age_max));
    }
    if let Some(product) = nonblank(&request.product) {
        conditions.push("instr(lower(mobile_name), lower(?)) > 0".to_string());
        binds.push(Bind::Text(product.to_string()));
    }

    let predicate = if conditions.is_empty() {
        "1=1".to_string()
    } else {
        conditions.join(" AND ")
    };

    Ok(CompiledQuery {
        predicate,
        binds,
        cursor,
        limit,
    })
}

/// Execute a compiled plan and return one page plus the cursor-independent
/// total count, both computed against the same snapshot view.
pub async fn fetch_page(
    pool: &SqlitePool,
    plan: &CompiledQuery,
) -> Result<RecordPage, PipelineError> {
    let mut tx = pool.begin().await?;

    let active: String =
        sqlx::query_scalar("SELECT active_table FROM snapshot_state WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;

    let page_sql = format!(
        "SELECT id, customer_id, sale_date, customer_location, age, gender, mobile_name, \
         sell_price, from_facebook, followed_page, previous_purchase, heard_of_shop, \
         source_file, processed_at, extra_json \
         FROM {active} WHERE {} AND id > ? ORDER BY id ASC LIMIT ?",
        plan.predicate
    );
    let mut page_query = sqlx::query(&page_sql);
    for bind in &plan.binds {
        page_query = match bind {
            Bind::Int(v) => page_query.bind(*v),
            Bind::Text(v) => page_query.bind(v.clone()),
        };
    }
    let rows = page_query
        .bind(plan.cursor.unwrap_or(i64::MIN))
        .bind(plan.limit + 1)
        .fetch_all(&mut *tx)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM {active} WHERE {}", plan.predicate);
    let mut count_query = sqlx::query_scalar::<Sqlite, i64>(&count_sql);
    for bind in &plan.binds {
        count_query = match bind {
            Bind::Int(v) => count_query.bind(*v),
            Bind::Text(v) => count_query.bind(v.clone()),
        };
    }
    let total_count = count_query.fetch_one(&mut *tx).await?;

    tx.commit().await?;

    let mut items: Vec<StoredRecord> = rows.iter().map(row_to_record).collect();
    let next_cursor = if items.len() as i64 > plan.limit {
        items.truncate(plan.limit as usize);
        items.last().map(|rec| encode_cursor(rec.id))
    } else {
        None
    };

    Ok(RecordPage {
        items,
        next_cursor,
        total_count,
    })
}

/// Encode a record id as an opaque client-held resumption token.
pub fn encode_cursor(id: i64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decode a cursor back into a record id. Only structural problems are
/// errors; an id that no longer exists in the snapshot just yields an
/// empty page downstream.
fn decode_cursor(raw: &str) -> Result<i64, PipelineError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim())
        .map_err(|_| PipelineError::bad_request("malformed cursor"))?;
    let text =
        String::from_utf8(bytes).map_err(|_| PipelineError::bad_request("malformed cursor"))?;
    text.parse::<i64>()
        .map_err(|_| PipelineError::bad_request("malformed cursor"))
}

fn parse_filter_date(raw: &str, param: &str) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| PipelineError::bad_request(format!("{param} must be a YYYY-MM-DD date")))
}

/// Treat absent and blank filter values the same: unconstrained.
fn nonblank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn row_to_record(row: &SqliteRow) -> StoredRecord {
    let sale_date: Option<String> = row.get("sale_date");
    let extra_json: String = row.get("extra_json");

    StoredRecord {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        date: sale_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        customer_location: row.get("customer_location"),
        age: row.get("age"),
        gender: row.get("gender"),
        mobile_name: row.get("mobile_name"),
        sell_price: row.get("sell_price"),
        from_facebook: row.get("from_facebook"),
        followed_page: row.get("followed_page"),
        previous_purchase: row.get("previous_purchase"),
        heard_of_shop: row.get("heard_of_shop"),
        source_file: row.get("source_file"),
        processed_at: row.get("processed_at"),
        extra: serde_json::from_str(&extra_json).unwrap_or_default(),
    }
}
