//! Thin HTTP passthrough over the query engine.
//!
//! The core consumes already-parsed filter parameters and returns a
//! structured page; this layer only maps HTTP to that contract.
//! Authentication and rate limiting belong to an upstream collaborator and
//! are deliberately absent here.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/records` | Filtered, cursor-paginated records |
//! | `GET`  | `/health` | Store reachability and active snapshot size |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be between 1 and 100" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unavailable` (503), `internal` (500).
//! A request never fails because an optional filter is absent.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, QueryConfig};
use crate::db;
use crate::error::PipelineError;
use crate::models::RecordPage;
use crate::query::{self, QueryRequest};
use crate::store;

/// Shared application state passed to route handlers via Axum's `State`.
#[derive(Clone)]
struct AppState {
    pool: SqlitePool,
    query: QueryConfig,
}

/// Start the read API server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;

    let state = AppState {
        pool,
        query: config.query.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/records", get(handle_records))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("read API listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::BadRequest(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request".to_string(),
                message,
            },
            PipelineError::StoreUnavailable(source) => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "unavailable".to_string(),
                message: source.to_string(),
            },
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: other.to_string(),
            },
        }
    }
}

// ============ GET /records ============

/// Handler for `GET /records`.
///
/// All filter parameters are optional query-string values; see
/// [`QueryRequest`]. The response is one page plus `next_cursor` and
/// `total_count`, never a partial or ambiguous result.
async fn handle_records(
    State(state): State<AppState>,
    Query(request): Query<QueryRequest>,
) -> Result<Json<RecordPage>, AppError> {
    let plan = query::compile(&request, &state.query)?;
    let page = query::fetch_page(&state.pool, &plan).await?;
    Ok(Json(page))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// Record count of the active snapshot.
    records: i64,
    snapshot_version: i64,
}

/// Handler for `GET /health`. Reports store reachability and how many
/// records the active snapshot holds.
async fn handle_health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, AppError> {
    let info = store::snapshot_info(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        records: info.record_count,
        snapshot_version: info.version,
    }))
}
