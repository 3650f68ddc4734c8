//! The plinth server library: application state, the axum app, and the
//! bridge between axum's transport and the plinth route table.
//!
//! axum owns the socket, body limits, and CORS; route resolution and
//! handler invocation go through [`plinth_http::RouteTable`], which is
//! synchronous and talks to SQLite, so every dispatch runs inside
//! `spawn_blocking`.

pub mod config;
pub mod routes;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use plinth_db::{Db, DbError, DbPool, ExportOptions};
use plinth_http::{gather, Reply, RequestContext, RouteTable};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// The plinth route table served by the fallback handler.
    pub routes: Arc<RouteTable>,
    /// Gates verbose diagnostics in 500 responses.
    pub dev_mode: bool,
    /// Database file path, used by the export endpoint's own connection.
    pub db_path: String,
}

impl AppState {
    pub fn new(pool: DbPool, db_path: String, dev_mode: bool) -> Self {
        let routes = Arc::new(routes::route_table(pool.clone()));
        Self {
            pool,
            routes,
            dev_mode,
            db_path,
        }
    }
}

/// Creates the fixed tables the built-in routes depend on.
///
/// Both statements are `IF NOT EXISTS`; host migrations may have
/// created them already.
pub fn ensure_base_tables(db: &Db) -> Result<(), DbError> {
    db.execute_query(plinth_tasks::RUNNING_TASKS_TABLE)?;
    db.execute_query(plinth_tasks::LOGS_TABLE)?;
    Ok(())
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load
/// balancers, monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router.
///
/// `/health` and `/api/export` are native axum routes; everything else
/// falls through to the plinth route table.
pub fn app(state: AppState, allowed_origin: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/export", get(export_handler))
        .fallback(dispatch_handler)
        .layer(cors_layer(allowed_origin))
        .with_state(state)
}

/// CORS fixed to a single allowed origin, all methods and headers permitted.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = allowed_origin, "invalid allowed origin, skipping CORS origin");
            layer
        }
    }
}

/// Fallback handler: assembles request input and dispatches through
/// the plinth route table.
async fn dispatch_handler(State(state): State<AppState>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let dev_mode = state.dev_mode;

    let body = match axum::body::to_bytes(req.into_body(), MAX_REQUEST_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return internal_error(dev_mode, &format!("failed to read request body: {e}"))
                .into_response()
        }
    };

    let reply = tokio::task::spawn_blocking(move || {
        let params = gather(&method, query.as_deref(), &body);
        let mut ctx = RequestContext::new(method, path, params);
        state.routes.dispatch(&mut ctx)
    })
    .await;

    match reply {
        Ok(reply) => reply.into_response(),
        Err(e) => internal_error(dev_mode, &format!("task join error: {e}")).into_response(),
    }
}

/// A 500 reply whose detail is visible only in development mode.
pub(crate) fn internal_error(dev_mode: bool, detail: &str) -> Reply {
    if dev_mode {
        Reply::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Internal server error: {detail}"),
        )
    } else {
        Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

/// Query parameters for `GET /api/export`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Comma-separated list of tables to include; absent means all.
    pub tables: Option<String>,
    /// Download file name override.
    pub name: Option<String>,
}

/// Handler for `GET /api/export`.
///
/// Streams a SQL dump of the database as a file download with a
/// computed `Content-Length`. The dump opens its own connection and
/// bypasses the shared pool.
async fn export_handler(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let dev_mode = state.dev_mode;
    let db_path = state.db_path.clone();
    let options = ExportOptions {
        tables: query
            .tables
            .map(|t| t.split(',').map(str::to_string).collect()),
        backup_name: query.name,
    };

    let result =
        tokio::task::spawn_blocking(move || plinth_db::export_database(&db_path, &options)).await;

    let export = match result {
        Ok(Ok(export)) => export,
        Ok(Err(e)) => return internal_error(dev_mode, &e.to_string()).into_response(),
        Err(e) => {
            return internal_error(dev_mode, &format!("task join error: {e}")).into_response()
        }
    };

    let length = export.content.len();
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(export.content))
    {
        Ok(response) => response,
        Err(e) => {
            internal_error(dev_mode, &format!("failed to build export response: {e}"))
                .into_response()
        }
    }
}
