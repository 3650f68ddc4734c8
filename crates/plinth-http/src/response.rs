//! JSON response types.
//!
//! Every response body is `{message, …}`-shaped JSON. [`Reply`] is an
//! ordinary response a handler returns; [`Halt`] carries the same data
//! but signals "stop and flush now" — the dispatch boundary emits it
//! and runs nothing further for the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use plinth_db::DbError;
use serde_json::{json, Value};

/// What a handler produces: a reply, or an unrecoverable halt.
pub type HandlerResult = Result<Reply, Halt>;

/// A JSON response with a status code.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    /// `200` with `{message: "OK"}`.
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "message": "OK" }),
        }
    }

    /// `200` with an arbitrary JSON body.
    pub fn send(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: data,
        }
    }

    /// The given status with `{message}`.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// An unrecoverable response.
///
/// Returned via `Err` so that `?` unwinds the handler immediately; the
/// boundary converts it into its wrapped [`Reply`] and flushes.
#[derive(Debug, Clone, PartialEq)]
pub struct Halt(Reply);

impl Halt {
    /// Terminates the request with the given status and `{message}`.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Halt(Reply::error(status, message))
    }

    /// Terminates with `404` and `{message: "Not found", details}`.
    pub fn not_found(details: Option<&str>) -> Self {
        Halt(Reply {
            status: StatusCode::NOT_FOUND,
            body: json!({
                "message": "Not found",
                "details": details.unwrap_or(""),
            }),
        })
    }

    pub fn into_reply(self) -> Reply {
        self.0
    }
}

impl From<Halt> for Reply {
    fn from(halt: Halt) -> Self {
        halt.0
    }
}

/// A failed query terminates the request with a 500 carrying the
/// single query-failure message.
impl From<DbError> for Halt {
    fn from(e: DbError) -> Self {
        Halt::error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
    }
}
